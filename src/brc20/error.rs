use super::*;

/// Why a payload was not a valid BRC-20 operation. Such payloads are
/// dropped before they reach the state processor.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum PayloadError {
  #[error("unsupported content type")]
  InvalidContentType,
  #[error("invalid json")]
  InvalidJson,
  #[error("field `{0}` is not a string")]
  InvalidFieldType(String),
  #[error("invalid protocol")]
  InvalidProtocol,
  #[error("invalid operation `{0}`")]
  InvalidOperation(String),
  #[error("empty tick")]
  EmptyTick,
  #[error("invalid tick length `{0}`")]
  InvalidTickLength(String),
  #[error("empty max")]
  EmptyMax,
  #[error("invalid max `{0}`")]
  InvalidMax(String),
  #[error("invalid dec `{0}`")]
  InvalidDecimals(String),
  #[error("invalid lim `{0}`")]
  InvalidLimit(String),
  #[error("invalid self_mint `{0}`")]
  InvalidSelfMint(String),
  #[error("invalid amt `{0}`")]
  InvalidAmount(String),
  #[error("numeric overflow `{0}`")]
  NumericOverflow(String),
}

/// Why a decoded operation had no effect on token state.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum Brc20Error {
  #[error("tick `{0}` already deployed")]
  DuplicateTick(String),
  #[error("tick `{0}` not found")]
  TickNotFound(String),
  #[error("amount `{amount}` has more than {decimals} decimals")]
  AmountExceedsPrecision { amount: String, decimals: u8 },
  #[error("zero amount not allowed")]
  InvalidZeroAmount,
  #[error("amount `{amount}` exceeds mint limit `{limit}`")]
  AmountExceedsLimit { amount: String, limit: String },
  #[error("tick `{0}` fully minted")]
  TickMinted(String),
  #[error("insufficient available balance: have `{available}`, need `{amount}`")]
  InsufficientBalance { available: String, amount: String },
  #[error("transferable inscription {0} not found")]
  TransferableNotFound(InscriptionId),
  #[error("inscribed to coinbase")]
  InscribeToCoinbase,
  #[error("mint parent does not match deploy inscription {0}")]
  SelfMintParentMismatch(InscriptionId),
  #[error("self-mint ticks are not active at height {0}")]
  SelfMintNotActive(u32),
  #[error("balance overflow")]
  Overflow,
}
