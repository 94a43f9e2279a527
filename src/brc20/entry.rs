use super::*;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TickEntry {
  pub tick: Tick,
  pub inscription_id: InscriptionId,
  pub max_supply: Num,
  pub limit_per_mint: Num,
  pub decimals: u8,
  pub self_mint: bool,
  pub minted_amount: Num,
  pub burned_amount: Num,
  pub deployed_height: u32,
  pub deployed_timestamp: u32,
  pub completed_height: Option<u32>,
  pub completed_timestamp: Option<u32>,
}

impl TickEntry {
  pub fn remaining(&self) -> Num {
    self
      .max_supply
      .checked_sub(self.minted_amount)
      .unwrap_or(Num::ZERO)
  }

  pub fn is_completed(&self) -> bool {
    self.minted_amount >= self.max_supply
  }
}

/// One script's holdings of one tick. `available_balance` is the part of
/// `overall_balance` not locked in transferable inscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Balance {
  pub tick: LowerTick,
  pub overall_balance: Num,
  pub available_balance: Num,
}

impl Balance {
  pub fn new(tick: LowerTick) -> Self {
    Self {
      tick,
      overall_balance: Num::ZERO,
      available_balance: Num::ZERO,
    }
  }

  pub(crate) fn key(script_key: &ScriptKey, tick: &LowerTick) -> String {
    format!("{script_key}_{tick}")
  }

  pub fn transferable_balance(&self) -> Num {
    self
      .overall_balance
      .checked_sub(self.available_balance)
      .unwrap_or(Num::ZERO)
  }
}

/// An inscribed transfer waiting to be sent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransferableLog {
  pub inscription_id: InscriptionId,
  pub owner: ScriptKey,
  pub tick: Tick,
  pub amount: Num,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeployEvent {
  pub tick: Tick,
  pub max_supply: Num,
  pub limit_per_mint: Num,
  pub decimals: u8,
  pub self_mint: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MintEvent {
  pub tick: Tick,
  pub amount: Num,
  pub clipped_from: Option<Num>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InscribeTransferEvent {
  pub tick: Tick,
  pub amount: Num,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransferTransferEvent {
  pub tick: Tick,
  pub amount: Num,
  pub burned: bool,
  pub returned: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Event {
  Deploy(DeployEvent),
  Mint(MintEvent),
  InscribeTransfer(InscribeTransferEvent),
  TransferTransfer(TransferTransferEvent),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
  Deploy,
  Mint,
  InscribeTransfer,
  TransferTransfer,
}

/// The outcome of one BRC-20 operation, successful or not.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Receipt {
  pub inscription_id: InscriptionId,
  pub txid: Txid,
  pub old_satpoint: Option<SatPoint>,
  pub new_satpoint: SatPoint,
  pub from: Option<ScriptKey>,
  pub to: Option<ScriptKey>,
  pub op: OperationKind,
  pub result: Result<Event, Brc20Error>,
}
