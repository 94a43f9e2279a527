use {super::*, std::num::ParseIntError, thiserror::Error};

const TXID_LEN: usize = 32;

/// An inscription's creation transaction and its position among the new
/// inscriptions of that transaction, rendered as `<txid>i<index>`.
#[derive(
  Debug, PartialEq, Copy, Clone, Hash, Eq, PartialOrd, Ord, DeserializeFromStr, SerializeDisplay,
)]
pub struct InscriptionId {
  pub txid: Txid,
  pub index: u32,
}

impl Default for InscriptionId {
  fn default() -> Self {
    Self {
      txid: Txid::all_zeros(),
      index: 0,
    }
  }
}

impl InscriptionId {
  /// Decodes the compact form used by the parent and delegate fields: the
  /// txid bytes followed by the little-endian index with trailing zero
  /// bytes removed. A full four byte index is also accepted.
  pub(crate) fn from_value(value: &[u8]) -> Option<Self> {
    if !(TXID_LEN..=TXID_LEN + 4).contains(&value.len()) {
      return None;
    }

    let (txid, index) = value.split_at(TXID_LEN);

    if index.len() != 4 && index.last() == Some(&0) {
      return None;
    }

    let mut bytes = [0; 4];
    bytes[..index.len()].copy_from_slice(index);

    Some(Self {
      txid: Txid::from_slice(txid).ok()?,
      index: u32::from_le_bytes(bytes),
    })
  }

  pub(crate) fn value(self) -> Vec<u8> {
    let index = self.index.to_le_bytes();
    let len = index.iter().rposition(|byte| *byte != 0).map_or(0, |i| i + 1);

    let mut value = self.txid.to_byte_array().to_vec();
    value.extend_from_slice(&index[..len]);
    value
  }
}

impl Display for InscriptionId {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}i{}", self.txid, self.index)
  }
}

#[derive(Debug, Error)]
pub enum ParseError {
  #[error("invalid character: '{0}'")]
  Character(char),
  #[error("invalid length: {0}")]
  Length(usize),
  #[error("invalid separator: `{0}`")]
  Separator(char),
  #[error("invalid txid: {0}")]
  Txid(bitcoin::hex::HexToArrayError),
  #[error("invalid index: {0}")]
  Index(ParseIntError),
}

impl FromStr for InscriptionId {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if let Some(character) = s.chars().find(|c| !c.is_ascii()) {
      return Err(ParseError::Character(character));
    }

    const TXID_HEX_LEN: usize = TXID_LEN * 2;
    const MIN_LEN: usize = TXID_HEX_LEN + 2;

    if s.len() < MIN_LEN {
      return Err(ParseError::Length(s.len()));
    }

    let (txid, rest) = s.split_at(TXID_HEX_LEN);

    let separator = rest.chars().next().ok_or(ParseError::Length(s.len()))?;

    if separator != 'i' {
      return Err(ParseError::Separator(separator));
    }

    Ok(Self {
      txid: txid.parse().map_err(ParseError::Txid)?,
      index: rest[1..].parse().map_err(ParseError::Index)?,
    })
  }
}
