use super::{params::*, *};

/// A token symbol as written by its deployer. Four bytes for ordinary ticks,
/// five for self-mint ticks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct Tick(String);

/// The case-insensitive form of a tick, used to identify a token.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct LowerTick(String);

impl Tick {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn to_lower(&self) -> LowerTick {
    LowerTick(self.0.to_lowercase())
  }

  pub fn is_self_mint(&self) -> bool {
    self.0.len() == SELF_MINT_TICK_LENGTH
  }
}

impl FromStr for Tick {
  type Err = PayloadError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.len() {
      0 => Err(PayloadError::EmptyTick),
      ORIGINAL_TICK_LENGTH | SELF_MINT_TICK_LENGTH => Ok(Self(s.into())),
      _ => Err(PayloadError::InvalidTickLength(s.into())),
    }
  }
}

impl Display for Tick {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl LowerTick {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl FromStr for LowerTick {
  type Err = PayloadError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(s.parse::<Tick>()?.to_lower())
  }
}

impl Display for LowerTick {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}
