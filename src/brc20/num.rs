use {
  super::{params::*, *},
  std::num::IntErrorKind,
};

const SCALE: u128 = 1_000_000_000_000_000_000;

/// A BRC-20 amount with eighteen decimal places, held as the scaled integer
/// so that arithmetic is exact.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Default,
  Hash,
  DeserializeFromStr,
  SerializeDisplay,
)]
pub struct Num(u128);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumError {
  Invalid,
  Overflow,
}

impl Num {
  pub const ZERO: Self = Self(0);
  pub const MAX: Self = Self(MAX_AMOUNT);

  /// Parses a plain decimal string with at most `decimals` fractional
  /// digits. Signs, exponents, and a leading or trailing `.` are invalid.
  pub(crate) fn parse(s: &str, decimals: u8) -> Result<Self, NumError> {
    if decimals > MAX_DECIMAL_WIDTH {
      return Err(NumError::Invalid);
    }

    let (integer, fraction) = match s.split_once('.') {
      Some((integer, fraction)) => (integer, fraction),
      None => (s, ""),
    };

    let digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());

    if integer.is_empty()
      || !digits(integer)
      || !digits(fraction)
      || (s.contains('.') && fraction.is_empty())
      || fraction.len() > usize::from(decimals)
    {
      return Err(NumError::Invalid);
    }

    let value = format!("{integer}{fraction:0<18}")
      .parse::<u128>()
      .map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow => NumError::Overflow,
        _ => NumError::Invalid,
      })?;

    if value > MAX_AMOUNT {
      return Err(NumError::Overflow);
    }

    Ok(Self(value))
  }

  pub fn from_raw(raw: u128) -> Self {
    Self(raw)
  }

  pub fn raw(self) -> u128 {
    self.0
  }

  pub fn is_zero(self) -> bool {
    self.0 == 0
  }

  /// Whether this amount has non-zero digits past `decimals` places.
  pub fn exceeds_precision(self, decimals: u8) -> bool {
    let unit = 10u128.pow(u32::from(
      MAX_DECIMAL_WIDTH.saturating_sub(decimals.min(MAX_DECIMAL_WIDTH)),
    ));
    self.0 % unit != 0
  }

  pub fn checked_add(self, other: Self) -> Option<Self> {
    self
      .0
      .checked_add(other.0)
      .filter(|sum| *sum <= MAX_AMOUNT)
      .map(Self)
  }

  pub fn checked_sub(self, other: Self) -> Option<Self> {
    self.0.checked_sub(other.0).map(Self)
  }
}

impl Display for Num {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    let integer = self.0 / SCALE;
    let fraction = self.0 % SCALE;

    if fraction == 0 {
      write!(f, "{integer}")
    } else {
      let fraction = format!("{fraction:018}");
      write!(f, "{integer}.{}", fraction.trim_end_matches('0'))
    }
  }
}

impl FromStr for Num {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s, MAX_DECIMAL_WIDTH).map_err(|err| anyhow!("invalid amount `{s}`: {err:?}"))
  }
}
