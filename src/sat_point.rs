use {
  super::*,
  bitcoin::transaction::ParseOutPointError,
  std::num::ParseIntError,
  thiserror::Error,
};

/// The location of a single sat: an output plus an offset into it.
///
/// Rendered as `<txid>:<vout>:<offset>`. Inscriptions that fall out of a
/// block's value are parked on the null outpoint, with offsets that keep
/// growing as more sats are lost.
#[derive(
  Debug,
  PartialEq,
  Copy,
  Clone,
  Eq,
  PartialOrd,
  Ord,
  Default,
  Hash,
  DeserializeFromStr,
  SerializeDisplay,
)]
pub struct SatPoint {
  pub outpoint: OutPoint,
  pub offset: u64,
}

impl SatPoint {
  pub(crate) fn lost(offset: u64) -> Self {
    Self {
      outpoint: lost_outpoint(),
      offset,
    }
  }

  pub fn is_lost(&self) -> bool {
    self.outpoint == lost_outpoint()
  }
}

impl Display for SatPoint {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}:{}", self.outpoint, self.offset)
  }
}

impl FromStr for SatPoint {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (outpoint, offset) = s
      .rsplit_once(':')
      .ok_or_else(|| Error::Separator(s.into()))?;

    Ok(Self {
      outpoint: outpoint.parse().map_err(|source| Error::Outpoint {
        outpoint: outpoint.into(),
        source,
      })?,
      offset: offset.parse().map_err(|source| Error::Offset {
        offset: offset.into(),
        source,
      })?,
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("satpoint `{0}` has no offset separator")]
  Separator(String),
  #[error("satpoint offset `{offset}` invalid: {source}")]
  Offset {
    offset: String,
    source: ParseIntError,
  },
  #[error("satpoint outpoint `{outpoint}` invalid: {source}")]
  Outpoint {
    outpoint: String,
    source: ParseOutPointError,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display() {
    assert_eq!(
      satpoint(1, 5).to_string(),
      "1111111111111111111111111111111111111111111111111111111111111111:1:5"
    );
  }

  #[test]
  fn from_str_round_trips_display() {
    let satpoint = satpoint(2, 42);
    assert_eq!(satpoint.to_string().parse::<SatPoint>().unwrap(), satpoint);

    let lost = SatPoint::lost(1000);
    assert!(lost.is_lost());
    assert_eq!(lost.to_string().parse::<SatPoint>().unwrap(), lost);
  }

  #[test]
  fn from_str_errors() {
    assert_eq!(
      "foo".parse::<SatPoint>().unwrap_err().to_string(),
      "satpoint `foo` has no offset separator"
    );

    assert_matches!(
      "1111111111111111111111111111111111111111111111111111111111111111:1:x"
        .parse::<SatPoint>()
        .unwrap_err(),
      Error::Offset { .. }
    );

    assert_matches!(
      "foo:0".parse::<SatPoint>().unwrap_err(),
      Error::Outpoint { .. }
    );
  }

  #[test]
  fn serde_uses_display_form() {
    let satpoint = satpoint(3, 7);
    let json = serde_json::to_string(&satpoint).unwrap();
    assert_eq!(json, format!("\"{satpoint}\""));
    assert_eq!(serde_json::from_str::<SatPoint>(&json).unwrap(), satpoint);
  }
}
