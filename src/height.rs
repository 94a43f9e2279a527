use {super::*, bitcoin::blockdata::constants::SUBSIDY_HALVING_INTERVAL, derive_more::Display};

#[derive(Copy, Clone, Debug, Display, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub(crate) struct Height(pub(crate) u32);

impl Height {
  pub(crate) fn subsidy(self) -> u64 {
    let halvings = self.0 / SUBSIDY_HALVING_INTERVAL;

    if halvings >= 64 {
      0
    } else {
      (Amount::ONE_BTC.to_sat() * 50) >> halvings
    }
  }
}
