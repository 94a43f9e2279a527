use super::*;

/// The owner of a balance: the address an output script encodes, or the
/// hash of the script when it has no address form.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub enum ScriptKey {
  Address(Address<NetworkUnchecked>),
  ScriptHash(ScriptHash),
}

impl ScriptKey {
  pub fn from_script(script: &Script, network: Network) -> Self {
    match Address::from_script(script, network) {
      Ok(address) => Self::Address(address.as_unchecked().clone()),
      Err(_) => Self::ScriptHash(script.script_hash()),
    }
  }
}

impl Display for ScriptKey {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Self::Address(address) => write!(f, "{}", address.clone().assume_checked()),
      Self::ScriptHash(script_hash) => write!(f, "{script_hash}"),
    }
  }
}
