use super::*;

#[derive(Deserialize, Default, PartialEq, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
  pub(crate) batch_size: Option<usize>,
  pub(crate) bitcoin_data_dir: Option<PathBuf>,
  pub(crate) bitcoin_rpc_limit: Option<usize>,
  pub(crate) bitcoin_rpc_password: Option<String>,
  pub(crate) bitcoin_rpc_url: Option<String>,
  pub(crate) bitcoin_rpc_username: Option<String>,
  pub(crate) brc20_missing_dec: Option<DecimalsPolicy>,
  pub(crate) chain: Option<Chain>,
  pub(crate) cookie_file: Option<PathBuf>,
  pub(crate) data_dir: Option<PathBuf>,
  pub(crate) first_inscription_height: Option<u32>,
  pub(crate) height_limit: Option<u32>,
  pub(crate) index: Option<PathBuf>,
  pub(crate) index_cache_size: Option<usize>,
  pub(crate) jubilee_height: Option<u32>,
  pub(crate) outpoint_cache_size: Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn example_config_file_is_valid() {
    let config: Config = serde_yaml::from_reader(File::open("ord-brc20.yaml").unwrap()).unwrap();
    assert_eq!(config.chain, Some(Chain::Mainnet));
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(serde_yaml::from_str::<Config>("hidden: []").is_err());
  }

  #[test]
  fn fields_use_kebab_case_values() {
    assert_eq!(
      serde_yaml::from_str::<Config>("chain: regtest\nbrc20_missing_dec: require").unwrap(),
      Config {
        chain: Some(Chain::Regtest),
        brc20_missing_dec: Some(DecimalsPolicy::Require),
        ..default()
      }
    );
  }
}
