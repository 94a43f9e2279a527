use {super::*, bitcoincore_rpc::Auth};

/// Options, environment variables, and the config file, resolved in that
/// order of precedence.
#[derive(Default, Debug, Clone)]
pub struct Settings {
  pub(crate) chain: Chain,
  pub(crate) config: Config,
  pub(crate) options: Options,
}

impl Settings {
  pub fn load(options: Options) -> Result<Self> {
    let config = match &options.config {
      Some(path) => Self::read_config(path)?,
      None => match &options.config_dir {
        Some(dir) if dir.join("ord-brc20.yaml").exists() => {
          Self::read_config(&dir.join("ord-brc20.yaml"))?
        }
        Some(_) | None => Config::default(),
      },
    };

    let chain = Self::setting_typed(
      options
        .signet
        .then_some(Chain::Signet)
        .or(options.regtest.then_some(Chain::Regtest))
        .or(options.testnet.then_some(Chain::Testnet))
        .or(options.chain_argument),
      Some("CHAIN"),
      config.chain,
      Chain::Mainnet,
    )?;

    Ok(Self {
      config,
      options,
      chain,
    })
  }

  fn read_config(path: &Path) -> Result<Config> {
    let file =
      File::open(path).with_context(|| format!("failed to open config `{}`", path.display()))?;

    serde_yaml::from_reader(file)
      .with_context(|| format!("failed to deserialize config `{}`", path.display()))
  }

  pub(crate) fn auth(&self) -> Result<Auth> {
    let rpc_user = Self::setting(
      self.options.bitcoin_rpc_username.as_deref(),
      Some("BITCOIN_RPC_USERNAME"),
      self.config.bitcoin_rpc_username.as_deref(),
      None,
    )?;

    let rpc_pass = Self::setting(
      self.options.bitcoin_rpc_password.as_deref(),
      Some("BITCOIN_RPC_PASSWORD"),
      self.config.bitcoin_rpc_password.as_deref(),
      None,
    )?;

    match (rpc_user, rpc_pass) {
      (Some(rpc_user), Some(rpc_pass)) => Ok(Auth::UserPass(rpc_user, rpc_pass)),
      (None, Some(_rpc_pass)) => Err(anyhow!("no bitcoind rpc user specified")),
      (Some(_rpc_user), None) => Err(anyhow!("no bitcoind rpc password specified")),
      _ => Ok(Auth::CookieFile(self.cookie_file()?)),
    }
  }

  pub(crate) fn bitcoin_rpc_client(&self) -> Result<Client> {
    let rpc_url = self.rpc_url()?;

    let auth = self.auth()?;

    log::info!("Connecting to Bitcoin Core at {rpc_url}");

    if let Auth::CookieFile(cookie_file) = &auth {
      log::info!(
        "Using credentials from cookie file at `{}`",
        cookie_file.display()
      );

      ensure!(
        cookie_file.is_file(),
        "cookie file `{}` does not exist",
        cookie_file.display()
      );
    }

    let client = Client::new(&rpc_url, auth)
      .with_context(|| format!("failed to connect to Bitcoin Core RPC at `{rpc_url}`"))?;

    let mut checks = 0;
    let rpc_chain = loop {
      match client.get_blockchain_info() {
        Ok(blockchain_info) => {
          break match blockchain_info.chain {
            Network::Bitcoin => Chain::Mainnet,
            Network::Testnet => Chain::Testnet,
            Network::Regtest => Chain::Regtest,
            Network::Signet => Chain::Signet,
            other => bail!("Bitcoin RPC server on unknown chain: {other}"),
          }
        }
        Err(bitcoincore_rpc::Error::JsonRpc(bitcoincore_rpc::jsonrpc::Error::Rpc(err)))
          if err.code == -28 => {}
        Err(err) => bail!("Failed to connect to Bitcoin Core RPC at `{rpc_url}`:  {err}"),
      }

      ensure! {
        checks < 100,
        "Failed to connect to Bitcoin Core RPC at `{rpc_url}`",
      }

      checks += 1;
      thread::sleep(Duration::from_millis(100));
    };

    let chain = self.chain();

    if rpc_chain != chain {
      bail!("Bitcoin RPC server is on {rpc_chain} but ord-brc20 is on {chain}");
    }

    Ok(client)
  }

  pub(crate) fn batch_size(&self) -> Result<usize> {
    Ok(
      Self::setting_typed(
        self.options.batch_size,
        Some("BATCH_SIZE"),
        self.config.batch_size,
        32,
      )?
      .max(1),
    )
  }

  pub(crate) fn bitcoin_rpc_limit(&self) -> Result<usize> {
    Self::setting_typed(
      self.options.bitcoin_rpc_limit,
      Some("BITCOIN_RPC_LIMIT"),
      self.config.bitcoin_rpc_limit,
      12,
    )
  }

  pub(crate) fn brc20_activation_height(&self) -> u32 {
    self
      .chain()
      .brc20_activation_height()
      .max(self.first_inscription_height())
  }

  pub(crate) fn brc20_self_mint_activation_height(&self) -> u32 {
    self.chain().brc20_self_mint_activation_height()
  }

  pub(crate) fn chain(&self) -> Chain {
    self.chain
  }

  pub(crate) fn cookie_file(&self) -> Result<PathBuf> {
    if let Some(cookie_file) = self
      .options
      .cookie_file
      .as_ref()
      .or(self.config.cookie_file.as_ref())
    {
      return Ok(cookie_file.clone());
    }

    let path = if let Some(bitcoin_data_dir) = self
      .options
      .bitcoin_data_dir
      .as_ref()
      .or(self.config.bitcoin_data_dir.as_ref())
    {
      bitcoin_data_dir.clone()
    } else if cfg!(target_os = "linux") {
      dirs::home_dir()
        .ok_or_else(|| anyhow!("failed to get cookie file path: could not get home dir"))?
        .join(".bitcoin")
    } else {
      dirs::data_dir()
        .ok_or_else(|| anyhow!("failed to get cookie file path: could not get data dir"))?
        .join("Bitcoin")
    };

    let path = self.chain().join_with_data_dir(&path);

    Ok(path.join(".cookie"))
  }

  pub(crate) fn data_dir(&self) -> Result<PathBuf> {
    let base = match self
      .options
      .data_dir
      .as_ref()
      .or(self.config.data_dir.as_ref())
    {
      Some(data_dir) => data_dir.clone(),
      None => dirs::data_dir()
        .ok_or_else(|| anyhow!("failed to get data dir"))?
        .join("ord-brc20"),
    };

    Ok(self.chain().join_with_data_dir(base))
  }

  pub(crate) fn decimals_policy(&self) -> Result<DecimalsPolicy> {
    Self::setting_typed(
      self.options.brc20_missing_dec,
      Some("BRC20_MISSING_DEC"),
      self.config.brc20_missing_dec,
      DecimalsPolicy::Default,
    )
  }

  pub(crate) fn first_inscription_height(&self) -> u32 {
    self
      .options
      .first_inscription_height
      .or(self.config.first_inscription_height)
      .unwrap_or_else(|| self.chain().first_inscription_height())
  }

  pub(crate) fn height_limit(&self) -> Option<u32> {
    self.options.height_limit.or(self.config.height_limit)
  }

  pub(crate) fn index(&self) -> Result<PathBuf> {
    match self.options.index.as_ref().or(self.config.index.as_ref()) {
      Some(index) => Ok(index.clone()),
      None => Ok(self.data_dir()?.join("index.redb")),
    }
  }

  pub(crate) fn index_cache_size(&self) -> Option<usize> {
    self
      .options
      .index_cache_size
      .or(self.config.index_cache_size)
  }

  pub(crate) fn jubilee_height(&self) -> u32 {
    self
      .options
      .jubilee_height
      .or(self.config.jubilee_height)
      .unwrap_or_else(|| self.chain().jubilee_height())
  }

  pub(crate) fn outpoint_cache_size(&self) -> Result<usize> {
    Self::setting_typed(
      self.options.outpoint_cache_size,
      Some("OUTPOINT_CACHE_SIZE"),
      self.config.outpoint_cache_size,
      1_000_000,
    )
  }

  pub(crate) fn rpc_url(&self) -> Result<String> {
    let base_url = Self::setting(
      self.options.bitcoin_rpc_url.as_deref(),
      Some("BITCOIN_RPC_URL"),
      self.config.bitcoin_rpc_url.as_deref(),
      None,
    )?
    .unwrap_or(format!("127.0.0.1:{}", self.chain().default_rpc_port()));

    Ok(format!("{base_url}/"))
  }

  fn setting_typed<T>(
    arg_value: Option<T>,
    env_key: Option<&str>,
    config_value: Option<T>,
    default_value: T,
  ) -> Result<T>
  where
    T: FromStr,
    T::Err: Into<Error>,
  {
    if let Some(arg_value) = arg_value {
      return Ok(arg_value);
    }

    if let Some(env_key) = env_key {
      let key = format!("ORD_BRC20_{env_key}");
      match env::var(key) {
        Ok(env_value) => {
          return env_value
            .parse::<T>()
            .map_err(Into::<Error>::into)
            .with_context(|| format!("failed to parse {env_key}"))
        }
        Err(err @ env::VarError::NotUnicode(_)) => return Err(err.into()),
        Err(env::VarError::NotPresent) => {}
      }
    }

    if let Some(config_value) = config_value {
      return Ok(config_value);
    }

    Ok(default_value)
  }

  fn setting(
    arg_value: Option<&str>,
    env_key: Option<&str>,
    config_value: Option<&str>,
    default_value: Option<&str>,
  ) -> Result<Option<String>> {
    if let Some(arg_value) = arg_value {
      return Ok(Some(arg_value.into()));
    }

    if let Some(env_key) = env_key {
      match env::var(format!("ORD_BRC20_{env_key}")) {
        Ok(env_value) => return Ok(Some(env_value)),
        Err(err @ env::VarError::NotUnicode(_)) => return Err(err.into()),
        Err(env::VarError::NotPresent) => {}
      }
    }

    Ok(config_value.or(default_value).map(str::to_string))
  }
}
