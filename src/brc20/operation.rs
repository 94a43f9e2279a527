use {
  super::{num::NumError, params::*, *},
  clap::ValueEnum,
  serde_json::{Map, Value},
};

/// What to do with a deploy that has no `dec` field.
#[derive(Default, ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecimalsPolicy {
  /// Use eighteen decimals.
  #[default]
  Default,
  /// Reject the deploy.
  Require,
}

impl FromStr for DecimalsPolicy {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "default" => Ok(Self::Default),
      "require" => Ok(Self::Require),
      _ => bail!("invalid decimals policy `{s}`"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Operation {
  Deploy(Deploy),
  Mint(Mint),
  Transfer(Transfer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deploy {
  pub tick: Tick,
  pub max_supply: Num,
  pub limit_per_mint: Num,
  pub decimals: u8,
  pub self_mint: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mint {
  pub tick: Tick,
  pub amount: Num,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
  pub tick: Tick,
  pub amount: Num,
}

fn is_brc20_content_type(content_type: &str) -> bool {
  let mime = content_type
    .split(';')
    .next()
    .unwrap_or_default()
    .trim();

  mime == "application/json" || mime == "text/plain"
}

fn parse_object(body: &[u8]) -> Option<Map<String, Value>> {
  match serde_json::from_slice(body).ok()? {
    Value::Object(object) => Some(object),
    _ => None,
  }
}

/// Whether an inscription's content is worth keeping for BRC-20: a JSON or
/// plain text body holding an object with `"p": "brc-20"`.
pub(crate) fn is_candidate(inscription: &Inscription) -> bool {
  inscription.content_type().is_some_and(is_brc20_content_type)
    && inscription
      .body()
      .and_then(parse_object)
      .is_some_and(|object| object.get("p").and_then(Value::as_str) == Some(PROTOCOL_LITERAL))
}

fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>, PayloadError> {
  match object.get(key) {
    None => Ok(None),
    Some(Value::String(value)) => Ok(Some(value)),
    Some(_) => Err(PayloadError::InvalidFieldType(key.into())),
  }
}

fn parse_num(
  value: &str,
  decimals: u8,
  invalid: fn(String) -> PayloadError,
) -> Result<Num, PayloadError> {
  Num::parse(value, decimals).map_err(|err| match err {
    NumError::Invalid => invalid(value.into()),
    NumError::Overflow => PayloadError::NumericOverflow(value.into()),
  })
}

impl Operation {
  pub fn from_inscription(
    inscription: &Inscription,
    policy: DecimalsPolicy,
  ) -> Result<Self, PayloadError> {
    if !inscription.content_type().is_some_and(is_brc20_content_type) {
      return Err(PayloadError::InvalidContentType);
    }

    Self::decode(inscription.body().unwrap_or_default(), policy)
  }

  pub fn decode(body: &[u8], policy: DecimalsPolicy) -> Result<Self, PayloadError> {
    let object = parse_object(body).ok_or(PayloadError::InvalidJson)?;

    if string_field(&object, "p")? != Some(PROTOCOL_LITERAL) {
      return Err(PayloadError::InvalidProtocol);
    }

    let op = string_field(&object, "op")?.unwrap_or_default();

    let tick = string_field(&object, "tick")?
      .unwrap_or_default()
      .parse::<Tick>()?;

    match op {
      "deploy" => Deploy::decode(&object, tick, policy).map(Self::Deploy),
      "mint" => Ok(Self::Mint(Mint {
        tick,
        amount: Self::decode_amount(&object)?,
      })),
      "transfer" => Ok(Self::Transfer(Transfer {
        tick,
        amount: Self::decode_amount(&object)?,
      })),
      _ => Err(PayloadError::InvalidOperation(op.into())),
    }
  }

  fn decode_amount(object: &Map<String, Value>) -> Result<Num, PayloadError> {
    match string_field(object, "amt")? {
      None | Some("") => Err(PayloadError::InvalidAmount(String::new())),
      Some(amount) => parse_num(amount, MAX_DECIMAL_WIDTH, PayloadError::InvalidAmount),
    }
  }

  pub fn tick(&self) -> &Tick {
    match self {
      Self::Deploy(deploy) => &deploy.tick,
      Self::Mint(mint) => &mint.tick,
      Self::Transfer(transfer) => &transfer.tick,
    }
  }
}

impl Deploy {
  fn decode(
    object: &Map<String, Value>,
    tick: Tick,
    policy: DecimalsPolicy,
  ) -> Result<Self, PayloadError> {
    let self_mint_field = string_field(object, "self_mint")?;
    let self_mint = self_mint_field == Some(SELF_MINT_MARKER);

    if self_mint != tick.is_self_mint() {
      return Err(PayloadError::InvalidSelfMint(
        self_mint_field.unwrap_or_default().into(),
      ));
    }

    let decimals = match string_field(object, "dec")? {
      Some(dec) => {
        if dec.is_empty() || !dec.bytes().all(|byte| byte.is_ascii_digit()) {
          return Err(PayloadError::InvalidDecimals(dec.into()));
        }

        dec
          .parse::<u8>()
          .ok()
          .filter(|decimals| *decimals <= MAX_DECIMAL_WIDTH)
          .ok_or_else(|| PayloadError::InvalidDecimals(dec.into()))?
      }
      None => match policy {
        DecimalsPolicy::Default => DEFAULT_DECIMALS,
        DecimalsPolicy::Require => return Err(PayloadError::InvalidDecimals(String::new())),
      },
    };

    let max_supply = match string_field(object, "max")? {
      None | Some("") => return Err(PayloadError::EmptyMax),
      Some(max) => parse_num(max, decimals, PayloadError::InvalidMax)?,
    };

    let max_supply = match (max_supply.is_zero(), self_mint) {
      (false, _) => max_supply,
      (true, true) => Num::MAX,
      (true, false) => return Err(PayloadError::InvalidMax("0".into())),
    };

    let limit_per_mint = match string_field(object, "lim")? {
      None => max_supply,
      Some(lim) => {
        let limit = parse_num(lim, decimals, PayloadError::InvalidLimit)?;

        match (limit.is_zero(), self_mint) {
          (false, _) => limit,
          (true, true) => Num::MAX,
          (true, false) => return Err(PayloadError::InvalidLimit(lim.into())),
        }
      }
    };

    Ok(Self {
      tick,
      max_supply,
      limit_per_mint,
      decimals,
      self_mint,
    })
  }
}
