use super::*;

#[derive(Serialize, PartialEq, Deserialize, Debug)]
pub struct Output {
  pub inscriptions: Vec<DecodedInscription>,
}

#[derive(Serialize, PartialEq, Deserialize, Debug)]
pub struct DecodedInscription {
  pub input: u32,
  pub offset: u32,
  pub content_type: Option<String>,
  pub content_encoding: Option<String>,
  pub metaprotocol: Option<String>,
  pub body: Option<String>,
  pub parent: Option<InscriptionId>,
  pub delegate: Option<InscriptionId>,
  pub pointer: Option<u64>,
  pub duplicate_field: bool,
  pub incomplete_field: bool,
  pub pushnum: bool,
  pub stutter: bool,
  pub unrecognized_even_field: bool,
  pub brc20: Option<Operation>,
  pub brc20_error: Option<brc20::PayloadError>,
}

impl DecodedInscription {
  fn new(envelope: Envelope, policy: DecimalsPolicy) -> Self {
    let (brc20, brc20_error) = if brc20::is_candidate(&envelope.inscription) {
      match Operation::from_inscription(&envelope.inscription, policy) {
        Ok(operation) => (Some(operation), None),
        Err(err) => (None, Some(err)),
      }
    } else {
      (None, None)
    };

    let inscription = &envelope.inscription;

    Self {
      input: envelope.input,
      offset: envelope.offset,
      content_type: inscription.content_type().map(str::to_string),
      content_encoding: inscription.content_encoding().map(str::to_string),
      metaprotocol: inscription.metaprotocol().map(str::to_string),
      body: inscription.body().map(hex::encode),
      parent: inscription.parent(),
      delegate: inscription.delegate(),
      pointer: inscription.pointer(),
      duplicate_field: envelope.duplicate_field,
      incomplete_field: envelope.incomplete_field,
      pushnum: envelope.pushnum,
      stutter: envelope.stutter,
      unrecognized_even_field: envelope.unrecognized_even_field,
      brc20,
      brc20_error,
    }
  }
}

#[derive(Debug, Parser)]
pub(crate) struct Decode {
  #[arg(
    long,
    help = "Read a consensus-encoded transaction from <FILE> instead of stdin."
  )]
  file: Option<PathBuf>,
}

impl Decode {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    let bytes = match self.file {
      Some(path) => fs::read(&path)
        .with_context(|| format!("failed to read transaction file `{}`", path.display()))?,
      None => {
        let mut bytes = Vec::new();
        io::stdin().read_to_end(&mut bytes)?;
        bytes
      }
    };

    let transaction = consensus::encode::deserialize::<Transaction>(&bytes)
      .context("failed to decode transaction")?;

    let policy = settings.decimals_policy()?;

    Ok(Some(Box::new(Output {
      inscriptions: Envelope::from_transaction(&transaction)
        .into_iter()
        .map(|envelope| DecodedInscription::new(envelope, policy))
        .collect(),
    })))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn decode(witness: Witness) -> Vec<DecodedInscription> {
    let transaction = Transaction {
      version: bitcoin::transaction::Version(2),
      lock_time: bitcoin::absolute::LockTime::ZERO,
      input: vec![bitcoin::TxIn {
        previous_output: OutPoint::null(),
        witness,
        ..default()
      }],
      output: Vec::new(),
    };

    Envelope::from_transaction(&transaction)
      .into_iter()
      .map(|envelope| DecodedInscription::new(envelope, DecimalsPolicy::Default))
      .collect()
  }

  #[test]
  fn brc20_payload_is_decoded() {
    let decoded = decode(
      brc20(r#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"1000"}"#).to_witness(),
    );

    assert_eq!(decoded.len(), 1);
    assert_eq!(
      decoded[0].content_type.as_deref(),
      Some("text/plain;charset=utf-8")
    );
    assert_eq!(
      decoded[0].brc20,
      Some(Operation::Mint(brc20::Mint {
        tick: "ordi".parse().unwrap(),
        amount: "1000".parse().unwrap(),
      }))
    );
    assert_eq!(decoded[0].brc20_error, None);
  }

  #[test]
  fn invalid_brc20_payload_reports_error() {
    let decoded = decode(
      brc20(r#"{"p":"brc-20","op":"mint","tick":"ordinals","amt":"1"}"#).to_witness(),
    );

    assert_eq!(decoded[0].brc20, None);
    assert_eq!(
      decoded[0].brc20_error,
      Some(brc20::PayloadError::InvalidTickLength("ordinals".into()))
    );
  }

  #[test]
  fn other_content_is_not_brc20() {
    let decoded = decode(inscription("image/png", [1, 2, 3]).to_witness());

    assert_eq!(decoded[0].body.as_deref(), Some("010203"));
    assert_eq!(decoded[0].brc20, None);
    assert_eq!(decoded[0].brc20_error, None);
  }

  #[test]
  fn optional_fields_are_reported() {
    let delegate = inscription_id(1);

    let decoded = decode(
      Inscription {
        content_encoding: Some(b"br".to_vec()),
        metaprotocol: Some(b"brc-20".to_vec()),
        delegate: Some(delegate.value()),
        ..inscription("text/plain", "hello")
      }
      .to_witness(),
    );

    assert_eq!(decoded[0].content_encoding.as_deref(), Some("br"));
    assert_eq!(decoded[0].metaprotocol.as_deref(), Some("brc-20"));
    assert_eq!(decoded[0].delegate, Some(delegate));
    assert_eq!(decoded[0].parent, None);
  }

  #[test]
  fn output_serializes_operation_tag() {
    let decoded = decode(
      brc20(r#"{"p":"brc-20","op":"transfer","tick":"ordi","amt":"1.5"}"#).to_witness(),
    );

    let json = serde_json::to_value(&decoded[0]).unwrap();

    assert_eq!(json["brc20"]["op"], "transfer");
    assert_eq!(json["brc20"]["amount"], "1.5");
  }
}
