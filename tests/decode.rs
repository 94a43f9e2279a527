use super::*;

#[test]
fn decode_brc20_inscription_from_file() {
  let transaction = reveal_transaction(
    "text/plain;charset=utf-8",
    br#"{"p":"brc-20","op":"deploy","tick":"ordi","max":"21000000","lim":"1000"}"#,
  );

  let output = CommandBuilder::new("decode --file transaction.bin")
    .write("transaction.bin", consensus::serialize(&transaction))
    .run_and_deserialize_output::<Output>();

  assert_eq!(output.inscriptions.len(), 1);

  let inscription = &output.inscriptions[0];

  pretty_assert_eq!(
    inscription.content_type.as_deref(),
    Some("text/plain;charset=utf-8")
  );
  assert_eq!(inscription.input, 0);
  assert_eq!(inscription.offset, 0);
  assert!(!inscription.duplicate_field);

  match &inscription.brc20 {
    Some(Operation::Deploy(deploy)) => {
      assert_eq!(deploy.tick.to_string(), "ordi");
      assert_eq!(deploy.max_supply.to_string(), "21000000");
      assert_eq!(deploy.limit_per_mint.to_string(), "1000");
      assert_eq!(deploy.decimals, 18);
    }
    other => panic!("unexpected payload: {other:?}"),
  }
}

#[test]
fn decode_from_stdin() {
  let transaction = reveal_transaction("image/png", &[0, 1, 2, 3]);

  let output = CommandBuilder::new("decode")
    .stdin(consensus::serialize(&transaction))
    .run_and_deserialize_output::<Output>();

  assert_eq!(output.inscriptions.len(), 1);
  assert_eq!(output.inscriptions[0].body.as_deref(), Some("00010203"));
  assert_eq!(output.inscriptions[0].brc20, None);
  assert_eq!(output.inscriptions[0].brc20_error, None);
}

#[test]
fn missing_decimals_can_be_required() {
  let transaction = reveal_transaction(
    "application/json",
    br#"{"p":"brc-20","op":"deploy","tick":"ordi","max":"21000000"}"#,
  );

  let output = CommandBuilder::new("--brc20-missing-dec require decode --file tx.bin")
    .write("tx.bin", consensus::serialize(&transaction))
    .run_and_deserialize_output::<Output>();

  assert_eq!(output.inscriptions[0].brc20, None);
  assert!(output.inscriptions[0].brc20_error.is_some());
}

#[test]
fn transaction_without_envelopes_has_no_inscriptions() {
  let mut transaction = reveal_transaction("text/plain", b"");
  transaction.input[0].witness = Witness::new();

  let output = CommandBuilder::new("decode --file tx.bin")
    .write("tx.bin", consensus::serialize(&transaction))
    .run_and_deserialize_output::<Output>();

  assert!(output.inscriptions.is_empty());
}

#[test]
fn garbage_input_is_an_error() {
  let stderr = CommandBuilder::new("decode --file tx.bin")
    .write("tx.bin", [1, 2, 3])
    .expected_exit_code(1)
    .run_and_extract_stderr();

  assert!(stderr.starts_with("error: failed to decode transaction"), "{stderr}");
}
