use {
  super::*,
  bitcoin::blockdata::{
    opcodes::{self, Opcode},
    script::{
      Instruction::{self, Op, PushBytes},
      Instructions,
    },
  },
  std::iter::Peekable,
};

pub(crate) const PROTOCOL_ID: [u8; 3] = *b"ord";
pub(crate) const BODY_TAG: [u8; 0] = [];

/// One inscription attempt found in a tapscript, together with the
/// irregularities that make it cursed.
#[derive(Default, PartialEq, Clone, Serialize, Deserialize, Debug, Eq)]
pub struct Envelope {
  pub input: u32,
  pub offset: u32,
  pub inscription: Inscription,
  pub duplicate_field: bool,
  pub incomplete_field: bool,
  pub pushnum: bool,
  pub stutter: bool,
  pub unrecognized_even_field: bool,
}

#[derive(Debug, PartialEq)]
struct RawEnvelope {
  input: u32,
  offset: u32,
  payload: Vec<Vec<u8>>,
  pushnum: bool,
  stutter: bool,
}

impl From<RawEnvelope> for Envelope {
  fn from(raw: RawEnvelope) -> Self {
    let body = raw
      .payload
      .iter()
      .enumerate()
      .position(|(i, push)| i % 2 == 0 && push.is_empty());

    let mut fields: BTreeMap<&[u8], Vec<&[u8]>> = BTreeMap::new();

    let mut incomplete_field = false;

    for item in raw.payload[..body.unwrap_or(raw.payload.len())].chunks(2) {
      match item {
        [key, value] => fields.entry(key).or_default().push(value),
        _ => incomplete_field = true,
      }
    }

    let duplicate_field = fields.values().any(|values| values.len() > 1);

    let inscription = Inscription {
      body: body.map(|i| raw.payload[i + 1..].concat()),
      content_encoding: Tag::ContentEncoding.take(&mut fields),
      content_type: Tag::ContentType.take(&mut fields),
      delegate: Tag::Delegate.take(&mut fields),
      metadata: Tag::Metadata.take(&mut fields),
      metaprotocol: Tag::Metaprotocol.take(&mut fields),
      parent: Tag::Parent.take(&mut fields),
      pointer: Tag::Pointer.take(&mut fields),
    };

    let unrecognized_even_field = fields
      .keys()
      .any(|tag| tag.first().is_some_and(|lsb| lsb % 2 == 0));

    Self {
      input: raw.input,
      offset: raw.offset,
      inscription,
      duplicate_field,
      incomplete_field,
      pushnum: raw.pushnum,
      stutter: raw.stutter,
      unrecognized_even_field,
    }
  }
}

impl Envelope {
  /// Parses every envelope in every input of `transaction`, ordered by
  /// input and then by position within the input.
  pub fn from_transaction(transaction: &Transaction) -> Vec<Self> {
    (0..)
      .zip(&transaction.input)
      .filter_map(|(input, tx_in)| Some((input, tx_in.witness.tapscript()?)))
      .flat_map(|(input, tapscript)| RawEnvelope::from_tapscript(tapscript, input))
      .map(Self::from)
      .collect()
  }
}

impl RawEnvelope {
  /// Envelopes found before a malformed instruction are kept; the rest of
  /// the script cannot be tokenized and is skipped.
  fn from_tapscript(tapscript: &Script, input: u32) -> Vec<Self> {
    let mut envelopes = Vec::new();

    let mut instructions = tapscript.instructions().peekable();

    let mut stuttered = false;
    let mut offset = 0;

    while let Some(Ok(instruction)) = instructions.next() {
      if instruction != PushBytes((&[]).into()) {
        continue;
      }

      match Self::from_instructions(&mut instructions, input, offset, stuttered) {
        Ok((_, Some(envelope))) => {
          envelopes.push(envelope);
          offset += 1;
        }
        Ok((stutter, None)) => stuttered = stutter,
        Err(err) => {
          log::trace!("stopped scanning input {input} tapscript: {err}");
          break;
        }
      }
    }

    envelopes
  }

  fn accept(
    instructions: &mut Peekable<Instructions>,
    instruction: Instruction,
  ) -> Result<bool, script::Error> {
    if instructions.peek() == Some(&Ok(instruction)) {
      instructions.next().transpose()?;
      Ok(true)
    } else {
      Ok(false)
    }
  }

  fn pushnum_value(opcode: Opcode) -> Option<u8> {
    let byte = opcode.to_u8();

    if opcode == opcodes::all::OP_PUSHNUM_NEG1 {
      Some(0x81)
    } else if (opcodes::all::OP_PUSHNUM_1.to_u8()..=opcodes::all::OP_PUSHNUM_16.to_u8())
      .contains(&byte)
    {
      Some(byte - opcodes::all::OP_PUSHNUM_1.to_u8() + 1)
    } else {
      None
    }
  }

  fn from_instructions(
    instructions: &mut Peekable<Instructions>,
    input: u32,
    offset: u32,
    stutter: bool,
  ) -> Result<(bool, Option<Self>), script::Error> {
    let empty = PushBytes((&[]).into());

    if !Self::accept(instructions, Op(opcodes::all::OP_IF))?
      || !Self::accept(instructions, PushBytes((&PROTOCOL_ID).into()))?
    {
      let stutter = instructions.peek() == Some(&Ok(empty));
      return Ok((stutter, None));
    }

    let mut pushnum = false;

    let mut payload = Vec::new();

    loop {
      match instructions.next().transpose()? {
        None => return Ok((false, None)),
        Some(Op(opcodes::all::OP_ENDIF)) => {
          return Ok((
            false,
            Some(Self {
              input,
              offset,
              payload,
              pushnum,
              stutter,
            }),
          ));
        }
        Some(Op(opcode)) => match Self::pushnum_value(opcode) {
          Some(value) => {
            pushnum = true;
            payload.push(vec![value]);
          }
          None => return Ok((false, None)),
        },
        Some(PushBytes(push)) => payload.push(push.as_bytes().to_vec()),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use {super::*, bitcoin::Witness};

  fn parse(witnesses: &[Witness]) -> Vec<Envelope> {
    Envelope::from_transaction(&Transaction {
      version: bitcoin::transaction::Version::TWO,
      lock_time: bitcoin::absolute::LockTime::ZERO,
      input: witnesses
        .iter()
        .map(|witness| bitcoin::TxIn {
          previous_output: OutPoint::null(),
          script_sig: ScriptBuf::new(),
          sequence: bitcoin::Sequence::ENABLE_RBF_NO_LOCKTIME,
          witness: witness.clone(),
        })
        .collect(),
      output: Vec::new(),
    })
  }

  fn tapscript(script: ScriptBuf) -> Witness {
    Witness::from_slice(&[script.into_bytes(), Vec::new()])
  }

  fn empty_envelope() -> script::Builder {
    script::Builder::new()
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_opcode(opcodes::all::OP_ENDIF)
  }

  #[test]
  fn empty() {
    assert_eq!(parse(&[Witness::new()]), Vec::new());
  }

  #[test]
  fn ignore_key_path_spends() {
    assert_eq!(
      parse(&[Witness::from_slice(&[empty_envelope()
        .into_script()
        .into_bytes()])]),
      Vec::new()
    );
  }

  #[test]
  fn ignore_key_path_spends_with_annex() {
    assert_eq!(
      parse(&[Witness::from_slice(&[
        empty_envelope().into_script().into_bytes(),
        vec![0x50]
      ])]),
      Vec::new()
    );
  }

  #[test]
  fn annex_is_dropped_before_taking_script() {
    assert_eq!(
      parse(&[Witness::from_slice(&[
        empty_envelope().into_script().into_bytes(),
        Vec::new(),
        vec![0x50, 1, 2],
      ])]),
      vec![Envelope::default()]
    );
  }

  #[test]
  fn parse_from_tapscript() {
    assert_eq!(
      parse(&[tapscript(empty_envelope().into_script())]),
      vec![Envelope::default()]
    );
  }

  #[test]
  fn malformed_tail_keeps_earlier_envelopes() {
    let mut script_bytes = empty_envelope().into_script().into_bytes();
    script_bytes.push(0x01);

    assert_eq!(
      parse(&[Witness::from_slice(&[script_bytes, Vec::new()])]),
      vec![Envelope::default()]
    );
  }

  #[test]
  fn no_inscription() {
    assert_eq!(parse(&[tapscript(ScriptBuf::new())]), Vec::new());
  }

  #[test]
  fn content_type_and_body() {
    assert_eq!(
      parse(&[envelope(&[
        &PROTOCOL_ID,
        &[1],
        b"text/plain;charset=utf-8",
        &[],
        b"ord",
      ])]),
      vec![Envelope {
        inscription: inscription("text/plain;charset=utf-8", "ord"),
        ..default()
      }]
    );
  }

  #[test]
  fn body_is_concatenated_across_pushes() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[], b"foo", b"bar", &[], b"baz"])]),
      vec![Envelope {
        inscription: Inscription {
          body: Some(b"foobarbaz".to_vec()),
          ..default()
        },
        ..default()
      }]
    );
  }

  #[test]
  fn body_with_no_pushes_is_empty() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[]])]),
      vec![Envelope {
        inscription: Inscription {
          body: Some(Vec::new()),
          ..default()
        },
        ..default()
      }]
    );
  }

  #[test]
  fn empty_push_at_odd_position_is_a_value() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[1], &[], &[], b"ord"])]),
      vec![Envelope {
        inscription: Inscription {
          content_type: Some(Vec::new()),
          body: Some(b"ord".to_vec()),
          ..default()
        },
        ..default()
      }]
    );
  }

  #[test]
  fn all_fields() {
    let parent = inscription_id(1);
    let delegate = inscription_id(2);

    assert_eq!(
      parse(&[envelope(&[
        &PROTOCOL_ID,
        &[1],
        b"application/json",
        &[2],
        &[0x10],
        &[3],
        &parent.value(),
        &[5],
        b"meta",
        &[7],
        b"proto",
        &[9],
        b"br",
        &[11],
        &delegate.value(),
        &[],
        b"{}",
      ])]),
      vec![Envelope {
        inscription: Inscription {
          body: Some(b"{}".to_vec()),
          content_encoding: Some(b"br".to_vec()),
          content_type: Some(b"application/json".to_vec()),
          delegate: Some(delegate.value()),
          metadata: Some(b"meta".to_vec()),
          metaprotocol: Some(b"proto".to_vec()),
          parent: Some(parent.value()),
          pointer: Some(vec![0x10]),
        },
        ..default()
      }]
    );
  }

  #[test]
  fn duplicate_field() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[1], b"foo", &[1], b"bar"])]),
      vec![Envelope {
        inscription: Inscription {
          content_type: Some(b"foo".to_vec()),
          ..default()
        },
        duplicate_field: true,
        ..default()
      }]
    );
  }

  #[test]
  fn duplicate_unknown_odd_field() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[255], &[], &[255], &[]])]),
      vec![Envelope {
        duplicate_field: true,
        ..default()
      }]
    );
  }

  #[test]
  fn duplicate_even_field_is_also_unrecognized() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[2], &[1], &[2], &[2]])]),
      vec![Envelope {
        inscription: Inscription {
          pointer: Some(vec![1]),
          ..default()
        },
        duplicate_field: true,
        unrecognized_even_field: true,
        ..default()
      }]
    );
  }

  #[test]
  fn chunked_metadata_is_concatenated_and_a_duplicate() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[5], b"foo", &[5], b"bar"])]),
      vec![Envelope {
        inscription: Inscription {
          metadata: Some(b"foobar".to_vec()),
          ..default()
        },
        duplicate_field: true,
        ..default()
      }]
    );
  }

  #[test]
  fn incomplete_field() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[99]])]),
      vec![Envelope {
        incomplete_field: true,
        ..default()
      }]
    );
  }

  #[test]
  fn unknown_odd_tag_is_ignored() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[13], b"bar", &[], b"ord"])]),
      vec![Envelope {
        inscription: Inscription {
          body: Some(b"ord".to_vec()),
          ..default()
        },
        ..default()
      }]
    );
  }

  #[test]
  fn unknown_even_tag_is_unrecognized() {
    assert_eq!(
      parse(&[envelope(&[&PROTOCOL_ID, &[22], b"bar", &[], b"ord"])]),
      vec![Envelope {
        inscription: Inscription {
          body: Some(b"ord".to_vec()),
          ..default()
        },
        unrecognized_even_field: true,
        ..default()
      }]
    );
  }

  #[test]
  fn pushnum_values_are_flagged() {
    for (opcode, value) in [
      (opcodes::all::OP_PUSHNUM_NEG1, 0x81),
      (opcodes::all::OP_PUSHNUM_1, 1),
      (opcodes::all::OP_PUSHNUM_7, 7),
      (opcodes::all::OP_PUSHNUM_16, 16),
    ] {
      let script = script::Builder::new()
        .push_opcode(opcodes::OP_FALSE)
        .push_opcode(opcodes::all::OP_IF)
        .push_slice(PROTOCOL_ID)
        .push_opcode(opcodes::OP_FALSE)
        .push_opcode(opcode)
        .push_opcode(opcodes::all::OP_ENDIF)
        .into_script();

      assert_eq!(
        parse(&[tapscript(script)]),
        vec![Envelope {
          inscription: Inscription {
            body: Some(vec![value]),
            ..default()
          },
          pushnum: true,
          ..default()
        }]
      );
    }
  }

  #[test]
  fn non_push_opcode_drops_only_that_envelope() {
    let script = script::Builder::new()
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_opcode(opcodes::all::OP_CHECKSIG)
      .push_opcode(opcodes::all::OP_ENDIF)
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_opcode(opcodes::all::OP_ENDIF)
      .into_script();

    assert_eq!(parse(&[tapscript(script)]), vec![Envelope::default()]);
  }

  #[test]
  fn unterminated_envelope_is_ignored() {
    let script = script::Builder::new()
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_slice(b"foo")
      .into_script();

    assert_eq!(parse(&[tapscript(script)]), Vec::new());
  }

  #[test]
  fn wrong_protocol_is_ignored() {
    let script = script::Builder::new()
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(b"foo")
      .push_opcode(opcodes::all::OP_ENDIF)
      .into_script();

    assert_eq!(parse(&[tapscript(script)]), Vec::new());
  }

  #[test]
  fn stutter_before_if() {
    let script = script::Builder::new()
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_opcode(opcodes::all::OP_ENDIF)
      .into_script();

    assert_eq!(
      parse(&[tapscript(script)]),
      vec![Envelope {
        stutter: true,
        ..default()
      }]
    );
  }

  #[test]
  fn stutter_inside_if() {
    let script = script::Builder::new()
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_opcode(opcodes::all::OP_ENDIF)
      .into_script();

    assert_eq!(
      parse(&[tapscript(script)]),
      vec![Envelope {
        stutter: true,
        ..default()
      }]
    );
  }

  #[test]
  fn no_stutter_after_unrelated_opcode() {
    let script = script::Builder::new()
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_CHECKSIG)
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_opcode(opcodes::all::OP_ENDIF)
      .into_script();

    assert_eq!(parse(&[tapscript(script)]), vec![Envelope::default()]);
  }

  #[test]
  fn multiple_envelopes_in_one_input_have_increasing_offsets() {
    let script = empty_envelope()
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_opcode(opcodes::all::OP_ENDIF)
      .into_script();

    assert_eq!(
      parse(&[tapscript(script)]),
      vec![
        Envelope::default(),
        Envelope {
          offset: 1,
          ..default()
        }
      ]
    );
  }

  #[test]
  fn envelopes_in_multiple_inputs() {
    assert_eq!(
      parse(&[
        envelope(&[&PROTOCOL_ID, &[], b"foo"]),
        Witness::new(),
        envelope(&[&PROTOCOL_ID, &[], b"bar"]),
      ]),
      vec![
        Envelope {
          inscription: Inscription {
            body: Some(b"foo".to_vec()),
            ..default()
          },
          ..default()
        },
        Envelope {
          input: 2,
          inscription: Inscription {
            body: Some(b"bar".to_vec()),
            ..default()
          },
          ..default()
        }
      ]
    );
  }

  #[test]
  fn parsing_is_idempotent() {
    let witness = envelope(&[&PROTOCOL_ID, &[1], b"text/plain", &[], b"hello"]);
    assert_eq!(parse(&[witness.clone()]), parse(&[witness]));
  }

  #[test]
  fn witness_round_trip() {
    let inscription = Inscription {
      body: Some(vec![0; 1200]),
      content_type: Some(b"text/plain".to_vec()),
      metadata: Some(vec![1; 600]),
      pointer: Some(vec![1]),
      ..default()
    };

    assert_eq!(
      parse(&[inscription.to_witness()]),
      vec![Envelope {
        inscription,
        ..default()
      }]
    );
  }
}
