use super::*;

/// The fields decoded from one envelope. Raw bytes are kept as found on
/// chain; typed views are exposed through accessors.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Eq, Default)]
pub struct Inscription {
  pub body: Option<Vec<u8>>,
  pub content_encoding: Option<Vec<u8>>,
  pub content_type: Option<Vec<u8>>,
  pub delegate: Option<Vec<u8>>,
  pub metadata: Option<Vec<u8>>,
  pub metaprotocol: Option<Vec<u8>>,
  pub parent: Option<Vec<u8>>,
  pub pointer: Option<Vec<u8>>,
}

impl Inscription {
  #[cfg(test)]
  pub(crate) fn new(content_type: Option<Vec<u8>>, body: Option<Vec<u8>>) -> Self {
    Self {
      content_type,
      body,
      ..default()
    }
  }

  pub fn body(&self) -> Option<&[u8]> {
    self.body.as_deref()
  }

  pub fn content_type(&self) -> Option<&str> {
    std::str::from_utf8(self.content_type.as_ref()?).ok()
  }

  pub fn content_encoding(&self) -> Option<&str> {
    std::str::from_utf8(self.content_encoding.as_ref()?).ok()
  }

  pub fn metaprotocol(&self) -> Option<&str> {
    std::str::from_utf8(self.metaprotocol.as_ref()?).ok()
  }

  pub fn parent(&self) -> Option<InscriptionId> {
    InscriptionId::from_value(self.parent.as_deref()?)
  }

  pub fn delegate(&self) -> Option<InscriptionId> {
    InscriptionId::from_value(self.delegate.as_deref()?)
  }

  /// The output offset this inscription asks to be placed at. Values wider
  /// than eight bytes are accepted only if the extra bytes are zero.
  pub fn pointer(&self) -> Option<u64> {
    let value = self.pointer.as_ref()?;

    if value.iter().skip(8).any(|byte| *byte != 0) {
      return None;
    }

    let mut bytes = [0; 8];
    let len = value.len().min(8);
    bytes[..len].copy_from_slice(&value[..len]);

    Some(u64::from_le_bytes(bytes))
  }

  /// Drops the content fields, keeping the fields that relate this
  /// inscription to others.
  pub(crate) fn strip_content(&mut self) {
    self.body = None;
    self.content_type = None;
    self.content_encoding = None;
  }

  #[cfg(test)]
  pub(crate) fn append_reveal_script(&self, builder: script::Builder) -> script::Builder {
    use bitcoin::blockdata::{constants::MAX_SCRIPT_ELEMENT_SIZE, opcodes};

    let mut builder = builder
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(opcodes::all::OP_IF)
      .push_slice(envelope::PROTOCOL_ID);

    builder = Tag::ContentType.append(builder, self.content_type.as_deref());
    builder = Tag::ContentEncoding.append(builder, self.content_encoding.as_deref());
    builder = Tag::Metaprotocol.append(builder, self.metaprotocol.as_deref());
    builder = Tag::Parent.append(builder, self.parent.as_deref());
    builder = Tag::Delegate.append(builder, self.delegate.as_deref());
    builder = Tag::Pointer.append(builder, self.pointer.as_deref());
    builder = Tag::Metadata.append(builder, self.metadata.as_deref());

    if let Some(body) = &self.body {
      builder = builder.push_slice(envelope::BODY_TAG);
      for chunk in body.chunks(MAX_SCRIPT_ELEMENT_SIZE) {
        builder = builder.push_slice::<&script::PushBytes>(chunk.try_into().unwrap());
      }
    }

    builder.push_opcode(opcodes::all::OP_ENDIF)
  }

  #[cfg(test)]
  pub(crate) fn to_witness(&self) -> bitcoin::Witness {
    let script = self.append_reveal_script(script::Builder::new()).into_script();

    let mut witness = bitcoin::Witness::new();
    witness.push(script);
    witness.push(Vec::<u8>::new());
    witness
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pointer_decodes_little_endian() {
    fn pointer(value: &[u8]) -> Option<u64> {
      Inscription {
        pointer: Some(value.into()),
        ..default()
      }
      .pointer()
    }

    assert_eq!(pointer(&[]), Some(0));
    assert_eq!(pointer(&[1]), Some(1));
    assert_eq!(pointer(&[0, 1]), Some(256));
    assert_eq!(pointer(&[0xff; 8]), Some(u64::MAX));
    assert_eq!(pointer(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 0]), Some(1));
    assert_eq!(pointer(&[1, 0, 0, 0, 0, 0, 0, 0, 1]), None);
    assert_eq!(Inscription::default().pointer(), None);
  }

  #[test]
  fn parent_requires_valid_value() {
    let id = inscription_id(1);

    let inscription = Inscription {
      parent: Some(id.value()),
      ..default()
    };
    assert_eq!(inscription.parent(), Some(id));

    let inscription = Inscription {
      parent: Some(vec![1, 2, 3]),
      ..default()
    };
    assert_eq!(inscription.parent(), None);
  }

  #[test]
  fn strip_content_keeps_relations() {
    let mut inscription = Inscription {
      body: Some(b"hello".to_vec()),
      content_type: Some(b"text/plain".to_vec()),
      content_encoding: Some(b"br".to_vec()),
      parent: Some(inscription_id(1).value()),
      metaprotocol: Some(b"foo".to_vec()),
      ..default()
    };

    inscription.strip_content();

    assert_eq!(
      inscription,
      Inscription {
        parent: Some(inscription_id(1).value()),
        metaprotocol: Some(b"foo".to_vec()),
        ..default()
      }
    );
  }

  #[test]
  fn text_accessors_require_utf8() {
    let inscription = Inscription {
      content_type: Some(vec![0xff]),
      metaprotocol: Some(b"brc-20".to_vec()),
      ..default()
    };
    assert_eq!(inscription.content_type(), None);
    assert_eq!(inscription.metaprotocol(), Some("brc-20"));
  }
}
