use super::*;

/// How repeated values of a field are combined.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Chunking {
  /// The first value is used.
  First,
  /// Values are concatenated in order, allowing fields larger than one push.
  /// Repeats still count as a duplicate field.
  Concatenate,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Tag {
  ContentType,
  Pointer,
  Parent,
  Metadata,
  Metaprotocol,
  ContentEncoding,
  Delegate,
}

impl Tag {
  pub(crate) const ALL: [Tag; 7] = [
    Self::ContentType,
    Self::Pointer,
    Self::Parent,
    Self::Metadata,
    Self::Metaprotocol,
    Self::ContentEncoding,
    Self::Delegate,
  ];

  pub(crate) fn byte(self) -> u8 {
    match self {
      Self::ContentType => 1,
      Self::Pointer => 2,
      Self::Parent => 3,
      Self::Metadata => 5,
      Self::Metaprotocol => 7,
      Self::ContentEncoding => 9,
      Self::Delegate => 11,
    }
  }

  pub(crate) fn chunking(self) -> Chunking {
    match self {
      Self::Metadata => Chunking::Concatenate,
      _ => Chunking::First,
    }
  }

  /// Removes this tag's value from `fields`. Repeats of a `First` tag stay
  /// behind, so an even one still counts as unrecognized.
  pub(crate) fn take(self, fields: &mut BTreeMap<&[u8], Vec<&[u8]>>) -> Option<Vec<u8>> {
    let key = [self.byte()];

    match self.chunking() {
      Chunking::Concatenate => {
        let values = fields.remove(key.as_slice())?;
        Some(values.concat())
      }
      Chunking::First => {
        let values = fields.get_mut(key.as_slice())?;

        if values.is_empty() {
          return None;
        }

        let value = values.remove(0).to_vec();

        if values.is_empty() {
          fields.remove(key.as_slice());
        }

        Some(value)
      }
    }
  }

  #[cfg(test)]
  pub(crate) fn append(self, builder: script::Builder, value: Option<&[u8]>) -> script::Builder {
    use bitcoin::blockdata::constants::MAX_SCRIPT_ELEMENT_SIZE;

    let Some(value) = value else {
      return builder;
    };

    let chunks = match self.chunking() {
      Chunking::Concatenate => value.chunks(MAX_SCRIPT_ELEMENT_SIZE).collect(),
      Chunking::First => vec![value],
    };

    chunks.into_iter().fold(builder, |builder, chunk| {
      builder
        .push_slice::<&script::PushBytes>([self.byte()].as_slice().try_into().unwrap())
        .push_slice::<&script::PushBytes>(chunk.try_into().unwrap())
    })
  }
}
