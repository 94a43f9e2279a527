use {super::*, bitcoin::hashes::sha256};

pub(crate) trait Entry: Sized {
  type Value;

  fn load(value: Self::Value) -> Self;

  fn store(self) -> Self::Value;
}

pub(super) type InscriptionIdValue = [u8; 36];

impl Entry for InscriptionId {
  type Value = InscriptionIdValue;

  fn load(value: Self::Value) -> Self {
    let mut txid = [0; 32];
    let mut index = [0; 4];
    txid.copy_from_slice(&value[..32]);
    index.copy_from_slice(&value[32..]);

    Self {
      txid: Txid::from_byte_array(txid),
      index: u32::from_be_bytes(index),
    }
  }

  fn store(self) -> Self::Value {
    let mut value = [0; 36];
    let (txid, index) = value.split_at_mut(32);
    txid.copy_from_slice(self.txid.as_ref());
    index.copy_from_slice(&self.index.to_be_bytes());
    value
  }
}

pub(super) type OutPointValue = [u8; 36];

impl Entry for OutPoint {
  type Value = OutPointValue;

  fn load(value: Self::Value) -> Self {
    let mut txid = [0; 32];
    let mut vout = [0; 4];
    txid.copy_from_slice(&value[..32]);
    vout.copy_from_slice(&value[32..]);

    Self {
      txid: Txid::from_byte_array(txid),
      vout: u32::from_le_bytes(vout),
    }
  }

  fn store(self) -> Self::Value {
    let mut value = [0; 36];
    let (txid, vout) = value.split_at_mut(32);
    txid.copy_from_slice(self.txid.as_ref());
    vout.copy_from_slice(&self.vout.to_le_bytes());
    value
  }
}

/// Transfers are keyed by inscription id followed by the big-endian transfer
/// counter, so one inscription's history is a contiguous, ordered range.
pub(super) type TransferKeyValue = [u8; 40];

#[derive(Debug, PartialEq, Copy, Clone, Eq, PartialOrd, Ord)]
pub(crate) struct TransferKey {
  pub(crate) inscription_id: InscriptionId,
  pub(crate) transfer_count: u32,
}

impl Entry for TransferKey {
  type Value = TransferKeyValue;

  fn load(value: Self::Value) -> Self {
    let mut id = [0; 36];
    let mut count = [0; 4];
    id.copy_from_slice(&value[..36]);
    count.copy_from_slice(&value[36..]);

    Self {
      inscription_id: InscriptionId::load(id),
      transfer_count: u32::from_be_bytes(count),
    }
  }

  fn store(self) -> Self::Value {
    let mut value = [0; 40];
    let (id, count) = value.split_at_mut(36);
    id.copy_from_slice(&self.inscription_id.store());
    count.copy_from_slice(&self.transfer_count.to_be_bytes());
    value
  }
}

/// Counters carried from one block to the next.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct ProcessorStats {
  pub blessed: u64,
  pub cursed: u64,
  pub lost_sats: u64,
}

pub(super) type ProcessorStatsValue = (u64, u64, u64);

impl Entry for ProcessorStats {
  type Value = ProcessorStatsValue;

  fn load((blessed, cursed, lost_sats): Self::Value) -> Self {
    Self {
      blessed,
      cursed,
      lost_sats,
    }
  }

  fn store(self) -> Self::Value {
    (self.blessed, self.cursed, self.lost_sats)
  }
}

impl ProcessorStats {
  pub(crate) fn next_sequence_number(self) -> u64 {
    self.blessed + self.cursed
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InscriptionEntry {
  pub id: InscriptionId,
  pub sequence_number: u64,
  pub number: i64,
  pub cursed: bool,
  pub cursed_for_brc20: bool,
  pub unbound: bool,
  pub parent: Option<InscriptionId>,
  pub fee: u64,
  pub height: u32,
  pub timestamp: u32,
  pub inscription: Inscription,
  pub transfer_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InscriptionTransfer {
  pub inscription_id: InscriptionId,
  pub block_height: u32,
  pub tx_index: u32,
  pub txid: Txid,
  pub old_satpoint: Option<SatPoint>,
  pub new_satpoint: SatPoint,
  pub new_pkscript: ScriptBuf,
  pub new_output_value: u64,
  pub sent_as_fee: bool,
  pub transfer_count: u32,
}

impl InscriptionTransfer {
  pub(crate) fn key(&self) -> TransferKey {
    TransferKey {
      inscription_id: self.inscription_id,
      transfer_count: self.transfer_count,
    }
  }
}

/// Marks a height as fully indexed. The event hashes let independent
/// indexers compare their BRC-20 results block by block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedBlock {
  pub height: u32,
  pub hash: BlockHash,
  pub prev_hash: BlockHash,
  pub event_hash: Option<sha256::Hash>,
  pub cumulative_event_hash: Option<sha256::Hash>,
}

impl IndexedBlock {
  pub(crate) fn new(
    height: u32,
    block: &Block,
    receipts: &[Receipt],
    previous: Option<&IndexedBlock>,
  ) -> Result<Self> {
    let event_hash = if receipts.is_empty() {
      None
    } else {
      Some(sha256::Hash::hash(&serde_json::to_vec(receipts)?))
    };

    let previous_cumulative = previous.and_then(|previous| previous.cumulative_event_hash);

    let cumulative_event_hash = match (event_hash, previous_cumulative) {
      (Some(event_hash), Some(previous)) => {
        let mut engine = Vec::with_capacity(64);
        engine.extend_from_slice(event_hash.as_byte_array());
        engine.extend_from_slice(previous.as_byte_array());
        Some(sha256::Hash::hash(&engine))
      }
      (Some(event_hash), None) => Some(sha256::Hash::hash(event_hash.as_byte_array())),
      (None, previous) => previous,
    };

    Ok(Self {
      height,
      hash: block.block_hash(),
      prev_hash: block.header.prev_blockhash,
      event_hash,
      cumulative_event_hash,
    })
  }
}
