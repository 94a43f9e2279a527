use super::*;

/// Inscription writes buffered while a block is processed. Reads check the
/// buffer first and fall back to the persisted store, so code running
/// mid-block sees its own writes without them being flushed.
pub(crate) struct Overlay<'a, R> {
  store: &'a R,
  entries: HashMap<InscriptionId, InscriptionEntry>,
  created: Vec<InscriptionId>,
  transfer_counts: HashMap<InscriptionId, u32>,
  transfers: Vec<InscriptionTransfer>,
  outpoint_to_transfers: HashMap<OutPoint, Vec<usize>>,
}

/// Everything an overlay buffered, ready to be flushed.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct InscriptionChanges {
  pub(crate) entries: Vec<InscriptionEntry>,
  pub(crate) transfer_counts: Vec<(InscriptionId, u32)>,
  pub(crate) transfers: Vec<InscriptionTransfer>,
}

impl<'a, R: InscriptionReader> Overlay<'a, R> {
  pub(crate) fn new(store: &'a R) -> Self {
    Self {
      store,
      entries: HashMap::new(),
      created: Vec::new(),
      transfer_counts: HashMap::new(),
      transfers: Vec::new(),
      outpoint_to_transfers: HashMap::new(),
    }
  }

  pub(crate) fn insert_entry(&mut self, entry: InscriptionEntry) {
    let id = entry.id;

    if self.entries.insert(id, entry).is_some() {
      panic!("inscription {id} created twice");
    }

    self.created.push(id);
  }

  /// Bumps the transfer counter of an existing inscription and returns the
  /// new value.
  pub(crate) fn next_transfer_count(&mut self, inscription_id: InscriptionId) -> Result<u32> {
    let current = match self.transfer_counts.get(&inscription_id) {
      Some(count) => *count,
      None => {
        self
          .entry(inscription_id)?
          .ok_or_else(|| anyhow!("transferred inscription {inscription_id} has no entry"))?
          .transfer_count
      }
    };

    let next = current + 1;

    self.transfer_counts.insert(inscription_id, next);

    Ok(next)
  }

  pub(crate) fn insert_transfer(&mut self, transfer: InscriptionTransfer) {
    self
      .outpoint_to_transfers
      .entry(transfer.new_satpoint.outpoint)
      .or_default()
      .push(self.transfers.len());

    self.transfers.push(transfer);
  }

  /// Transfers buffered so far, in the order they happened.
  pub(crate) fn transfers(&self) -> &[InscriptionTransfer] {
    &self.transfers
  }

  pub(crate) fn created(&self) -> usize {
    self.created.len()
  }

  pub(crate) fn into_changes(mut self) -> InscriptionChanges {
    let entries = self
      .created
      .iter()
      .filter_map(|id| self.entries.remove(id))
      .collect();

    let mut transfer_counts = self
      .transfer_counts
      .into_iter()
      .collect::<Vec<(InscriptionId, u32)>>();
    transfer_counts.sort();

    InscriptionChanges {
      entries,
      transfer_counts,
      transfers: self.transfers,
    }
  }
}

impl<R: InscriptionReader> InscriptionReader for Overlay<'_, R> {
  fn entry(&self, inscription_id: InscriptionId) -> Result<Option<InscriptionEntry>> {
    let entry = match self.entries.get(&inscription_id) {
      Some(entry) => Some(entry.clone()),
      None => self.store.entry(inscription_id)?,
    };

    Ok(entry.map(|mut entry| {
      if let Some(count) = self.transfer_counts.get(&inscription_id) {
        entry.transfer_count = *count;
      }
      entry
    }))
  }

  fn transfers_on(&self, outpoint: OutPoint) -> Result<Vec<InscriptionTransfer>> {
    match self.outpoint_to_transfers.get(&outpoint) {
      Some(indices) => {
        let mut transfers = indices
          .iter()
          .map(|i| self.transfers[*i].clone())
          .collect::<Vec<InscriptionTransfer>>();
        transfers.sort_by_key(|transfer| (transfer.new_satpoint.offset, transfer.inscription_id));
        Ok(transfers)
      }
      None => self.store.transfers_on(outpoint),
    }
  }
}
