use super::*;

pub struct Rtx(pub(crate) redb::ReadTransaction);

impl Rtx {
  pub(crate) fn latest_indexed_block(&self) -> Result<Option<IndexedBlock>> {
    self
      .0
      .open_table(HEIGHT_TO_INDEXED_BLOCK)?
      .last()?
      .map(|(_height, block)| decode(block.value()))
      .transpose()
  }

  pub(crate) fn indexed_block(&self, height: u32) -> Result<Option<IndexedBlock>> {
    self
      .0
      .open_table(HEIGHT_TO_INDEXED_BLOCK)?
      .get(height)?
      .map(|block| decode(block.value()))
      .transpose()
  }

  pub(crate) fn block_hash(&self, height: Option<u32>) -> Result<Option<BlockHash>> {
    Ok(match height {
      Some(height) => self.indexed_block(height)?,
      None => self.latest_indexed_block()?,
    }
    .map(|block| block.hash))
  }

  pub(crate) fn processor_stats(&self, height: u32) -> Result<Option<ProcessorStats>> {
    Ok(
      self
        .0
        .open_table(HEIGHT_TO_PROCESSOR_STATS)?
        .get(height)?
        .map(|stats| ProcessorStats::load(stats.value())),
    )
  }

  pub(crate) fn statistic(&self, statistic: Statistic) -> Result<u64> {
    Ok(
      self
        .0
        .open_table(STATISTIC_TO_COUNT)?
        .get(&statistic.key())?
        .map(|x| x.value())
        .unwrap_or_default(),
    )
  }

  pub(crate) fn inscription_id_by_sequence_number(
    &self,
    sequence_number: u64,
  ) -> Result<Option<InscriptionId>> {
    Ok(
      self
        .0
        .open_table(SEQUENCE_NUMBER_TO_INSCRIPTION_ID)?
        .get(sequence_number)?
        .map(|id| InscriptionId::load(id.value())),
    )
  }

  /// Every recorded move of `inscription_id`, oldest first.
  pub(crate) fn transfers_of(&self, inscription_id: InscriptionId) -> Result<Vec<InscriptionTransfer>> {
    let start = TransferKey {
      inscription_id,
      transfer_count: 0,
    }
    .store();

    let end = TransferKey {
      inscription_id,
      transfer_count: u32::MAX,
    }
    .store();

    self
      .0
      .open_table(INSCRIPTION_TRANSFERS)?
      .range(start..=end)?
      .map(|result| {
        result
          .map_err(Error::from)
          .and_then(|(_key, transfer)| decode(transfer.value()))
      })
      .collect()
  }

  pub(crate) fn receipts(&self, height: u32) -> Result<Vec<Receipt>> {
    self
      .0
      .open_table(BRC20_RECEIPTS)?
      .range(receipt_key(height, 0)..=receipt_key(height, u32::MAX))?
      .map(|result| {
        result
          .map_err(Error::from)
          .and_then(|(_key, receipt)| decode(receipt.value()))
      })
      .collect()
  }
}

impl InscriptionReader for Rtx {
  fn entry(&self, inscription_id: InscriptionId) -> Result<Option<InscriptionEntry>> {
    let Some(entry) = self
      .0
      .open_table(INSCRIPTION_ID_TO_ENTRY)?
      .get(&inscription_id.store())?
    else {
      return Ok(None);
    };

    let mut entry: InscriptionEntry = decode(entry.value())?;

    if let Some(transfer_count) = self
      .0
      .open_table(INSCRIPTION_ID_TO_TRANSFER_COUNT)?
      .get(&inscription_id.store())?
    {
      entry.transfer_count = transfer_count.value();
    }

    Ok(Some(entry))
  }

  fn transfers_on(&self, outpoint: OutPoint) -> Result<Vec<InscriptionTransfer>> {
    let inscription_transfers = self.0.open_table(INSCRIPTION_TRANSFERS)?;

    let mut transfers = Vec::new();

    for key in self
      .0
      .open_multimap_table(OUTPOINT_TO_TRANSFER_KEYS)?
      .get(&outpoint.store())?
    {
      let key = key?.value();

      let transfer = inscription_transfers.get(&key)?.ok_or_else(|| {
        anyhow!(
          "transfer {:?} of outpoint {outpoint} missing",
          TransferKey::load(key)
        )
      })?;

      transfers.push(decode::<InscriptionTransfer>(transfer.value())?);
    }

    transfers.sort_by_key(|transfer| (transfer.new_satpoint.offset, transfer.inscription_id));

    Ok(transfers)
  }
}

impl Brc20Reader for Rtx {
  fn tick_entries(&self, ticks: &[LowerTick]) -> Result<HashMap<LowerTick, TickEntry>> {
    let table = self.0.open_table(BRC20_TICK_ENTRIES)?;

    let mut entries = HashMap::new();

    for tick in ticks {
      if let Some(entry) = table.get(tick.as_str())? {
        entries.insert(tick.clone(), decode(entry.value())?);
      }
    }

    Ok(entries)
  }

  fn balance(&self, script_key: &ScriptKey, tick: &LowerTick) -> Result<Option<Balance>> {
    self
      .0
      .open_table(BRC20_BALANCES)?
      .get(Balance::key(script_key, tick).as_str())?
      .map(|balance| decode(balance.value()))
      .transpose()
  }

  fn transferable(&self, inscription_id: InscriptionId) -> Result<Option<TransferableLog>> {
    self
      .0
      .open_table(BRC20_TRANSFERABLES)?
      .get(&inscription_id.store())?
      .map(|log| decode(log.value()))
      .transpose()
  }
}
