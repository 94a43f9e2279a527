use super::*;

pub struct Wtx(redb::WriteTransaction);

impl Wtx {
  pub(super) fn new(wtx: redb::WriteTransaction) -> Self {
    Self(wtx)
  }
}

impl DataGatewayTransaction for Wtx {
  fn insert_indexed_block(&mut self, block: &IndexedBlock) -> Result {
    self
      .0
      .open_table(HEIGHT_TO_INDEXED_BLOCK)?
      .insert(block.height, encode(block)?.as_slice())?;
    Ok(())
  }

  fn insert_inscription_entries(&mut self, entries: &[InscriptionEntry]) -> Result {
    let mut id_to_entry = self.0.open_table(INSCRIPTION_ID_TO_ENTRY)?;
    let mut sequence_number_to_id = self.0.open_table(SEQUENCE_NUMBER_TO_INSCRIPTION_ID)?;

    for entry in entries {
      let id = entry.id.store();

      if id_to_entry.insert(&id, encode(entry)?.as_slice())?.is_some() {
        panic!("inscription {} created twice", entry.id);
      }

      sequence_number_to_id.insert(entry.sequence_number, &id)?;
    }

    Ok(())
  }

  fn upsert_inscription_entry_states(&mut self, states: &[(InscriptionId, u32)]) -> Result {
    let mut id_to_transfer_count = self.0.open_table(INSCRIPTION_ID_TO_TRANSFER_COUNT)?;

    for (inscription_id, transfer_count) in states {
      id_to_transfer_count.insert(&inscription_id.store(), transfer_count)?;
    }

    Ok(())
  }

  fn insert_inscription_transfers(&mut self, transfers: &[InscriptionTransfer]) -> Result {
    let mut inscription_transfers = self.0.open_table(INSCRIPTION_TRANSFERS)?;
    let mut outpoint_to_transfer_keys = self.0.open_multimap_table(OUTPOINT_TO_TRANSFER_KEYS)?;

    for transfer in transfers {
      let key = transfer.key().store();

      inscription_transfers.insert(&key, encode(transfer)?.as_slice())?;

      outpoint_to_transfer_keys.insert(&transfer.new_satpoint.outpoint.store(), &key)?;
    }

    Ok(())
  }

  fn insert_processor_stats(&mut self, height: u32, stats: ProcessorStats) -> Result {
    self
      .0
      .open_table(HEIGHT_TO_PROCESSOR_STATS)?
      .insert(height, stats.store())?;
    Ok(())
  }

  fn upsert_tick_entries(&mut self, entries: &[TickEntry]) -> Result {
    let mut tick_entries = self.0.open_table(BRC20_TICK_ENTRIES)?;

    for entry in entries {
      tick_entries.insert(entry.tick.to_lower().as_str(), encode(entry)?.as_slice())?;
    }

    Ok(())
  }

  fn upsert_balances(&mut self, balances: &[(ScriptKey, Balance)]) -> Result {
    let mut table = self.0.open_table(BRC20_BALANCES)?;

    for (script_key, balance) in balances {
      table.insert(
        Balance::key(script_key, &balance.tick).as_str(),
        encode(balance)?.as_slice(),
      )?;
    }

    Ok(())
  }

  fn insert_transferables(&mut self, logs: &[TransferableLog]) -> Result {
    let mut transferables = self.0.open_table(BRC20_TRANSFERABLES)?;

    for log in logs {
      transferables.insert(&log.inscription_id.store(), encode(log)?.as_slice())?;
    }

    Ok(())
  }

  fn remove_transferables(&mut self, inscription_ids: &[InscriptionId]) -> Result {
    let mut transferables = self.0.open_table(BRC20_TRANSFERABLES)?;

    for inscription_id in inscription_ids {
      transferables.remove(&inscription_id.store())?;
    }

    Ok(())
  }

  fn insert_brc20_receipts(&mut self, height: u32, receipts: &[Receipt]) -> Result {
    let mut table = self.0.open_table(BRC20_RECEIPTS)?;

    for (i, receipt) in receipts.iter().enumerate() {
      table.insert(
        receipt_key(height, u32::try_from(i)?),
        encode(receipt)?.as_slice(),
      )?;
    }

    Ok(())
  }

  fn commit(self) -> Result {
    Index::increment_statistic(&self.0, Statistic::Commits, 1)?;
    self.0.commit()?;
    Ok(())
  }

  fn rollback(self) -> Result {
    self.0.abort()?;
    Ok(())
  }
}
