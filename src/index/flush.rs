use {
  super::{overlay::InscriptionChanges, *},
  crate::brc20::processor::Brc20Changes,
};

/// Everything one block changed.
#[derive(Debug)]
pub(crate) struct BlockChanges {
  pub(crate) block: IndexedBlock,
  pub(crate) stats: ProcessorStats,
  pub(crate) inscriptions: InscriptionChanges,
  pub(crate) brc20: Brc20Changes,
}

/// Persists `changes` in a single transaction. The indexed block marker is
/// written first, and nothing is visible unless every write and the commit
/// succeed.
pub(crate) fn flush<G: DataGateway>(gateway: &G, changes: &BlockChanges) -> Result {
  let mut wtx = gateway.begin_write()?;

  match write(&mut wtx, changes) {
    Ok(()) => wtx
      .commit()
      .with_context(|| format!("failed to commit block {}", changes.block.height)),
    Err(err) => {
      if let Err(rollback_err) = wtx.rollback() {
        log::error!(
          "failed to roll back block {}: {rollback_err}",
          changes.block.height
        );
      }

      Err(err.context(format!("failed to flush block {}", changes.block.height)))
    }
  }
}

fn write<T: DataGatewayTransaction>(wtx: &mut T, changes: &BlockChanges) -> Result {
  let height = changes.block.height;

  wtx.insert_indexed_block(&changes.block)?;
  wtx.insert_inscription_entries(&changes.inscriptions.entries)?;
  wtx.upsert_inscription_entry_states(&changes.inscriptions.transfer_counts)?;
  wtx.insert_inscription_transfers(&changes.inscriptions.transfers)?;
  wtx.insert_processor_stats(height, changes.stats)?;
  wtx.upsert_tick_entries(&changes.brc20.ticks)?;
  wtx.upsert_balances(&changes.brc20.balances)?;
  wtx.insert_transferables(&changes.brc20.new_transferables)?;
  wtx.remove_transferables(&changes.brc20.spent_transferables)?;
  wtx.insert_brc20_receipts(height, &changes.brc20.receipts)?;

  Ok(())
}
