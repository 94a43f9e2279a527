use super::*;

/// Read access to inscription state.
pub trait InscriptionReader {
  fn entry(&self, inscription_id: InscriptionId) -> Result<Option<InscriptionEntry>>;

  /// The latest transfer of every inscription currently located on
  /// `outpoint`.
  fn transfers_on(&self, outpoint: OutPoint) -> Result<Vec<InscriptionTransfer>>;
}

/// Read access to BRC-20 state.
pub trait Brc20Reader {
  fn tick_entries(&self, ticks: &[LowerTick]) -> Result<HashMap<LowerTick, TickEntry>>;

  fn balance(&self, script_key: &ScriptKey, tick: &LowerTick) -> Result<Option<Balance>>;

  fn transferable(&self, inscription_id: InscriptionId) -> Result<Option<TransferableLog>>;
}

/// The persisted state the indexer reads from and writes to.
pub trait DataGateway {
  type Reader: InscriptionReader + Brc20Reader;

  type Transaction: DataGatewayTransaction;

  fn latest_indexed_block(&self) -> Result<Option<IndexedBlock>>;

  fn processor_stats(&self, height: u32) -> Result<Option<ProcessorStats>>;

  fn begin_read(&self) -> Result<Self::Reader>;

  fn begin_write(&self) -> Result<Self::Transaction>;
}

/// One unit of work. Nothing written through it is visible to readers
/// until `commit` succeeds, and `rollback` discards all of it.
pub trait DataGatewayTransaction {
  fn insert_indexed_block(&mut self, block: &IndexedBlock) -> Result;

  fn insert_inscription_entries(&mut self, entries: &[InscriptionEntry]) -> Result;

  fn upsert_inscription_entry_states(&mut self, states: &[(InscriptionId, u32)]) -> Result;

  fn insert_inscription_transfers(&mut self, transfers: &[InscriptionTransfer]) -> Result;

  fn insert_processor_stats(&mut self, height: u32, stats: ProcessorStats) -> Result;

  fn upsert_tick_entries(&mut self, entries: &[TickEntry]) -> Result;

  fn upsert_balances(&mut self, balances: &[(ScriptKey, Balance)]) -> Result;

  fn insert_transferables(&mut self, logs: &[TransferableLog]) -> Result;

  fn remove_transferables(&mut self, inscription_ids: &[InscriptionId]) -> Result;

  fn insert_brc20_receipts(&mut self, height: u32, receipts: &[Receipt]) -> Result;

  fn commit(self) -> Result;

  fn rollback(self) -> Result;
}
