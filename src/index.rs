use {
  self::{
    entry::{
      Entry, InscriptionIdValue, OutPointValue, ProcessorStatsValue, TransferKey,
      TransferKeyValue,
    },
    reorg::Reorg,
    updater::Updater,
  },
  super::*,
  crate::brc20::{
    Balance, Brc20Error, LowerTick, Receipt, ScriptKey, TickEntry, TransferableLog,
  },
  redb::{
    Database, DatabaseError, MultimapTableDefinition, ReadableMultimapTable, ReadableTable,
    StorageError, Table, TableDefinition,
  },
  serde::de::DeserializeOwned,
};

pub use self::{
  datastore::{Brc20Reader, DataGateway, DataGatewayTransaction, InscriptionReader},
  entry::{IndexedBlock, InscriptionEntry, InscriptionTransfer, ProcessorStats},
  source::{BlockSource, TransactionOutputSource},
};

pub(crate) use self::source::BitcoinCoreRpcResultExt;

mod datastore;
pub(crate) mod entry;
mod flush;
mod lru;
mod overlay;
mod reorg;
mod rtx;
mod source;
mod updater;
mod value_cache;
mod wtx;

#[cfg(test)]
pub(crate) mod testing;

const SCHEMA_VERSION: u64 = 1;

define_multimap_table! { OUTPOINT_TO_TRANSFER_KEYS, OutPointValue, TransferKeyValue }
define_table! { BRC20_BALANCES, &str, &[u8] }
define_table! { BRC20_RECEIPTS, u64, &[u8] }
define_table! { BRC20_TICK_ENTRIES, &str, &[u8] }
define_table! { BRC20_TRANSFERABLES, InscriptionIdValue, &[u8] }
define_table! { HEIGHT_TO_INDEXED_BLOCK, u32, &[u8] }
define_table! { HEIGHT_TO_PROCESSOR_STATS, u32, ProcessorStatsValue }
define_table! { INSCRIPTION_ID_TO_ENTRY, InscriptionIdValue, &[u8] }
define_table! { INSCRIPTION_ID_TO_TRANSFER_COUNT, InscriptionIdValue, u32 }
define_table! { INSCRIPTION_TRANSFERS, TransferKeyValue, &[u8] }
define_table! { SEQUENCE_NUMBER_TO_INSCRIPTION_ID, u64, InscriptionIdValue }
define_table! { STATISTIC_TO_COUNT, u64, u64 }

#[derive(Copy, Clone)]
pub(crate) enum Statistic {
  Schema = 0,
  Commits = 1,
  LastSavepointHeight = 2,
}

impl Statistic {
  fn key(self) -> u64 {
    self.into()
  }
}

impl From<Statistic> for u64 {
  fn from(statistic: Statistic) -> Self {
    statistic as u64
  }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
  Ok(rmp_serde::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
  Ok(rmp_serde::from_slice(bytes)?)
}

/// BRC-20 receipts are keyed by height and position within the block.
fn receipt_key(height: u32, index: u32) -> u64 {
  u64::from(height) << 32 | u64::from(index)
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Info {
  pub chain: Chain,
  pub height: Option<u32>,
  pub hash: Option<BlockHash>,
  pub blessed_inscriptions: u64,
  pub cursed_inscriptions: u64,
  pub lost_sats: u64,
  pub commits: u64,
  pub cumulative_event_hash: Option<String>,
  pub index_path: Option<PathBuf>,
}

pub struct Index {
  blocks: Arc<dyn BlockSource>,
  database: Database,
  durability: redb::Durability,
  outputs: Arc<dyn TransactionOutputSource>,
  path: Option<PathBuf>,
  settings: Settings,
}

impl Index {
  pub fn open(settings: &Settings) -> Result<Self> {
    let client = Arc::new(settings.bitcoin_rpc_client()?);

    let path = settings.index()?;

    if let Some(data_dir) = path.parent() {
      fs::create_dir_all(data_dir).snafu_context(error::Io { path: data_dir })?;
    }

    let mut builder = Database::builder();

    if let Some(cache_size) = settings.index_cache_size() {
      builder.set_cache_size(cache_size);
    }

    let database = match builder.open(&path) {
      Ok(database) => {
        Self::check_schema(&database, &path)?;
        database
      }
      Err(DatabaseError::Storage(StorageError::Io(error)))
        if error.kind() == io::ErrorKind::NotFound =>
      {
        let database = builder.create(&path)?;
        Self::initialize(&database)?;
        database
      }
      Err(error) => bail!("failed to open index: {error}"),
    };

    Ok(Self {
      blocks: client.clone(),
      database,
      durability: redb::Durability::Immediate,
      outputs: client,
      path: Some(path),
      settings: settings.clone(),
    })
  }

  /// An index held entirely in memory, reading the chain from `blocks` and
  /// `outputs`.
  pub fn memory(
    settings: &Settings,
    blocks: Arc<dyn BlockSource>,
    outputs: Arc<dyn TransactionOutputSource>,
  ) -> Result<Self> {
    let database =
      Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;

    Self::initialize(&database)?;

    Ok(Self {
      blocks,
      database,
      durability: redb::Durability::Immediate,
      outputs,
      path: None,
      settings: settings.clone(),
    })
  }

  fn initialize(database: &Database) -> Result {
    let tx = database.begin_write()?;

    tx.open_multimap_table(OUTPOINT_TO_TRANSFER_KEYS)?;
    tx.open_table(BRC20_BALANCES)?;
    tx.open_table(BRC20_RECEIPTS)?;
    tx.open_table(BRC20_TICK_ENTRIES)?;
    tx.open_table(BRC20_TRANSFERABLES)?;
    tx.open_table(HEIGHT_TO_INDEXED_BLOCK)?;
    tx.open_table(HEIGHT_TO_PROCESSOR_STATS)?;
    tx.open_table(INSCRIPTION_ID_TO_ENTRY)?;
    tx.open_table(INSCRIPTION_ID_TO_TRANSFER_COUNT)?;
    tx.open_table(INSCRIPTION_TRANSFERS)?;
    tx.open_table(SEQUENCE_NUMBER_TO_INSCRIPTION_ID)?;

    Self::set_statistic(
      &mut tx.open_table(STATISTIC_TO_COUNT)?,
      Statistic::Schema,
      SCHEMA_VERSION,
    )?;

    tx.commit()?;

    Ok(())
  }

  fn check_schema(database: &Database, path: &Path) -> Result {
    let schema_version = database
      .begin_read()?
      .open_table(STATISTIC_TO_COUNT)?
      .get(&Statistic::Schema.key())?
      .map(|x| x.value())
      .unwrap_or(0);

    match schema_version.cmp(&SCHEMA_VERSION) {
      std::cmp::Ordering::Less => bail!(
        "index at `{}` appears to have been built with an older, incompatible version of ord-brc20, consider deleting and rebuilding the index: index schema {schema_version}, ord-brc20 schema {SCHEMA_VERSION}",
        path.display()
      ),
      std::cmp::Ordering::Greater => bail!(
        "index at `{}` appears to have been built with a newer, incompatible version of ord-brc20, consider updating ord-brc20: index schema {schema_version}, ord-brc20 schema {SCHEMA_VERSION}",
        path.display()
      ),
      std::cmp::Ordering::Equal => Ok(()),
    }
  }

  pub fn update(&self) -> Result {
    loop {
      match Updater::new(self)?.update_index() {
        Ok(()) => return Ok(()),
        Err(err) => {
          log::info!("{err}");

          match err.downcast_ref() {
            Some(&reorg::Error::Recoverable { height, depth }) => {
              Reorg::handle_reorg(self, height, depth)?;
            }
            Some(&reorg::Error::Unrecoverable) => {
              return Err(anyhow!(reorg::Error::Unrecoverable));
            }
            None => return Err(err),
          }
        }
      }
    }
  }

  pub fn info(&self) -> Result<Info> {
    let rtx = self.begin_read()?;

    let latest = rtx.latest_indexed_block()?;

    let stats = match &latest {
      Some(block) => rtx.processor_stats(block.height)?.unwrap_or_default(),
      None => ProcessorStats::default(),
    };

    Ok(Info {
      chain: self.settings.chain(),
      height: latest.as_ref().map(|block| block.height),
      hash: latest.as_ref().map(|block| block.hash),
      blessed_inscriptions: stats.blessed,
      cursed_inscriptions: stats.cursed,
      lost_sats: stats.lost_sats,
      commits: rtx.statistic(Statistic::Commits)?,
      cumulative_event_hash: latest
        .and_then(|block| block.cumulative_event_hash)
        .map(|hash| hash.to_string()),
      index_path: self.path.clone(),
    })
  }

  fn begin_read(&self) -> Result<rtx::Rtx> {
    Ok(rtx::Rtx(self.database.begin_read()?))
  }

  fn begin_write(&self) -> Result<redb::WriteTransaction> {
    let mut tx = self.database.begin_write()?;
    tx.set_durability(self.durability);
    Ok(tx)
  }

  fn increment_statistic(wtx: &redb::WriteTransaction, statistic: Statistic, n: u64) -> Result {
    let mut statistic_to_count = wtx.open_table(STATISTIC_TO_COUNT)?;
    let value = statistic_to_count
      .get(&(statistic.key()))?
      .map(|x| x.value())
      .unwrap_or_default()
      + n;
    statistic_to_count.insert(&statistic.key(), &value)?;
    Ok(())
  }

  fn set_statistic(statistics: &mut Table<u64, u64>, statistic: Statistic, value: u64) -> Result {
    statistics.insert(&statistic.key(), &value)?;
    Ok(())
  }

  pub fn inscription_entry(&self, inscription_id: InscriptionId) -> Result<Option<InscriptionEntry>> {
    self.begin_read()?.entry(inscription_id)
  }

  pub fn inscription_transfers(
    &self,
    inscription_id: InscriptionId,
  ) -> Result<Vec<InscriptionTransfer>> {
    self.begin_read()?.transfers_of(inscription_id)
  }

  pub fn inscription_id_by_sequence_number(&self, sequence_number: u64) -> Result<Option<InscriptionId>> {
    self.begin_read()?.inscription_id_by_sequence_number(sequence_number)
  }

  pub fn tick_entry(&self, tick: &LowerTick) -> Result<Option<TickEntry>> {
    Ok(
      self
        .begin_read()?
        .tick_entries(&[tick.clone()])?
        .remove(tick),
    )
  }

  pub fn brc20_balance(&self, script_key: &ScriptKey, tick: &LowerTick) -> Result<Option<Balance>> {
    self.begin_read()?.balance(script_key, tick)
  }

  pub fn brc20_transferable(&self, inscription_id: InscriptionId) -> Result<Option<TransferableLog>> {
    self.begin_read()?.transferable(inscription_id)
  }

  pub fn brc20_receipts(&self, height: u32) -> Result<Vec<Receipt>> {
    self.begin_read()?.receipts(height)
  }
}

impl DataGateway for Index {
  type Reader = rtx::Rtx;
  type Transaction = wtx::Wtx;

  fn latest_indexed_block(&self) -> Result<Option<IndexedBlock>> {
    self.begin_read()?.latest_indexed_block()
  }

  fn processor_stats(&self, height: u32) -> Result<Option<ProcessorStats>> {
    self.begin_read()?.processor_stats(height)
  }

  fn begin_read(&self) -> Result<Self::Reader> {
    Index::begin_read(self)
  }

  fn begin_write(&self) -> Result<Self::Transaction> {
    Ok(wtx::Wtx::new(Index::begin_write(self)?))
  }
}
