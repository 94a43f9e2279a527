use super::*;

#[derive(Debug, PartialEq)]
pub(crate) enum Error {
  Recoverable { height: u32, depth: u32 },
  Unrecoverable,
}

impl Display for Error {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Self::Recoverable { height, depth } => {
        write!(f, "{depth} block deep reorg detected at height {height}")
      }
      Self::Unrecoverable => write!(f, "unrecoverable reorg detected"),
    }
  }
}

impl std::error::Error for Error {}

const MAX_SAVEPOINTS: u32 = 2;
const SAVEPOINT_INTERVAL: u32 = 10;
const CHAIN_TIP_DISTANCE: u32 = 21;

pub(crate) struct Reorg {}

impl Reorg {
  pub(crate) fn detect_reorg(block: &Block, height: u32, index: &Index) -> Result {
    let source_prev_blockhash = block.header.prev_blockhash;

    let rtx = index.begin_read()?;

    match rtx.block_hash(height.checked_sub(1))? {
      Some(index_prev_blockhash) if index_prev_blockhash == source_prev_blockhash => Ok(()),
      Some(_) => {
        let max_recoverable_reorg_depth =
          (MAX_SAVEPOINTS - 1) * SAVEPOINT_INTERVAL + height % SAVEPOINT_INTERVAL;

        for depth in 1..max_recoverable_reorg_depth {
          let Some(ancestor) = height.checked_sub(depth) else {
            break;
          };

          let index_block_hash = rtx.block_hash(Some(ancestor))?;
          let source_block_hash = index.blocks.block_hash(ancestor)?;

          if index_block_hash.is_some() && index_block_hash == source_block_hash {
            return Err(anyhow!(Error::Recoverable { height, depth }));
          }
        }

        Err(anyhow!(Error::Unrecoverable))
      }
      None => Ok(()),
    }
  }

  pub(crate) fn handle_reorg(index: &Index, height: u32, depth: u32) -> Result {
    log::info!("rolling back database after reorg of depth {depth} at height {height}");

    let mut wtx = index.begin_write()?;

    let oldest_savepoint = wtx
      .list_persistent_savepoints()?
      .min()
      .ok_or_else(|| anyhow!("no savepoint to roll back to"))?;

    let savepoint = wtx.get_persistent_savepoint(oldest_savepoint)?;

    wtx.restore_savepoint(&savepoint)?;

    Index::increment_statistic(&wtx, Statistic::Commits, 1)?;
    wtx.commit()?;

    log::info!(
      "successfully rolled back database to height {}",
      index
        .begin_read()?
        .latest_indexed_block()?
        .map(|block| block.height.to_string())
        .unwrap_or_else(|| "none".into())
    );

    Ok(())
  }

  pub(crate) fn update_savepoints(index: &Index, height: u32) -> Result {
    if let redb::Durability::None = index.durability {
      return Ok(());
    }

    let last_savepoint_height = index
      .begin_read()?
      .statistic(Statistic::LastSavepointHeight)?;

    let height = u64::from(height);

    let blocks = u64::from(index.blocks.block_count()?);

    if (height < SAVEPOINT_INTERVAL.into()
      || height.saturating_sub(last_savepoint_height) >= SAVEPOINT_INTERVAL.into())
      && blocks.saturating_sub(height) <= CHAIN_TIP_DISTANCE.into()
    {
      let wtx = index.begin_write()?;

      let savepoints = wtx.list_persistent_savepoints()?.collect::<Vec<u64>>();

      if savepoints.len() >= usize::try_from(MAX_SAVEPOINTS)? {
        if let Some(oldest) = savepoints.into_iter().min() {
          wtx.delete_persistent_savepoint(oldest)?;
        }
      }

      Index::increment_statistic(&wtx, Statistic::Commits, 1)?;
      wtx.commit()?;

      let wtx = index.begin_write()?;

      log::debug!("creating savepoint at height {height}");
      wtx.persistent_savepoint()?;

      Index::set_statistic(
        &mut wtx.open_table(STATISTIC_TO_COUNT)?,
        Statistic::LastSavepointHeight,
        height,
      )?;

      Index::increment_statistic(&wtx, Statistic::Commits, 1)?;
      wtx.commit()?;
    }

    Ok(())
  }
}
