use {
  self::inscription_updater::{BlockProcessingState, InscriptionUpdater},
  super::{flush::BlockChanges, overlay::Overlay, value_cache::ValueCache, *},
  crate::brc20::processor::{self, BlockContext, Brc20Changes, Brc20Processor},
  indicatif::{ProgressBar, ProgressStyle},
  log::log_enabled,
  std::sync::mpsc,
};

mod inscription_updater;

pub(crate) struct Updater<'index> {
  height: u32,
  index: &'index Index,
  previous: Option<IndexedBlock>,
  stats: ProcessorStats,
  values: ValueCache,
}

impl<'index> Updater<'index> {
  pub(crate) fn new(index: &'index Index) -> Result<Self> {
    let rtx = index.begin_read()?;

    let previous = rtx.latest_indexed_block()?;

    let (height, stats) = match &previous {
      Some(block) => (
        block.height + 1,
        rtx
          .processor_stats(block.height)?
          .ok_or_else(|| anyhow!("missing processor stats for block {}", block.height))?,
      ),
      None => (
        index.settings.first_inscription_height(),
        ProcessorStats::default(),
      ),
    };

    let values = ValueCache::new(
      index.outputs.clone(),
      index.settings.outpoint_cache_size()?,
      index.settings.bitcoin_rpc_limit()?,
    )?;

    Ok(Self {
      height,
      index,
      previous,
      stats,
      values,
    })
  }

  pub(crate) fn update_index(&mut self) -> Result {
    let starting_height = u64::from(self.index.blocks.block_count()?) + 1;

    let mut progress_bar = if cfg!(test)
      || log_enabled!(log::Level::Info)
      || starting_height <= u64::from(self.height)
      || env::var_os("ORD_BRC20_DISABLE_PROGRESS_BAR")
        .map(|value| !value.is_empty())
        .unwrap_or(false)
    {
      None
    } else {
      let progress_bar = ProgressBar::new(starting_height);
      progress_bar.set_position(self.height.into());
      progress_bar.set_style(
        ProgressStyle::with_template("[indexing blocks] {wide_bar} {pos}/{len}")?,
      );
      Some(progress_bar)
    };

    let rx = Self::fetch_blocks_from(self.index, self.height);

    let batch_size = self.index.settings.batch_size()?;

    'outer: loop {
      let mut batch = match rx.recv() {
        Ok(block) => vec![block?],
        Err(mpsc::RecvError) => break,
      };

      while batch.len() < batch_size {
        match rx.try_recv() {
          Ok(block) => batch.push(block?),
          Err(_) => break,
        }
      }

      self.values.prefetch(&batch)?;

      for block in &batch {
        Reorg::detect_reorg(block, self.height, self.index)?;

        self.index_block(block)?;

        Reorg::update_savepoints(self.index, self.height - 1)?;

        if let Some(progress_bar) = &mut progress_bar {
          progress_bar.inc(1);

          if progress_bar.position() > progress_bar.length().unwrap_or_default() {
            progress_bar.set_length(u64::from(self.index.blocks.block_count()?) + 1);
          }
        }

        if shutting_down() {
          break 'outer;
        }
      }
    }

    if let Some(progress_bar) = &mut progress_bar {
      progress_bar.finish_and_clear();
    }

    log::debug!(
      "outpoint value cache: {} hits, {} misses",
      self.values.hits(),
      self.values.misses()
    );

    Ok(())
  }

  fn fetch_blocks_from(index: &Index, mut height: u32) -> mpsc::Receiver<Result<Block>> {
    let (tx, rx) = mpsc::sync_channel(32);

    let height_limit = index.settings.height_limit();

    let blocks = index.blocks.clone();

    thread::spawn(move || loop {
      if let Some(height_limit) = height_limit {
        if height >= height_limit {
          break;
        }
      }

      match Self::get_block_with_retries(blocks.as_ref(), height) {
        Ok(Some(block)) => {
          if let Err(err) = tx.send(Ok(block)) {
            log::info!("Block receiver disconnected: {err}");
            break;
          }
          height += 1;
        }
        Ok(None) => break,
        Err(err) => {
          log::error!("failed to fetch block {height}: {err}");
          tx.send(Err(err)).ok();
          break;
        }
      }
    });

    rx
  }

  fn get_block_with_retries(blocks: &dyn BlockSource, height: u32) -> Result<Option<Block>> {
    let mut errors = 0;
    loop {
      match blocks.block(height) {
        Err(err) => {
          if cfg!(test) {
            return Err(err);
          }

          errors += 1;
          let seconds = 1 << errors;
          log::warn!("failed to fetch block {height}, retrying in {seconds}s: {err}");

          if seconds > 120 {
            log::error!("would sleep for more than 120s, giving up");
            return Err(err);
          }

          thread::sleep(Duration::from_secs(seconds));
        }
        Ok(result) => return Ok(result),
      }
    }
  }

  fn index_block(&mut self, block: &Block) -> Result {
    let start = Instant::now();
    let height = self.height;
    let timestamp = block.header.time;
    let settings = &self.index.settings;

    let rtx = self.index.begin_read()?;
    let mut overlay = Overlay::new(&rtx);
    let mut state = BlockProcessingState::new(height, self.stats);

    let mut inscription_updater = InscriptionUpdater {
      overlay: &mut overlay,
      values: &self.values,
      height,
      timestamp,
      jubilee_height: settings.jubilee_height(),
    };

    for (tx_index, tx) in (0u32..).zip(&block.txdata).skip(1) {
      inscription_updater.index_transaction(&mut state, tx_index, tx, tx.compute_txid())?;
    }

    if let Some(coinbase) = block.txdata.first() {
      inscription_updater.index_transaction(&mut state, 0, coinbase, coinbase.compute_txid())?;
    }

    let brc20 = if height >= settings.brc20_activation_height() {
      let messages =
        processor::messages(&overlay, overlay.transfers(), settings.decimals_policy()?)?;

      Brc20Processor::new(
        &rtx,
        BlockContext {
          network: settings.chain().network(),
          height,
          timestamp,
          self_mint_activation_height: settings.brc20_self_mint_activation_height(),
        },
      )
      .process(&messages)?
    } else {
      Brc20Changes::default()
    };

    let created = overlay.created();
    let inscriptions = overlay.into_changes();

    drop(rtx);

    let changes = BlockChanges {
      block: IndexedBlock::new(height, block, &brc20.receipts, self.previous.as_ref())?,
      stats: state.stats(),
      inscriptions,
      brc20,
    };

    flush::flush(self.index, &changes)?;

    log::info!(
      "Block {height} at {} with {} transactions, {created} inscriptions, {} transfers, {} brc-20 receipts in {} ms",
      timestamp_to_string(timestamp),
      block.txdata.len(),
      changes.inscriptions.transfers.len(),
      changes.brc20.receipts.len(),
      start.elapsed().as_millis(),
    );

    self.stats = changes.stats;
    self.previous = Some(changes.block);
    self.height += 1;

    Ok(())
  }
}

fn timestamp_to_string(seconds: u32) -> String {
  timestamp(seconds.into()).to_rfc3339()
}
