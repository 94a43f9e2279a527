use {
  super::{lru::SimpleLru, *},
  futures::stream::{self, StreamExt},
  std::sync::MutexGuard,
};

/// Values of previous outputs, filled from the outputs of indexed
/// transactions and fetched from the output source on a miss.
pub(crate) struct ValueCache {
  lru: Mutex<SimpleLru<OutPoint, u64>>,
  outputs: Arc<dyn TransactionOutputSource>,
  rpc_limit: usize,
  runtime: Runtime,
  hits: atomic::AtomicU64,
  misses: atomic::AtomicU64,
}

impl ValueCache {
  pub(crate) fn new(
    outputs: Arc<dyn TransactionOutputSource>,
    capacity: usize,
    rpc_limit: usize,
  ) -> Result<Self> {
    Ok(Self {
      lru: Mutex::new(SimpleLru::new(capacity)),
      outputs,
      rpc_limit: rpc_limit.max(1),
      runtime: Runtime::new()?,
      hits: atomic::AtomicU64::new(0),
      misses: atomic::AtomicU64::new(0),
    })
  }

  fn lru(&self) -> Result<MutexGuard<SimpleLru<OutPoint, u64>>> {
    self
      .lru
      .lock()
      .map_err(|err| anyhow!("outpoint value cache lock poisoned: {err}"))
  }

  pub(crate) fn insert(&self, outpoint: OutPoint, value: u64) -> Result {
    self.lru()?.insert(outpoint, value);
    Ok(())
  }

  fn insert_outputs(&self, txid: Txid, outputs: &[TxOut]) -> Result {
    let mut lru = self.lru()?;

    for (vout, output) in outputs.iter().enumerate() {
      lru.insert(
        OutPoint {
          txid,
          vout: u32::try_from(vout)?,
        },
        output.value.to_sat(),
      );
    }

    Ok(())
  }

  /// The value of `outpoint`. A miss fetches the whole transaction's outputs
  /// and caches all of them.
  pub(crate) fn value(&self, outpoint: OutPoint) -> Result<u64> {
    if let Some(value) = self.lru()?.get(&outpoint) {
      self.hits.fetch_add(1, atomic::Ordering::Relaxed);
      return Ok(*value);
    }

    self.misses.fetch_add(1, atomic::Ordering::Relaxed);

    let outputs = self.outputs.transaction_outputs(outpoint.txid)?;

    let value = usize::try_from(outpoint.vout)
      .ok()
      .and_then(|vout| outputs.get(vout))
      .map(|output| output.value.to_sat())
      .ok_or_else(|| anyhow!("output {outpoint} does not exist"))?;

    self.insert_outputs(outpoint.txid, &outputs)?;

    Ok(value)
  }

  /// Fetches, in parallel, the values of every input of `blocks` that is
  /// neither cached nor created within `blocks` itself.
  pub(crate) fn prefetch(&self, blocks: &[Block]) -> Result {
    let created = blocks
      .iter()
      .flat_map(|block| block.txdata.iter().map(Transaction::compute_txid))
      .collect::<HashSet<Txid>>();

    let txids = {
      let lru = self.lru()?;

      blocks
        .iter()
        .flat_map(|block| block.txdata.iter())
        .filter(|tx| !tx.is_coinbase())
        .flat_map(|tx| tx.input.iter().map(|input| input.previous_output))
        .filter(|outpoint| !created.contains(&outpoint.txid) && !lru.contains(outpoint))
        .map(|outpoint| outpoint.txid)
        .collect::<HashSet<Txid>>()
    };

    if txids.is_empty() {
      return Ok(());
    }

    log::debug!("prefetching outputs of {} transactions", txids.len());

    let start = Instant::now();
    let count = txids.len();

    self.runtime.block_on(async {
      let mut fetches = stream::iter(txids)
        .map(|txid| {
          let outputs = self.outputs.clone();
          task::spawn_blocking(move || {
            outputs
              .transaction_outputs(txid)
              .map(|outputs| (txid, outputs))
          })
        })
        .buffer_unordered(self.rpc_limit);

      while let Some(result) = fetches.next().await {
        let (txid, outputs) = result??;
        self.insert_outputs(txid, &outputs)?;
      }

      Ok::<(), Error>(())
    })?;

    log::debug!(
      "prefetched outputs of {count} transactions in {} ms",
      start.elapsed().as_millis()
    );

    Ok(())
  }

  pub(crate) fn hits(&self) -> u64 {
    self.hits.load(atomic::Ordering::Relaxed)
  }

  pub(crate) fn misses(&self) -> u64 {
    self.misses.load(atomic::Ordering::Relaxed)
  }
}

#[cfg(test)]
mod tests {
  use {super::*, testing::MockSource};

  fn funding(n: u8, values: &[u64]) -> Transaction {
    Transaction {
      version: bitcoin::transaction::Version(2),
      lock_time: bitcoin::absolute::LockTime::ZERO,
      input: vec![bitcoin::TxIn {
        previous_output: OutPoint {
          txid: Txid::from_byte_array([n; 32]),
          vout: 0,
        },
        ..default()
      }],
      output: values
        .iter()
        .map(|value| TxOut {
          value: Amount::from_sat(*value),
          script_pubkey: script_pubkey(n),
        })
        .collect(),
    }
  }

  #[test]
  fn miss_fetches_and_caches_all_outputs() {
    let source = Arc::new(MockSource::default());
    let tx = funding(1, &[100, 200]);
    let txid = tx.compute_txid();
    source.add_transaction(tx);

    let cache = ValueCache::new(source.clone(), 10, 2).unwrap();

    assert_eq!(cache.value(OutPoint { txid, vout: 1 }).unwrap(), 200);
    assert_eq!(cache.value(OutPoint { txid, vout: 0 }).unwrap(), 100);
    assert_eq!(cache.misses(), 1);
    assert_eq!(cache.hits(), 1);
    assert_eq!(source.output_fetches(), 1);
  }

  #[test]
  fn missing_output_is_an_error() {
    let source = Arc::new(MockSource::default());
    let tx = funding(1, &[100]);
    let txid = tx.compute_txid();
    source.add_transaction(tx);

    let cache = ValueCache::new(source, 10, 2).unwrap();

    assert!(cache.value(OutPoint { txid, vout: 5 }).is_err());
    assert!(cache.value(outpoint(9)).is_err());
  }

  #[test]
  fn inserted_values_are_served_without_fetching() {
    let source = Arc::new(MockSource::default());
    let cache = ValueCache::new(source.clone(), 10, 2).unwrap();

    cache.insert(outpoint(1), 42).unwrap();

    assert_eq!(cache.value(outpoint(1)).unwrap(), 42);
    assert_eq!(source.output_fetches(), 0);
  }

  #[test]
  fn prefetch_skips_outputs_created_in_batch() {
    let source = Arc::new(MockSource::default());

    let a = funding(1, &[1000]);
    let b = funding(2, &[2000]);
    source.add_transaction(a.clone());
    source.add_transaction(b.clone());

    let spend = |txid| Transaction {
      input: vec![bitcoin::TxIn {
        previous_output: OutPoint { txid, vout: 0 },
        ..default()
      }],
      ..funding(3, &[1])
    };

    let first = spend(a.compute_txid());
    let second = spend(first.compute_txid());
    let third = spend(b.compute_txid());

    let block = Block {
      header: bitcoin::blockdata::constants::genesis_block(Network::Regtest).header,
      txdata: vec![first, second, third],
    };

    let cache = ValueCache::new(source.clone(), 10, 4).unwrap();

    cache.prefetch(&[block]).unwrap();

    assert_eq!(source.output_fetches(), 2);
    assert_eq!(
      cache
        .value(OutPoint {
          txid: b.compute_txid(),
          vout: 0
        })
        .unwrap(),
      2000
    );
    assert_eq!(source.output_fetches(), 2);
  }
}
