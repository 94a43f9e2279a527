use {super::*, bitcoin::Witness};

#[derive(Default)]
struct State {
  blocks: Vec<Block>,
  mempool: Vec<Transaction>,
  nonce: u32,
  output_fetches: u64,
  transactions: HashMap<Txid, Transaction>,
}

/// An in-memory chain that serves both blocks and transaction outputs.
#[derive(Default)]
pub(crate) struct MockSource {
  state: Mutex<State>,
}

#[derive(Default, Clone)]
pub(crate) struct TransactionTemplate<'a> {
  /// `(block height, transaction index, output index, witness)`
  pub(crate) inputs: &'a [(usize, usize, u32, Witness)],
  /// Explicit outputs. When empty, a single output pays everything but
  /// `fee` to `script_pubkey(1)`.
  pub(crate) outputs: &'a [(ScriptBuf, u64)],
  pub(crate) fee: u64,
}

impl MockSource {
  fn state(&self) -> std::sync::MutexGuard<State> {
    self.state.lock().unwrap()
  }

  pub(crate) fn add_transaction(&self, tx: Transaction) {
    self.state().transactions.insert(tx.compute_txid(), tx);
  }

  pub(crate) fn output_fetches(&self) -> u64 {
    self.state().output_fetches
  }

  pub(crate) fn height(&self) -> u32 {
    u32::try_from(self.state().blocks.len()).unwrap() - 1
  }

  pub(crate) fn block_at(&self, height: usize) -> Block {
    self.state().blocks[height].clone()
  }

  pub(crate) fn broadcast_tx(&self, template: TransactionTemplate) -> Txid {
    let mut state = self.state();

    let mut input_value = 0;
    let mut input = Vec::new();

    for (height, tx_index, vout, witness) in template.inputs {
      let tx = &state.blocks[*height].txdata[*tx_index];
      input_value += tx.output[usize::try_from(*vout).unwrap()].value.to_sat();
      input.push(bitcoin::TxIn {
        previous_output: OutPoint {
          txid: tx.compute_txid(),
          vout: *vout,
        },
        witness: witness.clone(),
        ..default()
      });
    }

    let output = if template.outputs.is_empty() {
      vec![TxOut {
        value: Amount::from_sat(input_value - template.fee),
        script_pubkey: script_pubkey(1),
      }]
    } else {
      template
        .outputs
        .iter()
        .map(|(script_pubkey, value)| TxOut {
          value: Amount::from_sat(*value),
          script_pubkey: script_pubkey.clone(),
        })
        .collect()
    };

    let tx = Transaction {
      version: bitcoin::transaction::Version(2),
      lock_time: bitcoin::absolute::LockTime::ZERO,
      input,
      output,
    };

    let txid = tx.compute_txid();
    state.mempool.push(tx);
    txid
  }

  /// Mines a block containing the mempool. The coinbase pays `subsidy` plus
  /// fees to `script_pubkey(0)`, unless `coinbase_value` overrides it.
  pub(crate) fn mine_block(&self, coinbase_value: Option<u64>) -> Block {
    let mut state = self.state();

    let height = u32::try_from(state.blocks.len()).unwrap();

    let mempool = std::mem::take(&mut state.mempool);

    let mut fees = 0;
    for tx in &mempool {
      let input_value = tx
        .input
        .iter()
        .map(|tx_in| {
          state.transactions[&tx_in.previous_output.txid].output
            [usize::try_from(tx_in.previous_output.vout).unwrap()]
          .value
          .to_sat()
        })
        .sum::<u64>();
      let output_value = tx.output.iter().map(|o| o.value.to_sat()).sum::<u64>();
      fees += input_value - output_value;
    }

    state.nonce += 1;

    let coinbase = Transaction {
      version: bitcoin::transaction::Version(2),
      lock_time: bitcoin::absolute::LockTime::ZERO,
      input: vec![bitcoin::TxIn {
        previous_output: OutPoint::null(),
        script_sig: script::Builder::new()
          .push_int(height.into())
          .push_int(state.nonce.into())
          .into_script(),
        ..default()
      }],
      output: vec![TxOut {
        value: Amount::from_sat(coinbase_value.unwrap_or(Height(height).subsidy() + fees)),
        script_pubkey: script_pubkey(0),
      }],
    };

    let txdata = std::iter::once(coinbase)
      .chain(mempool)
      .collect::<Vec<Transaction>>();

    let prev_blockhash = state
      .blocks
      .last()
      .map(Block::block_hash)
      .unwrap_or_else(BlockHash::all_zeros);

    let mut block = Block {
      header: bitcoin::block::Header {
        version: bitcoin::block::Version::TWO,
        prev_blockhash,
        merkle_root: bitcoin::TxMerkleNode::all_zeros(),
        time: 1_700_000_000 + height,
        bits: bitcoin::CompactTarget::from_consensus(0x207fffff),
        nonce: state.nonce,
      },
      txdata,
    };

    if let Some(merkle_root) = block.compute_merkle_root() {
      block.header.merkle_root = merkle_root;
    }

    for tx in &block.txdata {
      state.transactions.insert(tx.compute_txid(), tx.clone());
    }

    state.blocks.push(block.clone());

    block
  }

  /// Drops the last `n` blocks. Their transactions are not returned to the
  /// mempool.
  pub(crate) fn invalidate(&self, n: usize) {
    let mut state = self.state();
    let len = state.blocks.len();
    state.blocks.truncate(len - n);
  }
}

impl BlockSource for MockSource {
  fn block_count(&self) -> Result<u32> {
    Ok(u32::try_from(self.state().blocks.len().saturating_sub(1))?)
  }

  fn block_hash(&self, height: u32) -> Result<Option<BlockHash>> {
    Ok(
      self
        .state()
        .blocks
        .get(usize::try_from(height)?)
        .map(Block::block_hash),
    )
  }

  fn block(&self, height: u32) -> Result<Option<Block>> {
    Ok(self.state().blocks.get(usize::try_from(height)?).cloned())
  }
}

impl TransactionOutputSource for MockSource {
  fn transaction_outputs(&self, txid: Txid) -> Result<Vec<TxOut>> {
    let mut state = self.state();
    state.output_fetches += 1;
    state
      .transactions
      .get(&txid)
      .map(|tx| tx.output.clone())
      .ok_or_else(|| anyhow!("transaction {txid} not found"))
  }
}

pub(crate) struct ContextBuilder {
  args: Vec<OsString>,
  chain: Chain,
}

impl ContextBuilder {
  pub(crate) fn build(self) -> Context {
    self.try_build().unwrap()
  }

  pub(crate) fn try_build(self) -> Result<Context> {
    let command: Vec<OsString> = vec!["ord-brc20".into(), format!("--chain={}", self.chain).into()];

    let settings = Settings::load(Options::try_parse_from(
      command.into_iter().chain(self.args),
    )?)?;

    let source = Arc::new(MockSource::default());

    let index = Index::memory(&settings, source.clone(), source.clone())?;

    Ok(Context {
      index,
      settings,
      source,
    })
  }

  pub(crate) fn arg(mut self, arg: impl Into<OsString>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub(crate) fn chain(mut self, chain: Chain) -> Self {
    self.chain = chain;
    self
  }
}

pub(crate) struct Context {
  pub(crate) index: Index,
  #[allow(unused)]
  pub(crate) settings: Settings,
  pub(crate) source: Arc<MockSource>,
}

impl Context {
  pub(crate) fn builder() -> ContextBuilder {
    ContextBuilder {
      args: Vec::new(),
      chain: Chain::Regtest,
    }
  }

  pub(crate) fn mine_blocks(&self, n: u64) -> Vec<Block> {
    let blocks = (0..n)
      .map(|_| self.source.mine_block(None))
      .collect::<Vec<Block>>();
    self.index.update().unwrap();
    blocks
  }

  pub(crate) fn mine_blocks_with_coinbase_value(&self, n: u64, value: u64) -> Vec<Block> {
    let blocks = (0..n)
      .map(|_| self.source.mine_block(Some(value)))
      .collect::<Vec<Block>>();
    self.index.update().unwrap();
    blocks
  }

  pub(crate) fn broadcast_tx(&self, template: TransactionTemplate) -> Txid {
    self.source.broadcast_tx(template)
  }

  /// Mines a block with a transaction spending coinbase `height` that
  /// reveals `inscription` to `script_pubkey(1)`.
  pub(crate) fn inscribe(&self, height: usize, inscription: &Inscription) -> InscriptionId {
    let txid = self.broadcast_tx(TransactionTemplate {
      inputs: &[(height, 0, 0, inscription.to_witness())],
      ..default()
    });

    self.mine_blocks(1);

    InscriptionId { txid, index: 0 }
  }
}
