use {
  super::*,
  crate::index::{Brc20Reader, InscriptionEntry, InscriptionReader, InscriptionTransfer},
};

/// A decoded BRC-20 operation attached to one inscription transfer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Message {
  pub(crate) inscription_id: InscriptionId,
  pub(crate) txid: Txid,
  pub(crate) old_satpoint: Option<SatPoint>,
  pub(crate) new_satpoint: SatPoint,
  pub(crate) new_pkscript: ScriptBuf,
  pub(crate) sent_as_fee: bool,
  pub(crate) parent: Option<InscriptionId>,
  pub(crate) op: MessageOp,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MessageOp {
  Deploy(Deploy),
  Mint(Mint),
  InscribeTransfer(Transfer),
  TransferTransfer,
}

impl Message {
  /// Interprets a transfer: the creation of a BRC-20 inscription is an
  /// inscribe operation, and the first move of a transfer inscription sends
  /// it. Every other transfer carries no BRC-20 meaning.
  pub(crate) fn resolve(
    entry: &InscriptionEntry,
    transfer: &InscriptionTransfer,
    policy: DecimalsPolicy,
  ) -> Option<Self> {
    if entry.cursed_for_brc20 || entry.inscription.body().is_none() {
      return None;
    }

    if transfer.transfer_count > 2 {
      return None;
    }

    let operation = match Operation::from_inscription(&entry.inscription, policy) {
      Ok(operation) => operation,
      Err(err) => {
        log::debug!(
          "ignoring brc-20 payload of {}: {err}",
          transfer.inscription_id
        );
        return None;
      }
    };

    let op = match (transfer.transfer_count, operation) {
      (1, Operation::Deploy(deploy)) => MessageOp::Deploy(deploy),
      (1, Operation::Mint(mint)) => MessageOp::Mint(mint),
      (1, Operation::Transfer(transfer)) => MessageOp::InscribeTransfer(transfer),
      (2, Operation::Transfer(_)) => MessageOp::TransferTransfer,
      _ => return None,
    };

    Some(Self {
      inscription_id: transfer.inscription_id,
      txid: transfer.txid,
      old_satpoint: transfer.old_satpoint,
      new_satpoint: transfer.new_satpoint,
      new_pkscript: transfer.new_pkscript.clone(),
      sent_as_fee: transfer.sent_as_fee,
      parent: entry.parent,
      op,
    })
  }

  fn tick(&self) -> Option<LowerTick> {
    match &self.op {
      MessageOp::Deploy(deploy) => Some(deploy.tick.to_lower()),
      MessageOp::Mint(mint) => Some(mint.tick.to_lower()),
      MessageOp::InscribeTransfer(transfer) => Some(transfer.tick.to_lower()),
      MessageOp::TransferTransfer => None,
    }
  }

  fn kind(&self) -> OperationKind {
    match self.op {
      MessageOp::Deploy(_) => OperationKind::Deploy,
      MessageOp::Mint(_) => OperationKind::Mint,
      MessageOp::InscribeTransfer(_) => OperationKind::InscribeTransfer,
      MessageOp::TransferTransfer => OperationKind::TransferTransfer,
    }
  }
}

/// Resolves the messages carried by a block's transfers, in order.
pub(crate) fn messages<I: InscriptionReader>(
  inscriptions: &I,
  transfers: &[InscriptionTransfer],
  policy: DecimalsPolicy,
) -> Result<Vec<Message>> {
  let mut messages = Vec::new();

  for transfer in transfers {
    let entry = inscriptions
      .entry(transfer.inscription_id)?
      .ok_or_else(|| anyhow!("missing entry for transfer of {}", transfer.inscription_id))?;

    messages.extend(Message::resolve(&entry, transfer, policy));
  }

  Ok(messages)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockContext {
  pub(crate) network: Network,
  pub(crate) height: u32,
  pub(crate) timestamp: u32,
  pub(crate) self_mint_activation_height: u32,
}

/// Everything a block changed in BRC-20 state.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Brc20Changes {
  pub(crate) ticks: Vec<TickEntry>,
  pub(crate) balances: Vec<(ScriptKey, Balance)>,
  pub(crate) new_transferables: Vec<TransferableLog>,
  pub(crate) spent_transferables: Vec<InscriptionId>,
  pub(crate) receipts: Vec<Receipt>,
}

pub(crate) struct Brc20Processor<'a, R> {
  context: BlockContext,
  reader: &'a R,
  ticks: HashMap<LowerTick, TickEntry>,
  dirty_ticks: HashSet<LowerTick>,
  balances: HashMap<(ScriptKey, LowerTick), Balance>,
  dirty_balances: HashSet<(ScriptKey, LowerTick)>,
  new_transferables: HashMap<InscriptionId, TransferableLog>,
  spent_transferables: HashSet<InscriptionId>,
  receipts: Vec<Receipt>,
}

impl<'a, R: Brc20Reader> Brc20Processor<'a, R> {
  pub(crate) fn new(reader: &'a R, context: BlockContext) -> Self {
    Self {
      context,
      reader,
      ticks: HashMap::new(),
      dirty_ticks: HashSet::new(),
      balances: HashMap::new(),
      dirty_balances: HashSet::new(),
      new_transferables: HashMap::new(),
      spent_transferables: HashSet::new(),
      receipts: Vec::new(),
    }
  }

  pub(crate) fn process(mut self, messages: &[Message]) -> Result<Brc20Changes> {
    let ticks = messages
      .iter()
      .filter_map(Message::tick)
      .collect::<HashSet<LowerTick>>()
      .into_iter()
      .collect::<Vec<LowerTick>>();

    self.ticks = self.reader.tick_entries(&ticks)?;

    for message in messages {
      let (from, result) = self.execute(message)?;

      if let Err(err) = &result {
        log::debug!(
          "brc-20 {:?} of {} rejected: {err}",
          message.kind(),
          message.inscription_id
        );
      }

      let to = (!message.sent_as_fee).then(|| self.script_key(&message.new_pkscript));

      self.receipts.push(Receipt {
        inscription_id: message.inscription_id,
        txid: message.txid,
        old_satpoint: message.old_satpoint,
        new_satpoint: message.new_satpoint,
        from,
        to,
        op: message.kind(),
        result,
      });
    }

    Ok(self.into_changes())
  }

  fn into_changes(self) -> Brc20Changes {
    let mut ticks = self
      .dirty_ticks
      .into_iter()
      .filter_map(|tick| self.ticks.get(&tick).cloned())
      .collect::<Vec<TickEntry>>();
    ticks.sort_by(|a, b| a.tick.to_lower().cmp(&b.tick.to_lower()));

    let mut balances = self
      .dirty_balances
      .into_iter()
      .filter_map(|key| {
        self
          .balances
          .get(&key)
          .map(|balance| (key.0.clone(), balance.clone()))
      })
      .collect::<Vec<(ScriptKey, Balance)>>();
    balances.sort_by_key(|(script_key, balance)| Balance::key(script_key, &balance.tick));

    let mut new_transferables = self
      .new_transferables
      .into_values()
      .collect::<Vec<TransferableLog>>();
    new_transferables.sort_by_key(|log| log.inscription_id);

    let mut spent_transferables = self
      .spent_transferables
      .into_iter()
      .collect::<Vec<InscriptionId>>();
    spent_transferables.sort();

    Brc20Changes {
      ticks,
      balances,
      new_transferables,
      spent_transferables,
      receipts: self.receipts,
    }
  }

  fn script_key(&self, script: &Script) -> ScriptKey {
    ScriptKey::from_script(script, self.context.network)
  }

  /// Applies one message, returning the sender of a transfer-transfer and
  /// the outcome. Store failures abort the block, rejections do not.
  fn execute(
    &mut self,
    message: &Message,
  ) -> Result<(Option<ScriptKey>, Result<Event, Brc20Error>)> {
    match &message.op {
      MessageOp::Deploy(deploy) => Ok((None, self.deploy(message, deploy))),
      MessageOp::Mint(mint) => Ok((None, self.mint(message, mint)?)),
      MessageOp::InscribeTransfer(transfer) => {
        Ok((None, self.inscribe_transfer(message, transfer)?))
      }
      MessageOp::TransferTransfer => self.transfer_transfer(message),
    }
  }

  fn deploy(&mut self, message: &Message, deploy: &Deploy) -> Result<Event, Brc20Error> {
    if message.sent_as_fee {
      return Err(Brc20Error::InscribeToCoinbase);
    }

    let tick = deploy.tick.to_lower();

    if let Some(entry) = self.ticks.get(&tick) {
      return Err(Brc20Error::DuplicateTick(entry.tick.to_string()));
    }

    if deploy.self_mint && self.context.height < self.context.self_mint_activation_height {
      return Err(Brc20Error::SelfMintNotActive(self.context.height));
    }

    self.ticks.insert(
      tick.clone(),
      TickEntry {
        tick: deploy.tick.clone(),
        inscription_id: message.inscription_id,
        max_supply: deploy.max_supply,
        limit_per_mint: deploy.limit_per_mint,
        decimals: deploy.decimals,
        self_mint: deploy.self_mint,
        minted_amount: Num::ZERO,
        burned_amount: Num::ZERO,
        deployed_height: self.context.height,
        deployed_timestamp: self.context.timestamp,
        completed_height: None,
        completed_timestamp: None,
      },
    );
    self.dirty_ticks.insert(tick);

    Ok(Event::Deploy(DeployEvent {
      tick: deploy.tick.clone(),
      max_supply: deploy.max_supply,
      limit_per_mint: deploy.limit_per_mint,
      decimals: deploy.decimals,
      self_mint: deploy.self_mint,
    }))
  }

  fn checked_tick(&self, tick: &Tick, amount: Num) -> Result<TickEntry, Brc20Error> {
    let entry = self
      .ticks
      .get(&tick.to_lower())
      .ok_or_else(|| Brc20Error::TickNotFound(tick.to_string()))?;

    if amount.exceeds_precision(entry.decimals) {
      return Err(Brc20Error::AmountExceedsPrecision {
        amount: amount.to_string(),
        decimals: entry.decimals,
      });
    }

    if amount.is_zero() {
      return Err(Brc20Error::InvalidZeroAmount);
    }

    Ok(entry.clone())
  }

  fn mint(&mut self, message: &Message, mint: &Mint) -> Result<Result<Event, Brc20Error>> {
    if message.sent_as_fee {
      return Ok(Err(Brc20Error::InscribeToCoinbase));
    }

    let mut entry = match self.checked_tick(&mint.tick, mint.amount) {
      Ok(entry) => entry,
      Err(err) => return Ok(Err(err)),
    };

    if mint.amount > entry.limit_per_mint {
      return Ok(Err(Brc20Error::AmountExceedsLimit {
        amount: mint.amount.to_string(),
        limit: entry.limit_per_mint.to_string(),
      }));
    }

    if entry.self_mint && message.parent != Some(entry.inscription_id) {
      return Ok(Err(Brc20Error::SelfMintParentMismatch(
        entry.inscription_id,
      )));
    }

    if entry.is_completed() {
      return Ok(Err(Brc20Error::TickMinted(entry.tick.to_string())));
    }

    let remaining = entry.remaining();

    let (amount, clipped_from) = if mint.amount > remaining {
      (remaining, Some(mint.amount))
    } else {
      (mint.amount, None)
    };

    let to = self.script_key(&message.new_pkscript);
    let tick = entry.tick.to_lower();

    let mut balance = self.balance(&to, &tick)?;

    let (Some(overall), Some(available), Some(minted)) = (
      balance.overall_balance.checked_add(amount),
      balance.available_balance.checked_add(amount),
      entry.minted_amount.checked_add(amount),
    ) else {
      return Ok(Err(Brc20Error::Overflow));
    };

    balance.overall_balance = overall;
    balance.available_balance = available;
    self.update_balance(to, balance);

    entry.minted_amount = minted;

    if entry.is_completed() {
      entry.completed_height = Some(self.context.height);
      entry.completed_timestamp = Some(self.context.timestamp);
    }

    let event = Event::Mint(MintEvent {
      tick: entry.tick.clone(),
      amount,
      clipped_from,
    });

    self.update_tick(entry);

    Ok(Ok(event))
  }

  fn inscribe_transfer(
    &mut self,
    message: &Message,
    transfer: &Transfer,
  ) -> Result<Result<Event, Brc20Error>> {
    if message.sent_as_fee {
      return Ok(Err(Brc20Error::InscribeToCoinbase));
    }

    let entry = match self.checked_tick(&transfer.tick, transfer.amount) {
      Ok(entry) => entry,
      Err(err) => return Ok(Err(err)),
    };

    let owner = self.script_key(&message.new_pkscript);
    let tick = entry.tick.to_lower();

    let mut balance = self.balance(&owner, &tick)?;

    let Some(available) = balance.available_balance.checked_sub(transfer.amount) else {
      return Ok(Err(Brc20Error::InsufficientBalance {
        available: balance.available_balance.to_string(),
        amount: transfer.amount.to_string(),
      }));
    };

    balance.available_balance = available;
    self.update_balance(owner.clone(), balance);

    self.new_transferables.insert(
      message.inscription_id,
      TransferableLog {
        inscription_id: message.inscription_id,
        owner,
        tick: entry.tick.clone(),
        amount: transfer.amount,
      },
    );

    Ok(Ok(Event::InscribeTransfer(InscribeTransferEvent {
      tick: entry.tick,
      amount: transfer.amount,
    })))
  }

  fn take_transferable(&mut self, inscription_id: InscriptionId) -> Result<Option<TransferableLog>> {
    if let Some(log) = self.new_transferables.remove(&inscription_id) {
      return Ok(Some(log));
    }

    if self.spent_transferables.contains(&inscription_id) {
      return Ok(None);
    }

    let log = self.reader.transferable(inscription_id)?;

    if log.is_some() {
      self.spent_transferables.insert(inscription_id);
    }

    Ok(log)
  }

  fn transfer_transfer(
    &mut self,
    message: &Message,
  ) -> Result<(Option<ScriptKey>, Result<Event, Brc20Error>)> {
    let Some(log) = self.take_transferable(message.inscription_id)? else {
      return Ok((
        None,
        Err(Brc20Error::TransferableNotFound(message.inscription_id)),
      ));
    };

    let sender = Some(log.owner.clone());

    Ok((sender, self.settle(message, log)?))
  }

  fn settle(&mut self, message: &Message, log: TransferableLog) -> Result<Result<Event, Brc20Error>> {
    let tick = log.tick.to_lower();

    if !self.ticks.contains_key(&tick) {
      if let Some(entry) = self.reader.tick_entries(&[tick.clone()])?.remove(&tick) {
        self.ticks.insert(tick.clone(), entry);
      }
    }

    let Some(mut entry) = self.ticks.get(&tick).cloned() else {
      return Ok(Err(Brc20Error::TickNotFound(log.tick.to_string())));
    };

    let mut sender = self.balance(&log.owner, &tick)?;

    // A transfer inscription spent as fee goes back to its owner.
    if message.sent_as_fee {
      let Some(available) = sender.available_balance.checked_add(log.amount) else {
        return Ok(Err(Brc20Error::Overflow));
      };
      sender.available_balance = available;
      self.update_balance(log.owner.clone(), sender);

      return Ok(Ok(Event::TransferTransfer(TransferTransferEvent {
        tick: log.tick,
        amount: log.amount,
        burned: false,
        returned: true,
      })));
    }

    let mut burned = false;

    let Some(overall) = sender.overall_balance.checked_sub(log.amount) else {
      return Ok(Err(Brc20Error::Overflow));
    };

    sender.overall_balance = overall;

    if message.new_pkscript.is_op_return() {
      let Some(burned_amount) = entry.burned_amount.checked_add(log.amount) else {
        return Ok(Err(Brc20Error::Overflow));
      };
      entry.burned_amount = burned_amount;
      burned = true;
      self.update_balance(log.owner.clone(), sender);
      self.update_tick(entry);
    } else {
      self.update_balance(log.owner.clone(), sender);

      let to = self.script_key(&message.new_pkscript);
      let mut recipient = self.balance(&to, &tick)?;

      let (Some(overall), Some(available)) = (
        recipient.overall_balance.checked_add(log.amount),
        recipient.available_balance.checked_add(log.amount),
      ) else {
        return Ok(Err(Brc20Error::Overflow));
      };

      recipient.overall_balance = overall;
      recipient.available_balance = available;
      self.update_balance(to, recipient);
    }

    Ok(Ok(Event::TransferTransfer(TransferTransferEvent {
      tick: log.tick,
      amount: log.amount,
      burned,
      returned: false,
    })))
  }

  fn balance(&mut self, script_key: &ScriptKey, tick: &LowerTick) -> Result<Balance> {
    let key = (script_key.clone(), tick.clone());

    if let Some(balance) = self.balances.get(&key) {
      return Ok(balance.clone());
    }

    let balance = self
      .reader
      .balance(script_key, tick)?
      .unwrap_or_else(|| Balance::new(tick.clone()));

    self.balances.insert(key, balance.clone());

    Ok(balance)
  }

  fn update_balance(&mut self, script_key: ScriptKey, balance: Balance) {
    let key = (script_key, balance.tick.clone());
    self.dirty_balances.insert(key.clone());
    self.balances.insert(key, balance);
  }

  fn update_tick(&mut self, entry: TickEntry) {
    let tick = entry.tick.to_lower();
    self.dirty_ticks.insert(tick.clone());
    self.ticks.insert(tick, entry);
  }
}
