use super::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Curse {
  DuplicateField,
  IncompleteField,
  NotAtOffsetZero,
  NotInFirstInput,
  Pointer,
  Pushnum,
  Reinscription,
  Stutter,
  UnrecognizedEvenField,
}

/// An inscription in motion while one transaction is processed.
#[derive(Debug, Clone)]
pub(crate) struct Flotsam {
  inscription_id: InscriptionId,
  offset: u64,
  txid: Txid,
  tx_index: u32,
  origin: Origin,
}

#[derive(Debug, Clone)]
enum Origin {
  New {
    cursed: bool,
    cursed_for_brc20: bool,
    fee: u64,
    inscription: Inscription,
    parent: Option<InscriptionId>,
    unbound: bool,
  },
  Old {
    old_satpoint: SatPoint,
  },
}

/// State threaded through the transactions of one block.
#[derive(Debug)]
pub(crate) struct BlockProcessingState {
  pub(crate) blessed: u64,
  pub(crate) cursed: u64,
  pub(crate) lost_sats: u64,
  /// Subsidy plus the fees of the transactions processed so far. Offsets of
  /// inscriptions sent as fee are relative to this pool.
  pub(crate) reward: u64,
  /// Inscriptions paid as fee, waiting for the coinbase.
  pub(crate) flotsam: Vec<Flotsam>,
}

impl BlockProcessingState {
  pub(crate) fn new(height: u32, stats: ProcessorStats) -> Self {
    Self {
      blessed: stats.blessed,
      cursed: stats.cursed,
      lost_sats: stats.lost_sats,
      reward: Height(height).subsidy(),
      flotsam: Vec::new(),
    }
  }

  pub(crate) fn stats(&self) -> ProcessorStats {
    ProcessorStats {
      blessed: self.blessed,
      cursed: self.cursed,
      lost_sats: self.lost_sats,
    }
  }

  fn next_sequence_number(&self) -> u64 {
    self.blessed + self.cursed
  }

  fn next_number(&mut self, cursed: bool) -> Result<i64> {
    if cursed {
      let number = -(i64::try_from(self.cursed)? + 1);
      self.cursed += 1;
      Ok(number)
    } else {
      let number = i64::try_from(self.blessed)?;
      self.blessed += 1;
      Ok(number)
    }
  }
}

/// The first inscription found at an offset, and how many have been found
/// there so far.
struct Occupant {
  count: u64,
  cursed: bool,
  cursed_for_brc20: bool,
}

pub(crate) struct InscriptionUpdater<'a, 'store, R> {
  pub(crate) overlay: &'a mut Overlay<'store, R>,
  pub(crate) values: &'a ValueCache,
  pub(crate) height: u32,
  pub(crate) timestamp: u32,
  pub(crate) jubilee_height: u32,
}

impl<R: InscriptionReader> InscriptionUpdater<'_, '_, R> {
  pub(crate) fn index_transaction(
    &mut self,
    state: &mut BlockProcessingState,
    tx_index: u32,
    tx: &Transaction,
    txid: Txid,
  ) -> Result {
    let is_coinbase = tx.is_coinbase();

    let envelopes = if is_coinbase {
      Vec::new()
    } else {
      Envelope::from_transaction(tx)
    };

    let mut inbound = Vec::with_capacity(tx.input.len());

    for tx_in in &tx.input {
      inbound.push(if tx_in.previous_output.is_null() {
        Vec::new()
      } else {
        self.overlay.transfers_on(tx_in.previous_output)?
      });
    }

    if !is_coinbase && envelopes.is_empty() && inbound.iter().all(Vec::is_empty) {
      return self.cache_outputs(tx, txid);
    }

    let jubilant = self.height >= self.jubilee_height;
    let total_output_value = tx
      .output
      .iter()
      .map(|tx_out| tx_out.value.to_sat())
      .sum::<u64>();

    let mut floating_inscriptions = Vec::new();
    let mut occupants = HashMap::<u64, Occupant>::new();
    let mut envelopes = envelopes.into_iter().peekable();
    let mut id_counter = 0;
    let mut total_input_value = 0;

    for ((input_index, tx_in), transfers) in (0u32..).zip(&tx.input).zip(inbound) {
      if tx_in.previous_output.is_null() {
        total_input_value += Height(self.height).subsidy();
        continue;
      }

      for transfer in transfers {
        let offset = total_input_value + transfer.new_satpoint.offset;

        let entry = self
          .overlay
          .entry(transfer.inscription_id)?
          .ok_or_else(|| anyhow!("inscription {} has no entry", transfer.inscription_id))?;

        occupants
          .entry(offset)
          .and_modify(|occupant| occupant.count += 1)
          .or_insert(Occupant {
            count: 1,
            cursed: entry.cursed,
            cursed_for_brc20: entry.cursed_for_brc20,
          });

        floating_inscriptions.push(Flotsam {
          inscription_id: transfer.inscription_id,
          offset,
          txid,
          tx_index,
          origin: Origin::Old {
            old_satpoint: transfer.new_satpoint,
          },
        });
      }

      let offset = total_input_value;

      let input_value = self.values.value(tx_in.previous_output)?;

      total_input_value += input_value;

      while let Some(envelope) = envelopes.next_if(|envelope| envelope.input == input_index) {
        let inscription_id = InscriptionId {
          txid,
          index: id_counter,
        };

        let curse = if envelope.unrecognized_even_field {
          Some(Curse::UnrecognizedEvenField)
        } else if envelope.duplicate_field {
          Some(Curse::DuplicateField)
        } else if envelope.incomplete_field {
          Some(Curse::IncompleteField)
        } else if envelope.input != 0 {
          Some(Curse::NotInFirstInput)
        } else if envelope.offset != 0 {
          Some(Curse::NotAtOffsetZero)
        } else if envelope.inscription.pointer.is_some() {
          Some(Curse::Pointer)
        } else if envelope.pushnum {
          Some(Curse::Pushnum)
        } else if envelope.stutter {
          Some(Curse::Stutter)
        } else {
          None
        };

        let (curse, cursed_for_brc20) = match (curse, occupants.get(&offset)) {
          (Some(curse), _) => (Some(curse), true),
          (None, Some(occupant)) if occupant.count > 1 => (Some(Curse::Reinscription), true),
          (None, Some(occupant)) => (
            (!occupant.cursed).then_some(Curse::Reinscription),
            !occupant.cursed_for_brc20,
          ),
          (None, None) => (None, false),
        };

        if let Some(curse) = curse {
          log::debug!("found cursed inscription {inscription_id}: {curse:?}");
        }

        let unbound = input_value == 0 || envelope.unrecognized_even_field;

        let offset = match envelope.inscription.pointer() {
          Some(pointer) if pointer < total_output_value => pointer,
          _ => offset,
        };

        occupants
          .entry(offset)
          .and_modify(|occupant| occupant.count += 1)
          .or_insert(Occupant {
            count: 1,
            cursed: curse.is_some(),
            cursed_for_brc20,
          });

        floating_inscriptions.push(Flotsam {
          inscription_id,
          offset,
          txid,
          tx_index,
          origin: Origin::New {
            cursed: curse.is_some() && !jubilant,
            cursed_for_brc20,
            fee: 0,
            parent: envelope.inscription.parent(),
            inscription: envelope.inscription,
            unbound,
          },
        });

        id_counter += 1;
      }
    }

    let present = floating_inscriptions
      .iter()
      .map(|flotsam| flotsam.inscription_id)
      .collect::<HashSet<InscriptionId>>();

    let fee = total_input_value
      .saturating_sub(total_output_value)
      .checked_div(u64::from(id_counter))
      .unwrap_or_default();

    for flotsam in &mut floating_inscriptions {
      let inscription_id = flotsam.inscription_id;

      if let Origin::New {
        fee: flotsam_fee,
        parent,
        ..
      } = &mut flotsam.origin
      {
        *flotsam_fee = fee;

        if parent.is_some_and(|parent| parent == inscription_id || !present.contains(&parent)) {
          *parent = None;
        }
      }
    }

    if is_coinbase {
      floating_inscriptions.append(&mut state.flotsam);
    }

    floating_inscriptions.sort_by_key(|flotsam| flotsam.offset);

    let mut floating_inscriptions = floating_inscriptions.into_iter().peekable();
    let mut output_value = 0;

    for (vout, tx_out) in (0u32..).zip(&tx.output) {
      let end = output_value + tx_out.value.to_sat();

      while let Some(flotsam) = floating_inscriptions.next_if(|flotsam| flotsam.offset < end) {
        let new_satpoint = SatPoint {
          outpoint: OutPoint { txid, vout },
          offset: flotsam.offset - output_value,
        };

        self.update_inscription_location(
          state,
          flotsam,
          new_satpoint,
          &tx_out.script_pubkey,
          tx_out.value.to_sat(),
          is_coinbase,
        )?;
      }

      output_value = end;
    }

    if is_coinbase {
      for flotsam in floating_inscriptions {
        let new_satpoint = SatPoint::lost(state.lost_sats + flotsam.offset - output_value);
        self.update_inscription_location(state, flotsam, new_satpoint, &ScriptBuf::new(), 0, true)?;
      }

      state.lost_sats += state.reward.saturating_sub(output_value);
    } else {
      let reward = state.reward;

      state
        .flotsam
        .extend(floating_inscriptions.map(|flotsam| Flotsam {
          offset: reward + flotsam.offset - output_value,
          ..flotsam
        }));

      state.reward += total_input_value.saturating_sub(output_value);
    }

    self.cache_outputs(tx, txid)
  }

  fn cache_outputs(&self, tx: &Transaction, txid: Txid) -> Result {
    for (vout, tx_out) in (0u32..).zip(&tx.output) {
      self
        .values
        .insert(OutPoint { txid, vout }, tx_out.value.to_sat())?;
    }

    Ok(())
  }

  fn update_inscription_location(
    &mut self,
    state: &mut BlockProcessingState,
    flotsam: Flotsam,
    new_satpoint: SatPoint,
    new_pkscript: &Script,
    new_output_value: u64,
    sent_as_fee: bool,
  ) -> Result {
    let inscription_id = flotsam.inscription_id;

    let (old_satpoint, transfer_count) = match flotsam.origin {
      Origin::Old { old_satpoint } => (
        Some(old_satpoint),
        self.overlay.next_transfer_count(inscription_id)?,
      ),
      Origin::New {
        cursed,
        cursed_for_brc20,
        fee,
        mut inscription,
        parent,
        unbound,
      } => {
        let sequence_number = state.next_sequence_number();
        let number = state.next_number(cursed)?;

        if !brc20::is_candidate(&inscription) {
          inscription.strip_content();
        }

        self.overlay.insert_entry(InscriptionEntry {
          id: inscription_id,
          sequence_number,
          number,
          cursed,
          cursed_for_brc20,
          unbound,
          parent,
          fee,
          height: self.height,
          timestamp: self.timestamp,
          inscription,
          transfer_count: 1,
        });

        (None, 1)
      }
    };

    self.overlay.insert_transfer(InscriptionTransfer {
      inscription_id,
      block_height: self.height,
      tx_index: flotsam.tx_index,
      txid: flotsam.txid,
      old_satpoint,
      new_satpoint,
      new_pkscript: new_pkscript.to_owned(),
      new_output_value,
      sent_as_fee,
      transfer_count,
    });

    Ok(())
  }
}
