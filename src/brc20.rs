use super::*;

pub use self::{
  entry::{
    Balance, DeployEvent, Event, InscribeTransferEvent, MintEvent, OperationKind, Receipt,
    TickEntry, TransferTransferEvent, TransferableLog,
  },
  error::{Brc20Error, PayloadError},
  num::Num,
  operation::{DecimalsPolicy, Deploy, Mint, Operation, Transfer},
  script_key::ScriptKey,
  tick::{LowerTick, Tick},
};

pub(crate) use self::operation::is_candidate;

mod entry;
mod error;
mod num;
mod operation;
pub(crate) mod params;
pub(crate) mod processor;
mod script_key;
mod tick;
