pub(crate) const PROTOCOL_LITERAL: &str = "brc-20";

pub(crate) const MAX_DECIMAL_WIDTH: u8 = 18;

pub(crate) const DEFAULT_DECIMALS: u8 = MAX_DECIMAL_WIDTH;

/// `(2^64 - 1) * 10^18`, the largest amount any field may hold.
pub(crate) const MAX_AMOUNT: u128 = 18_446_744_073_709_551_615_000_000_000_000_000_000;

pub(crate) const ORIGINAL_TICK_LENGTH: usize = 4;

pub(crate) const SELF_MINT_TICK_LENGTH: usize = 5;

pub(crate) const SELF_MINT_MARKER: &str = "true";
