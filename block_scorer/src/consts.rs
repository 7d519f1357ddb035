use core::num::NonZeroU64;

use nonzero_ext::nonzero;

pub const APPLICATION_NAME: &str = "block_scorer";
pub const APPLICATION_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const USER_AGENT: &str = concat!("block_scorer/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_METRICS_PORT: u16 = 5054;

// Matches the timeout beacon nodes are given to build a block before the slot is lost anyway.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 90_000;

// Two mainnet slots.
pub const DEFAULT_GATE_TIMEOUT: u64 = 24;

pub const DEFAULT_SECONDS_PER_SLOT: NonZeroU64 = nonzero!(12_u64);
