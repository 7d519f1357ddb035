use crate::primitives::Slot;

pub const GENESIS_SLOT: Slot = 0;

/// Attestations may only reference blocks this many slots back.
pub const ATTESTATION_WINDOW: u64 = 32;

/// Number of slots of block roots kept around for head vote checks.
pub const ROOT_WINDOW: u64 = 64;
