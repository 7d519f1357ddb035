use core::ops::Bound;
use std::collections::HashMap;

use types::{
    bitlist::AttestationBitlist,
    primitives::{CommitteeIndex, Slot, H256},
};

use crate::store::{AttestationHistory, BlockRootHistory};

/// Read-only view of a [`ChainStateStore`] taken for scoring a proposal at `current_slot`.
///
/// The view borrows the store, so nothing can be recorded into it until the view is dropped.
///
/// [`ChainStateStore`]: crate::ChainStateStore
#[derive(Clone, Copy, Debug)]
pub struct WindowSnapshot<'store> {
    current_slot: Slot,
    attestations: &'store AttestationHistory,
    block_roots: &'store BlockRootHistory,
}

impl<'store> WindowSnapshot<'store> {
    pub(crate) const fn new(
        current_slot: Slot,
        attestations: &'store AttestationHistory,
        block_roots: &'store BlockRootHistory,
    ) -> Self {
        Self {
            current_slot,
            attestations,
            block_roots,
        }
    }

    #[must_use]
    pub const fn current_slot(&self) -> Slot {
        self.current_slot
    }

    #[must_use]
    pub fn attestation_bits(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> Option<&'store AttestationBitlist> {
        self.attestations.get(&slot)?.get(&committee_index)
    }

    #[must_use]
    pub fn committees_at(
        &self,
        slot: Slot,
    ) -> Option<&'store HashMap<CommitteeIndex, AttestationBitlist>> {
        self.attestations.get(&slot)
    }

    #[must_use]
    pub fn block_root(&self, slot: Slot) -> Option<H256> {
        self.block_roots.get(&slot).copied()
    }

    /// Root of the canonical block at `slot`, or of the closest earlier block if `slot` was empty.
    #[must_use]
    pub fn canonical_root_at(&self, slot: Slot) -> Option<H256> {
        self.block_roots
            .range((Bound::Unbounded, Bound::Included(slot)))
            .next_back()
            .map(|(_, root)| *root)
    }

    pub fn attestation_slots(&self) -> impl DoubleEndedIterator<Item = Slot> + 'store {
        self.attestations.keys().copied()
    }

    pub fn block_root_slots(&self) -> impl DoubleEndedIterator<Item = Slot> + 'store {
        self.block_roots.keys().copied()
    }
}
