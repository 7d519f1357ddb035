use std::collections::{BTreeMap, HashMap};

use types::{
    bitlist::AttestationBitlist,
    consts::{ATTESTATION_WINDOW, ROOT_WINDOW},
    primitives::{CommitteeIndex, Slot, H256},
};

use crate::snapshot::WindowSnapshot;

pub type AttestationHistory = BTreeMap<Slot, HashMap<CommitteeIndex, AttestationBitlist>>;
pub type BlockRootHistory = BTreeMap<Slot, H256>;

/// Rolling history of attestations and canonical block roots seen on chain.
///
/// The store has no internal synchronization. It is written by the head update process and read
/// by the proposal pipeline, with access handed back and forth through `head_sync::HeadSyncGate`.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ChainStateStore {
    attestations: AttestationHistory,
    block_roots: BlockRootHistory,
}

impl ChainStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `bitlist` into the bits already recorded for `(slot, committee_index)`.
    ///
    /// Slots older than the retained window are accepted. They are dropped by the next eviction.
    pub fn record_attestation(
        &mut self,
        slot: Slot,
        committee_index: CommitteeIndex,
        bitlist: &AttestationBitlist,
    ) {
        self.attestations
            .entry(slot)
            .or_default()
            .entry(committee_index)
            .and_modify(|existing| existing.union_with(bitlist))
            .or_insert_with(|| bitlist.clone());
    }

    pub fn record_block_root(&mut self, slot: Slot, root: H256) {
        self.block_roots.insert(slot, root);
    }

    /// Forgets the block roots of `first_slot` and every later slot.
    ///
    /// Attestations are kept. Votes included in orphaned blocks stay until they are evicted.
    pub fn discard_block_roots_from(&mut self, first_slot: Slot) {
        self.block_roots.split_off(&first_slot);
    }

    /// Drops every slot that can no longer be referenced by a block proposed at `current_slot`.
    ///
    /// Afterwards attestation slots are all `>= current_slot - 31` and root slots are all
    /// `>= current_slot - 63`. Nothing is evicted while `current_slot` is still inside the first
    /// window after genesis.
    pub fn evict_older_than(&mut self, current_slot: Slot) {
        if let Some(boundary) = window_start(current_slot, ATTESTATION_WINDOW) {
            self.attestations = self.attestations.split_off(&boundary);
        }

        if let Some(boundary) = window_start(current_slot, ROOT_WINDOW) {
            self.block_roots = self.block_roots.split_off(&boundary);
        }
    }

    #[must_use]
    pub const fn snapshot_window(&self, current_slot: Slot) -> WindowSnapshot<'_> {
        WindowSnapshot::new(current_slot, &self.attestations, &self.block_roots)
    }

    #[must_use]
    pub fn attestation_slot_count(&self) -> usize {
        self.attestations.len()
    }

    #[must_use]
    pub fn block_root_slot_count(&self) -> usize {
        self.block_roots.len()
    }

    #[must_use]
    pub fn block_root(&self, slot: Slot) -> Option<H256> {
        self.block_roots.get(&slot).copied()
    }

    #[must_use]
    pub fn latest_block_root_slot(&self) -> Option<Slot> {
        self.block_roots.last_key_value().map(|(slot, _)| *slot)
    }
}

fn window_start(current_slot: Slot, window: u64) -> Option<Slot> {
    current_slot.checked_sub(window - 1)
}
