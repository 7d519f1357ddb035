use core::time::Duration;
use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chain_state::WindowSnapshot;
use parking_lot::Mutex;
use types::{
    bitlist::AttestationBitlist,
    containers::{Attestation, AttestationData, BeaconBlock, BeaconBlockBody, Checkpoint, Proposal},
    phase::Phase,
    primitives::{CommitteeIndex, Slot, H256},
};

use crate::{
    client::{CanonicalBlock, ChainDataClient, ChainHead, HeadDataSource},
    observability::{ObservabilitySink, Outcome},
    scoring::{AttestationScorer, BlockMetrics, BlockScore, Scorer, ScoringError},
    sink::ScoreSink,
};

pub fn attestation(
    slot: Slot,
    index: CommitteeIndex,
    bits: impl IntoIterator<Item = bool>,
    beacon_block_root: H256,
) -> Attestation {
    let checkpoint = Checkpoint {
        epoch: slot / 32,
        root: H256::zero(),
    };

    Attestation {
        aggregation_bits: AttestationBitlist::from_bools(bits),
        data: AttestationData {
            slot,
            index,
            beacon_block_root,
            source: checkpoint,
            target: checkpoint,
        },
        committee_bits: None,
    }
}

pub fn proposal(slot: Slot, phase: Phase, attestations: Vec<Attestation>) -> Proposal {
    Proposal {
        phase,
        block: BeaconBlock {
            slot,
            proposer_index: slot % 64,
            parent_root: H256::zero(),
            state_root: H256::zero(),
            body: BeaconBlockBody { attestations },
        },
    }
}

pub struct FakeClient {
    pub label: String,
    pub phase: Phase,
    pub attestations: Mutex<HashMap<Slot, Vec<Attestation>>>,
    pub failures: Mutex<HashMap<Slot, usize>>,
    pub hang: bool,
    pub fetches: AtomicUsize,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self {
            label: "lh".to_owned(),
            phase: Phase::Deneb,
            attestations: Mutex::default(),
            failures: Mutex::default(),
            hang: false,
            fetches: AtomicUsize::default(),
        }
    }
}

impl FakeClient {
    pub fn failing_once_at(slot: Slot) -> Self {
        let client = Self::default();
        client.failures.lock().insert(slot, 1);
        client
    }
}

#[async_trait]
impl ChainDataClient for FakeClient {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_proposal(&self, slot: Slot) -> Result<Proposal> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.hang {
            core::future::pending::<()>().await;
        }

        if let Some(remaining) = self.failures.lock().get_mut(&slot).filter(|count| **count > 0) {
            *remaining -= 1;
            bail!("connection reset while requesting slot {slot}");
        }

        let attestations = self.attestations.lock().remove(&slot).unwrap_or_default();

        Ok(proposal(slot, self.phase.clone(), attestations))
    }
}

/// What a scorer saw in the window it was given.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SeenWindow {
    pub current_slot: Slot,
    pub attestation_slots: Vec<Slot>,
    pub attestation_votes: usize,
}

#[derive(Default)]
pub struct RecordingScorer {
    pub seen: Mutex<Vec<SeenWindow>>,
    pub failures: AtomicUsize,
}

impl Scorer for RecordingScorer {
    fn score(
        &self,
        proposal: &Proposal,
        window: &WindowSnapshot<'_>,
    ) -> Result<BlockScore, ScoringError> {
        let attestation_slots = window.attestation_slots().collect::<Vec<_>>();

        let attestation_votes = attestation_slots
            .iter()
            .filter_map(|slot| window.committees_at(*slot))
            .flat_map(HashMap::values)
            .map(AttestationBitlist::count_ones)
            .sum();

        self.seen.lock().push(SeenWindow {
            current_slot: window.current_slot(),
            attestation_slots,
            attestation_votes,
        });

        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| count.checked_sub(1))
            .is_ok();

        if fail {
            return Err(ScoringError::Failed(anyhow::anyhow!("history unavailable")));
        }

        AttestationScorer.score(proposal, window)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum SinkBehavior {
    #[default]
    Succeed,
    Fail,
    Hang,
    HangOnce,
}

#[derive(Default)]
pub struct RecordingSink {
    pub behavior: SinkBehavior,
    pub persisted: Mutex<Vec<BlockMetrics>>,
    pub hung: AtomicBool,
}

#[async_trait]
impl ScoreSink for RecordingSink {
    async fn persist(&self, metrics: &BlockMetrics) -> Result<()> {
        match self.behavior {
            SinkBehavior::Succeed => {
                self.persisted.lock().push(metrics.clone());
                Ok(())
            }
            SinkBehavior::Fail => bail!("disk full"),
            SinkBehavior::Hang => core::future::pending().await,
            SinkBehavior::HangOnce => {
                if !self.hung.swap(true, Ordering::SeqCst) {
                    core::future::pending::<()>().await;
                }

                self.persisted.lock().push(metrics.clone());
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub outcomes: Mutex<Vec<(Slot, Outcome)>>,
    pub proposal_latencies: AtomicUsize,
    pub window_sizes: Mutex<Vec<(usize, usize)>>,
    pub persistence_failures: AtomicUsize,
    pub head_updates: Mutex<Vec<bool>>,
}

impl ObservabilitySink for RecordingObserver {
    fn observe_proposal_latency(&self, _label: &str, _latency: Duration) {
        self.proposal_latencies.fetch_add(1, Ordering::SeqCst);
    }

    fn record_outcome(&self, _label: &str, slot: Slot, outcome: Outcome) {
        self.outcomes.lock().push((slot, outcome));
    }

    fn set_window_sizes(&self, _label: &str, attestation_slots: usize, root_slots: usize) {
        self.window_sizes.lock().push((attestation_slots, root_slots));
    }

    fn observe_persistence_failure(&self, _label: &str) {
        self.persistence_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn observe_head_update(&self, _label: &str, _duration: Duration, succeeded: bool) {
        self.head_updates.lock().push(succeeded);
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub head: Mutex<Option<ChainHead>>,
    pub blocks: Mutex<BTreeMap<Slot, CanonicalBlock>>,
    pub fail: AtomicBool,
    pub requested: Mutex<Vec<Slot>>,
}

impl FakeSource {
    /// Fills every slot in `slots` with a block whose root repeats the low byte of the slot.
    pub fn with_blocks(slots: impl IntoIterator<Item = Slot>) -> Self {
        let source = Self::default();

        for slot in slots {
            source.add_block(slot, root_for(slot), vec![]);
        }

        source
    }

    pub fn add_block(&self, slot: Slot, root: H256, attestations: Vec<Attestation>) {
        self.blocks.lock().insert(slot, CanonicalBlock { root, attestations });

        let mut head = self.head.lock();

        if head.is_none_or(|head| head.slot <= slot) {
            *head = Some(ChainHead { slot, root });
        }
    }
}

#[async_trait]
impl HeadDataSource for FakeSource {
    fn label(&self) -> &str {
        "lh"
    }

    async fn head(&self) -> Result<ChainHead> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("beacon node unavailable");
        }

        match *self.head.lock() {
            Some(head) => Ok(head),
            None => bail!("no head yet"),
        }
    }

    async fn canonical_block(&self, slot: Slot) -> Result<Option<CanonicalBlock>> {
        self.requested.lock().push(slot);
        Ok(self.blocks.lock().get(&slot).cloned())
    }
}

#[allow(clippy::cast_possible_truncation)]
pub const fn root_for(slot: Slot) -> H256 {
    H256::repeat_byte(slot as u8)
}
