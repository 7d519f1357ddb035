use core::time::Duration;

use prometheus_metrics::Metrics;
use strum::{AsRefStr, Display};
use types::primitives::Slot;

/// Result of one `ProposalPipeline::process_slot` call, as reported to observability.
#[derive(Clone, Copy, PartialEq, Eq, Debug, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Scored,
    ProposalFetchFailed,
    ScoringUnsupported,
    ScoringFailed,
    GateFailure,
    OutOfOrderSlot,
    Cancelled,
}

impl Outcome {
    /// Whether the slot counts as processed and will not be attempted again.
    #[must_use]
    pub const fn advances_last_processed_slot(self) -> bool {
        matches!(self, Self::Scored | Self::ScoringUnsupported)
    }
}

pub trait ObservabilitySink: Send + Sync {
    fn observe_proposal_latency(&self, label: &str, latency: Duration);

    fn record_outcome(&self, label: &str, slot: Slot, outcome: Outcome);

    fn set_window_sizes(&self, label: &str, attestation_slots: usize, root_slots: usize);

    fn observe_persistence_failure(&self, label: &str);

    fn observe_score(&self, _label: &str, _slot: Slot, _score: u64) {}

    fn observe_head_update(&self, _label: &str, _duration: Duration, _succeeded: bool) {}
}

impl ObservabilitySink for Metrics {
    fn observe_proposal_latency(&self, label: &str, latency: Duration) {
        self.observe_block_proposal_time(label, latency);
    }

    fn record_outcome(&self, label: &str, slot: Slot, outcome: Outcome) {
        self.register_process_slot_outcome(label, outcome.as_ref());

        if outcome.advances_last_processed_slot() {
            self.set_last_processed_slot(label, slot);
        }
    }

    fn set_window_sizes(&self, label: &str, attestation_slots: usize, root_slots: usize) {
        self.set_chain_state_window_slots(label, "attestations", attestation_slots);
        self.set_chain_state_window_slots(label, "block_roots", root_slots);
    }

    fn observe_persistence_failure(&self, label: &str) {
        self.register_score_persistence_failure(label);
    }

    fn observe_score(&self, label: &str, _slot: Slot, score: u64) {
        self.set_block_score(label, score);
    }

    fn observe_head_update(&self, label: &str, duration: Duration, succeeded: bool) {
        self.observe_head_update_time(label, duration);

        if !succeeded {
            self.register_head_update_error(label);
        }
    }
}
