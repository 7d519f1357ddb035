use core::time::Duration;

use anyhow::Error as AnyhowError;
use thiserror::Error;
use types::{phase::Phase, primitives::Slot};

use crate::observability::Outcome;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to fetch block proposal for slot {slot} from {label}")]
    ProposalFetchFailed {
        slot: Slot,
        label: String,
        #[source]
        source: AnyhowError,
    },
    #[error("{label} proposed a {phase} block for slot {slot}, which cannot be scored")]
    ScoringUnsupported {
        slot: Slot,
        label: String,
        phase: Phase,
    },
    #[error("failed to score block proposal for slot {slot} from {label}")]
    ScoringFailed {
        slot: Slot,
        label: String,
        #[source]
        source: AnyhowError,
    },
    #[error("failed to persist score of block proposal for slot {slot} from {label}")]
    PersistenceFailed {
        slot: Slot,
        label: String,
        #[source]
        source: AnyhowError,
    },
    #[error(
        "head update for {label} did not accept chain state after slot {slot} within {timeout:?}"
    )]
    GateDeadlock {
        slot: Slot,
        label: String,
        timeout: Duration,
    },
    #[error("head update for {label} stopped before chain state for slot {slot} was handed over")]
    GateClosed { slot: Slot, label: String },
    #[error("head sync gate for {label} used out of order while processing slot {slot}")]
    GateMisuse {
        slot: Slot,
        label: String,
        #[source]
        source: head_sync::Error,
    },
    #[error("slot {slot} for {label} is not after last processed slot {last_processed}")]
    OutOfOrderSlot {
        slot: Slot,
        last_processed: Slot,
        label: String,
    },
    #[error("processing slot {slot} for {label} was cancelled")]
    Cancelled { slot: Slot, label: String },
}

impl Error {
    pub(crate) fn from_gate(error: head_sync::Error, slot: Slot, label: &str) -> Self {
        let label = label.to_owned();

        match error {
            head_sync::Error::Deadlock { timeout, .. } => Self::GateDeadlock {
                slot,
                label,
                timeout,
            },
            head_sync::Error::Closed => Self::GateClosed { slot, label },
            head_sync::Error::UnexpectedState { .. } => Self::GateMisuse {
                slot,
                label,
                source: error,
            },
        }
    }

    /// Whether the process should stop instead of moving on to the next slot.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::GateDeadlock { .. } | Self::GateClosed { .. } | Self::GateMisuse { .. },
        )
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        match self {
            Self::ProposalFetchFailed { slot, .. }
            | Self::ScoringUnsupported { slot, .. }
            | Self::ScoringFailed { slot, .. }
            | Self::PersistenceFailed { slot, .. }
            | Self::GateDeadlock { slot, .. }
            | Self::GateClosed { slot, .. }
            | Self::GateMisuse { slot, .. }
            | Self::OutOfOrderSlot { slot, .. }
            | Self::Cancelled { slot, .. } => *slot,
        }
    }

    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::ProposalFetchFailed { .. } => Outcome::ProposalFetchFailed,
            Self::ScoringUnsupported { .. } => Outcome::ScoringUnsupported,
            Self::ScoringFailed { .. } => Outcome::ScoringFailed,
            // Not returned from `ProposalPipeline::process_slot`. The score is still reported.
            Self::PersistenceFailed { .. } => Outcome::Scored,
            Self::GateDeadlock { .. } | Self::GateClosed { .. } | Self::GateMisuse { .. } => {
                Outcome::GateFailure
            }
            Self::OutOfOrderSlot { .. } => Outcome::OutOfOrderSlot,
            Self::Cancelled { .. } => Outcome::Cancelled,
        }
    }
}
