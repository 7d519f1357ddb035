use std::{sync::Arc, time::Instant};

use anyhow::{anyhow, Error as AnyhowError};
use chain_state::ChainStateStore;
use head_sync::{GateState, HeadSyncGate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use types::primitives::Slot;

use crate::{
    client::ChainDataClient,
    error::Error,
    observability::{ObservabilitySink, Outcome},
    scoring::{BlockMetrics, Scorer, ScoringError},
    sink::ScoreSink,
};

/// Scores the block proposals of one beacon node, one slot at a time.
pub struct ProposalPipeline<C> {
    client: Arc<C>,
    scorer: Arc<dyn Scorer>,
    sink: Arc<dyn ScoreSink>,
    gate: HeadSyncGate<ChainStateStore>,
    observer: Option<Arc<dyn ObservabilitySink>>,
    cancellation: CancellationToken,
    last_processed_slot: Option<Slot>,
    // Slot whose block took chain state and has not handed it over yet.
    unsignalled_slot: Option<Slot>,
}

impl<C: ChainDataClient> ProposalPipeline<C> {
    #[must_use]
    pub fn new(
        client: Arc<C>,
        scorer: Arc<dyn Scorer>,
        sink: Arc<dyn ScoreSink>,
        gate: HeadSyncGate<ChainStateStore>,
        observer: Option<Arc<dyn ObservabilitySink>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            client,
            scorer,
            sink,
            gate,
            observer,
            cancellation,
            last_processed_slot: None,
            unsignalled_slot: None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.client.label()
    }

    #[must_use]
    pub const fn last_processed_slot(&self) -> Option<Slot> {
        self.last_processed_slot
    }

    /// Chain state, unless it is currently held by the head update process.
    pub fn chain_state(&mut self) -> Option<&ChainStateStore> {
        self.gate.get()
    }

    /// Fetches, scores and persists the proposal for `slot`, then hands chain state over to the
    /// head update process.
    ///
    /// Chain state is only touched once the proposal has been fetched. From then on the gate is
    /// signalled exactly once, whether scoring and persistence succeed or not. Failing to persist
    /// a score is logged and counted but not returned.
    ///
    /// If a previous call was dropped while holding chain state, chain state is handed over for
    /// that call's slot first.
    pub async fn process_slot(&mut self, slot: Slot) -> Result<BlockMetrics, Error> {
        let label = self.client.label().to_owned();
        let result = self.try_process_slot(slot, &label).await;

        let outcome = match &result {
            Ok(_) => Outcome::Scored,
            Err(error) => error.outcome(),
        };

        if let Some(observer) = &self.observer {
            observer.record_outcome(&label, slot, outcome);
        }

        result
    }

    async fn try_process_slot(&mut self, slot: Slot, label: &str) -> Result<BlockMetrics, Error> {
        if let Some(last_processed) = self.last_processed_slot {
            if slot <= last_processed {
                return Err(Error::OutOfOrderSlot {
                    slot,
                    last_processed,
                    label: label.to_owned(),
                });
            }
        }

        self.release_abandoned_block(label).await?;

        debug!(label, "processing block proposal for slot {slot}");

        let cancelled = || Error::Cancelled {
            slot,
            label: label.to_owned(),
        };

        let requested_at = Instant::now();

        let fetched = tokio::select! {
            biased;

            () = self.cancellation.cancelled() => return Err(cancelled()),
            fetched = self.client.fetch_proposal(slot) => fetched,
        };

        let proposal_time = requested_at.elapsed();

        if let Some(observer) = &self.observer {
            observer.observe_proposal_latency(label, proposal_time);
        }

        let proposal = fetched.map_err(|source| Error::ProposalFetchFailed {
            slot,
            label: label.to_owned(),
            source,
        })?;

        info!(label, "block proposal for slot {slot} took {proposal_time:?}");

        let store = tokio::select! {
            biased;

            () = self.cancellation.cancelled() => return Err(cancelled()),
            store = self.gate.begin_block() => {
                store.map_err(|error| Error::from_gate(error, slot, label))?
            }
        };

        self.unsignalled_slot = Some(slot);

        store.evict_older_than(slot);

        let window_sizes = (store.attestation_slot_count(), store.block_root_slot_count());
        let scored = self.scorer.score(&proposal, &store.snapshot_window(slot));

        if let Some(observer) = &self.observer {
            observer.set_window_sizes(label, window_sizes.0, window_sizes.1);
        }

        let result = match scored {
            Ok(score) => {
                let metrics = BlockMetrics {
                    label: label.to_owned(),
                    slot,
                    phase: proposal.phase.clone(),
                    proposer_index: proposal.block.proposer_index,
                    proposal_time,
                    score,
                };

                info!(label, "scored block proposal for slot {slot}: {metrics:?}");

                if let Some(observer) = &self.observer {
                    observer.observe_score(label, slot, score.score);
                }

                self.persist(&metrics).await;
                self.last_processed_slot = Some(slot);

                Ok(metrics)
            }
            Err(ScoringError::Unsupported { phase }) => {
                self.last_processed_slot = Some(slot);

                Err(Error::ScoringUnsupported {
                    slot,
                    label: label.to_owned(),
                    phase,
                })
            }
            // The slot stays eligible for a retry.
            Err(ScoringError::Failed(source)) => Err(Error::ScoringFailed {
                slot,
                label: label.to_owned(),
                source,
            }),
        };

        let signalled = self.gate.signal(slot).await;

        self.unsignalled_slot = None;

        signalled.map_err(|error| Error::from_gate(error, slot, label))?;

        result
    }

    async fn release_abandoned_block(&mut self, label: &str) -> Result<(), Error> {
        let Some(slot) = self.unsignalled_slot.take() else {
            return Ok(());
        };

        // A call dropped inside `signal` has already handed chain state over.
        if self.gate.state() != GateState::BlockInFlight {
            return Ok(());
        }

        warn!(label, "processing slot {slot} was abandoned, handing chain state over");

        self.gate
            .signal(slot)
            .await
            .map_err(|error| Error::from_gate(error, slot, label))
    }

    async fn persist(&self, metrics: &BlockMetrics) {
        let persisted = tokio::select! {
            biased;

            () = self.cancellation.cancelled() => Err(anyhow!("cancelled")),
            persisted = self.sink.persist(metrics) => persisted,
        };

        if let Err(source) = persisted {
            let error = Error::PersistenceFailed {
                slot: metrics.slot,
                label: metrics.label.clone(),
                source,
            };

            warn!("{:#}", AnyhowError::from(error));

            if let Some(observer) = &self.observer {
                observer.observe_persistence_failure(&metrics.label);
            }
        }
    }
}
