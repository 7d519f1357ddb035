use std::{sync::Arc, time::Instant};

use anyhow::Result;
use chain_state::ChainStateStore;
use head_sync::HeadUpdateReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use types::{
    consts::{ATTESTATION_WINDOW, ROOT_WINDOW},
    primitives::Slot,
};

use crate::{client::HeadDataSource, observability::ObservabilitySink};

/// Copies canonical blocks the store has not seen yet into it.
pub struct HeadIngester<S> {
    source: Arc<S>,
    last_ingested_slot: Option<Slot>,
}

impl<S: HeadDataSource> HeadIngester<S> {
    #[must_use]
    pub const fn new(source: Arc<S>) -> Self {
        Self {
            source,
            last_ingested_slot: None,
        }
    }

    #[must_use]
    pub const fn last_ingested_slot(&self) -> Option<Slot> {
        self.last_ingested_slot
    }

    /// Records the roots and attestations of canonical blocks up to the current head.
    ///
    /// Only the last [`ROOT_WINDOW`] slots are read. If the head has been reorganized onto a block
    /// the store does not know, the roots of the last [`ATTESTATION_WINDOW`] slots and any later
    /// ones are replaced with what the chain holds now. Roots of slots after a head that moved
    /// back are forgotten.
    ///
    /// Returns the number of blocks recorded.
    pub async fn ingest(&mut self, store: &mut ChainStateStore) -> Result<usize> {
        let label = self.source.label();
        let head = self.source.head().await?;
        let earliest_slot = head.slot.saturating_sub(ROOT_WINDOW - 1);

        let mut next_slot = match self.last_ingested_slot {
            Some(last_ingested) if last_ingested < head.slot => last_ingested + 1,
            Some(last_ingested) if store.block_root(head.slot) == Some(head.root) => {
                if last_ingested > head.slot {
                    info!(
                        label,
                        "head moved back to slot {}, forgetting roots of later slots",
                        head.slot,
                    );

                    store.discard_block_roots_from(head.slot.saturating_add(1));
                    self.last_ingested_slot = Some(head.slot);
                }

                return Ok(0);
            }
            Some(_) => {
                info!(
                    label,
                    "head at slot {} has unknown root {:?}, reading recent blocks again",
                    head.slot,
                    head.root,
                );

                let reread_slot = head.slot.saturating_sub(ATTESTATION_WINDOW - 1);

                // Roots from the abandoned chain must not be taken for canonical ones.
                store.discard_block_roots_from(reread_slot);

                reread_slot
            }
            None => earliest_slot,
        };

        next_slot = next_slot.max(earliest_slot);

        let mut recorded = 0;

        for slot in next_slot..=head.slot {
            let Some(block) = self.source.canonical_block(slot).await? else {
                debug!(label, "no canonical block in slot {slot}");
                self.last_ingested_slot = Some(slot);
                continue;
            };

            store.record_block_root(slot, block.root);

            for attestation in &block.attestations {
                if attestation.committee_bits.is_some() {
                    debug!(
                        label,
                        "skipping attestation with committee bits in block at slot {slot}",
                    );
                    continue;
                }

                store.record_attestation(
                    attestation.data.slot,
                    attestation.data.index,
                    &attestation.aggregation_bits,
                );
            }

            recorded += 1;
            self.last_ingested_slot = Some(slot);
        }

        Ok(recorded)
    }
}

/// Head update side of a beacon node's `HeadSyncGate`.
pub struct HeadUpdater<S> {
    ingester: HeadIngester<S>,
    receiver: HeadUpdateReceiver<ChainStateStore>,
    observer: Option<Arc<dyn ObservabilitySink>>,
}

impl<S: HeadDataSource> HeadUpdater<S> {
    #[must_use]
    pub fn new(
        ingester: HeadIngester<S>,
        receiver: HeadUpdateReceiver<ChainStateStore>,
        observer: Option<Arc<dyn ObservabilitySink>>,
    ) -> Self {
        Self {
            ingester,
            receiver,
            observer,
        }
    }

    /// Takes one turn per signal from the proposal pipeline until either side stops.
    ///
    /// A failed ingestion is logged and the turn is completed anyway, so block processing is
    /// never starved. Blocks missed because of it are read on the next turn.
    pub async fn run(mut self, cancellation: CancellationToken) {
        let label = self.ingester.source.label().to_owned();

        loop {
            let turn = tokio::select! {
                () = cancellation.cancelled() => break,
                turn = self.receiver.accept() => turn,
            };

            let Some(mut turn) = turn else {
                debug!(label = %label, "proposal pipeline stopped");
                break;
            };

            let started_at = Instant::now();
            let ingested = self.ingester.ingest(&mut turn).await;
            let duration = started_at.elapsed();

            match &ingested {
                Ok(recorded) => {
                    debug!(
                        label = %label,
                        "recorded {recorded} blocks after slot {} in {duration:?}",
                        turn.slot(),
                    );
                }
                Err(error) => warn!(
                    label = %label,
                    "failed to read new heads after slot {}: {error:?}",
                    turn.slot(),
                ),
            }

            if let Some(observer) = &self.observer {
                observer.observe_head_update(&label, duration, ingested.is_ok());
            }

            if turn.complete().is_err() {
                debug!(label = %label, "proposal pipeline stopped during head update");
                break;
            }
        }
    }
}
