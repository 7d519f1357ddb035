use core::{num::NonZeroU64, time::Duration};
use std::{sync::Arc, time::SystemTime};

use anyhow::{Context as _, Error as AnyhowError, Result};
use beacon_api::BeaconNodeClient;
use chain_state::ChainStateStore;
use pipeline::{
    Error, HeadIngester, HeadUpdater, ObservabilitySink, ProposalPipeline, ScoreSink, Scorer,
};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument as _};
use types::primitives::Slot;

use crate::slot_clock::SlotClock;

/// Parts shared by the pipelines of all beacon nodes.
#[derive(Clone)]
pub struct Components {
    pub scorer: Arc<dyn Scorer>,
    pub sink: Arc<dyn ScoreSink>,
    pub observer: Option<Arc<dyn ObservabilitySink>>,
    pub cancellation: CancellationToken,
    pub gate_timeout: Duration,
    pub seconds_per_slot: NonZeroU64,
}

/// Drives the proposal pipeline of one beacon node at the start of every slot.
pub struct SlotScheduler {
    pipeline: ProposalPipeline<BeaconNodeClient>,
    clock: SlotClock,
    cancellation: CancellationToken,
}

impl SlotScheduler {
    /// Reads genesis and the recent chain from `client` and starts its head update task.
    pub async fn start(client: Arc<BeaconNodeClient>, components: Components) -> Result<Self> {
        let Components {
            scorer,
            sink,
            observer,
            cancellation,
            gate_timeout,
            seconds_per_slot,
        } = components;

        let endpoint = client.endpoint();

        let genesis_time = client
            .fetch_genesis_time()
            .await
            .with_context(|| format!("failed to read genesis time from {endpoint}"))?;

        let clock = SlotClock::new(genesis_time, seconds_per_slot);

        let mut store = ChainStateStore::new();
        let mut ingester = HeadIngester::new(Arc::clone(&client));

        // The head update task reads whatever is missed here after the first slot.
        match ingester.ingest(&mut store).await {
            Ok(recorded) => info!("loaded {recorded} recent blocks from {endpoint}"),
            Err(error) => warn!("failed to load recent blocks from {endpoint}: {error:?}"),
        }

        let (gate, receiver) = head_sync::channel(store, Some(gate_timeout));
        let updater = HeadUpdater::new(ingester, receiver, observer.clone());

        tokio::spawn(updater.run(cancellation.clone()).in_current_span());

        let pipeline = ProposalPipeline::new(
            client,
            scorer,
            sink,
            gate,
            observer,
            cancellation.clone(),
        );

        Ok(Self {
            pipeline,
            clock,
            cancellation,
        })
    }

    /// Processes one slot per tick until cancelled or until the pipeline fails fatally.
    ///
    /// Ticks missed while a slot is still being processed are skipped.
    pub async fn run(mut self) -> Result<()> {
        let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;
        let (first_slot, delay) = self.clock.next_slot_start(now)?;
        let slot_duration = self.clock.slot_duration();
        let start = Instant::now() + delay;

        let mut interval = tokio::time::interval_at(start, slot_duration);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("scoring proposals from slot {first_slot} in {delay:?}");

        loop {
            let tick = tokio::select! {
                () = self.cancellation.cancelled() => break,
                tick = interval.tick() => tick,
            };

            let slot = first_slot + elapsed_slots(start, tick, slot_duration)?;

            match self.pipeline.process_slot(slot).await {
                Ok(_) => {}
                Err(Error::Cancelled { .. }) => break,
                Err(error) if error.is_fatal() => {
                    error!("stopping after fatal error in slot {slot}: {error}");
                    return Err(error.into());
                }
                Err(error) => warn!("{:#}", AnyhowError::from(error)),
            }
        }

        info!(
            "stopped scoring, last processed slot: {:?}",
            self.pipeline.last_processed_slot(),
        );

        Ok(())
    }
}

fn elapsed_slots(start: Instant, tick: Instant, slot_duration: Duration) -> Result<Slot> {
    let nanos = tick.saturating_duration_since(start).as_nanos() / slot_duration.as_nanos();
    Ok(Slot::try_from(nanos)?)
}
