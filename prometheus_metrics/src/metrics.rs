use core::time::Duration;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::OnceCell;
use prometheus::{histogram_opts, opts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec};
use tracing::warn;

pub static METRICS: OnceCell<Arc<Metrics>> = OnceCell::new();

// Proposals are requested with a long timeout, so the buckets go well past a slot.
const PROPOSAL_TIME_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0, 6.0, 8.0, 12.0, 24.0, 60.0, 90.0,
];

#[derive(Debug)]
pub struct Metrics {
    // Overview
    live: IntGauge,
    last_processed_slot: IntGaugeVec,

    // Proposal pipeline
    block_proposal_times: HistogramVec,
    process_slot_outcomes: IntCounterVec,
    score_persistence_failures: IntCounterVec,
    block_scores: IntGaugeVec,

    // Chain state
    chain_state_window_slots: IntGaugeVec,

    // Head updates
    head_update_times: HistogramVec,
    head_update_errors: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Overview
            live: IntGauge::new("IS_LIVE", "Block scorer status")?,
            last_processed_slot: IntGaugeVec::new(
                opts!(
                    "SCORER_LAST_PROCESSED_SLOT",
                    "Last slot whose proposal was processed"
                ),
                &["label"],
            )?,

            // Proposal pipeline
            block_proposal_times: HistogramVec::new(
                histogram_opts!(
                    "SCORER_BLOCK_PROPOSAL_TIMES",
                    "Time taken by the beacon node to produce a block proposal",
                    PROPOSAL_TIME_BUCKETS.to_vec()
                ),
                &["label"],
            )?,
            process_slot_outcomes: IntCounterVec::new(
                opts!(
                    "SCORER_PROCESS_SLOT_OUTCOMES",
                    "Number of processed slots by outcome"
                ),
                &["label", "outcome"],
            )?,
            score_persistence_failures: IntCounterVec::new(
                opts!(
                    "SCORER_SCORE_PERSISTENCE_FAILURES",
                    "Number of scores that could not be persisted"
                ),
                &["label"],
            )?,
            block_scores: IntGaugeVec::new(
                opts!("SCORER_BLOCK_SCORE", "Score of the last scored proposal"),
                &["label"],
            )?,

            // Chain state
            chain_state_window_slots: IntGaugeVec::new(
                opts!(
                    "SCORER_CHAIN_STATE_WINDOW_SLOTS",
                    "Number of slots currently retained in chain state history"
                ),
                &["label", "kind"],
            )?,

            // Head updates
            head_update_times: HistogramVec::new(
                histogram_opts!(
                    "SCORER_HEAD_UPDATE_TIMES",
                    "Time spent ingesting new heads while holding chain state"
                ),
                &["label"],
            )?,
            head_update_errors: IntCounterVec::new(
                opts!(
                    "SCORER_HEAD_UPDATE_ERRORS",
                    "Number of head updates that failed to read from the beacon node"
                ),
                &["label"],
            )?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        let default_registry = prometheus::default_registry();

        default_registry.register(Box::new(self.live.clone()))?;
        default_registry.register(Box::new(self.last_processed_slot.clone()))?;
        default_registry.register(Box::new(self.block_proposal_times.clone()))?;
        default_registry.register(Box::new(self.process_slot_outcomes.clone()))?;
        default_registry.register(Box::new(self.score_persistence_failures.clone()))?;
        default_registry.register(Box::new(self.block_scores.clone()))?;
        default_registry.register(Box::new(self.chain_state_window_slots.clone()))?;
        default_registry.register(Box::new(self.head_update_times.clone()))?;
        default_registry.register(Box::new(self.head_update_errors.clone()))?;

        Ok(())
    }

    // Overview
    pub fn set_live(&self) {
        self.live.set(1)
    }

    pub fn set_last_processed_slot(&self, label: &str, slot: u64) {
        match self.last_processed_slot.get_metric_with_label_values(&[label]) {
            Ok(gauge) => gauge.set(i64::try_from(slot).unwrap_or(i64::MAX)),
            Err(error) => warn!("unable to track last processed slot for {label}: {error:?}"),
        }
    }

    // Proposal pipeline
    pub fn observe_block_proposal_time(&self, label: &str, duration: Duration) {
        match self.block_proposal_times.get_metric_with_label_values(&[label]) {
            Ok(histogram) => histogram.observe(duration.as_secs_f64()),
            Err(error) => warn!("unable to track block proposal time for {label}: {error:?}"),
        }
    }

    pub fn register_process_slot_outcome(&self, label: &str, outcome: &str) {
        match self
            .process_slot_outcomes
            .get_metric_with_label_values(&[label, outcome])
        {
            Ok(counter) => counter.inc(),
            Err(error) => {
                warn!("unable to register process slot outcome {outcome} for {label}: {error:?}")
            }
        }
    }

    pub fn register_score_persistence_failure(&self, label: &str) {
        match self
            .score_persistence_failures
            .get_metric_with_label_values(&[label])
        {
            Ok(counter) => counter.inc(),
            Err(error) => {
                warn!("unable to register score persistence failure for {label}: {error:?}")
            }
        }
    }

    pub fn set_block_score(&self, label: &str, score: u64) {
        match self.block_scores.get_metric_with_label_values(&[label]) {
            Ok(gauge) => gauge.set(i64::try_from(score).unwrap_or(i64::MAX)),
            Err(error) => warn!("unable to track block score for {label}: {error:?}"),
        }
    }

    // Chain state
    pub fn set_chain_state_window_slots(&self, label: &str, kind: &str, slots: usize) {
        match self
            .chain_state_window_slots
            .get_metric_with_label_values(&[label, kind])
        {
            Ok(gauge) => gauge.set(i64::try_from(slots).unwrap_or(i64::MAX)),
            Err(error) => {
                warn!("unable to track chain state window size ({kind}) for {label}: {error:?}")
            }
        }
    }

    // Head updates
    pub fn observe_head_update_time(&self, label: &str, duration: Duration) {
        match self.head_update_times.get_metric_with_label_values(&[label]) {
            Ok(histogram) => histogram.observe(duration.as_secs_f64()),
            Err(error) => warn!("unable to track head update time for {label}: {error:?}"),
        }
    }

    pub fn register_head_update_error(&self, label: &str) {
        match self.head_update_errors.get_metric_with_label_values(&[label]) {
            Ok(counter) => counter.inc(),
            Err(error) => warn!("unable to register head update error for {label}: {error:?}"),
        }
    }
}
