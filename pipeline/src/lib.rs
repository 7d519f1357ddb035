pub use crate::{
    client::{CanonicalBlock, ChainDataClient, ChainHead, HeadDataSource},
    error::Error,
    head_updater::{HeadIngester, HeadUpdater},
    observability::{ObservabilitySink, Outcome},
    proposal_pipeline::ProposalPipeline,
    scoring::{AttestationScorer, BlockMetrics, BlockScore, Scorer, ScoringError},
    sink::{JsonLinesScoreSink, LoggingScoreSink, ScoreSink},
};

mod client;
mod error;
mod head_updater;
mod observability;
mod proposal_pipeline;
mod scoring;
mod sink;

#[cfg(test)]
mod test_utils;
