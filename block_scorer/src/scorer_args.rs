use core::{
    fmt::Display,
    net::{IpAddr, Ipv4Addr},
    num::NonZeroU64,
    time::Duration,
};
use std::path::PathBuf;

use anyhow::{bail, ensure, Result};
use beacon_api::BeaconEndpoint;
use clap::{error::ErrorKind, Args, CommandFactory as _, Error as ClapError, Parser};
use itertools::Itertools as _;
use tracing::level_filters::LevelFilter;

use crate::{
    consts::{
        APPLICATION_NAME, APPLICATION_VERSION, DEFAULT_GATE_TIMEOUT, DEFAULT_METRICS_PORT,
        DEFAULT_REQUEST_TIMEOUT, DEFAULT_SECONDS_PER_SLOT,
    },
    metrics_server::MetricsServerConfig,
    scorer_config::ScorerConfig,
};

/// Scores the block proposals produced by beacon nodes
#[derive(Parser)]
#[clap(display_name = APPLICATION_NAME, version = APPLICATION_VERSION)]
pub struct ScorerArgs {
    /// Beacon nodes to score, written as `label/url` and separated by commas
    #[clap(long, required = true, value_delimiter = ',')]
    bn_endpoints: Vec<BeaconEndpoint>,

    /// File to append scores to, one JSON object per line
    #[clap(long)]
    output: Option<PathBuf>,

    /// Log level of workspace crates
    #[clap(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    #[clap(flatten)]
    timing_options: TimingOptions,

    #[clap(flatten)]
    metrics_options: MetricsOptions,
}

#[derive(Args)]
struct TimingOptions {
    /// Timeout for Beacon Node API requests in milliseconds
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT)]
    request_timeout: u64,

    /// Time in seconds the head update may take to accept chain state before scoring stops
    #[clap(long, default_value_t = DEFAULT_GATE_TIMEOUT)]
    gate_timeout: u64,

    /// Slot duration of the scored chain
    #[clap(long, default_value_t = DEFAULT_SECONDS_PER_SLOT)]
    seconds_per_slot: NonZeroU64,
}

#[derive(Args)]
struct MetricsOptions {
    /// Collect Prometheus metrics
    #[clap(long)]
    metrics: bool,

    /// Metrics address for metrics endpoint
    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    metrics_address: IpAddr,

    /// Listen port for metrics endpoint
    #[clap(long, default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,
}

impl ScorerArgs {
    pub fn try_into_config(self) -> Result<ScorerConfig> {
        let Self {
            bn_endpoints,
            output,
            log_level,
            timing_options,
            metrics_options,
        } = self;

        let TimingOptions {
            request_timeout,
            gate_timeout,
            seconds_per_slot,
        } = timing_options;

        let MetricsOptions {
            metrics,
            metrics_address,
            metrics_port,
        } = metrics_options;

        if let Some(label) = bn_endpoints
            .iter()
            .map(|endpoint| endpoint.label.as_str())
            .duplicates()
            .next()
        {
            bail!("beacon node label {label:?} is used more than once");
        }

        ensure!(request_timeout > 0, "--request-timeout must be positive");
        ensure!(gate_timeout > 0, "--gate-timeout must be positive");

        let metrics_server_config = metrics.then_some(MetricsServerConfig {
            metrics_address,
            metrics_port,
        });

        Ok(ScorerConfig {
            endpoints: bn_endpoints,
            output,
            log_level,
            request_timeout: Duration::from_millis(request_timeout),
            gate_timeout: Duration::from_secs(gate_timeout),
            seconds_per_slot,
            metrics_server_config,
        })
    }

    #[must_use]
    pub fn clap_error(message: impl Display) -> ClapError {
        Self::command().error(ErrorKind::ValueValidation, message)
    }
}
