use core::{net::SocketAddr, num::NonZeroU64, time::Duration};
use std::path::PathBuf;

use beacon_api::BeaconEndpoint;
use itertools::Itertools as _;
use tracing::{info, level_filters::LevelFilter};

use crate::metrics_server::MetricsServerConfig;

#[cfg_attr(test, derive(Debug))]
pub struct ScorerConfig {
    pub endpoints: Vec<BeaconEndpoint>,
    pub output: Option<PathBuf>,
    pub log_level: LevelFilter,
    pub request_timeout: Duration,
    pub gate_timeout: Duration,
    pub seconds_per_slot: NonZeroU64,
    pub metrics_server_config: Option<MetricsServerConfig>,
}

impl ScorerConfig {
    pub fn report(&self) {
        let Self {
            endpoints,
            output,
            log_level,
            request_timeout,
            gate_timeout,
            seconds_per_slot,
            metrics_server_config,
        } = self;

        info!("beacon nodes: [{}]", endpoints.iter().format(", "));

        match output {
            Some(path) => info!("appending scores to {path:?}"),
            None => info!("scores are only logged"),
        }

        info!("log level: {log_level}");
        info!("request timeout: {request_timeout:?}");
        info!("head update deadlock timeout: {gate_timeout:?}");
        info!("seconds per slot: {seconds_per_slot}");

        if let Some(metrics_server_config) = metrics_server_config {
            info!(
                "metrics server address: {}",
                SocketAddr::from(metrics_server_config),
            );
        }
    }
}
