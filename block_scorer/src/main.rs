use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context as _, Result};
use beacon_api::BeaconNodeClient;
use clap::{Error as ClapError, Parser as _};
use pipeline::{
    AttestationScorer, JsonLinesScoreSink, LoggingScoreSink, ObservabilitySink, ScoreSink, Scorer,
};
use prometheus_metrics::{Metrics, METRICS};
use reqwest::ClientBuilder;
use tokio::{runtime::Builder, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument as _};

use crate::{
    consts::USER_AGENT,
    metrics_server::run_metrics_server,
    scheduler::{Components, SlotScheduler},
    scorer_args::ScorerArgs,
    scorer_config::ScorerConfig,
};

mod consts;
mod metrics_server;
mod scheduler;
mod scorer_args;
mod scorer_config;
mod slot_clock;

fn main() -> ExitCode {
    if let Err(error) = try_main() {
        error.downcast_ref().map(ClapError::exit);
        error!("{error:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    let config = ScorerArgs::try_parse()?
        .try_into_config()
        .map_err(ScorerArgs::clap_error)?;

    binary_utils::initialize_tracing_logger(module_path!(), config.log_level)?;

    info!("starting block scorer");
    config.report();

    // This is roughly what `#[tokio::main]` expands to.
    Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: ScorerConfig) -> Result<()> {
    let ScorerConfig {
        endpoints,
        output,
        request_timeout,
        gate_timeout,
        seconds_per_slot,
        metrics_server_config,
        ..
    } = config;

    let cancellation = CancellationToken::new();

    let metrics = match metrics_server_config {
        Some(metrics_server_config) => {
            let metrics = Arc::new(Metrics::new()?);
            metrics.register_with_default_metrics()?;
            METRICS.get_or_init(|| Arc::clone(&metrics));

            let server = run_metrics_server(metrics_server_config, Arc::clone(&metrics));

            tokio::spawn(async move {
                if let Err(error) = server.await {
                    error!("metrics server failed: {error:?}");
                }
            });

            Some(metrics)
        }
        None => None,
    };

    let observer = metrics.map(|metrics| -> Arc<dyn ObservabilitySink> { metrics });

    let scorer: Arc<dyn Scorer> = Arc::new(AttestationScorer);

    let components = Components {
        scorer,
        sink: score_sink(output),
        observer,
        cancellation: cancellation.clone(),
        gate_timeout,
        seconds_per_slot,
    };

    // Creating multiple `reqwest::Client`s seems to leak memory.
    // Create a single one and share it between beacon nodes.
    let client = ClientBuilder::new()
        .timeout(request_timeout)
        .user_agent(USER_AGENT)
        .build()?;

    let mut schedulers = JoinSet::new();

    for endpoint in endpoints {
        let span = info_span!("scorer", label = %endpoint.label);
        let client = Arc::new(BeaconNodeClient::new(endpoint, client.clone(), request_timeout));

        let scheduler = SlotScheduler::start(client, components.clone())
            .instrument(span.clone())
            .await?;

        schedulers.spawn(scheduler.run().instrument(span));
    }

    if let Some(metrics) = METRICS.get() {
        metrics.set_live();
    }

    let result = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("received Ctrl-C, stopping");
            Ok(())
        }
        result = join_schedulers(&mut schedulers) => result,
    };

    cancellation.cancel();

    while let Some(joined) = schedulers.join_next().await {
        if let Err(error) = joined.context("scheduler task panicked").and_then(|result| result) {
            warn!("scheduler stopped with error during shutdown: {error:?}");
        }
    }

    result
}

fn score_sink(output: Option<PathBuf>) -> Arc<dyn ScoreSink> {
    match output {
        Some(path) => Arc::new(JsonLinesScoreSink::new(path)),
        None => Arc::new(LoggingScoreSink),
    }
}

// Returns the first error. Schedulers only stop on their own after a fatal pipeline error.
async fn join_schedulers(schedulers: &mut JoinSet<Result<()>>) -> Result<()> {
    while let Some(joined) = schedulers.join_next().await {
        joined.context("scheduler task panicked")??;
    }

    Ok(())
}
