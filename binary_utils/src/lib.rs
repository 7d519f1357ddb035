use std::io::{self, IsTerminal as _};

use anyhow::Result;
use chrono::{Local, SecondsFormat};
use tracing::debug;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::Writer, time::FormatTime},
    prelude::*,
    EnvFilter,
};

pub const LOG_ENV_VARIABLE: &str = "BLOCK_SCORER_LOG";

const WORKSPACE_CRATES: &[&str] = &[
    "beacon_api",
    "binary_utils",
    "chain_state",
    "head_sync",
    "pipeline",
    "prometheus_metrics",
];

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        write!(
            w,
            "[{}]",
            Local::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Logs workspace crates and `module_path` at `log_level` to stdout.
///
/// Directives in the `BLOCK_SCORER_LOG` environment variable take precedence.
pub fn initialize_tracing_logger(module_path: &str, log_level: LevelFilter) -> Result<()> {
    let env_directives = std::env::var(LOG_ENV_VARIABLE).ok();
    let filter = build_filter(module_path, log_level, env_directives.as_deref())?;

    let stdout_layer = fmt::layer()
        .compact()
        .with_thread_ids(false)
        .with_target(true)
        .with_file(false)
        .with_line_number(true)
        .with_timer(LocalTimer)
        .with_ansi(io::stdout().is_terminal());

    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(filter))
        .try_init()?;

    debug!("tracing started");

    Ok(())
}

fn build_filter(
    module_path: &str,
    log_level: LevelFilter,
    env_directives: Option<&str>,
) -> Result<EnvFilter> {
    let mut filter = EnvFilter::default().add_directive(LevelFilter::OFF.into());

    for crate_name in WORKSPACE_CRATES.iter().chain([&module_path]) {
        filter = filter.add_directive(format!("{crate_name}={log_level}").parse()?);
    }

    let env_directives = env_directives
        .into_iter()
        .flat_map(|directives| directives.split(','))
        .map(str::trim)
        .filter(|directive| !directive.is_empty());

    for directive in env_directives {
        filter = filter.add_directive(directive.parse()?);
    }

    Ok(filter)
}
