use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use tokio::{fs::OpenOptions, io::AsyncWriteExt as _};
use tracing::info;

use crate::scoring::BlockMetrics;

#[async_trait]
pub trait ScoreSink: Send + Sync {
    async fn persist(&self, metrics: &BlockMetrics) -> Result<()>;
}

/// Used when no output is configured. Scores only end up in the log.
#[derive(Clone, Copy, Default, Debug)]
pub struct LoggingScoreSink;

#[async_trait]
impl ScoreSink for LoggingScoreSink {
    async fn persist(&self, metrics: &BlockMetrics) -> Result<()> {
        info!(
            label = %metrics.label,
            slot = metrics.slot,
            phase = %metrics.phase,
            proposer_index = metrics.proposer_index,
            score = metrics.score.score,
            "block score: {:?}",
            metrics.score,
        );

        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Clone, Debug)]
pub struct JsonLinesScoreSink {
    path: PathBuf,
}

impl JsonLinesScoreSink {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ScoreSink for JsonLinesScoreSink {
    async fn persist(&self, metrics: &BlockMetrics) -> Result<()> {
        let mut line = serde_json::to_vec(metrics)?;

        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open score file {}", self.path.display()))?;

        file.write_all(&line).await?;
        file.flush().await?;

        Ok(())
    }
}
