use crate::config::EvaluateConfig;
use crate::results::Summary;
use crate::types::BlockBounds;
use crate::utils::timestamped_path;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings a single simulation ran with.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig<'a> {
    #[serde(flatten)]
    pub evaluation: &'a EvaluateConfig,
    pub bounds: BlockBounds,
    /// Utility of this run when sweeping several values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_utility: Option<f64>,
}

impl RunConfig<'_> {
    /// Hashes (sha256) the canonical JSON of the run settings, hex encoded
    pub fn digest(&self) -> Result<String> {
        let json = serde_json::to_vec(self).context("Serializing run config")?;
        Ok(hex::encode(Sha256::digest(&json)))
    }
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    pub config_digest: String,
    pub config: RunConfig<'a>,
    pub stats: Summary,
}

impl<'a> Report<'a> {
    pub fn new(config: RunConfig<'a>, stats: Summary) -> Result<Self> {
        Ok(Self {
            generated_at: Utc::now(),
            config_digest: config.digest()?,
            config,
            stats,
        })
    }
}

/// Writes the report next to `basename`, with the current time in the file name.
pub async fn write_report(basename: &Path, report: &Report<'_>) -> Result<PathBuf> {
    let path = timestamped_path(basename);
    let bytes = serde_json::to_vec(report).context("Serializing report")?;

    debug!(
        "Writing report: {}",
        json!({ "path": path, "config_digest": report.config_digest })
    );

    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Writing report {}", path.display()))?;

    Ok(path)
}
