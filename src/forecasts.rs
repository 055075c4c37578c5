use crate::predictors::PredictorError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A forecast distribution produced by the price model at a point in time.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ForecastEntry {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub distribution: Vec<f64>,
}

/// Forecast distributions sorted by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    timestamps: Vec<DateTime<Utc>>,
    distributions: Vec<Vec<f64>>,
}

impl ForecastSeries {
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        distributions: Vec<Vec<f64>>,
    ) -> Result<Self, PredictorError> {
        if timestamps.len() != distributions.len() {
            return Err(PredictorError::invalid_data(format!(
                "Forecast series has {} timestamps but {} distributions",
                timestamps.len(),
                distributions.len()
            )));
        }

        if timestamps.is_empty() {
            return Err(PredictorError::missing_data(
                "Forecast series requires at least one entry",
            ));
        }

        if timestamps.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(PredictorError::invalid_data(
                "Forecast timestamps must be sorted ascending",
            ));
        }

        if let Some(index) = distributions.iter().position(|d| d.is_empty()) {
            return Err(PredictorError::invalid_data(format!(
                "Forecast distribution at index {} is empty",
                index
            )));
        }

        Ok(Self {
            timestamps,
            distributions,
        })
    }

    pub fn from_entries(entries: Vec<ForecastEntry>) -> Result<Self, PredictorError> {
        let (timestamps, distributions) = entries
            .into_iter()
            .map(|entry| (entry.timestamp, entry.distribution))
            .unzip();

        Self::new(timestamps, distributions)
    }

    /// Index of the latest forecast whose timestamp is not after `timestamp`.
    pub fn index_at(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.timestamps
            .partition_point(|forecast_time| *forecast_time <= timestamp)
            .checked_sub(1)
    }

    pub fn distribution(&self, index: usize) -> Option<&[f64]> {
        self.distributions.get(index).map(Vec::as_slice)
    }

    pub fn distributions(&self) -> &[Vec<f64>] {
        &self.distributions
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
}

pub async fn load_forecasts(path: &Path) -> Result<ForecastSeries> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Reading forecasts {}", path.display()))?;

    let entries: Vec<ForecastEntry> =
        serde_json::from_str(&content).context("Parsing forecast entries")?;

    let series = ForecastSeries::from_entries(entries).context("Validating forecast series")?;

    info!(entries = series.len(), "Loaded forecast series");

    Ok(series)
}
