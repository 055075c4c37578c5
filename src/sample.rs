/*
Synthetic price feed
A sine wave over the requested price range with uniform noise, one block every
14 seconds and a small share of empty blocks. Forecasts, when requested, are the
sorted prices of the blocks following each forecast time, so the model predictor
has something sensible to read.
*/

use crate::blocks::{BlockRecord, MinPriceTransaction};
use crate::config::SampleConfig;
use crate::forecasts::ForecastEntry;
use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::info;

const BLOCK_TIME_SECONDS: i64 = 14;
const WEI_PER_GWEI: f64 = 1_000_000_000.0;

/// Blocks between two forecasts and blocks covered by each forecast.
const FORECAST_INTERVAL: usize = 20;
const FORECAST_HORIZON: usize = 40;

pub fn generate_blocks(config: &SampleConfig) -> Result<Vec<BlockRecord>> {
    if config.min_gwei < 0.0 || config.max_gwei < config.min_gwei {
        return Err(anyhow!(
            "Invalid price range {} - {} gwei",
            config.min_gwei,
            config.max_gwei
        ));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let range = config.max_gwei - config.min_gwei;
    let length = config.blocks.max(1) as f64;

    let blocks = (0..config.blocks)
        .map(|i| {
            let phase = 2.0 * PI * config.cycles * i as f64 / length;
            let wave = (phase.sin() + 1.0) / 2.0;
            let noise = rng.random_range(-1.0..=1.0) * config.noise;
            let gwei = config.min_gwei + (wave + noise).clamp(0.0, 1.0) * range;

            let gas_price = if rng.random_bool(config.empty_ratio.clamp(0.0, 1.0)) {
                0
            } else {
                (gwei * WEI_PER_GWEI).round() as u64
            };

            BlockRecord {
                block_number: config.first_block + i,
                timestamp: Some(config.start_timestamp + i as i64 * BLOCK_TIME_SECONDS),
                min_price_tx: Some(MinPriceTransaction { gas_price }),
            }
        })
        .collect();

    Ok(blocks)
}

pub fn forecasts_from_blocks(blocks: &[BlockRecord]) -> Result<Vec<ForecastEntry>> {
    blocks
        .iter()
        .enumerate()
        .step_by(FORECAST_INTERVAL)
        .filter(|(i, _)| i + FORECAST_HORIZON < blocks.len())
        .map(|(i, block)| {
            let timestamp = block
                .timestamp
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
                .ok_or(anyhow!("Block {} has no timestamp", block.block_number))?;

            let mut distribution: Vec<f64> = blocks[i + 1..=i + FORECAST_HORIZON]
                .iter()
                .filter_map(|b| b.min_price_tx.as_ref())
                .map(|tx| tx.gas_price as f64)
                .collect();
            distribution.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            Ok(ForecastEntry {
                timestamp,
                distribution,
            })
        })
        .collect()
}

pub async fn run_generate_sample(config: &SampleConfig) -> Result<()> {
    let blocks = generate_blocks(config)?;

    let mut lines = String::new();
    for block in &blocks {
        lines.push_str(&serde_json::to_string(block).context("Serializing block record")?);
        lines.push('\n');
    }

    tokio::fs::write(&config.output, lines)
        .await
        .with_context(|| format!("Writing {}", config.output.display()))?;

    info!(blocks = blocks.len(), path = %config.output.display(), "Wrote sample prices");

    if let Some(path) = &config.forecasts_output {
        let forecasts = forecasts_from_blocks(&blocks)?;
        let json = serde_json::to_vec(&forecasts).context("Serializing forecasts")?;

        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Writing {}", path.display()))?;

        info!(entries = forecasts.len(), path = %path.display(), "Wrote sample forecasts");
    }

    Ok(())
}
