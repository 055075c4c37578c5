use crate::prices::PriceSeries;
use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const WEI_PER_GWEI: Decimal = dec!(1000000000);

/// One line of the block price feed.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BlockRecord {
    pub block_number: u64,
    /// Unix timestamp in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price_tx: Option<MinPriceTransaction>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MinPriceTransaction {
    pub gas_price: u64,
}

/// Parses newline delimited block records into a [`PriceSeries`].
/// Later records for the same block replace earlier ones.
pub fn parse_block_records(input: &str) -> Result<PriceSeries> {
    let mut series = PriceSeries::new();

    for (line_number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: BlockRecord = serde_json::from_str(line)
            .with_context(|| format!("Parsing block record on line {}", line_number + 1))?;

        add_block_record(&mut series, record)?;
    }

    Ok(series)
}

pub fn add_block_record(series: &mut PriceSeries, record: BlockRecord) -> Result<()> {
    if let Some(min_price_tx) = record.min_price_tx {
        series.insert_price(record.block_number, min_price_tx.gas_price);
    }

    if let Some(timestamp) = record.timestamp {
        let datetime = DateTime::from_timestamp(timestamp, 0).ok_or(anyhow!(
            "Invalid timestamp {} for block {}",
            timestamp,
            record.block_number
        ))?;
        series.insert_timestamp(record.block_number, datetime);
    }

    Ok(())
}

pub async fn load_price_series(path: &Path) -> Result<PriceSeries> {
    debug!("Reading block prices from {}", path.display());

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Reading price feed {}", path.display()))?;

    let series = parse_block_records(&content)?;

    info!(
        blocks = series.len(),
        first_block = ?series.first_block(),
        last_block = ?series.last_block(),
        "Loaded price series"
    );

    Ok(series)
}

pub fn wei_to_gwei(wei: f64) -> Result<f64> {
    let wei_decimal = Decimal::from_f64(wei).ok_or(anyhow!("Failed to convert {} wei", wei))?;

    let gwei_decimal = wei_decimal / WEI_PER_GWEI;

    gwei_decimal
        .round_dp(9)
        .to_f64()
        .ok_or(anyhow!("Failed to convert wei to gwei"))
}
