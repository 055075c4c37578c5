use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, PartialEq, Eq, EnumString, Display, Deserialize, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PredictorKind {
    /// Lowest price in the upcoming blocks, uses future data
    Clairvoyant,
    /// Percentile of recent block prices, as geth suggests gas prices
    PercentileWindow,
    /// Percentile of precomputed model forecasts
    ModelBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Deserialize, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Inclusive block range of one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockBounds {
    /// First block a transaction is submitted at
    pub start: u64,
    /// Last block a transaction is submitted at
    pub end: u64,
    /// Pending transactions are given up after this block
    pub last: u64,
}

impl std::fmt::Display for BlockBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} (final {})", self.start, self.end, self.last)
    }
}
