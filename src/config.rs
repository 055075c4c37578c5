use crate::predictors::PredictorSettings;
use crate::types::{LogFormat, PredictorKind};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Config {
    #[arg(long, env = "GAS_EVAL_LOG_FORMAT", default_value = "json", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Replay a price feed with a predictor and write the inclusion statistics
    Evaluate(EvaluateConfig),
    /// Write a synthetic price feed, and optionally forecasts, for trying things out
    GenerateSample(SampleConfig),
}

#[derive(Args, Clone, Debug, Serialize)]
pub struct EvaluateConfig {
    /// JSON lines file with one block record per line
    #[arg(long, env = "GAS_EVAL_PRICES")]
    pub prices: PathBuf,

    #[arg(long, env = "GAS_EVAL_PREDICTOR")]
    pub predictor: PredictorKind,

    #[command(flatten)]
    pub settings: PredictorSettings,

    /// Number of blocks at the start of the feed used only as history
    #[arg(long, env = "GAS_EVAL_SKIP_START", default_value_t = 0)]
    pub skip_start: u64,

    /// Number of blocks at the end of the feed used only to include pending transactions
    #[arg(long, env = "GAS_EVAL_SKIP_END", default_value_t = 0)]
    pub skip_end: u64,

    /// The report is written next to this path with the run time appended to its name
    #[arg(long, env = "GAS_EVAL_OUTPUT", default_value = "stats.json")]
    pub output: PathBuf,
}

#[derive(Args, Clone, Debug, Serialize)]
pub struct SampleConfig {
    #[arg(long, env = "GAS_EVAL_SAMPLE_OUTPUT", default_value = "sample-prices.jsonl")]
    pub output: PathBuf,

    /// Also write forecasts built from the upcoming block prices
    #[arg(long, env = "GAS_EVAL_SAMPLE_FORECASTS")]
    pub forecasts_output: Option<PathBuf>,

    #[arg(long, default_value_t = 6171)]
    pub blocks: u64,

    #[arg(long, default_value_t = 9_000_000)]
    pub first_block: u64,

    /// Unix timestamp of the first block
    #[arg(long, default_value_t = 1_579_046_400)]
    pub start_timestamp: i64,

    /// Number of sine cycles over the whole sample
    #[arg(long, default_value_t = 20.0)]
    pub cycles: f64,

    /// Lowest and highest generated price, in gwei
    #[arg(long, default_value_t = 1.0)]
    pub min_gwei: f64,

    #[arg(long, default_value_t = 40.0)]
    pub max_gwei: f64,

    /// Noise amplitude relative to the price range
    #[arg(long, default_value_t = 0.1)]
    pub noise: f64,

    /// Share of blocks without transactions
    #[arg(long, default_value_t = 0.02)]
    pub empty_ratio: f64,

    #[arg(long)]
    pub seed: Option<u64>,
}
