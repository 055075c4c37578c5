use crate::forecasts::ForecastSeries;
use crate::prices::PriceSeries;
use crate::types::PredictorKind;
use clap::Args;
use clairvoyant::ClairvoyantPredictor;
use model::ModelPredictor;
use percentile::PercentileWindowPredictor;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod clairvoyant;
mod errors;
mod model;
mod percentile;

pub use errors::PredictorError;

/// Prices above this are clamped by the percentile window predictor (500 gwei).
pub const MAX_PRICE: u64 = 500_000_000_000;

/// A gas price strategy. Implementations may keep incremental state, so a
/// predictor instance serves a single simulation pass with increasing block numbers.
pub trait Predictor {
    fn predict_price(&mut self, block_number: u64) -> Result<u64, PredictorError>;
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict_price(&mut self, block_number: u64) -> Result<u64, PredictorError> {
        (**self).predict_price(block_number)
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictorSettings {
    /// Look-ahead window of the clairvoyant predictor
    #[arg(long, env = "GAS_EVAL_BLOCKS_TO_WAIT", default_value_t = 240)]
    pub blocks_to_wait: u64,

    /// Ignore window prices further than this many standard deviations below the mean
    #[arg(long, env = "GAS_EVAL_MAX_STDEVS")]
    pub max_stdevs: Option<f64>,

    /// Look-behind unit of the percentile window predictor
    #[arg(long, env = "GAS_EVAL_BLOCKS_COUNT", default_value_t = 20)]
    pub blocks_count: u64,

    /// Percentile to suggest, defaults to 60 for the window and 20 for the model
    #[arg(long, env = "GAS_EVAL_PERCENTILE")]
    pub percentile: Option<f64>,

    /// Multiplier applied to the percentile window suggestion
    #[arg(long, env = "GAS_EVAL_FACTOR", default_value_t = 1.0)]
    pub factor: f64,

    /// JSON file with the model forecast distributions
    #[arg(long, env = "GAS_EVAL_FORECASTS")]
    pub forecasts: Option<PathBuf>,

    /// Urgency values for the model predictor, one simulation per value
    #[arg(long, env = "GAS_EVAL_UTILITY", value_delimiter = ',')]
    pub utility: Vec<f64>,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            blocks_to_wait: 240,
            max_stdevs: None,
            blocks_count: 20,
            percentile: None,
            factor: 1.0,
            forecasts: None,
            utility: Vec::new(),
        }
    }
}

/// Builds a fresh predictor for one simulation run.
pub fn build_predictor<'a>(
    kind: &PredictorKind,
    settings: &PredictorSettings,
    prices: &'a PriceSeries,
    forecasts: Option<&'a ForecastSeries>,
    utility: Option<f64>,
) -> Result<Box<dyn Predictor + Send + 'a>, PredictorError> {
    match kind {
        PredictorKind::Clairvoyant => Ok(Box::new(ClairvoyantPredictor::new(
            prices,
            settings.blocks_to_wait,
            settings.max_stdevs,
        ))),
        PredictorKind::PercentileWindow => Ok(Box::new(PercentileWindowPredictor::new(
            prices,
            settings.blocks_count,
            settings.percentile.unwrap_or(percentile::DEFAULT_PERCENTILE),
            settings.factor,
        )?)),
        PredictorKind::ModelBased => {
            let forecasts = forecasts.ok_or_else(|| {
                PredictorError::missing_data("ModelBased predictor requires a forecast series")
            })?;

            Ok(Box::new(ModelPredictor::new(
                prices,
                forecasts,
                settings.percentile.unwrap_or(model::DEFAULT_PERCENTILE),
                utility,
            )))
        }
    }
}
