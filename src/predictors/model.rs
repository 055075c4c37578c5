/*
Model Based Prediction
Uses the forecast distributions produced offline by the price model.

How it works: The block is mapped to its timestamp and the latest forecast made at
or before that time is selected; the suggestion is a percentile of its
distribution. When a utility is configured, every forecast also gets a trend: the
least-squares slope of the distribution values against their index, min-max scaled
over all forecasts into [-1, 1]. The percentile is then multiplied by
exp(trend) * utility, so rising forecasts push the price up for urgent users.
*/

use super::{Predictor, PredictorError};
use crate::forecasts::ForecastSeries;
use crate::prices::PriceSeries;
use crate::utils::{linear_slope, min_max_scale, percentile};
use chrono::{DateTime, Utc};

pub const DEFAULT_PERCENTILE: f64 = 20.0;

/// How far back we look for a block with a recorded timestamp.
pub const MAX_TIMESTAMP_LOOKBACK: u64 = 1024;

const TREND_RANGE: (f64, f64) = (-1.0, 1.0);

pub struct ModelPredictor<'a> {
    prices: &'a PriceSeries,
    forecasts: &'a ForecastSeries,
    percentile: f64,
    adjustment: Option<TrendAdjustment>,
}

struct TrendAdjustment {
    utility: f64,
    trends: Vec<f64>,
}

impl<'a> ModelPredictor<'a> {
    pub fn new(
        prices: &'a PriceSeries,
        forecasts: &'a ForecastSeries,
        percentile: f64,
        utility: Option<f64>,
    ) -> Self {
        let adjustment = utility.map(|utility| TrendAdjustment {
            utility,
            trends: forecast_trends(forecasts),
        });

        Self {
            prices,
            forecasts,
            percentile: percentile.clamp(0.0, 100.0),
            adjustment,
        }
    }

    fn block_timestamp(&self, block_number: u64) -> Result<DateTime<Utc>, PredictorError> {
        let oldest = block_number.saturating_sub(MAX_TIMESTAMP_LOOKBACK);

        (oldest..=block_number)
            .rev()
            .find_map(|block| self.prices.timestamp(block))
            .ok_or_else(|| {
                PredictorError::missing_data(format!(
                    "No timestamp recorded for blocks {} to {}",
                    oldest, block_number
                ))
            })
    }
}

/// Normalized slope of every forecast distribution.
fn forecast_trends(forecasts: &ForecastSeries) -> Vec<f64> {
    let slopes: Vec<f64> = forecasts
        .distributions()
        .iter()
        .map(|distribution| linear_slope(distribution))
        .collect();

    min_max_scale(&slopes, TREND_RANGE.0, TREND_RANGE.1)
}

impl Predictor for ModelPredictor<'_> {
    fn predict_price(&mut self, block_number: u64) -> Result<u64, PredictorError> {
        let timestamp = self.block_timestamp(block_number)?;

        let index = self.forecasts.index_at(timestamp).ok_or_else(|| {
            PredictorError::missing_data(format!(
                "Block {} at {} precedes every forecast",
                block_number, timestamp
            ))
        })?;

        let distribution = self.forecasts.distribution(index).ok_or_else(|| {
            PredictorError::missing_data(format!("No forecast distribution at index {}", index))
        })?;

        let mut price = percentile(distribution, self.percentile).ok_or_else(|| {
            PredictorError::insufficient_data(format!(
                "Forecast distribution at index {} is empty",
                index
            ))
        })?;

        if let Some(TrendAdjustment { utility, trends }) = &self.adjustment {
            price *= trends[index].exp() * utility;
        }

        Ok(price.round().max(0.0) as u64)
    }
}
