/*
Percentile Window Prediction (geth style)
Mirrors the gas price oracle shipped with geth: suggest a tunable percentile of the
minimum prices seen in recent blocks.

How it works: Walking backward from the block before the prediction, it collects
up to `blocks_count * 5` block prices. Empty blocks (price 0) are skipped, but only
`blocks_count / 2` of them; after that they are sampled like any other block. The
percentile of the samples is capped at MAX_PRICE and scaled by `factor`.
*/

use super::{Predictor, PredictorError, MAX_PRICE};
use crate::prices::PriceSeries;
use crate::utils::percentile_sorted;

pub const DEFAULT_PERCENTILE: f64 = 60.0;

pub struct PercentileWindowPredictor<'a> {
    prices: &'a PriceSeries,
    blocks_count: u64,
    max_blocks: usize,
    percentile: f64,
    factor: f64,
}

impl<'a> PercentileWindowPredictor<'a> {
    pub fn new(
        prices: &'a PriceSeries,
        blocks_count: u64,
        percentile: f64,
        factor: f64,
    ) -> Result<Self, PredictorError> {
        let max_blocks = blocks_count
            .checked_mul(5)
            .and_then(|blocks| usize::try_from(blocks).ok())
            .ok_or_else(|| {
                PredictorError::invalid_data(format!("blocks_count {} is too large", blocks_count))
            })?;

        Ok(Self {
            prices,
            blocks_count,
            max_blocks,
            percentile: percentile.clamp(0.0, 100.0),
            factor,
        })
    }

    fn collect_samples(&self, block_number: u64) -> Vec<f64> {
        let mut max_empty = self.blocks_count / 2;
        let mut samples = Vec::with_capacity(self.max_blocks.min(self.prices.len()));

        for (_, price) in self.prices.prices_before(block_number) {
            if samples.len() >= self.max_blocks {
                break;
            }

            if price == 0 && max_empty > 0 {
                max_empty -= 1;
                continue;
            }

            samples.push(price as f64);
        }

        samples
    }
}

impl Predictor for PercentileWindowPredictor<'_> {
    fn predict_price(&mut self, block_number: u64) -> Result<u64, PredictorError> {
        let mut samples = self.collect_samples(block_number);
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let suggested = percentile_sorted(&samples, self.percentile).ok_or_else(|| {
            PredictorError::insufficient_data(format!(
                "PercentileWindow predictor found no prices before block {}",
                block_number
            ))
        })?;

        let suggested = (suggested as u64).min(MAX_PRICE);

        Ok((suggested as f64 * self.factor) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u64 = 1_000_000_000;

    fn fixture() -> PriceSeries {
        [2, 1, 1, 2, 3]
            .iter()
            .enumerate()
            .map(|(i, price)| (100 + i as u64, price * GWEI))
            .collect()
    }

    #[test]
    fn test_percentiles_of_recent_blocks() {
        let prices = fixture();

        for (percentile, expected) in [(60.0, 2 * GWEI), (100.0, 3 * GWEI), (20.0, GWEI)] {
            let mut predictor =
                PercentileWindowPredictor::new(&prices, 1, percentile, 1.0).unwrap();
            assert_eq!(
                predictor.predict_price(105).unwrap(),
                expected,
                "percentile {}",
                percentile
            );
        }
    }

    #[test]
    fn test_only_looks_at_max_blocks() {
        // blocks_count 1 -> 5 samples, the 100 gwei block is out of reach
        let mut prices = fixture();
        prices.insert_price(99, 100 * GWEI);

        let mut predictor = PercentileWindowPredictor::new(&prices, 1, 100.0, 1.0).unwrap();
        assert_eq!(predictor.predict_price(105).unwrap(), 3 * GWEI);
    }

    #[test]
    fn test_skips_limited_number_of_empty_blocks() {
        // blocks_count 4 -> 20 samples, 2 empty blocks may be skipped
        let prices: PriceSeries = [(0, 8), (1, 0), (2, 0), (3, 0), (4, 4), (5, 0)]
            .into_iter()
            .collect();
        let predictor = PercentileWindowPredictor::new(&prices, 4, 0.0, 1.0).unwrap();

        assert_eq!(predictor.collect_samples(6), vec![4.0, 0.0, 0.0, 8.0]);
    }

    #[test]
    fn test_minimum_percentile_avoids_empty_blocks_within_budget() {
        let prices: PriceSeries = [(0, 8), (1, 0), (2, 5)].into_iter().collect();
        let mut predictor = PercentileWindowPredictor::new(&prices, 2, 0.0, 1.0).unwrap();

        assert_eq!(predictor.predict_price(3).unwrap(), 5);
    }

    #[test]
    fn test_gaps_are_not_samples() {
        let prices: PriceSeries = [(10, 4), (20, 6)].into_iter().collect();
        let mut predictor = PercentileWindowPredictor::new(&prices, 1, 50.0, 1.0).unwrap();

        assert_eq!(predictor.predict_price(30).unwrap(), 5);
    }

    #[test]
    fn test_clamps_to_max_price_before_factor() {
        let prices: PriceSeries = [(0, 2 * MAX_PRICE)].into_iter().collect();
        let mut predictor = PercentileWindowPredictor::new(&prices, 1, 50.0, 1.5).unwrap();

        assert_eq!(predictor.predict_price(1).unwrap(), MAX_PRICE / 2 * 3);
    }

    #[test]
    fn test_percentile_is_clamped() {
        let prices = fixture();
        let mut predictor = PercentileWindowPredictor::new(&prices, 1, 250.0, 1.0).unwrap();

        assert_eq!(predictor.predict_price(105).unwrap(), 3 * GWEI);
    }

    #[test]
    fn test_no_history_is_an_error() {
        let prices = fixture();
        let mut predictor = PercentileWindowPredictor::new(&prices, 1, 60.0, 1.0).unwrap();

        let result = predictor.predict_price(100);

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("no prices before block 100"));
    }

    #[test]
    fn test_oversized_blocks_count_is_rejected() {
        let prices = fixture();

        let result = PercentileWindowPredictor::new(&prices, u64::MAX, 60.0, 1.0);

        assert!(matches!(result, Err(PredictorError::InvalidData { .. })));
    }
}
