/*
Clairvoyant Prediction
This predictor cheats: it looks at the prices of the blocks that follow the
transaction and suggests the lowest one reachable within `blocks_to_wait` blocks.

How it works: The window (block, block + blocks_to_wait] is kept as an ordered
multiset that slides forward with each call, so each prediction costs O(log n)
instead of a rescan. Calls may skip blocks but never go back. It is the theoretical best case for a user willing
to wait at most `blocks_to_wait` blocks.

With `max_stdevs` set, rolling sums give the window mean and standard deviation
and the suggestion becomes the lowest price not further than `max_stdevs`
deviations below the mean, so a single outlier block does not define the target.
*/

use super::{Predictor, PredictorError};
use crate::prices::PriceSeries;
use std::collections::BTreeMap;

/// Ordered multiset of the prices currently inside the window, with running sums.
#[derive(Debug, Default)]
struct PriceWindow {
    counts: BTreeMap<u64, usize>,
    len: usize,
    sum: u128,
    sum_of_squares: u128,
}

impl PriceWindow {
    fn add(&mut self, price: u64) {
        *self.counts.entry(price).or_insert(0) += 1;
        self.len += 1;
        self.sum += price as u128;
        self.sum_of_squares += price as u128 * price as u128;
    }

    fn remove(&mut self, price: u64) {
        let Some(count) = self.counts.get_mut(&price) else {
            return;
        };

        *count -= 1;
        if *count == 0 {
            self.counts.remove(&price);
        }

        self.len -= 1;
        self.sum -= price as u128;
        self.sum_of_squares -= price as u128 * price as u128;
    }

    fn min(&self) -> Option<u64> {
        self.counts.keys().next().copied()
    }

    /// Smallest price in the window that is >= `bound`.
    fn min_at_least(&self, bound: f64) -> Option<u64> {
        let floor = if bound <= 0.0 {
            0
        } else if bound >= u64::MAX as f64 {
            return None;
        } else {
            bound.ceil() as u64
        };

        self.counts.range(floor..).next().map(|(price, _)| *price)
    }

    /// Population mean and standard deviation.
    fn mean_and_stdev(&self) -> Option<(f64, f64)> {
        if self.len == 0 {
            return None;
        }

        let n = self.len as f64;
        let mean = self.sum as f64 / n;
        let variance = (self.sum_of_squares as f64 / n - mean * mean).max(0.0);

        Some((mean, variance.sqrt()))
    }
}

pub struct ClairvoyantPredictor<'a> {
    prices: &'a PriceSeries,
    blocks_to_wait: u64,
    max_stdevs: Option<f64>,
    window: PriceWindow,
    last_block: Option<u64>,
}

impl<'a> ClairvoyantPredictor<'a> {
    pub fn new(prices: &'a PriceSeries, blocks_to_wait: u64, max_stdevs: Option<f64>) -> Self {
        Self {
            prices,
            blocks_to_wait,
            max_stdevs,
            window: PriceWindow::default(),
            last_block: None,
        }
    }

    fn add_blocks(&mut self, first: u64, last: u64) {
        if first > last {
            return;
        }
        for (_, price) in self.prices.prices_in(first..=last) {
            self.window.add(price);
        }
    }

    fn remove_blocks(&mut self, first: u64, last: u64) {
        if first > last {
            return;
        }
        for (_, price) in self.prices.prices_in(first..=last) {
            self.window.remove(price);
        }
    }

    /// Slides the window to (block_number, block_number + blocks_to_wait].
    /// Blocks skipped since the previous call leave the window in one step.
    fn advance_to(&mut self, block_number: u64) -> Result<(), PredictorError> {
        let window_end = block_number.checked_add(self.blocks_to_wait).ok_or_else(|| {
            PredictorError::out_of_range(
                block_number,
                format!("look-ahead of {} blocks overflows", self.blocks_to_wait),
            )
        })?;

        let last_known = self.prices.last_block().unwrap_or(0);
        if self.prices.is_empty() || window_end > last_known {
            return Err(PredictorError::out_of_range(
                block_number,
                format!(
                    "look-ahead window ends at {} but prices are known up to {}",
                    window_end, last_known
                ),
            ));
        }

        match self.last_block {
            None => self.add_blocks(block_number + 1, window_end),
            Some(last_block) if block_number > last_block => {
                // window_end <= last_known, so the previous end cannot overflow either
                let last_window_end = last_block + self.blocks_to_wait;
                self.remove_blocks(last_block + 1, block_number.min(last_window_end));
                self.add_blocks(last_window_end.max(block_number) + 1, window_end);
            }
            Some(last_block) => {
                return Err(PredictorError::OutOfOrder {
                    expected: last_block + 1,
                    actual: block_number,
                });
            }
        }

        self.last_block = Some(block_number);
        Ok(())
    }
}

impl Predictor for ClairvoyantPredictor<'_> {
    fn predict_price(&mut self, block_number: u64) -> Result<u64, PredictorError> {
        self.advance_to(block_number)?;

        let Some(max_stdevs) = self.max_stdevs else {
            return self.window.min().ok_or_else(|| {
                PredictorError::insufficient_data(format!(
                    "No prices known in the {} blocks after block {}",
                    self.blocks_to_wait, block_number
                ))
            });
        };

        let (mean, stdev) = self.window.mean_and_stdev().ok_or_else(|| {
            PredictorError::insufficient_data(format!(
                "No prices known in the {} blocks after block {}",
                self.blocks_to_wait, block_number
            ))
        })?;

        let bound = mean - max_stdevs * stdev;

        self.window
            .min_at_least(bound)
            .ok_or(PredictorError::NoQualifyingPrice { bound, mean, stdev })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn series(prices: &[u64]) -> PriceSeries {
        prices
            .iter()
            .enumerate()
            .map(|(block, price)| (block as u64, *price))
            .collect()
    }

    #[test]
    fn test_minimum_of_future_window() {
        let prices = series(&[5, 7, 8, 5, 6, 2, 4]);
        let mut predictor = ClairvoyantPredictor::new(&prices, 4, None);

        assert_eq!(predictor.predict_price(0).unwrap(), 5);
        assert_eq!(predictor.predict_price(1).unwrap(), 2);
        assert_eq!(predictor.predict_price(2).unwrap(), 2);
    }

    #[test]
    fn test_incremental_window_matches_naive_minimum() {
        let mut rng = StdRng::seed_from_u64(7);

        for blocks_to_wait in [1_u64, 3, 10, 25] {
            let raw: Vec<u64> = (0..300).map(|_| rng.random_range(0..50)).collect();
            let prices = series(&raw);
            let mut predictor = ClairvoyantPredictor::new(&prices, blocks_to_wait, None);

            let start = 17;
            let last = raw.len() as u64 - 1 - blocks_to_wait;
            for block in start..=last {
                let naive = (block + 1..=block + blocks_to_wait)
                    .map(|b| raw[b as usize])
                    .min()
                    .unwrap();
                assert_eq!(predictor.predict_price(block).unwrap(), naive);
            }
        }
    }

    #[test]
    fn test_window_skips_missing_blocks() {
        let prices: PriceSeries = [(0, 9), (1, 8), (3, 4), (4, 6), (5, 7)]
            .into_iter()
            .collect();
        let mut predictor = ClairvoyantPredictor::new(&prices, 2, None);

        assert_eq!(predictor.predict_price(0).unwrap(), 8);
        assert_eq!(predictor.predict_price(1).unwrap(), 4);
        assert_eq!(predictor.predict_price(2).unwrap(), 4);
        assert_eq!(predictor.predict_price(3).unwrap(), 6);
    }

    #[test]
    fn test_empty_window_is_an_error() {
        let prices: PriceSeries = [(0, 9), (5, 7)].into_iter().collect();
        let mut predictor = ClairvoyantPredictor::new(&prices, 2, None);

        let result = predictor.predict_price(0);

        assert!(matches!(result, Err(PredictorError::InsufficientData { .. })));
    }

    #[test]
    fn test_backward_or_repeated_calls_are_rejected() {
        let prices = series(&[5, 7, 8, 5, 6, 2, 4]);
        let mut predictor = ClairvoyantPredictor::new(&prices, 2, None);

        predictor.predict_price(2).unwrap();

        assert_eq!(
            predictor.predict_price(2),
            Err(PredictorError::OutOfOrder {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            predictor.predict_price(1),
            Err(PredictorError::OutOfOrder {
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn test_skipped_calls_match_naive_minimum() {
        let mut rng = StdRng::seed_from_u64(11);

        for blocks_to_wait in [1_u64, 4, 12] {
            let raw: Vec<u64> = (0..200).map(|_| rng.random_range(0..50)).collect();
            let prices: PriceSeries = raw
                .iter()
                .enumerate()
                .filter(|(block, _)| block % 7 != 3)
                .map(|(block, price)| (block as u64, *price))
                .collect();
            let mut predictor = ClairvoyantPredictor::new(&prices, blocks_to_wait, None);

            let last = prices.last_block().unwrap() - blocks_to_wait;
            let mut block = 0;
            while block <= last {
                let naive = (block + 1..=block + blocks_to_wait)
                    .filter_map(|b| prices.price(b))
                    .min();
                assert_eq!(predictor.predict_price(block).ok(), naive, "block {}", block);
                // jumps both shorter and longer than the window
                block += rng.random_range(1..=2 * blocks_to_wait + 2);
            }
        }
    }

    #[test]
    fn test_overflowing_window_is_out_of_range() {
        let prices = series(&[5, 7, 8]);
        let mut predictor = ClairvoyantPredictor::new(&prices, u64::MAX, None);

        let result = predictor.predict_price(1);

        assert!(matches!(result, Err(PredictorError::OutOfRange { .. })));
    }

    #[test]
    fn test_window_past_known_prices_is_rejected() {
        let prices = series(&[5, 7, 8]);
        let mut predictor = ClairvoyantPredictor::new(&prices, 4, None);

        let result = predictor.predict_price(0);

        assert!(matches!(result, Err(PredictorError::OutOfRange { .. })));
    }

    #[test]
    fn test_max_stdevs_ignores_outlier() {
        // window after block 0: 100, 100, 100, 100, 1
        let prices = series(&[50, 100, 100, 100, 100, 1]);
        let mut predictor = ClairvoyantPredictor::new(&prices, 5, Some(1.0));

        // mean 80.2, stdev 39.6, bound 40.6
        assert_eq!(predictor.predict_price(0).unwrap(), 100);
    }

    #[test]
    fn test_max_stdevs_tracks_sliding_window() {
        let prices = series(&[0, 10, 20, 30, 40, 50, 60]);
        let mut predictor = ClairvoyantPredictor::new(&prices, 3, Some(0.0));

        // bound is the window mean
        assert_eq!(predictor.predict_price(0).unwrap(), 20);
        assert_eq!(predictor.predict_price(1).unwrap(), 30);
        assert_eq!(predictor.predict_price(2).unwrap(), 40);
        assert_eq!(predictor.predict_price(3).unwrap(), 50);
    }

    #[test]
    fn test_max_stdevs_without_qualifying_price() {
        let prices = series(&[0, 10, 20, 30]);
        let mut predictor = ClairvoyantPredictor::new(&prices, 3, Some(-5.0));

        let result = predictor.predict_price(0);

        assert!(matches!(
            result,
            Err(PredictorError::NoQualifyingPrice { .. })
        ));
    }

    #[test]
    fn test_price_window_removes_single_occurrence() {
        let mut window = PriceWindow::default();
        window.add(3);
        window.add(3);
        window.add(5);
        window.remove(3);

        assert_eq!(window.min(), Some(3));
        assert_eq!(window.len, 2);
        assert_eq!(window.sum, 8);

        window.remove(3);
        assert_eq!(window.min(), Some(5));
        assert_eq!(window.mean_and_stdev(), Some((5.0, 0.0)));
    }
}
