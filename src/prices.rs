use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::RangeBounds;

/// Observed minimum inclusion price and timestamp of each known block.
/// Block numbers can be sparse, a missing block is simply absent from the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    prices: BTreeMap<u64, u64>,
    timestamps: BTreeMap<u64, DateTime<Utc>>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_price(&mut self, block_number: u64, price: u64) {
        self.prices.insert(block_number, price);
    }

    pub fn insert_timestamp(&mut self, block_number: u64, timestamp: DateTime<Utc>) {
        self.timestamps.insert(block_number, timestamp);
    }

    pub fn price(&self, block_number: u64) -> Option<u64> {
        self.prices.get(&block_number).copied()
    }

    pub fn timestamp(&self, block_number: u64) -> Option<DateTime<Utc>> {
        self.timestamps.get(&block_number).copied()
    }

    /// Known prices strictly before `block_number`, newest first.
    pub fn prices_before(&self, block_number: u64) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.prices
            .range(..block_number)
            .rev()
            .map(|(block, price)| (*block, *price))
    }

    /// Known prices whose block falls in `blocks`, oldest first.
    pub fn prices_in<R>(&self, blocks: R) -> impl Iterator<Item = (u64, u64)> + '_
    where
        R: RangeBounds<u64>,
    {
        self.prices
            .range(blocks)
            .map(|(block, price)| (*block, *price))
    }

    pub fn first_block(&self) -> Option<u64> {
        self.prices.keys().next().copied()
    }

    pub fn last_block(&self) -> Option<u64> {
        self.prices.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(u64, u64)> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
            timestamps: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_series_bounds() {
        let series: PriceSeries = [(10, 5), (12, 7), (11, 0)].into_iter().collect();

        assert_eq!(series.first_block(), Some(10));
        assert_eq!(series.last_block(), Some(12));
        assert_eq!(series.price(11), Some(0));
        assert_eq!(series.price(13), None);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_prices_before_is_newest_first() {
        let series: PriceSeries = [(1, 10), (3, 30), (4, 40)].into_iter().collect();
        let before: Vec<_> = series.prices_before(4).collect();
        assert_eq!(before, vec![(3, 30), (1, 10)]);
        assert_eq!(series.prices_before(1).count(), 0);
    }

    #[test]
    fn test_prices_in_skips_missing_blocks() {
        let series: PriceSeries = [(1, 10), (3, 30), (4, 40)].into_iter().collect();
        let inside: Vec<_> = series.prices_in(2..=4).collect();
        assert_eq!(inside, vec![(3, 30), (4, 40)]);
    }

    #[test]
    fn test_empty_series() {
        let series = PriceSeries::new();
        assert!(series.is_empty());
        assert_eq!(series.first_block(), None);
        assert_eq!(series.last_block(), None);
    }
}
