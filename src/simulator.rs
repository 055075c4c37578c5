use crate::predictors::{Predictor, PredictorError};
use crate::prices::PriceSeries;
use crate::results::{InclusionOutcome, ResultAggregate, SimulatedTransaction};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;
use tracing::{debug, info};

const PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid block bounds: start {start}, end {end}, final {last} must be ordered")]
    InvalidBounds { start: u64, end: u64, last: u64 },

    #[error("Prediction failed at block {block_number}: {source}")]
    Predictor {
        block_number: u64,
        #[source]
        source: PredictorError,
    },
}

/// Pending transaction ordered by submitted price, earlier submissions first on ties.
#[derive(Debug, PartialEq, Eq)]
struct PendingTransaction {
    transaction: SimulatedTransaction,
    seq: u64,
}

impl Ord for PendingTransaction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.transaction
            .submitted_price
            .cmp(&other.transaction.submitted_price)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingTransaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Transactions waiting for a block cheap enough to include them.
/// The highest offer is at the top: if it does not clear a block, none does.
#[derive(Debug, Default)]
struct PendingPool {
    heap: BinaryHeap<PendingTransaction>,
    next_seq: u64,
}

impl PendingPool {
    fn push(&mut self, transaction: SimulatedTransaction) {
        self.heap.push(PendingTransaction {
            transaction,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Pops the highest offer if it pays at least `price`.
    fn pop_includable(&mut self, price: u64) -> Option<SimulatedTransaction> {
        if self.heap.peek()?.transaction.submitted_price < price {
            return None;
        }
        self.heap.pop().map(|pending| pending.transaction)
    }

    fn pop(&mut self) -> Option<SimulatedTransaction> {
        self.heap.pop().map(|pending| pending.transaction)
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Replays a price series, submitting one transaction per block at the predicted price.
///
/// A transaction is included at the first later block whose minimum price is at
/// or below its submitted price. Running a simulation consumes the simulator so
/// predictor state never leaks into another run.
pub struct InclusionSimulator<'a, P> {
    prices: &'a PriceSeries,
    predictor: P,
}

impl<'a, P: Predictor> InclusionSimulator<'a, P> {
    pub fn new(prices: &'a PriceSeries, predictor: P) -> Self {
        Self { prices, predictor }
    }

    /// Submits transactions from `start_block` to `end_block` (inclusive) and keeps
    /// matching them until they are all included or `final_block` is passed.
    pub fn simulate(
        mut self,
        start_block: u64,
        end_block: u64,
        final_block: u64,
    ) -> Result<ResultAggregate, SimulationError> {
        if start_block > end_block || end_block > final_block {
            return Err(SimulationError::InvalidBounds {
                start: start_block,
                end: end_block,
                last: final_block,
            });
        }

        let mut pending = PendingPool::default();
        let mut results = ResultAggregate::new();
        let total_blocks = final_block - start_block;
        let mut block_number = start_block;

        while block_number <= end_block || (!pending.is_empty() && block_number <= final_block) {
            if (block_number - start_block) % PROGRESS_INTERVAL == 0 {
                info!(
                    "Simulation progress: {}/{}, pending: {}",
                    block_number - start_block,
                    total_blocks,
                    pending.len()
                );
            }

            let Some(actual_price) = self.prices.price(block_number) else {
                debug!("No price for block {}, skipping", block_number);
                block_number += 1;
                continue;
            };

            while let Some(transaction) = pending.pop_includable(actual_price) {
                results.add(InclusionOutcome::included(
                    transaction,
                    block_number,
                    actual_price,
                ));
            }

            if block_number <= end_block {
                let submitted_price = self.predictor.predict_price(block_number).map_err(
                    |source| SimulationError::Predictor {
                        block_number,
                        source,
                    },
                )?;

                pending.push(SimulatedTransaction {
                    creation_block: block_number,
                    submitted_price,
                });
            }

            block_number += 1;
        }

        debug!(
            "Giving up on {} transactions after block {}",
            pending.len(),
            final_block
        );

        while let Some(transaction) = pending.pop() {
            results.add(InclusionOutcome::not_included(transaction));
        }

        Ok(results)
    }
}
