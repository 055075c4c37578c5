use crate::utils::median;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    #[error("Transaction created at block {creation_block} has not been included")]
    NotIncluded { creation_block: u64 },

    #[error("No transaction has been included")]
    NoIncludedTransactions,
}

/// A transaction submitted by the simulation at `creation_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedTransaction {
    pub creation_block: u64,
    pub submitted_price: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inclusion {
    pub block_number: u64,
    pub price: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusionOutcome {
    pub transaction: SimulatedTransaction,
    pub inclusion: Option<Inclusion>,
}

impl InclusionOutcome {
    pub fn included(transaction: SimulatedTransaction, block_number: u64, price: u64) -> Self {
        Self {
            transaction,
            inclusion: Some(Inclusion {
                block_number,
                price,
            }),
        }
    }

    pub fn not_included(transaction: SimulatedTransaction) -> Self {
        Self {
            transaction,
            inclusion: None,
        }
    }

    pub fn is_included(&self) -> bool {
        self.inclusion.is_some()
    }

    fn inclusion(&self) -> Result<&Inclusion, ResultError> {
        self.inclusion.as_ref().ok_or(ResultError::NotIncluded {
            creation_block: self.transaction.creation_block,
        })
    }

    pub fn blocks_waited(&self) -> Result<u64, ResultError> {
        Ok(self.inclusion()?.block_number - self.transaction.creation_block)
    }

    /// How much more than the block minimum the transaction offered.
    pub fn price_diff(&self) -> Result<u64, ResultError> {
        Ok(self.transaction.submitted_price - self.inclusion()?.price)
    }

    pub fn record(&self) -> OutcomeRecord {
        OutcomeRecord {
            included: self.is_included(),
            creation_block_number: self.transaction.creation_block,
            creation_gas_price: self.transaction.submitted_price,
            inclusion_block_number: self.inclusion.map(|i| i.block_number),
            inclusion_gas_price: self.inclusion.map(|i| i.price),
            blocks_waited: self.blocks_waited().ok(),
            gas_price_diff: self.price_diff().ok(),
        }
    }
}

/// Serialized form of an [`InclusionOutcome`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutcomeRecord {
    pub included: bool,
    pub creation_block_number: u64,
    pub creation_gas_price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusion_block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusion_gas_price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks_waited: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price_diff: Option<u64>,
}

/// Outcomes of one simulation in the order they were decided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultAggregate {
    outcomes: Vec<InclusionOutcome>,
}

impl ResultAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: InclusionOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[InclusionOutcome] {
        &self.outcomes
    }

    pub fn iter(&self) -> impl Iterator<Item = &InclusionOutcome> {
        self.outcomes.iter()
    }

    fn included(&self) -> impl Iterator<Item = &InclusionOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_included())
    }

    pub fn total_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn included_count(&self) -> usize {
        self.included().count()
    }

    pub fn not_included_count(&self) -> usize {
        self.total_count() - self.included_count()
    }

    pub fn total_price_diff(&self) -> u128 {
        self.included()
            .filter_map(|outcome| outcome.price_diff().ok())
            .map(u128::from)
            .sum()
    }

    pub fn total_blocks_waited(&self) -> u64 {
        self.included()
            .filter_map(|outcome| outcome.blocks_waited().ok())
            .sum()
    }

    fn included_divisor(&self) -> Result<f64, ResultError> {
        match self.included_count() {
            0 => Err(ResultError::NoIncludedTransactions),
            count => Ok(count as f64),
        }
    }

    pub fn average_price_diff(&self) -> Result<f64, ResultError> {
        Ok(self.total_price_diff() as f64 / self.included_divisor()?)
    }

    pub fn average_blocks_waited(&self) -> Result<f64, ResultError> {
        Ok(self.total_blocks_waited() as f64 / self.included_divisor()?)
    }

    /// Average submitted price of the included transactions.
    pub fn average_price(&self) -> Result<f64, ResultError> {
        let total: u128 = self
            .included()
            .map(|outcome| outcome.transaction.submitted_price as u128)
            .sum();

        Ok(total as f64 / self.included_divisor()?)
    }

    /// Median submitted price of the included transactions.
    pub fn median_price(&self) -> Result<f64, ResultError> {
        let prices: Vec<f64> = self
            .included()
            .map(|outcome| outcome.transaction.submitted_price as f64)
            .collect();

        median(&prices).ok_or(ResultError::NoIncludedTransactions)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total_count: self.total_count(),
            included_count: self.included_count(),
            not_included_count: self.not_included_count(),
            average_gas_price: self.average_price().ok(),
            median_gas_price: self.median_price().ok(),
            total_gas_price_diff: self.total_price_diff(),
            average_gas_price_diff: self.average_price_diff().ok(),
            total_blocks_waited: self.total_blocks_waited(),
            average_blocks_waited: self.average_blocks_waited().ok(),
            results: self.iter().map(InclusionOutcome::record).collect(),
        }
    }
}

/// Statistics of a [`ResultAggregate`]. Averages are `None` when nothing was included.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub total_count: usize,
    pub included_count: usize,
    pub not_included_count: usize,
    pub average_gas_price: Option<f64>,
    pub median_gas_price: Option<f64>,
    pub total_gas_price_diff: u128,
    pub average_gas_price_diff: Option<f64>,
    pub total_blocks_waited: u64,
    pub average_blocks_waited: Option<f64>,
    pub results: Vec<OutcomeRecord>,
}
