use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictorError {
    #[error("Blocks must be queried in consecutive order: expected {expected}, got {actual}")]
    OutOfOrder { expected: u64, actual: u64 },

    #[error("Block {block_number} is outside of the known price series: {message}")]
    OutOfRange { block_number: u64, message: String },

    #[error("Missing required data: {message}")]
    MissingData { message: String },

    #[error("Insufficient data for computation: {message}")]
    InsufficientData { message: String },

    #[error("Invalid data provided: {message}")]
    InvalidData { message: String },

    #[error("No price in window is above the bound {bound:.2} (mean {mean:.2}, stdev {stdev:.2})")]
    NoQualifyingPrice { bound: f64, mean: f64, stdev: f64 },
}

impl PredictorError {
    pub fn out_of_range(block_number: u64, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            block_number,
            message: message.into(),
        }
    }

    pub fn missing_data(message: impl Into<String>) -> Self {
        Self::MissingData {
            message: message.into(),
        }
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}
