use crate::provider::ProviderError;
use market_common::data::DataError;
use thiserror::Error;

/// Service layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not enough history for {symbol}: need {required} bars, have {available}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },
}

impl ServiceError {
    /// Displayable "not enough history" state rather than a failure.
    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, ServiceError::InsufficientHistory { .. })
    }
}
