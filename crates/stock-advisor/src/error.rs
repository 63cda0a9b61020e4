//! Error Types for the Market-Data Domain

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Symbol not supported: {0}")]
    UnsupportedSymbol(String),

    #[error("No price history available for {0}")]
    HistoryUnavailable(String),

    #[error("Insufficient history for {symbol}: {have} candles")]
    InsufficientHistory { symbol: String, have: usize },

    #[error("Market data source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
