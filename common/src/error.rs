use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Empty price series")]
    EmptySeries,

    #[error("Timestamps must be strictly increasing: bar {index} at {current} follows {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("Invalid {field} at bar {index}: {value}")]
    InvalidPrice {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("CSV parse error: {0}")]
    CsvError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Ledger store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TradingError {
    /// Malformed market data, as opposed to IO or configuration failures
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            TradingError::EmptySeries
                | TradingError::NonMonotonicTimestamp { .. }
                | TradingError::InvalidPrice { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TradingError>;
