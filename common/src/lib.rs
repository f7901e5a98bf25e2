pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BacktestParameters, EngineConfig, IndicatorParameters, LedgerParameters, RsiWarmup,
    SignalParameters, SizingParameters,
};
pub use error::{Result, TradingError};
pub use types::*;
