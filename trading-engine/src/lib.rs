pub mod data;
pub mod engine;
pub mod indicators;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod scan;
pub mod signals;

pub use data::{generate_synthetic_bars, load_dir, load_file, validate_series};
pub use engine::{BacktestEngine, BacktestOutcome};
pub use indicators::{IndicatorRow, IndicatorTable};
pub use ledger::{
    ApplyOutcome, JsonFileStore, Ledger, LedgerSnapshot, LedgerStore, MemoryStore, NoOpReason,
    SharedLedger, SizingPolicy,
};
pub use metrics::MetricsCalculator;
pub use notify::{dispatch, Notifier, TracingNotifier};
pub use scan::{ScanFailure, ScanReport, Scanner, SymbolSnapshot};
pub use signals::SignalGenerator;

// Re-export common types
pub use common::{
    BacktestReport, EngineConfig, HoldingValuation, Position, PriceBar, PriceSource,
    Recommendation, Result, SignalType, TradeRecord, TradeSide, TradingError, Valuation,
};
