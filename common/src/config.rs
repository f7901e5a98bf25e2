use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TradingError};

/// How RSI rows are filled before enough deltas exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiWarmup {
    /// Fill warm-up rows with the neutral value 50
    Neutral,
    /// Leave warm-up rows unavailable
    Unavailable,
}

/// Indicator lookbacks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParameters {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub rsi_period: usize,
    pub rsi_warmup: RsiWarmup,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
}

impl Default for IndicatorParameters {
    fn default() -> Self {
        Self {
            sma_fast: 20,
            sma_slow: 50,
            rsi_period: 14,
            rsi_warmup: RsiWarmup::Neutral,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std_dev: 2.0,
        }
    }
}

impl IndicatorParameters {
    /// Bars needed before every indicator covers its full lookback
    pub fn warmup_bars(&self) -> usize {
        self.sma_slow
            .max(self.sma_fast)
            .max(self.bb_period)
            .max(self.rsi_period + 1)
    }

    /// Reject lookbacks the indicator functions cannot produce a full series for
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("sma_fast", self.sma_fast),
            ("sma_slow", self.sma_slow),
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("bb_period", self.bb_period),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(invalid(format!("{} must be positive", name)));
            }
        }
        if self.sma_fast >= self.sma_slow {
            return Err(invalid("sma_fast must be shorter than sma_slow"));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(invalid("macd_fast must be shorter than macd_slow"));
        }
        if !(self.bb_std_dev > 0.0) {
            return Err(invalid("bb_std_dev must be positive"));
        }
        Ok(())
    }
}

/// Signal thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParameters {
    /// BUY requires RSI strictly below this
    pub rsi_buy_max: f64,
    /// SELL requires RSI strictly above this
    pub rsi_sell_min: f64,
    pub target_multiplier: f64,
    pub stop_loss_multiplier: f64,
}

impl Default for SignalParameters {
    fn default() -> Self {
        Self {
            rsi_buy_max: 70.0,
            rsi_sell_min: 30.0,
            target_multiplier: 1.05,
            stop_loss_multiplier: 0.97,
        }
    }
}

/// Live ledger position sizing: spend min(cash * cash_fraction, max_trade_value)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingParameters {
    pub cash_fraction: f64,
    pub max_trade_value: f64,
}

impl Default for SizingParameters {
    fn default() -> Self {
        Self {
            cash_fraction: 0.10,
            max_trade_value: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerParameters {
    pub initial_cash: f64,
    pub path: PathBuf,
}

impl Default for LedgerParameters {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            path: PathBuf::from("paper_portfolio.json"),
        }
    }
}

/// Backtest parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParameters {
    pub initial_capital: f64,
    /// Trades shown by `BacktestReport::trade_log_sample`
    pub trade_log_display: usize,
}

impl Default for BacktestParameters {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            trade_log_display: 20,
        }
    }
}

/// Full engine configuration. Every section is optional in the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub indicators: IndicatorParameters,
    pub signals: SignalParameters,
    pub sizing: SizingParameters,
    pub ledger: LedgerParameters,
    pub backtest: BacktestParameters,
}

impl EngineConfig {
    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            TradingError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| TradingError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.indicators.validate()?;

        let sig = &self.signals;
        if !(sig.target_multiplier > 0.0 && sig.stop_loss_multiplier > 0.0) {
            return Err(invalid("target/stop-loss multipliers must be positive"));
        }

        let sizing = &self.sizing;
        if !(sizing.cash_fraction > 0.0 && sizing.cash_fraction <= 1.0) {
            return Err(invalid("cash_fraction must be in (0, 1]"));
        }
        if !(sizing.max_trade_value > 0.0) {
            return Err(invalid("max_trade_value must be positive"));
        }

        if !(self.ledger.initial_cash >= 0.0) {
            return Err(invalid("initial_cash must not be negative"));
        }
        if !(self.backtest.initial_capital > 0.0) {
            return Err(invalid("initial_capital must be positive"));
        }
        Ok(())
    }

    pub fn with_capital(mut self, capital: f64) -> Self {
        self.backtest.initial_capital = capital;
        self
    }

    pub fn with_initial_cash(mut self, cash: f64) -> Self {
        self.ledger.initial_cash = cash;
        self
    }

    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger.path = path.into();
        self
    }

    pub fn with_rsi_thresholds(mut self, sell_min: f64, buy_max: f64) -> Self {
        self.signals.rsi_sell_min = sell_min;
        self.signals.rsi_buy_max = buy_max;
        self
    }

    pub fn with_sizing(mut self, cash_fraction: f64, max_trade_value: f64) -> Self {
        self.sizing.cash_fraction = cash_fraction;
        self.sizing.max_trade_value = max_trade_value;
        self
    }

    pub fn with_rsi_warmup(mut self, warmup: RsiWarmup) -> Self {
        self.indicators.rsi_warmup = warmup;
        self
    }
}

fn invalid(msg: impl Into<String>) -> TradingError {
    TradingError::InvalidParameter(msg.into())
}
