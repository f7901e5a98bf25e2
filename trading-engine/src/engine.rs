use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{BacktestReport, EngineConfig, PriceBar, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::data::validate_series;
use crate::indicators::IndicatorTable;
use crate::ledger::{Ledger, SizingPolicy};
use crate::metrics::MetricsCalculator;
use crate::signals::SignalGenerator;

/// Result of a backtest run. Short history is a status, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BacktestOutcome {
    Completed(BacktestReport),
    InsufficientData { required: usize, actual: usize },
}

impl BacktestOutcome {
    pub fn report(&self) -> Option<&BacktestReport> {
        match self {
            BacktestOutcome::Completed(report) => Some(report),
            BacktestOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Bar-by-bar replay of the live signal rules against a private, all-cash ledger
pub struct BacktestEngine {
    config: EngineConfig,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Replay `bars` for one symbol.
    ///
    /// Signals at bar `i` see only rows `i - 1` and `i`, and trades fill at bar `i`'s close.
    /// The first replayed bar is the first one with a full warm-up window behind it.
    pub fn run(&self, symbol: &str, bars: &[PriceBar]) -> Result<BacktestOutcome> {
        let start_time = Instant::now();
        self.config.indicators.validate()?;

        let warmup = self.config.indicators.warmup_bars();
        let required = warmup + 1;
        if bars.is_empty() {
            return Ok(BacktestOutcome::InsufficientData {
                required,
                actual: 0,
            });
        }
        validate_series(bars)?;
        if bars.len() < required {
            debug!(symbol, required, actual = bars.len(), "not enough bars to backtest");
            return Ok(BacktestOutcome::InsufficientData {
                required,
                actual: bars.len(),
            });
        }

        let table = IndicatorTable::compute(bars, &self.config.indicators)?;
        let rows = table.rows();
        let generator = SignalGenerator::new(&self.config.signals);
        let initial_capital = self.config.backtest.initial_capital;
        let mut ledger = Ledger::new(initial_capital, SizingPolicy::AllCash);

        let mut equity_curve: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(bars.len() - warmup);

        for i in warmup..bars.len() {
            let bar = &bars[i];
            let recommendation = generator.generate(symbol, &rows[i - 1], &rows[i]);
            if recommendation.is_actionable() {
                ledger.apply(&recommendation, bar.close);
            }
            equity_curve.push((bar.timestamp, ledger.value_at(symbol, bar.close)));
        }

        let final_value = equity_curve
            .last()
            .map(|(_, v)| *v)
            .unwrap_or(initial_capital);
        let trade_log = ledger.trades().to_vec();

        let report = BacktestReport {
            symbol: symbol.to_string(),
            start_date: bars[warmup].timestamp.date_naive(),
            end_date: bars[bars.len() - 1].timestamp.date_naive(),
            initial_capital,
            final_value,
            total_return_pct: MetricsCalculator::total_return_pct(final_value, initial_capital),
            max_drawdown_pct: MetricsCalculator::simplified_drawdown_pct(&equity_curve),
            running_max_drawdown_pct: MetricsCalculator::running_max_drawdown_pct(&equity_curve),
            number_of_trades: trade_log.len(),
            trade_log,
            equity_curve,
            execution_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            symbol,
            trades = report.number_of_trades,
            total_return_pct = report.total_return_pct,
            max_drawdown_pct = report.max_drawdown_pct,
            "backtest complete"
        );
        Ok(BacktestOutcome::Completed(report))
    }

    /// Run independent backtests in parallel. Results keep the input order.
    pub fn run_many(&self, series: &[(String, Vec<PriceBar>)]) -> Vec<(String, Result<BacktestOutcome>)> {
        series
            .par_iter()
            .map(|(symbol, bars)| (symbol.clone(), self.run(symbol, bars)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::tests::generate_crossover_bars;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};
    use common::{TradeSide, TradingError};

    fn rising_bars(n: usize) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                PriceBar::new(start + Duration::days(i as i64), c, c + 0.5, c - 0.5, c, 1000.0)
            })
            .collect()
    }

    fn completed(outcome: BacktestOutcome) -> BacktestReport {
        match outcome {
            BacktestOutcome::Completed(report) => report,
            other => panic!("expected a completed backtest, got {:?}", other),
        }
    }

    #[test]
    fn test_rising_series_makes_no_trades() {
        let engine = BacktestEngine::new(EngineConfig::default());
        let report = completed(engine.run("UP", &rising_bars(150)).unwrap());

        assert_eq!(report.number_of_trades, 0);
        assert!(report.trade_log.is_empty());
        assert_eq!(report.final_value, report.initial_capital);
        assert_eq!(report.total_return_pct, 0.0);
        assert_eq!(report.max_drawdown_pct, 0.0);
        assert_eq!(report.equity_curve.len(), 100);
    }

    #[test]
    fn test_crossover_round_trip() {
        let engine = BacktestEngine::new(EngineConfig::default());
        let bars = generate_crossover_bars(65, 200.0);
        let report = completed(engine.run("ZIG", &bars).unwrap());

        assert_eq!(report.number_of_trades, 2);
        let buy = &report.trade_log[0];
        let sell = &report.trade_log[1];
        assert_eq!(buy.side, TradeSide::Buy);
        assert_eq!(buy.quantity, 548);
        assert_eq!(buy.as_of, bars[85].timestamp);
        assert_eq!(sell.side, TradeSide::Sell);
        assert_eq!(sell.quantity, 548);
        assert_eq!(sell.as_of, bars[155].timestamp);

        assert_relative_eq!(sell.realized_pnl.unwrap(), 9918.8, epsilon = 1e-6);
        assert_relative_eq!(report.final_value, 109_918.8, epsilon = 1e-6);
        assert_relative_eq!(report.total_return_pct, 9.9188, epsilon = 1e-6);
        assert_relative_eq!(report.max_drawdown_pct, 14.481088, epsilon = 1e-4);
        assert!(report.running_max_drawdown_pct <= report.max_drawdown_pct);
        assert!(report.running_max_drawdown_pct > 0.0);
    }

    #[test]
    fn test_report_window_starts_after_warmup() {
        let engine = BacktestEngine::new(EngineConfig::default());
        let bars = rising_bars(80);
        let report = completed(engine.run("UP", &bars).unwrap());

        assert_eq!(report.start_date, bars[50].timestamp.date_naive());
        assert_eq!(report.end_date, bars[79].timestamp.date_naive());
        assert_eq!(report.equity_curve[0].0, bars[50].timestamp);
    }

    #[test]
    fn test_insufficient_data() {
        let engine = BacktestEngine::new(EngineConfig::default());

        match engine.run("SHORT", &rising_bars(50)).unwrap() {
            BacktestOutcome::InsufficientData { required, actual } => {
                assert_eq!(required, 51);
                assert_eq!(actual, 50);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(engine.run("EMPTY", &[]).unwrap().report().is_none());
    }

    #[test]
    fn test_malformed_input_is_error() {
        let engine = BacktestEngine::new(EngineConfig::default());
        let mut bars = rising_bars(80);
        bars[40].timestamp = bars[39].timestamp;

        let err = engine.run("BAD", &bars).unwrap_err();
        assert!(matches!(err, TradingError::NonMonotonicTimestamp { index: 40, .. }));
    }

    #[test]
    fn test_zero_lookback_is_error() {
        let mut config = EngineConfig::default();
        config.indicators.sma_fast = 0;
        let engine = BacktestEngine::new(config);

        for bars in [rising_bars(80), vec![]] {
            let err = engine.run("UP", &bars).unwrap_err();
            assert!(matches!(err, TradingError::InvalidParameter(_)));
        }
    }

    #[test]
    fn test_run_many_keeps_order() {
        let engine = BacktestEngine::new(EngineConfig::default());
        let series = vec![
            ("ZIG".to_string(), generate_crossover_bars(65, 200.0)),
            ("SHORT".to_string(), rising_bars(10)),
            ("UP".to_string(), rising_bars(120)),
        ];

        let results = engine.run_many(&series);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "ZIG");
        let zig = results[0].1.as_ref().unwrap().report().unwrap();
        assert_eq!(zig.number_of_trades, 2);
        assert!(results[1].1.as_ref().unwrap().report().is_none());
        assert_eq!(
            results[2].1.as_ref().unwrap().report().unwrap().number_of_trades,
            0
        );
    }
}
