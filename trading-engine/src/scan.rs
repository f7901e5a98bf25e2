use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{
    EngineConfig, IndicatorParameters, PriceBar, Recommendation, Result, SignalType, TradingError,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::indicators::IndicatorTable;
use crate::signals::SignalGenerator;

/// Latest close and signal for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub close: f64,
    /// Change from the previous close, in percent. `None` with a single bar.
    pub percent_change: Option<f64>,
    pub signal: SignalType,
    pub target: Option<f64>,
    pub as_of: DateTime<Utc>,
}

/// A symbol that could not be evaluated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub snapshots: Vec<SymbolSnapshot>,
    /// One recommendation per evaluated symbol, HOLD included
    pub recommendations: Vec<Recommendation>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn actionable(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(|r| r.is_actionable())
    }

    pub fn holds(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(|r| !r.is_actionable())
    }

    /// Latest close per evaluated symbol, for execution and valuation
    pub fn latest_prices(&self) -> HashMap<String, f64> {
        self.snapshots
            .iter()
            .map(|s| (s.symbol.clone(), s.close))
            .collect()
    }

    /// Record a symbol that failed before evaluation, e.g. while loading its data
    pub fn push_failure(&mut self, symbol: impl Into<String>, error: &TradingError) {
        let symbol = symbol.into();
        warn!(symbol = %symbol, error = %error, "symbol skipped");
        self.failures.push(ScanFailure {
            symbol,
            error: error.to_string(),
        });
    }
}

/// Evaluates the latest signal across a universe of symbols
#[derive(Debug, Clone)]
pub struct Scanner {
    indicators: IndicatorParameters,
    generator: SignalGenerator,
}

impl Scanner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            indicators: config.indicators.clone(),
            generator: SignalGenerator::new(&config.signals),
        }
    }

    /// Snapshot and recommendation for the most recent bar of one symbol
    pub fn evaluate(
        &self,
        symbol: &str,
        bars: &[PriceBar],
    ) -> Result<(SymbolSnapshot, Recommendation)> {
        let table = IndicatorTable::compute(bars, &self.indicators)?;
        let recommendation = self
            .generator
            .evaluate(symbol, &table)
            .ok_or(TradingError::EmptySeries)?;

        let percent_change = table.last_pair().map(|(prev, curr)| {
            (curr.close - prev.close) / prev.close * 100.0
        });
        let snapshot = SymbolSnapshot {
            symbol: symbol.to_string(),
            close: recommendation.reference_price,
            percent_change,
            signal: recommendation.signal,
            target: recommendation.target_price,
            as_of: recommendation.as_of,
        };
        debug!(symbol, signal = %snapshot.signal, close = snapshot.close, "symbol evaluated");
        Ok((snapshot, recommendation))
    }

    /// Evaluate every symbol in parallel. Malformed symbols are reported as failures and
    /// do not stop the rest; output keeps the input order.
    pub fn scan(&self, universe: &[(String, Vec<PriceBar>)]) -> ScanReport {
        let results: Vec<_> = universe
            .par_iter()
            .map(|(symbol, bars)| (symbol, self.evaluate(symbol, bars)))
            .collect();

        let mut report = ScanReport::default();
        for (symbol, result) in results {
            match result {
                Ok((snapshot, recommendation)) => {
                    report.snapshots.push(snapshot);
                    report.recommendations.push(recommendation);
                }
                Err(e) => report.push_failure(symbol.as_str(), &e),
            }
        }
        report
    }
}
