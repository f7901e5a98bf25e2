pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

use chrono::{DateTime, Utc};
use common::{IndicatorParameters, PriceBar, Result, RsiWarmup};
use serde::Serialize;

use crate::data::validate_series;

pub use bollinger::{calculate_bollinger_bands, BollingerBands};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, Macd};
pub use rsi::{calculate_rsi, rsi_value};
pub use sma::calculate_sma;

/// Neutral RSI used by [`RsiWarmup::Neutral`]
pub const NEUTRAL_RSI: f64 = 50.0;

/// Indicator values at one bar, derived only from bars at or before it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub sma_fast: f64,
    pub sma_slow: f64,
    /// `None` during warm-up when the policy is [`RsiWarmup::Unavailable`]
    pub rsi: Option<f64>,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    /// Number of bars up to and including this one
    pub bars_seen: usize,
    /// Whether every lookback is fully covered
    pub warm: bool,
}

impl IndicatorRow {
    pub fn is_warm(&self) -> bool {
        self.warm
    }
}

/// Pre-computed indicators for all bars
#[derive(Debug, Clone)]
pub struct IndicatorTable {
    rows: Vec<IndicatorRow>,
}

impl IndicatorTable {
    /// Validate the parameters and series, then compute every indicator.
    ///
    /// Short history is not an error: rows inside the warm-up window carry relaxed SMA /
    /// Bollinger values and `warm == false`. Malformed input (non-increasing timestamps,
    /// non-positive closes) is, and so is a zero lookback.
    pub fn compute(bars: &[PriceBar], params: &IndicatorParameters) -> Result<Self> {
        params.validate()?;
        if bars.is_empty() {
            return Ok(Self { rows: vec![] });
        }
        validate_series(bars)?;

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let sma_fast = calculate_sma(&closes, params.sma_fast);
        let sma_slow = calculate_sma(&closes, params.sma_slow);
        let rsi = calculate_rsi(&closes, params.rsi_period);
        let macd = calculate_macd(
            &closes,
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        );
        let bb = calculate_bollinger_bands(&closes, params.bb_period, params.bb_std_dev);
        let warmup = params.warmup_bars();

        let rows = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| IndicatorRow {
                timestamp: bar.timestamp,
                close: bar.close,
                sma_fast: sma_fast[i],
                sma_slow: sma_slow[i],
                rsi: match (rsi[i], params.rsi_warmup) {
                    (Some(v), _) => Some(v),
                    (None, RsiWarmup::Neutral) => Some(NEUTRAL_RSI),
                    (None, RsiWarmup::Unavailable) => None,
                },
                macd: macd.macd[i],
                macd_signal: macd.signal[i],
                macd_histogram: macd.histogram[i],
                bb_upper: bb.upper[i],
                bb_middle: bb.middle[i],
                bb_lower: bb.lower[i],
                bars_seen: i + 1,
                warm: i + 1 >= warmup,
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn get(&self, idx: usize) -> Option<&IndicatorRow> {
        self.rows.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Latest row and the one before it, if at least two exist
    pub fn last_pair(&self) -> Option<(&IndicatorRow, &IndicatorRow)> {
        let n = self.rows.len();
        if n < 2 {
            return None;
        }
        Some((&self.rows[n - 2], &self.rows[n - 1]))
    }
}
