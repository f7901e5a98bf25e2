use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data, normalised at the ingestion boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Discrete trade recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    /// Exit an existing long position. Never a short-sale entry.
    Sell,
    Hold,
}

impl SignalType {
    /// BUY and SELL act on the ledger; HOLD never does
    pub fn is_actionable(self) -> bool {
        !matches!(self, SignalType::Hold)
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

/// Output of one signal evaluation. Not persisted; only its ledger effects are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: String,
    pub signal: SignalType,
    pub reference_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    /// Only ever set on BUY
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    pub reason: String,
    pub as_of: DateTime<Utc>,
}

impl Recommendation {
    pub fn hold(
        symbol: impl Into<String>,
        reference_price: f64,
        reason: impl Into<String>,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            signal: SignalType::Hold,
            reference_price,
            target_price: None,
            stop_loss: None,
            reason: reason.into(),
            as_of,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.signal.is_actionable()
    }
}

/// Open long position. Exists only while quantity > 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    pub average_cost: f64,
}

impl Position {
    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.average_cost
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.average_cost) * self.quantity as f64
    }

    pub fn unrealized_pnl_pct(&self, price: f64) -> f64 {
        let cost = self.cost_basis();
        if cost == 0.0 {
            0.0
        } else {
            (self.unrealized_pnl(price) / cost) * 100.0
        }
    }
}

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub as_of: DateTime<Utc>,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: f64,
    pub value: f64,
    /// Booked on SELL only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl_pct: Option<f64>,
    pub cash_after: f64,
    #[serde(default)]
    pub reason: String,
}

/// Where a holding's mark price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Live,
    /// No live price was supplied; the holding is marked at its average cost
    AverageCost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingValuation {
    pub symbol: String,
    pub quantity: u64,
    pub average_cost: f64,
    pub mark_price: f64,
    pub price_source: PriceSource,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_pct: f64,
}

/// Point-in-time valuation of a ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub cash: f64,
    pub holdings_value: f64,
    pub total_value: f64,
    pub initial_cash: f64,
    pub total_pnl: f64,
    pub total_pnl_pct: f64,
    pub realized_pnl: f64,
    pub holdings: Vec<HoldingValuation>,
    /// True when at least one holding fell back to its average cost
    pub stale: bool,
}

/// Backtest result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    /// Simplified drawdown: (highest value - lowest value) / highest value over the whole
    /// replay, regardless of the order in which they occurred.
    pub max_drawdown_pct: f64,
    /// Sequential peak-to-trough drawdown, reported alongside the simplified figure
    pub running_max_drawdown_pct: f64,
    pub number_of_trades: usize,
    pub trade_log: Vec<TradeRecord>,
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
    pub execution_time_ms: u64,
}

impl BacktestReport {
    /// Head + tail sample of the trade log for display. The full log stays in `trade_log`.
    ///
    /// Returns exactly `max_trades` entries when the log is longer; an odd count gives the
    /// extra entry to the head.
    pub fn trade_log_sample(&self, max_trades: usize) -> Vec<&TradeRecord> {
        if self.trade_log.len() <= max_trades {
            return self.trade_log.iter().collect();
        }
        let tail = max_trades / 2;
        let head = max_trades - tail;
        let tail_start = self.trade_log.len() - tail;
        self.trade_log[..head]
            .iter()
            .chain(self.trade_log[tail_start..].iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn trade(i: u32) -> TradeRecord {
        TradeRecord {
            as_of: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(i as i64),
            symbol: "X".to_string(),
            side: if i % 2 == 0 { TradeSide::Buy } else { TradeSide::Sell },
            quantity: i as u64 + 1,
            price: 100.0,
            value: 100.0 * (i as f64 + 1.0),
            realized_pnl: None,
            realized_pnl_pct: None,
            cash_after: 0.0,
            reason: String::new(),
        }
    }

    fn report(trades: usize) -> BacktestReport {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        BacktestReport {
            symbol: "X".to_string(),
            start_date: date,
            end_date: date,
            initial_capital: 1000.0,
            final_value: 1000.0,
            total_return_pct: 0.0,
            max_drawdown_pct: 0.0,
            running_max_drawdown_pct: 0.0,
            number_of_trades: trades,
            trade_log: (0..trades as u32).map(trade).collect(),
            equity_curve: vec![],
            execution_time_ms: 0,
        }
    }

    #[test]
    fn test_trade_log_sample_short_log_is_untouched() {
        let r = report(5);
        assert_eq!(r.trade_log_sample(20).len(), 5);
    }

    #[test]
    fn test_trade_log_sample_keeps_head_and_tail() {
        let r = report(30);
        let sample = r.trade_log_sample(20);
        assert_eq!(sample.len(), 20);
        assert_eq!(sample[0].quantity, 1);
        assert_eq!(sample[9].quantity, 10);
        assert_eq!(sample[10].quantity, 21);
        assert_eq!(sample[19].quantity, 30);
        // full fidelity retained
        assert_eq!(r.trade_log.len(), 30);
    }

    #[test]
    fn test_trade_log_sample_odd_count() {
        let r = report(30);

        let quantities: Vec<u64> = r.trade_log_sample(5).iter().map(|t| t.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 3, 29, 30]);

        let single = r.trade_log_sample(1);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].quantity, 1);

        assert!(r.trade_log_sample(0).is_empty());
    }

    #[test]
    fn test_position_pnl() {
        let pos = Position {
            symbol: "X".to_string(),
            quantity: 10,
            average_cost: 1000.0,
        };
        assert_eq!(pos.cost_basis(), 10000.0);
        assert_eq!(pos.unrealized_pnl(1200.0), 2000.0);
        assert_eq!(pos.unrealized_pnl_pct(1200.0), 20.0);
    }

    #[test]
    fn test_signal_type_serialization() {
        assert_eq!(serde_json::to_string(&SignalType::Buy).unwrap(), "\"BUY\"");
        assert!(!SignalType::Hold.is_actionable());
        assert!(SignalType::Sell.is_actionable());
    }
}
