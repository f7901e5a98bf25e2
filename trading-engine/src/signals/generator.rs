use common::{Recommendation, SignalParameters, SignalType};

use crate::indicators::{IndicatorRow, IndicatorTable};

/// Signal generator based on a fast/slow SMA crossover confirmed by RSI and MACD
///
/// Crossover, not level, gates a signal: the fast SMA has to move from at-or-below the
/// slow SMA on the previous row to strictly above it on the current row (or the reverse
/// for SELL). Anything else is HOLD.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    params: SignalParameters,
}

impl SignalGenerator {
    pub fn new(params: &SignalParameters) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Recommendation for the latest row of a table.
    ///
    /// Returns `None` only for an empty table; a single row yields HOLD.
    pub fn evaluate(&self, symbol: &str, table: &IndicatorTable) -> Option<Recommendation> {
        match table.last_pair() {
            Some((previous, current)) => Some(self.generate(symbol, previous, current)),
            None => table.get(0).map(|row| {
                Recommendation::hold(
                    symbol,
                    row.close,
                    "Insufficient history: need at least two bars",
                    row.timestamp,
                )
            }),
        }
    }

    /// Generate a recommendation from the current row and the one immediately before it
    pub fn generate(
        &self,
        symbol: &str,
        previous: &IndicatorRow,
        current: &IndicatorRow,
    ) -> Recommendation {
        if !previous.is_warm() || !current.is_warm() {
            return Recommendation::hold(
                symbol,
                current.close,
                format!("Warming up ({} bars seen)", current.bars_seen),
                current.timestamp,
            );
        }
        let Some(rsi) = current.rsi else {
            return Recommendation::hold(
                symbol,
                current.close,
                "RSI unavailable",
                current.timestamp,
            );
        };

        if let Some(signal) = self.check_entry_signal(symbol, previous, current, rsi) {
            return signal;
        }
        if let Some(signal) = self.check_exit_signal(symbol, previous, current, rsi) {
            return signal;
        }

        Recommendation::hold(symbol, current.close, hold_reason(current, rsi), current.timestamp)
    }

    /// BUY: fast SMA crosses above slow SMA, RSI below the ceiling, MACD above its signal
    fn check_entry_signal(
        &self,
        symbol: &str,
        previous: &IndicatorRow,
        current: &IndicatorRow,
        rsi: f64,
    ) -> Option<Recommendation> {
        let crossed_above =
            current.sma_fast > current.sma_slow && previous.sma_fast <= previous.sma_slow;
        if !crossed_above || rsi >= self.params.rsi_buy_max || current.macd <= current.macd_signal
        {
            return None;
        }

        Some(Recommendation {
            symbol: symbol.to_string(),
            signal: SignalType::Buy,
            reference_price: current.close,
            target_price: Some(current.close * self.params.target_multiplier),
            stop_loss: Some(current.close * self.params.stop_loss_multiplier),
            reason: format!(
                "SMA crossover, RSI({:.1})<{:.0}, MACD bullish",
                rsi, self.params.rsi_buy_max
            ),
            as_of: current.timestamp,
        })
    }

    /// SELL (exit long): fast SMA crosses below slow SMA, RSI above the floor, MACD below
    /// its signal
    fn check_exit_signal(
        &self,
        symbol: &str,
        previous: &IndicatorRow,
        current: &IndicatorRow,
        rsi: f64,
    ) -> Option<Recommendation> {
        let crossed_below =
            current.sma_fast < current.sma_slow && previous.sma_fast >= previous.sma_slow;
        if !crossed_below || rsi <= self.params.rsi_sell_min || current.macd >= current.macd_signal
        {
            return None;
        }

        Some(Recommendation {
            symbol: symbol.to_string(),
            signal: SignalType::Sell,
            reference_price: current.close,
            target_price: None,
            stop_loss: None,
            reason: format!(
                "SMA crossunder, RSI({:.1})>{:.0}, MACD bearish",
                rsi, self.params.rsi_sell_min
            ),
            as_of: current.timestamp,
        })
    }
}

fn hold_reason(current: &IndicatorRow, rsi: f64) -> &'static str {
    if current.close > current.sma_slow && rsi > 50.0 {
        "Above slow SMA, RSI>50 - potential hold/weak buy"
    } else if current.close < current.sma_slow && rsi < 50.0 {
        "Below slow SMA, RSI<50 - potential hold/weak sell"
    } else {
        "Neutral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_row(sma_fast: f64, sma_slow: f64, rsi: f64, macd: f64, macd_signal: f64) -> IndicatorRow {
        IndicatorRow {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            close: 100.0,
            sma_fast,
            sma_slow,
            rsi: Some(rsi),
            macd,
            macd_signal,
            macd_histogram: macd - macd_signal,
            bb_upper: 110.0,
            bb_middle: sma_fast,
            bb_lower: 90.0,
            bars_seen: 60,
            warm: true,
        }
    }

    fn generator() -> SignalGenerator {
        SignalGenerator::new(&SignalParameters::default())
    }

    #[test]
    fn test_buy_signal() {
        let prev = make_row(99.0, 100.0, 55.0, 0.5, 0.4);
        let curr = make_row(101.0, 100.0, 55.0, 0.5, 0.4);

        let rec = generator().generate("X", &prev, &curr);

        assert_eq!(rec.signal, SignalType::Buy);
        assert!((rec.target_price.unwrap() - 105.0).abs() < 1e-9);
        assert!((rec.stop_loss.unwrap() - 97.0).abs() < 1e-9);
        assert_eq!(rec.reference_price, 100.0);
    }

    #[test]
    fn test_buy_from_equal_smas() {
        let prev = make_row(100.0, 100.0, 55.0, 0.5, 0.4);
        let curr = make_row(100.5, 100.0, 55.0, 0.5, 0.4);
        assert_eq!(generator().generate("X", &prev, &curr).signal, SignalType::Buy);
    }

    #[test]
    fn test_no_buy_without_crossover() {
        // already above on the previous bar: level, not crossover
        let prev = make_row(101.0, 100.0, 55.0, 0.5, 0.4);
        let curr = make_row(102.0, 100.0, 55.0, 0.5, 0.4);
        assert_eq!(generator().generate("X", &prev, &curr).signal, SignalType::Hold);
    }

    #[test]
    fn test_no_buy_when_overbought() {
        let prev = make_row(99.0, 100.0, 70.0, 0.5, 0.4);
        let curr = make_row(101.0, 100.0, 70.0, 0.5, 0.4);
        assert_eq!(generator().generate("X", &prev, &curr).signal, SignalType::Hold);
    }

    #[test]
    fn test_no_buy_when_macd_bearish() {
        let prev = make_row(99.0, 100.0, 55.0, 0.4, 0.5);
        let curr = make_row(101.0, 100.0, 55.0, 0.4, 0.5);
        assert_eq!(generator().generate("X", &prev, &curr).signal, SignalType::Hold);
    }

    #[test]
    fn test_sell_signal() {
        let prev = make_row(100.0, 100.0, 45.0, 0.3, 0.4);
        let curr = make_row(99.0, 100.0, 45.0, 0.3, 0.4);

        let rec = generator().generate("X", &prev, &curr);

        assert_eq!(rec.signal, SignalType::Sell);
        assert!(rec.target_price.is_none());
        assert!(rec.stop_loss.is_none());
    }

    #[test]
    fn test_no_sell_when_oversold() {
        let prev = make_row(101.0, 100.0, 30.0, 0.3, 0.4);
        let curr = make_row(99.0, 100.0, 30.0, 0.3, 0.4);
        assert_eq!(generator().generate("X", &prev, &curr).signal, SignalType::Hold);
    }

    #[test]
    fn test_hold_during_warmup() {
        let mut prev = make_row(99.0, 100.0, 55.0, 0.5, 0.4);
        prev.warm = false;
        let curr = make_row(101.0, 100.0, 55.0, 0.5, 0.4);

        let rec = generator().generate("X", &prev, &curr);
        assert_eq!(rec.signal, SignalType::Hold);
        assert!(rec.reason.starts_with("Warming up"));
    }

    #[test]
    fn test_hold_when_rsi_unavailable() {
        let prev = make_row(99.0, 100.0, 55.0, 0.5, 0.4);
        let mut curr = make_row(101.0, 100.0, 55.0, 0.5, 0.4);
        curr.rsi = None;
        assert_eq!(generator().generate("X", &prev, &curr).signal, SignalType::Hold);
    }

    #[test]
    fn test_hold_reasons() {
        let prev = make_row(101.0, 100.0, 60.0, 0.5, 0.4);
        let mut curr = make_row(101.0, 99.0, 60.0, 0.5, 0.4);
        let rec = generator().generate("X", &prev, &curr);
        assert_eq!(rec.reason, "Above slow SMA, RSI>50 - potential hold/weak buy");

        curr.sma_slow = 120.0;
        curr.rsi = Some(40.0);
        let rec = generator().generate("X", &prev, &curr);
        assert_eq!(rec.reason, "Below slow SMA, RSI<50 - potential hold/weak sell");
    }
}
