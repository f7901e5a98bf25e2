use chrono::{DateTime, Utc};

/// Backtest performance figures computed from the per-bar equity curve
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Total return relative to initial capital, in percent
    pub fn total_return_pct(final_value: f64, initial_capital: f64) -> f64 {
        if initial_capital == 0.0 {
            return 0.0;
        }
        (final_value - initial_capital) / initial_capital * 100.0
    }

    /// Simplified drawdown: (highest value - lowest value) / highest value, in percent.
    ///
    /// The peak and trough are global, so a low that came before the peak still counts.
    /// Use [`MetricsCalculator::running_max_drawdown_pct`] for the sequential figure.
    pub fn simplified_drawdown_pct(equity_curve: &[(DateTime<Utc>, f64)]) -> f64 {
        let mut values = equity_curve.iter().map(|(_, v)| *v);
        let Some(first) = values.next() else {
            return 0.0;
        };
        let (max, min) = values.fold((first, first), |(max, min), v| (max.max(v), min.min(v)));
        if max <= 0.0 {
            return 0.0;
        }
        (max - min) / max * 100.0
    }

    /// Largest peak-to-trough decline where the trough follows the peak, in percent
    pub fn running_max_drawdown_pct(equity_curve: &[(DateTime<Utc>, f64)]) -> f64 {
        if equity_curve.is_empty() {
            return 0.0;
        }

        let mut max_equity = equity_curve[0].1;
        let mut max_drawdown = 0.0;

        for (_, equity) in equity_curve {
            if *equity > max_equity {
                max_equity = *equity;
            }
            if max_equity <= 0.0 {
                continue;
            }
            let drawdown = (max_equity - equity) / max_equity * 100.0;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        max_drawdown
    }
}
