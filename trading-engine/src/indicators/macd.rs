use super::ema::calculate_ema;

/// MACD line, signal line and histogram
#[derive(Debug, Clone)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Calculate MACD as EMA(fast) - EMA(slow), with an EMA(signal) of the MACD line
pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let ema_fast = calculate_ema(prices, fast);
    let ema_slow = calculate_ema(prices, slow);

    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema(&macd, signal);
    let histogram = macd
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    Macd {
        macd,
        signal: signal_line,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_macd_lengths() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let macd = calculate_macd(&prices, 12, 26, 9);

        assert_eq!(macd.macd.len(), 40);
        assert_eq!(macd.signal.len(), 40);
        assert_eq!(macd.histogram.len(), 40);
    }

    #[test]
    fn test_macd_starts_at_zero() {
        let prices = vec![50.0, 51.0, 52.0];
        let macd = calculate_macd(&prices, 12, 26, 9);
        assert_eq!(macd.macd[0], 0.0);
        assert_eq!(macd.signal[0], 0.0);
    }

    #[test]
    fn test_macd_uptrend_is_bullish() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let macd = calculate_macd(&prices, 12, 26, 9);

        let last = prices.len() - 1;
        assert!(macd.macd[last] > 0.0);
        assert!(macd.macd[last] > macd.signal[last]);
        assert_relative_eq!(
            macd.histogram[last],
            macd.macd[last] - macd.signal[last]
        );
    }
}
