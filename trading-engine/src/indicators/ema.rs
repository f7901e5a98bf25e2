/// Calculate Exponential Moving Average
///
/// Smoothing factor is `2 / (period + 1)`, seeded by the first price rather than an SMA
/// of the first `period` values. Backtest and live evaluation both go through here.
///
/// # Arguments
/// * `prices` - Slice of prices
/// * `period` - EMA span
///
/// # Returns
/// Vector of EMA values
pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    if n == 0 || period == 0 {
        return vec![];
    }

    let mut ema = vec![0.0; n];
    let multiplier = 2.0 / (period as f64 + 1.0);

    // Initialize with first price
    ema[0] = prices[0];

    for i in 1..n {
        ema[i] = (prices[i] - ema[i - 1]) * multiplier + ema[i - 1];
    }

    ema
}
