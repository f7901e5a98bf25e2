/// Calculate RSI from simple rolling averages of gains and losses
///
/// # Arguments
/// * `prices` - Slice of closing prices
/// * `period` - Number of deltas in the window (typically 14)
///
/// # Returns
/// One value per price. Indices before `period` deltas exist are `None`; the caller
/// decides how to fill them.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut rsi = vec![None; n];

    if period == 0 || n < period + 1 {
        return rsi;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    // deltas[i - 1] is the change into bar i
    for i in period..n {
        let window = &deltas[i - period..i];
        let (gains, losses) = window.iter().fold((0.0, 0.0), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
        let avg_gain = gains / period as f64;
        let avg_loss = losses / period as f64;
        rsi[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    rsi
}

/// RSI from average gain and loss, saturating instead of dividing by zero
pub fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 {
            100.0
        } else {
            // flat window
            50.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}
