/// Calculate Simple Moving Average with a minimum of one period
///
/// Indices before `period - 1` average over however many bars are available, so the
/// output always has the same length as the input and never contains gaps.
///
/// # Arguments
/// * `prices` - Slice of prices
/// * `period` - SMA period
pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    if n == 0 || period == 0 {
        return vec![];
    }

    let mut sma = Vec::with_capacity(n);
    let mut sum = 0.0;

    for i in 0..n {
        sum += prices[i];
        if i >= period {
            sum -= prices[i - period];
        }
        let count = (i + 1).min(period);
        sma.push(sum / count as f64);
    }

    sma
}
