/// Bollinger Bands result
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Calculate Bollinger Bands
///
/// # Arguments
/// * `prices` - Slice of closing prices
/// * `period` - Period for moving average (typically 20)
/// * `std_dev` - Number of standard deviations (typically 2.0)
///
/// Uses the population standard deviation over the same window as the middle band.
/// Like the SMA, early indices use however many bars are available.
pub fn calculate_bollinger_bands(prices: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    let n = prices.len();
    let mut bb = BollingerBands {
        upper: vec![0.0; n],
        middle: vec![0.0; n],
        lower: vec![0.0; n],
    };

    if period == 0 {
        return bb;
    }

    for i in 0..n {
        let start = (i + 1).saturating_sub(period);
        let window = &prices[start..=i];
        let len = window.len() as f64;

        let mean: f64 = window.iter().sum::<f64>() / len;
        let variance: f64 = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / len;
        let std = variance.sqrt();

        bb.middle[i] = mean;
        bb.upper[i] = mean + std * std_dev;
        bb.lower[i] = mean - std * std_dev;
    }

    bb
}
