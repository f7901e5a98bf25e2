use chrono::{Duration, Utc};
use common::PriceBar;
use rand::Rng;

/// Generate a random-walk daily series for demos
pub fn generate_synthetic_bars(days: usize, initial_price: f64) -> Vec<PriceBar> {
    let mut rng = rand::thread_rng();
    let mut bars = Vec::with_capacity(days);

    let mut price = initial_price;
    let start_date = Utc::now() - Duration::days(days as i64);

    let daily_volatility = 0.02;
    let drift = 0.0002;

    for i in 0..days {
        let date = start_date + Duration::days(i as i64);

        let random_return: f64 = rng.gen_range(-1.0..1.0);
        let daily_return = drift + daily_volatility * random_return;
        let new_price = (price * (1.0 + daily_return)).max(0.01);

        let intraday_range = price * rng.gen_range(0.005..0.02);
        let open = price;
        let close = new_price;
        let high = open.max(close) + rng.gen_range(0.0..intraday_range);
        let low = (open.min(close) - rng.gen_range(0.0..intraday_range)).max(0.0);

        let volume = 1_000_000.0 * (1.0 + daily_return.abs() * 10.0) * rng.gen_range(0.8..1.2);

        bars.push(PriceBar {
            timestamp: date,
            open,
            high,
            low,
            close,
            volume,
        });

        price = new_price;
    }

    bars
}
