use chrono::{Duration, TimeZone, Utc};
use trading_engine::PriceBar;

/// Zig-zag series of three `phase_len` phases: decline, rally, decline.
///
/// With `phase_len = 65` and the default parameters it crosses over on bar 85 and
/// under on bar 155.
pub fn crossover_bars(phase_len: usize, initial_price: f64) -> Vec<PriceBar> {
    const DECLINE: (f64, f64) = (-2.0, 1.1);
    const RALLY: (f64, f64) = (2.3, -1.0);

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut price = initial_price;
    (0..phase_len * 3)
        .map(|i| {
            if i > 0 {
                let step = i - 1;
                let (first, second) = if step / phase_len == 1 { RALLY } else { DECLINE };
                price += if (step % phase_len) % 2 == 0 { first } else { second };
            }
            PriceBar {
                timestamp: start + Duration::days(i as i64),
                open: price,
                high: price + 0.5,
                low: (price - 0.5).max(0.0),
                close: price,
                volume: 1_000_000.0,
            }
        })
        .collect()
}
