pub mod loader;
pub mod synthetic;

pub use loader::{load_csv, load_json};
pub use synthetic::generate_synthetic_bars;

use std::fs;
use std::path::Path;

use common::{PriceBar, Result, TradingError};

/// Load bars from file, detecting format from extension
pub fn load_file(path: &Path) -> Result<Vec<PriceBar>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        _ => Err(TradingError::DataLoadError(format!(
            "Unsupported file format: {}",
            ext
        ))),
    }
}

/// Load every CSV/JSON file in a directory, keyed by file stem (the symbol).
///
/// A file that fails to load is returned as an error entry rather than aborting the rest.
pub fn load_dir(dir: &Path) -> Result<Vec<(String, Result<Vec<PriceBar>>)>> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("csv") | Some("json")
            )
        })
        .collect();
    entries.sort();

    Ok(entries
        .into_iter()
        .filter_map(|path| {
            let symbol = path.file_stem()?.to_str()?.to_uppercase();
            Some((symbol, load_file(&path)))
        })
        .collect())
}

/// Check a series before anything downstream sees it.
///
/// Timestamps must be strictly increasing, closes strictly positive, and every other
/// field finite and non-negative.
pub fn validate_series(bars: &[PriceBar]) -> Result<()> {
    if bars.is_empty() {
        return Err(TradingError::EmptySeries);
    }

    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(TradingError::InvalidPrice {
                index: i,
                field: "close",
                value: bar.close,
            });
        }
        let others = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("volume", bar.volume),
        ];
        for (field, value) in others {
            if !value.is_finite() || value < 0.0 {
                return Err(TradingError::InvalidPrice {
                    index: i,
                    field,
                    value,
                });
            }
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(TradingError::NonMonotonicTimestamp {
                index: i,
                previous: bars[i - 1].timestamp,
                current: bar.timestamp,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(day: i64, close: f64) -> PriceBar {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceBar::new(start + Duration::days(day), close, close, close, close, 100.0)
    }

    #[test]
    fn test_valid_series() {
        assert!(validate_series(&[bar(0, 1.0), bar(1, 2.0)]).is_ok());
    }

    #[test]
    fn test_duplicate_timestamp() {
        let err = validate_series(&[bar(0, 1.0), bar(0, 2.0)]).unwrap_err();
        assert!(matches!(err, TradingError::NonMonotonicTimestamp { index: 1, .. }));
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_backwards_timestamp() {
        let err = validate_series(&[bar(1, 1.0), bar(0, 2.0)]).unwrap_err();
        assert!(matches!(err, TradingError::NonMonotonicTimestamp { .. }));
    }

    #[test]
    fn test_non_positive_close() {
        let err = validate_series(&[bar(0, 1.0), bar(1, -2.0)]).unwrap_err();
        assert!(matches!(
            err,
            TradingError::InvalidPrice { index: 1, field: "close", .. }
        ));
    }

    #[test]
    fn test_nan_volume() {
        let mut b = bar(0, 1.0);
        b.volume = f64::NAN;
        assert!(validate_series(&[b]).is_err());
    }

    #[test]
    fn test_empty() {
        assert!(matches!(validate_series(&[]), Err(TradingError::EmptySeries)));
    }

    #[test]
    fn test_load_file_unknown_extension() {
        let result = load_file(Path::new("prices.parquet"));
        assert!(matches!(result, Err(TradingError::DataLoadError(_))));
    }

    #[test]
    fn test_load_dir_keys_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("abc.csv"),
            "timestamp,open,high,low,close,volume\n2024-01-01,1,1,1,1,10\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_dir(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "ABC");
        assert_eq!(loaded[0].1.as_ref().unwrap().len(), 1);
    }
}
