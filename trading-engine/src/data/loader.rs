use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use common::{PriceBar, Result, TradingError};

/// Load bars from CSV file
///
/// Expected columns: timestamp, open, high, low, close, volume. A row with fewer
/// columns is an error naming its line.
pub fn load_csv(path: &Path) -> Result<Vec<PriceBar>> {
    let file = File::open(path).map_err(|e| TradingError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut bars = Vec::new();

    for result in csv_reader.records() {
        let record = result.map_err(|e| TradingError::CsvError(e.to_string()))?;

        if record.len() < 6 {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(TradingError::CsvError(format!(
                "Expected 6 columns at line {}, found {}",
                line,
                record.len()
            )));
        }

        let timestamp = parse_timestamp(&record[0])?;
        let open = parse_field(&record[1], "open")?;
        let high = parse_field(&record[2], "high")?;
        let low = parse_field(&record[3], "low")?;
        let close = parse_field(&record[4], "close")?;
        let volume = parse_field(&record[5], "volume")?;

        bars.push(PriceBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(bars)
}

/// Load bars from JSON file
pub fn load_json(path: &Path) -> Result<Vec<PriceBar>> {
    let file = File::open(path).map_err(|e| TradingError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let bars: Vec<PriceBar> = serde_json::from_reader(reader)?;
    Ok(bars)
}

fn parse_field(raw: &str, name: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .map_err(|_| TradingError::CsvError(format!("Invalid {}: {:?}", name, raw)))
}

/// Parse timestamp from various formats
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    // Try ISO 8601 format first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    for fmt in &datetime_formats {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in &date_formats {
        if let Some(dt) = chrono::NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    // Try Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(TradingError::CsvError(format!(
        "Unable to parse timestamp: {}",
        s
    )))
}
