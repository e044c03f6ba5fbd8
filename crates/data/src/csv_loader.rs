use crate::DataError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tbot_core::{Candle, Period};
use tracing::debug;

/// Load candles of `period` from a CSV file.
///
/// Expected columns (case-insensitive, any order):
/// `timestamp` (or `date`, `datetime`, `time`), `open`, `high`, `low`, `close`
/// and optionally `volume`. Rows are returned sorted by time.
pub fn load_candles_from_csv(path: &Path, period: Period) -> Result<Vec<Candle>, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(format!(
            "CSV file not found: {}",
            path.display()
        )));
    }
    let file = std::fs::File::open(path)?;
    let candles = load_candles_from_reader(file, period)?;
    debug!(path = %path.display(), %period, candles = candles.len(), "Loaded candles from CSV");
    Ok(candles)
}

/// Load `<dir>/<symbol>.csv`.
pub fn load_symbol(dir: &Path, symbol: &str, period: Period) -> Result<Vec<Candle>, DataError> {
    load_candles_from_csv(&dir.join(format!("{symbol}.csv")), period)
}

pub fn load_candles_from_reader<R: Read>(reader: R, period: Period) -> Result<Vec<Candle>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| DataError::Parse(format!("Failed to read headers: {e}")))?
        .clone();
    let cols = resolve_columns(&headers)?;

    let mut candles = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::Parse(format!("CSV record error: {e}")))?;
        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .ok_or_else(|| DataError::Parse(format!("Row {}: missing {name}", row + 1)))
        };

        let time = parse_timestamp(field(cols.timestamp, "timestamp")?)?;
        let open = parse_decimal(field(cols.open, "open")?, "open")?;
        let high = parse_decimal(field(cols.high, "high")?, "high")?;
        let low = parse_decimal(field(cols.low, "low")?, "low")?;
        let close = parse_decimal(field(cols.close, "close")?, "close")?;
        let volume = match cols.volume {
            Some(idx) => parse_decimal(field(idx, "volume")?, "volume")?,
            None => Decimal::ZERO,
        };

        let candle = Candle::new(period, time, open, high, low, close, volume)
            .map_err(|e| DataError::Parse(format!("Row {}: {e}", row + 1)))?;
        candles.push(candle);
    }

    candles.sort_by_key(|c| c.time());
    Ok(candles)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct ColumnMap {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnMap, DataError> {
    let required = |names: &[&str], label: &str| {
        find_column(headers, names).ok_or_else(|| DataError::Parse(format!("No {label} column found")))
    };

    Ok(ColumnMap {
        timestamp: required(&["timestamp", "date", "datetime", "time"], "timestamp")?,
        open: required(&["open", "o"], "open")?,
        high: required(&["high", "h"], "high")?,
        low: required(&["low", "l"], "low")?,
        close: required(&["close", "c"], "close")?,
        volume: find_column(headers, &["volume", "vol", "v"]),
    })
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn parse_decimal(s: &str, field: &str) -> Result<Decimal, DataError> {
    Decimal::from_str(s.trim())
        .or_else(|_| Decimal::from_scientific(s.trim()))
        .map_err(|e| DataError::Parse(format!("Failed to parse {field} '{s}': {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DataError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Naive formats are taken as UTC.
    const FORMATS: [&str; 8] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y%m%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    // Unix seconds
    if let Some(dt) = s.parse::<i64>().ok().and_then(|ts| DateTime::from_timestamp(ts, 0)) {
        return Ok(dt);
    }

    Err(DataError::Parse(format!("Unable to parse timestamp: '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_load_with_aliases_and_sorting() {
        let csv = "Date,O,H,L,C,Vol\n\
                   2024-01-02 09:31:00,10,11,9,10.5,100\n\
                   2024-01-02 09:30:00,9.5,10,9,10,50\n";
        let candles = load_candles_from_reader(csv.as_bytes(), Period::Min1).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time(), Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap());
        assert_eq!(candles[1].close(), dec!(10.5));
        assert_eq!(candles[1].volume(), dec!(100));
    }

    #[test]
    fn test_volume_is_optional() {
        let csv = "timestamp,open,high,low,close\n1704187800,1,2,0.5,1.5\n";
        let candles = load_candles_from_reader(csv.as_bytes(), Period::Min5).unwrap();
        assert_eq!(candles[0].volume(), Decimal::ZERO);
        assert_eq!(candles[0].period(), Period::Min5);
        assert_eq!(candles[0].time(), Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_rfc3339_and_date_only() {
        assert_eq!(
            parse_timestamp("2024-01-02T10:30:00+01:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-01-02").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_invalid_candle_rejected() {
        let csv = "time,open,high,low,close\n2024-01-02,10,9,11,10\n";
        match load_candles_from_reader(csv.as_bytes(), Period::Day1) {
            Err(DataError::Parse(msg)) => assert!(msg.contains("Row 1")),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column() {
        let csv = "time,open,high,close\n2024-01-02,10,11,10\n";
        assert!(matches!(
            load_candles_from_reader(csv.as_bytes(), Period::Day1),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = load_candles_from_csv(Path::new("/nonexistent/ES.csv"), Period::Min1);
        assert!(matches!(result, Err(DataError::NotFound(_))));
    }
}
