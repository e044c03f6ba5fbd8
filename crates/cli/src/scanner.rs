use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tbot_core::{CandleSeries, Direction};
use tbot_feed::{FeedKey, FeedListener};
use tbot_indicators::GannAnalysis;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Abc,
    Uturn,
}

/// A pattern seen on the newest candle of a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub feed: String,
    pub time: DateTime<Utc>,
    pub kind: SignalKind,
    pub direction: Direction,
}

pub type SignalLog = Arc<Mutex<Vec<Signal>>>;

/// Watches a feed's Gann analysis and records ABC and UTURN marks that land
/// on the newest candle.
///
/// A mark sits on the extreme of the leg that completes the pattern, so it
/// moves forward each time that leg extends. Each pattern is recorded once,
/// keyed by the start of its leg.
pub struct AbcScanner {
    indicator: String,
    signals: SignalLog,
    reported: HashMap<(String, SignalKind), DateTime<Utc>>,
}

impl AbcScanner {
    pub fn new(indicator: impl Into<String>, signals: SignalLog) -> Self {
        Self {
            indicator: indicator.into(),
            signals,
            reported: HashMap::new(),
        }
    }

    fn is_new(&mut self, key: &FeedKey, kind: SignalKind, leg_start: Option<DateTime<Utc>>) -> bool {
        let Some(start) = leg_start else {
            return true;
        };
        let slot = (key.to_string(), kind);
        if self.reported.get(&slot) == Some(&start) {
            debug!(feed = %key, ?kind, leg_start = %start, "Pattern already reported for this leg");
            return false;
        }
        self.reported.insert(slot, start);
        true
    }

    fn record(&self, key: &FeedKey, time: DateTime<Utc>, kind: SignalKind, direction: Direction) {
        // An up ABC sets up a short entry and vice versa.
        let bias = match direction {
            Direction::Up => "short",
            Direction::Down => "long",
        };
        match kind {
            SignalKind::Abc => info!(feed = %key, %time, %direction, bias, "ABC detected"),
            SignalKind::Uturn => info!(feed = %key, %time, %direction, "UTURN confirmed"),
        }
        self.signals.lock().push(Signal {
            feed: key.to_string(),
            time,
            kind,
            direction,
        });
    }
}

impl FeedListener for AbcScanner {
    fn on_update(&mut self, key: &FeedKey, series: &CandleSeries) {
        let Ok(candle) = series.last() else {
            return;
        };
        let Some(record) = series
            .indicator(&self.indicator)
            .and_then(|i| i.last())
            .and_then(|v| v.as_pattern())
            .copied()
        else {
            debug!(feed = %key, indicator = %self.indicator, "No pattern output to scan");
            return;
        };

        if record.abc.is_none() && record.uturn.is_none() {
            return;
        }

        // Only the forming leg can end on the newest candle.
        let leg_start = GannAnalysis::legs(series.candles())
            .last()
            .and_then(|leg| series.get(leg.start_index))
            .map(|c| c.time());

        if let Some(direction) = record.abc {
            if self.is_new(key, SignalKind::Abc, leg_start) {
                self.record(key, candle.time(), SignalKind::Abc, direction);
            }
        }
        if let Some(direction) = record.uturn {
            if self.is_new(key, SignalKind::Uturn, leg_start) {
                self.record(key, candle.time(), SignalKind::Uturn, direction);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use tbot_core::{Candle, Period};
    use tbot_feed::FeedRouter;
    use tbot_indicators::GannAnalysis;

    fn bar(i: i64, high: i64, low: i64) -> Candle {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap() + Duration::minutes(i);
        let (h, l) = (Decimal::from(high), Decimal::from(low));
        Candle::new(Period::Min1, time, l, h, l, h, Decimal::ONE).unwrap()
    }

    #[test]
    fn test_scanner_records_abc_and_uturn_on_new_bar() {
        let ranges = [(100, 95), (102, 97), (101, 96), (105, 99), (99, 90), (103, 92), (101, 88)];
        let candles: Vec<Candle> = ranges.iter().enumerate().map(|(i, &(h, l))| bar(i as i64, h, l)).collect();

        let mut series = CandleSeries::new(Period::Min1, candles[..6].to_vec(), 50).unwrap();
        series.register_indicator("gann", GannAnalysis::new()).unwrap();

        let signals = SignalLog::default();
        let mut router = FeedRouter::new();
        let key = router.add_feed("ES", series).unwrap();
        router.add_listener(key.clone(), AbcScanner::new("gann", signals.clone()));

        router.update(&key, candles[6].clone()).unwrap();

        let seen = signals.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].kind, SignalKind::Abc);
        assert_eq!(seen[0].direction, Direction::Down);
        assert_eq!(seen[1].kind, SignalKind::Uturn);
        assert_eq!(seen[1].feed, "ES_1m");
        assert_eq!(seen[1].time, candles[6].time());
    }

    #[test]
    fn test_scanner_reports_extended_leg_once() {
        let ranges = [
            (100, 95),
            (102, 97),
            (101, 96),
            (105, 99),
            (99, 90),
            (103, 92),
            (101, 88),
            (100, 85),
        ];
        let candles: Vec<Candle> = ranges.iter().enumerate().map(|(i, &(h, l))| bar(i as i64, h, l)).collect();

        let mut series = CandleSeries::new(Period::Min1, candles[..6].to_vec(), 50).unwrap();
        series.register_indicator("gann", GannAnalysis::new()).unwrap();

        let signals = SignalLog::default();
        let mut router = FeedRouter::new();
        let key = router.add_feed("ES", series).unwrap();
        router.add_listener(key.clone(), AbcScanner::new("gann", signals.clone()));

        router.update(&key, candles[6].clone()).unwrap();
        router.update(&key, candles[7].clone()).unwrap();

        // The down leg extends to a new low on the last bar and carries both
        // marks along with it.
        let last = router
            .series(&key)
            .and_then(|s| s.indicator("gann"))
            .and_then(|i| i.last())
            .and_then(|v| v.as_pattern())
            .copied()
            .unwrap();
        assert_eq!(last.abc, Some(Direction::Down));
        assert_eq!(last.uturn, Some(Direction::Down));

        let seen = signals.lock().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|s| s.time == candles[6].time()));
    }

    #[test]
    fn test_scanner_ignores_missing_indicator() {
        let signals = SignalLog::default();
        let mut scanner = AbcScanner::new("gann", signals.clone());
        let series = CandleSeries::new(Period::Min1, vec![bar(0, 10, 5)], 5).unwrap();
        scanner.on_update(&FeedKey::new("ES", Period::Min1), &series);
        assert!(signals.lock().is_empty());
    }
}
