pub mod pump;
pub mod router;

pub use pump::Subscription;
pub use router::{FeedKey, FeedListener, FeedRouter, ListenerId, RouterError};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use tbot_core::{Candle, CandleSeries, Period};

    pub fn candle(minute: i64, close: i64) -> Candle {
        let time = Utc.with_ymd_and_hms(2024, 5, 6, 13, 30, 0).unwrap() + Duration::minutes(minute);
        let c = Decimal::from(close);
        Candle::new(Period::Min1, time, c, c + Decimal::ONE, c - Decimal::ONE, c, Decimal::TEN).unwrap()
    }

    pub fn series(closes: &[i64]) -> CandleSeries {
        let candles = closes.iter().enumerate().map(|(i, &c)| candle(i as i64, c)).collect();
        CandleSeries::new(Period::Min1, candles, 10).unwrap()
    }
}
