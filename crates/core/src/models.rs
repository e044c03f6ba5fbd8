use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// The length of time covered by one candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "2m")]
    Min2,
    #[serde(rename = "3m")]
    Min3,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "10m")]
    Min10,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

/// Returned when a string or duration does not name a known [`Period`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown candle period '{0}'")]
pub struct UnknownPeriod(pub String);

impl Period {
    pub const ALL: [Period; 11] = [
        Period::Min1,
        Period::Min2,
        Period::Min3,
        Period::Min5,
        Period::Min10,
        Period::Min15,
        Period::Min30,
        Period::Hour1,
        Period::Hour4,
        Period::Day1,
        Period::Week1,
    ];

    /// Short label, e.g. `"5m"` or `"1d"`.
    pub fn label(&self) -> &'static str {
        match self {
            Period::Min1 => "1m",
            Period::Min2 => "2m",
            Period::Min3 => "3m",
            Period::Min5 => "5m",
            Period::Min10 => "10m",
            Period::Min15 => "15m",
            Period::Min30 => "30m",
            Period::Hour1 => "1h",
            Period::Hour4 => "4h",
            Period::Day1 => "1d",
            Period::Week1 => "1w",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Period::Min1 => Duration::minutes(1),
            Period::Min2 => Duration::minutes(2),
            Period::Min3 => Duration::minutes(3),
            Period::Min5 => Duration::minutes(5),
            Period::Min10 => Duration::minutes(10),
            Period::Min15 => Duration::minutes(15),
            Period::Min30 => Duration::minutes(30),
            Period::Hour1 => Duration::hours(1),
            Period::Hour4 => Duration::hours(4),
            Period::Day1 => Duration::days(1),
            Period::Week1 => Duration::weeks(1),
        }
    }

    pub fn from_duration(duration: Duration) -> Result<Self, UnknownPeriod> {
        Self::ALL
            .into_iter()
            .find(|p| p.duration() == duration)
            .ok_or_else(|| UnknownPeriod(format!("{}s", duration.num_seconds())))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPeriod(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Candle
// ---------------------------------------------------------------------------

/// Errors raised when constructing a [`Candle`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CandleError {
    #[error("Candle at {time} has an inconsistent range: O={open} H={high} L={low} C={close}")]
    InvalidRange {
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    },
}

/// A single OHLCV sample. Immutable once built; `low` and `high` always bound
/// `open` and `close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CandleFields")]
pub struct Candle {
    period: Period,
    /// Time the candle opened.
    time: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

#[derive(Deserialize)]
struct CandleFields {
    period: Period,
    time: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

impl TryFrom<CandleFields> for Candle {
    type Error = CandleError;

    fn try_from(f: CandleFields) -> Result<Self, Self::Error> {
        Candle::new(f.period, f.time, f.open, f.high, f.low, f.close, f.volume)
    }
}

impl Candle {
    pub fn new(
        period: Period,
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self, CandleError> {
        let bounded = low <= high
            && low <= open
            && low <= close
            && high >= open
            && high >= close;
        if !bounded {
            return Err(CandleError::InvalidRange {
                time,
                open,
                high,
                low,
                close,
            });
        }

        Ok(Self {
            period,
            time,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }
}

impl fmt::Display for Candle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Time: {}, O: {}, H: {}, L: {}, C: {}, Vol: {}",
            self.time, self.open, self.high, self.low, self.close, self.volume
        )
    }
}

// ---------------------------------------------------------------------------
// Pattern output
// ---------------------------------------------------------------------------

/// Direction of a bar, leg, or pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("UP"),
            Direction::Down => f.write_str("DOWN"),
        }
    }
}

/// Gann analysis output for one candle, index-aligned with its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub bar_direction: Direction,
    /// Set on the bar where an ABC pattern's C leg made its extreme.
    pub abc: Option<Direction>,
    /// Set on the bar where a trend reversal was confirmed.
    pub uturn: Option<Direction>,
}
