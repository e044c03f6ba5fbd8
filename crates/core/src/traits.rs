use crate::models::*;
use crate::series::CandleSeries;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tbot_queues::{CompletionQueue, UpdateQueue};

// ---------------------------------------------------------------------------
// Indicator Trait
// ---------------------------------------------------------------------------

/// One output element of an indicator, aligned with a candle of the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IndicatorValue {
    Pattern(PatternRecord),
    Direction(Direction),
    /// `None` while the indicator is still warming up.
    Price(Option<Decimal>),
}

impl IndicatorValue {
    pub fn as_pattern(&self) -> Option<&PatternRecord> {
        match self {
            IndicatorValue::Pattern(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_direction(&self) -> Option<Direction> {
        match self {
            IndicatorValue::Direction(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_price(&self) -> Option<Decimal> {
        match self {
            IndicatorValue::Price(p) => *p,
            _ => None,
        }
    }
}

/// Errors raised while evaluating an indicator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("Cannot evaluate an indicator on an empty series")]
    EmptySeries,
    #[error("Invalid indicator parameter: {0}")]
    InvalidParameter(String),
    #[error("Indicator produced {got} values for {expected} candles")]
    Misaligned { expected: usize, got: usize },
}

/// An analysis attached to a [`CandleSeries`].
///
/// `calculate` is a pure function of the series contents and must return
/// exactly one value per candle. The series re-runs it on every append and
/// keeps the latest result.
pub trait Indicator: Send + Sync {
    /// Short description used in logs.
    fn name(&self) -> &str;

    fn calculate(&self, series: &CandleSeries) -> Result<Vec<IndicatorValue>, IndicatorError>;
}

// ---------------------------------------------------------------------------
// Broker Source Trait
// ---------------------------------------------------------------------------

/// Identifies one outstanding history request or bar subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// Item type of a bar stream. Upstream failures travel in-band so the consumer
/// sees them on its next read of the queue.
pub type BarUpdate = Result<Candle, SourceError>;

/// Errors that can occur while talking to a market data source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("Source is not connected")]
    NotConnected,
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("No data for {symbol} {period}")]
    UnknownInstrument { symbol: String, period: Period },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unknown request: {0}")]
    UnknownRequest(RequestId),
    #[error("Source disconnected")]
    Disconnected,
    #[error("Malformed data: {0}")]
    Malformed(String),
}

/// A market data source that answers on its own background thread.
///
/// Every call hands over the queue the responses should land in; the caller
/// keeps a clone and waits on it with the [`Poller`](tbot_queues::Poller).
/// Errors detected before anything is delivered are returned directly.
pub trait BrokerSource: Send {
    fn connect(&mut self) -> Result<(), SourceError>;

    fn disconnect(&mut self) -> Result<(), SourceError>;

    fn is_connected(&self) -> bool;

    /// Deliver up to `count` historical candles into `queue`, then complete it.
    fn request_history(
        &mut self,
        queue: CompletionQueue<Candle>,
        symbol: &str,
        period: Period,
        count: usize,
    ) -> Result<RequestId, SourceError>;

    /// Stream new candles into `queue` as they close.
    fn subscribe_bars(
        &mut self,
        queue: UpdateQueue<BarUpdate>,
        symbol: &str,
        period: Period,
    ) -> Result<RequestId, SourceError>;

    /// Stop an outstanding request or subscription.
    fn cancel(&mut self, request: RequestId) -> Result<(), SourceError>;
}
