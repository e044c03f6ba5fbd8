use crate::models::*;
use crate::traits::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Errors returned by [`CandleSeries`] operations. A failed call leaves the
/// series exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Candle period {got} does not match series period {expected}")]
    TypeMismatch { expected: Period, got: Period },
    #[error("Candle at {got} is older than the last candle at {last}")]
    OutOfOrder {
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },
    #[error("Indicator '{0}' is already registered")]
    DuplicateName(String),
    #[error("Series is empty")]
    EmptySeries,
    #[error("Indicator '{name}' failed: {source}")]
    Indicator {
        name: String,
        #[source]
        source: IndicatorError,
    },
}

/// An indicator attached to a series together with its latest output.
pub struct RegisteredIndicator {
    indicator: Box<dyn Indicator>,
    data: Vec<IndicatorValue>,
}

impl RegisteredIndicator {
    pub fn indicator(&self) -> &dyn Indicator {
        self.indicator.as_ref()
    }

    /// Output for every candle, index-aligned with the series.
    pub fn data(&self) -> &[IndicatorValue] {
        &self.data
    }

    /// Output for the most recent candle.
    pub fn last(&self) -> Option<&IndicatorValue> {
        self.data.last()
    }
}

impl fmt::Debug for RegisteredIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredIndicator")
            .field("indicator", &self.indicator.name())
            .field("len", &self.data.len())
            .finish()
    }
}

/// Fixed-capacity, time-ordered candle history for one symbol and period.
///
/// Appending past capacity evicts the oldest candle. Every attached indicator
/// is recomputed over the whole window after each append.
#[derive(Debug)]
pub struct CandleSeries {
    period: Period,
    capacity: usize,
    candles: Vec<Candle>,
    indicators: BTreeMap<String, RegisteredIndicator>,
}

impl CandleSeries {
    /// Build a series from an initial batch, keeping the most recent
    /// `capacity` candles.
    pub fn new(period: Period, initial: Vec<Candle>, capacity: usize) -> Result<Self, SeriesError> {
        if capacity < 2 {
            return Err(SeriesError::InvalidArgument(format!(
                "capacity must be at least 2, got {capacity}"
            )));
        }
        if let Some(bad) = initial.iter().find(|c| c.period() != period) {
            return Err(SeriesError::InvalidArgument(format!(
                "candle at {} has period {}, expected {period}",
                bad.time(),
                bad.period()
            )));
        }
        if initial.windows(2).any(|w| w[1].time() < w[0].time()) {
            return Err(SeriesError::InvalidArgument(
                "initial candles are not in time order".into(),
            ));
        }

        let mut candles = initial;
        if candles.len() > capacity {
            let excess = candles.len() - capacity;
            candles.drain(..excess);
        }
        candles.reserve_exact(capacity + 1 - candles.len());

        Ok(Self {
            period,
            capacity,
            candles,
            indicators: BTreeMap::new(),
        })
    }

    /// Append a candle, evict the oldest if over capacity, then recompute
    /// every indicator. If an indicator fails the append is undone.
    pub fn append(&mut self, candle: Candle) -> Result<(), SeriesError> {
        if candle.period() != self.period {
            return Err(SeriesError::TypeMismatch {
                expected: self.period,
                got: candle.period(),
            });
        }
        if let Some(last) = self.candles.last() {
            if candle.time() < last.time() {
                return Err(SeriesError::OutOfOrder {
                    last: last.time(),
                    got: candle.time(),
                });
            }
        }

        self.candles.push(candle);
        let evicted = if self.candles.len() > self.capacity {
            Some(self.candles.remove(0))
        } else {
            None
        };

        match self.recompute_all() {
            Ok(results) => {
                for (registered, data) in self.indicators.values_mut().zip(results) {
                    registered.data = data;
                }
                if evicted.is_some() {
                    debug!(period = %self.period, len = self.candles.len(), "Evicted oldest candle");
                }
                Ok(())
            }
            Err(e) => {
                self.candles.pop();
                if let Some(oldest) = evicted {
                    self.candles.insert(0, oldest);
                }
                Err(e)
            }
        }
    }

    /// Attach an indicator under `name` and evaluate it once.
    pub fn register_indicator<I>(&mut self, name: impl Into<String>, indicator: I) -> Result<(), SeriesError>
    where
        I: Indicator + 'static,
    {
        let name = name.into();
        if self.indicators.contains_key(&name) {
            return Err(SeriesError::DuplicateName(name));
        }

        let data = self.evaluate(&name, &indicator)?;
        debug!(period = %self.period, name = %name, kind = indicator.name(), "Registered indicator");
        self.indicators.insert(
            name,
            RegisteredIndicator {
                indicator: Box::new(indicator),
                data,
            },
        );
        Ok(())
    }

    /// Detach and return the indicator registered under `name`, if any.
    pub fn unregister_indicator(&mut self, name: &str) -> Option<RegisteredIndicator> {
        self.indicators.remove(name)
    }

    pub fn indicator(&self, name: &str) -> Option<&RegisteredIndicator> {
        self.indicators.get(name)
    }

    pub fn indicators(&self) -> impl Iterator<Item = (&str, &RegisteredIndicator)> {
        self.indicators.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn last(&self) -> Result<&Candle, SeriesError> {
        self.candles.last().ok_or(SeriesError::EmptySeries)
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn period(&self) -> Period {
        self.period
    }

    fn recompute_all(&self) -> Result<Vec<Vec<IndicatorValue>>, SeriesError> {
        self.indicators
            .iter()
            .map(|(name, registered)| self.evaluate(name, registered.indicator.as_ref()))
            .collect()
    }

    fn evaluate(&self, name: &str, indicator: &dyn Indicator) -> Result<Vec<IndicatorValue>, SeriesError> {
        let wrap = |source| SeriesError::Indicator {
            name: name.to_string(),
            source,
        };
        let data = indicator.calculate(self).map_err(wrap)?;
        if data.len() != self.candles.len() {
            return Err(wrap(IndicatorError::Misaligned {
                expected: self.candles.len(),
                got: data.len(),
            }));
        }
        Ok(data)
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
