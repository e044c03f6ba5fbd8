use crate::{Ema, Sma, Streaming};
use serde::{Deserialize, Serialize};
use tbot_core::{CandleSeries, Indicator, IndicatorError, IndicatorValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaKind {
    Sma,
    Ema,
}

/// Moving average of closes as a series indicator. Candles inside the warm-up
/// window map to `Price(None)`.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    kind: MaKind,
    period: usize,
    name: String,
}

impl MovingAverage {
    pub fn new(kind: MaKind, period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "moving average period must be > 0".into(),
            ));
        }
        let name = match kind {
            MaKind::Sma => format!("sma_{period}"),
            MaKind::Ema => format!("ema_{period}"),
        };
        Ok(Self { kind, period, name })
    }

    pub fn kind(&self) -> MaKind {
        self.kind
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn calculator(&self) -> Result<Box<dyn Streaming>, IndicatorError> {
        Ok(match self.kind {
            MaKind::Sma => Box::new(Sma::new(self.period)?),
            MaKind::Ema => Box::new(Ema::new(self.period)?),
        })
    }
}

impl Indicator for MovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn calculate(&self, series: &CandleSeries) -> Result<Vec<IndicatorValue>, IndicatorError> {
        let mut calc = self.calculator()?;
        Ok(series
            .iter()
            .map(|c| IndicatorValue::Price(calc.next(c.close())))
            .collect())
    }
}
