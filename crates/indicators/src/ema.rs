use crate::Streaming;
use rust_decimal::Decimal;
use tbot_core::IndicatorError;

/// Exponential Moving Average (EMA), seeded with the SMA of the first
/// `period` values.
#[derive(Debug, Clone)]
pub struct Ema {
    len: usize,
    multiplier: Decimal,
    current: Option<Decimal>,
    count: usize,
    seed_sum: Decimal,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter("EMA period must be > 0".into()));
        }
        Ok(Self {
            len: period,
            multiplier: Decimal::TWO / (Decimal::from(period) + Decimal::ONE),
            current: None,
            count: 0,
            seed_sum: Decimal::ZERO,
        })
    }

    pub fn value(&self) -> Option<Decimal> {
        self.current
    }
}

impl Streaming for Ema {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        self.count += 1;
        self.current = match self.current {
            Some(prev) => Some((value - prev) * self.multiplier + prev),
            None => {
                self.seed_sum += value;
                (self.count >= self.len).then(|| self.seed_sum / Decimal::from(self.len))
            }
        };
        self.current
    }

    fn reset(&mut self) {
        self.current = None;
        self.count = 0;
        self.seed_sum = Decimal::ZERO;
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }
}
