use crate::Streaming;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use tbot_core::IndicatorError;

/// Simple Moving Average (SMA).
#[derive(Debug, Clone)]
pub struct Sma {
    len: usize,
    window: VecDeque<Decimal>,
    sum: Decimal,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameter("SMA period must be > 0".into()));
        }
        Ok(Self {
            len: period,
            window: VecDeque::with_capacity(period + 1),
            sum: Decimal::ZERO,
        })
    }

    /// Current average without feeding new data.
    pub fn value(&self) -> Option<Decimal> {
        self.is_ready().then(|| self.sum / Decimal::from(self.len))
    }
}

impl Streaming for Sma {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        self.sum += value;
        self.window.push_back(value);
        if self.window.len() > self.len {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        self.value()
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = Decimal::ZERO;
    }

    fn is_ready(&self) -> bool {
        self.window.len() == self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sma_window_slides() {
        let mut sma = Sma::new(3).unwrap();
        let out: Vec<_> = [1, 2, 3, 4, 5].into_iter().map(|v| sma.next(Decimal::from(v))).collect();
        assert_eq!(out, vec![None, None, Some(dec!(2)), Some(dec!(3)), Some(dec!(4))]);
    }

    #[test]
    fn test_sma_reset() {
        let mut sma = Sma::new(2).unwrap();
        sma.next(dec!(10));
        sma.next(dec!(20));
        sma.reset();
        assert!(!sma.is_ready());
        assert_eq!(sma.next(dec!(5)), None);
        assert_eq!(sma.next(dec!(15)), Some(dec!(10)));
    }

    #[test]
    fn test_sma_zero_period() {
        assert!(Sma::new(0).is_err());
    }
}
