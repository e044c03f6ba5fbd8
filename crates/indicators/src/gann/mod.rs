//! Gann bar counting with hoagies, leg aggregation, ABC and UTURN detection.
//!
//! The analysis runs in four stages over the whole window: bar directions,
//! legs built from runs of equal direction, ABC patterns over consecutive leg
//! triples, and UTURN reversals tracked across all legs.

mod abc;
mod bars;
mod legs;
mod uturn;

pub use legs::Leg;

pub(crate) use bars::plain_directions;

use tbot_core::{Candle, CandleSeries, Indicator, IndicatorError, IndicatorValue, PatternRecord};
use tracing::trace;

/// Gann analysis as a series indicator. Emits one
/// [`IndicatorValue::Pattern`] per candle.
#[derive(Debug, Clone, Copy, Default)]
pub struct GannAnalysis;

impl GannAnalysis {
    pub fn new() -> Self {
        Self
    }

    /// Run all four stages over `candles`.
    pub fn analyze(candles: &[Candle]) -> Result<Vec<PatternRecord>, IndicatorError> {
        if candles.is_empty() {
            return Err(IndicatorError::EmptySeries);
        }

        let dirs = bars::bar_directions(candles);
        let legs = legs::build_legs(candles, &dirs);
        let abcs = abc::abc_marks(candles.len(), &legs);
        let uturns = uturn::uturn_marks(candles.len(), &legs);
        trace!(bars = candles.len(), legs = legs.len(), "Gann analysis complete");

        Ok(dirs
            .into_iter()
            .zip(abcs)
            .zip(uturns)
            .map(|((bar_direction, abc), uturn)| PatternRecord {
                bar_direction,
                abc,
                uturn,
            })
            .collect())
    }

    /// Legs of `candles`, including the one still forming.
    pub fn legs(candles: &[Candle]) -> Vec<Leg> {
        legs::build_legs(candles, &bars::bar_directions(candles))
    }
}

impl Indicator for GannAnalysis {
    fn name(&self) -> &str {
        "gann_analysis"
    }

    fn calculate(&self, series: &CandleSeries) -> Result<Vec<IndicatorValue>, IndicatorError> {
        let records = Self::analyze(series.candles())?;
        Ok(records.into_iter().map(IndicatorValue::Pattern).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bar, bars, series};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tbot_core::Direction::{Down, Up};
    use tbot_core::{Direction, SeriesError};

    fn golden() -> Vec<Candle> {
        bars(
            &[
                (dec!(100), dec!(95)),
                (dec!(102), dec!(97)),
                (dec!(101), dec!(96)),
                (dec!(105), dec!(99)),
                (dec!(99), dec!(90)),
            ],
            true,
        )
    }

    fn golden_extended() -> Vec<Candle> {
        let mut candles = golden();
        candles.push(bar(5, dec!(92), dec!(103), dec!(92), dec!(103)));
        candles.push(bar(6, dec!(101), dec!(101), dec!(88), dec!(88)));
        candles
    }

    fn directions(records: &[PatternRecord]) -> Vec<Direction> {
        records.iter().map(|r| r.bar_direction).collect()
    }

    #[test]
    fn test_golden_fixture() {
        let records = GannAnalysis::analyze(&golden()).unwrap();
        assert_eq!(directions(&records), vec![Up, Up, Down, Up, Down]);

        let abcs: Vec<_> = records.iter().map(|r| r.abc).collect();
        assert_eq!(abcs, vec![None, None, None, Some(Up), None]);
        assert!(records.iter().all(|r| r.uturn.is_none()));
    }

    #[test]
    fn test_golden_fixture_extended() {
        let candles = golden_extended();
        let records = GannAnalysis::analyze(&candles).unwrap();
        assert_eq!(directions(&records), vec![Up, Up, Down, Up, Down, Up, Down]);
        assert_eq!(records[3].abc, Some(Up));
        assert_eq!(records[6].abc, Some(Down));
        assert_eq!(records[6].uturn, Some(Down));
        assert_eq!(records.iter().filter(|r| r.uturn.is_some()).count(), 1);

        let legs = GannAnalysis::legs(&candles);
        assert_eq!(legs.len(), 6);
        assert_eq!(
            legs[4],
            Leg {
                direction: Up,
                start_index: 4,
                end_index: 5,
                low: dec!(90),
                high: dec!(103),
            }
        );
        assert_eq!(
            legs[5],
            Leg {
                direction: Down,
                start_index: 5,
                end_index: 6,
                low: dec!(88),
                high: dec!(103),
            }
        );
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(GannAnalysis::analyze(&[]), Err(IndicatorError::EmptySeries));
    }

    #[test]
    fn test_empty_series_cannot_register() {
        let mut empty = CandleSeries::new(tbot_core::Period::Min1, vec![], 4).unwrap();
        assert!(matches!(
            empty.register_indicator("gann", GannAnalysis::new()),
            Err(SeriesError::Indicator {
                source: IndicatorError::EmptySeries,
                ..
            })
        ));
    }

    #[test]
    fn test_series_recomputes_on_append() {
        let candles = golden_extended();
        let mut s = series(candles[..5].to_vec());
        s.register_indicator("gann", GannAnalysis::new()).unwrap();
        let last = s.indicator("gann").unwrap().last().and_then(|v| v.as_pattern()).copied();
        assert_eq!(last.map(|r| r.bar_direction), Some(Down));
        assert_eq!(last.and_then(|r| r.uturn), None);

        // Capacity is 5, so these appends slide the window.
        s.append(candles[5].clone()).unwrap();
        s.append(candles[6].clone()).unwrap();
        let data = s.indicator("gann").unwrap().data();
        assert_eq!(data.len(), 5);
        let expected: Vec<IndicatorValue> = GannAnalysis::analyze(s.candles())
            .unwrap()
            .into_iter()
            .map(IndicatorValue::Pattern)
            .collect();
        assert_eq!(data, expected.as_slice());
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let s = series(golden_extended());
        let first = GannAnalysis.calculate(&s).unwrap();
        let second = GannAnalysis.calculate(&s).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn test_rising_bars_are_all_up(
            start in 1i64..10_000,
            steps in prop::collection::vec((1i64..50, 1i64..50), 1..60),
            width in 1i64..100,
        ) {
            let mut low = Decimal::from(start);
            let mut high = low + Decimal::from(width);
            let mut candles = vec![bar(0, low, high, low, high)];
            for (i, (dl, dh)) in steps.iter().enumerate() {
                low += Decimal::from(*dl);
                high = (high + Decimal::from(*dh)).max(low + Decimal::ONE);
                candles.push(bar(i as i64 + 1, low, high, low, high));
            }

            let records = GannAnalysis::analyze(&candles).unwrap();
            prop_assert_eq!(records.len(), candles.len());
            prop_assert!(records[1..].iter().all(|r| r.bar_direction == Up));
        }
    }
}
