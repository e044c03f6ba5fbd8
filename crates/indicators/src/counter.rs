use crate::gann::plain_directions;
use tbot_core::{CandleSeries, Indicator, IndicatorError, IndicatorValue};

/// Plain Gann bar count: every bar is compared with the one before it and
/// inside or outside bars repeat the previous direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct GannCounter;

impl Indicator for GannCounter {
    fn name(&self) -> &str {
        "gann_counter"
    }

    fn calculate(&self, series: &CandleSeries) -> Result<Vec<IndicatorValue>, IndicatorError> {
        if series.is_empty() {
            return Err(IndicatorError::EmptySeries);
        }
        Ok(plain_directions(series.candles())
            .into_iter()
            .map(IndicatorValue::Direction)
            .collect())
    }
}
