pub mod counter;
pub mod ema;
pub mod gann;
pub mod moving_average;
pub mod sma;

pub use counter::GannCounter;
pub use ema::Ema;
pub use gann::{GannAnalysis, Leg};
pub use moving_average::{MaKind, MovingAverage};
pub use sma::Sma;

use rust_decimal::Decimal;

/// Trait for streaming (incremental) calculators.
/// Feed one value at a time; the calculator maintains internal state.
pub trait Streaming: Send + Sync {
    /// Process the next value and return the output (if ready).
    fn next(&mut self, value: Decimal) -> Option<Decimal>;

    /// Reset to the initial state.
    fn reset(&mut self);

    fn is_ready(&self) -> bool;
}
