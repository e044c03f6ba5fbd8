use super::legs::Leg;
use rust_decimal::Decimal;
use tbot_core::Direction;

/// Mark confirmed trend reversals.
///
/// The trend and its critical high/low are seeded from the first leg. In an
/// up trend a counter-leg that undercuts the critical low arms a reversal at
/// that low; a later down leg that breaks the armed level confirms it, unless
/// an up leg makes a new critical high first. Down trends mirror this.
pub(crate) fn uturn_marks(len: usize, legs: &[Leg]) -> Vec<Option<Direction>> {
    let mut marks = vec![None; len];
    let Some(first) = legs.first() else {
        return marks;
    };

    let mut trend = first.direction;
    let mut crit_high = first.high;
    let mut crit_low = first.low;
    let mut armed: Option<Decimal> = None;

    for leg in &legs[1..] {
        match (armed, trend, leg.direction) {
            (None, Direction::Up, Direction::Up) => {
                if leg.high >= crit_high {
                    crit_high = leg.high;
                }
            }
            (None, Direction::Up, Direction::Down) => {
                if leg.low >= crit_low {
                    crit_low = leg.low;
                } else {
                    armed = Some(leg.low);
                }
            }
            (None, Direction::Down, Direction::Down) => {
                if leg.low <= crit_low {
                    crit_low = leg.low;
                }
            }
            (None, Direction::Down, Direction::Up) => {
                if leg.high <= crit_high {
                    crit_high = leg.high;
                } else {
                    armed = Some(leg.high);
                }
            }
            (Some(_), Direction::Up, Direction::Up) => {
                if leg.high >= crit_high {
                    crit_high = leg.high;
                    armed = None;
                }
            }
            (Some(level), Direction::Up, Direction::Down) => {
                if leg.low < level {
                    confirm(&mut marks, leg, Direction::Down);
                    trend = Direction::Down;
                    crit_high = leg.high;
                    crit_low = leg.low;
                    armed = None;
                }
            }
            (Some(_), Direction::Down, Direction::Down) => {
                if leg.low <= crit_low {
                    crit_low = leg.low;
                    armed = None;
                }
            }
            (Some(level), Direction::Down, Direction::Up) => {
                if leg.high > level {
                    confirm(&mut marks, leg, Direction::Up);
                    trend = Direction::Up;
                    crit_high = leg.high;
                    crit_low = leg.low;
                    armed = None;
                }
            }
        }
    }

    marks
}

fn confirm(marks: &mut [Option<Direction>], leg: &Leg, direction: Direction) {
    if let Some(mark) = marks.get_mut(leg.end_index) {
        *mark = Some(direction);
    }
}
