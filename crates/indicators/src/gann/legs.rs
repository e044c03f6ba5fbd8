use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tbot_core::{Candle, Direction};

/// A run of same-direction bars.
///
/// Consecutive legs share a pivot: each leg starts where the previous one made
/// its extreme, and inherits the opposite extreme from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub direction: Direction,
    pub start_index: usize,
    /// Bar where the leg set its extreme.
    pub end_index: usize,
    pub low: Decimal,
    pub high: Decimal,
}

/// Aggregate bar directions into legs. The last leg may still be forming.
pub(crate) fn build_legs(candles: &[Candle], dirs: &[Direction]) -> Vec<Leg> {
    let (Some(first), Some(&first_dir)) = (candles.first(), dirs.first()) else {
        return Vec::new();
    };

    let mut legs = Vec::new();
    let mut curr = Leg {
        direction: first_dir,
        start_index: 0,
        end_index: 0,
        low: first.low(),
        high: first.high(),
    };

    for (i, (candle, &dir)) in candles.iter().zip(dirs).enumerate().skip(1) {
        if dir != curr.direction {
            let prev = curr;
            legs.push(prev);
            curr = match dir {
                Direction::Up => Leg {
                    direction: dir,
                    start_index: prev.end_index,
                    end_index: i,
                    low: prev.low,
                    high: candle.high(),
                },
                Direction::Down => Leg {
                    direction: dir,
                    start_index: prev.end_index,
                    end_index: i,
                    low: candle.low(),
                    high: prev.high,
                },
            };
        }

        match dir {
            Direction::Up if candle.high() > curr.high => {
                curr.high = candle.high();
                curr.end_index = i;
            }
            Direction::Down if candle.low() < curr.low => {
                curr.low = candle.low();
                curr.end_index = i;
            }
            _ => {}
        }
    }

    legs.push(curr);
    legs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gann::bars::bar_directions;
    use crate::test_support::bars;
    use rust_decimal_macros::dec;

    #[test]
    fn test_single_bar_is_one_leg() {
        let candles = bars(&[(dec!(10), dec!(8))], true);
        let legs = build_legs(&candles, &bar_directions(&candles));
        assert_eq!(
            legs,
            vec![Leg {
                direction: Direction::Up,
                start_index: 0,
                end_index: 0,
                low: dec!(8),
                high: dec!(10),
            }]
        );
    }

    #[test]
    fn test_legs_share_pivots() {
        let candles = bars(
            &[
                (dec!(100), dec!(95)),
                (dec!(102), dec!(97)),
                (dec!(101), dec!(96)),
                (dec!(105), dec!(99)),
                (dec!(99), dec!(90)),
            ],
            true,
        );
        let legs = build_legs(&candles, &bar_directions(&candles));

        let summary: Vec<_> = legs
            .iter()
            .map(|l| (l.direction, l.start_index, l.end_index, l.low, l.high))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Direction::Up, 0, 1, dec!(95), dec!(102)),
                (Direction::Down, 1, 2, dec!(96), dec!(102)),
                (Direction::Up, 2, 3, dec!(96), dec!(105)),
                (Direction::Down, 3, 4, dec!(90), dec!(105)),
            ]
        );
    }

    #[test]
    fn test_end_index_tracks_extreme_not_last_bar() {
        // Up, up (new high), then an inside bar that repeats Up without a new high.
        let candles = bars(&[(dec!(10), dec!(5)), (dec!(12), dec!(6)), (dec!(11), dec!(7))], true);
        let legs = build_legs(&candles, &bar_directions(&candles));
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].end_index, 1);
        assert_eq!(legs[0].high, dec!(12));
    }
}
