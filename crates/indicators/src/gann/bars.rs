use tbot_core::{Candle, Direction};

/// Direction of the first bar, from its body.
pub(crate) fn opening_direction(candle: &Candle) -> Direction {
    if candle.open() < candle.close() {
        Direction::Up
    } else {
        Direction::Down
    }
}

/// Classify every bar with the Gann rule, honouring hoagies.
///
/// An inside bar freezes the bar before it as the reference. Until a later
/// bar breaks out of that reference, bars are compared against it rather than
/// against their immediate predecessor, and a bar touching its edges still
/// counts as inside.
pub(crate) fn bar_directions(candles: &[Candle]) -> Vec<Direction> {
    let Some(first) = candles.first() else {
        return Vec::new();
    };

    let mut dirs = Vec::with_capacity(candles.len());
    dirs.push(opening_direction(first));
    let mut hoagie: Option<&Candle> = None;

    for i in 1..candles.len() {
        let curr = &candles[i];
        let prev_dir = dirs[i - 1];

        let dir = match hoagie {
            None => {
                let prev = &candles[i - 1];
                if curr.high() > prev.high() && curr.low() > prev.low() {
                    Direction::Up
                } else if curr.low() < prev.low() && curr.high() < prev.high() {
                    Direction::Down
                } else {
                    if curr.high() < prev.high() && curr.low() > prev.low() {
                        hoagie = Some(prev);
                    }
                    prev_dir
                }
            }
            Some(frozen) => {
                if curr.high() > frozen.high() && curr.low() > frozen.low() {
                    hoagie = None;
                    Direction::Up
                } else if curr.low() < frozen.low() && curr.high() < frozen.high() {
                    hoagie = None;
                    Direction::Down
                } else {
                    let inside = curr.high() <= frozen.high() && curr.low() >= frozen.low();
                    if !inside {
                        hoagie = None;
                    }
                    prev_dir
                }
            }
        };
        dirs.push(dir);
    }

    dirs
}

/// Classify every bar against its predecessor only. Inside and outside bars
/// repeat the previous direction.
pub(crate) fn plain_directions(candles: &[Candle]) -> Vec<Direction> {
    let Some(first) = candles.first() else {
        return Vec::new();
    };

    let mut dirs = Vec::with_capacity(candles.len());
    dirs.push(opening_direction(first));
    for pair in candles.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let dir = if curr.high() > prev.high() && curr.low() > prev.low() {
            Direction::Up
        } else if curr.low() < prev.low() && curr.high() < prev.high() {
            Direction::Down
        } else {
            dirs[dirs.len() - 1]
        };
        dirs.push(dir);
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bars;
    use rust_decimal_macros::dec;
    use tbot_core::Direction::{Down, Up};

    #[test]
    fn test_first_bar_uses_body() {
        let up = bars(&[(dec!(10), dec!(5))], true);
        let down = bars(&[(dec!(10), dec!(5))], false);
        assert_eq!(bar_directions(&up), vec![Up]);
        assert_eq!(bar_directions(&down), vec![Down]);
        assert!(bar_directions(&[]).is_empty());
    }

    #[test]
    fn test_hoagie_holds_against_frozen_reference() {
        let candles = bars(
            &[
                (dec!(10), dec!(5)),
                (dec!(9), dec!(4)),
                (dec!(8.5), dec!(4.5)), // inside bar 1
                (dec!(8.8), dec!(4.8)), // up vs bar 2, still inside bar 1
                (dec!(9.5), dec!(5)),   // breaks out of bar 1
            ],
            false,
        );
        assert_eq!(bar_directions(&candles), vec![Down, Down, Down, Down, Up]);
        assert_eq!(plain_directions(&candles), vec![Down, Down, Down, Up, Up]);
    }

    #[test]
    fn test_equal_edge_does_not_break_hoagie() {
        let candles = bars(
            &[
                (dec!(10), dec!(5)),
                (dec!(9), dec!(4)),
                (dec!(8.5), dec!(4.5)),
                (dec!(9), dec!(4.6)), // touches the frozen high
            ],
            false,
        );
        assert_eq!(bar_directions(&candles), vec![Down, Down, Down, Down]);
        assert_eq!(plain_directions(&candles)[3], Up);
    }

    #[test]
    fn test_outside_bar_cancels_hoagie() {
        let candles = bars(
            &[
                (dec!(10), dec!(5)),
                (dec!(9), dec!(4)),
                (dec!(8.5), dec!(4.5)),
                (dec!(9.5), dec!(3.5)), // engulfs bar 1
                (dec!(9.6), dec!(3.8)), // up vs bar 3, would be outside bar 1
            ],
            false,
        );
        assert_eq!(bar_directions(&candles), vec![Down, Down, Down, Down, Up]);
    }

    #[test]
    fn test_equal_range_outside_hoagie_is_outside() {
        // Without a pending hoagie an equal bar is not strictly inside, so it
        // repeats the direction without freezing anything.
        let candles = bars(
            &[(dec!(10), dec!(5)), (dec!(10), dec!(5)), (dec!(10.5), dec!(5.5))],
            true,
        );
        assert_eq!(bar_directions(&candles), vec![Up, Up, Up]);
    }
}
