use super::legs::Leg;
use tbot_core::Direction;

/// Mark ABC patterns at the extreme of each qualifying C leg.
///
/// An up ABC is a higher low (B over A) followed by a higher high (C over B);
/// a down ABC is the mirror image.
pub(crate) fn abc_marks(len: usize, legs: &[Leg]) -> Vec<Option<Direction>> {
    let mut marks = vec![None; len];
    for window in legs.windows(3) {
        let (a, b, c) = (&window[0], &window[1], &window[2]);
        let found = match c.direction {
            Direction::Up => a.low < b.low && b.high < c.high,
            Direction::Down => a.high > b.high && b.low > c.low,
        };
        if found {
            if let Some(mark) = marks.get_mut(c.end_index) {
                *mark = Some(c.direction);
            }
        }
    }
    marks
}
