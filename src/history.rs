//! Scrolling history of projected heights.
//!
//! Index 0 is the newest sample. Each shift pushes a new sample at the front and drops
//! the oldest one, so the length never changes after construction.

use std::collections::vec_deque::Iter;
use std::collections::VecDeque;

use crate::angle::Direction;

/// Number of preceding samples that must be free of labels before a new label is stamped.
pub const LABEL_SPACING: usize = 5;

/// Angle captions are stamped only on multiples of this many degrees.
pub const LABEL_STEP_DEGREES: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    pub height: i32,
    pub angle_label: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ProjectionHistory {
    samples: VecDeque<Sample>,
}

impl ProjectionHistory {
    /// # Panics
    /// Panics if `len` is zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "ProjectionHistory length must be greater than 0");
        Self {
            samples: std::iter::repeat(Sample::default()).take(len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest sample first.
    pub fn iter(&self) -> Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn newest(&self) -> Sample {
        self.samples.front().copied().unwrap_or_default()
    }

    /// Reset every sample to zero height and no label.
    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = Sample::default());
    }

    /// Insert `height` as the newest sample. `label` is kept only if none of the
    /// previous `LABEL_SPACING` samples carries one.
    pub fn shift(&mut self, height: i32, label: Option<i32>) {
        self.samples.pop_back();
        let crowded = self
            .samples
            .iter()
            .take(LABEL_SPACING)
            .any(|s| s.angle_label.is_some());
        self.samples.push_front(Sample {
            height,
            angle_label: if crowded { None } else { label },
        });
    }
}

/// Caption to stamp for the current angle, if any.
///
/// Only a moving vector gets captions. Counter-clockwise angles are reported in
/// `[0, 360)`, clockwise ones as non-positive values in `(-360, 0]`.
pub fn angle_label(angle_degrees: f64, is_running: bool, direction: Direction) -> Option<i32> {
    if !is_running {
        return None;
    }
    let mut label = angle_degrees.round() as i32;
    if direction.is_clockwise() {
        label = (label - 360) % 360;
    }
    if label % LABEL_STEP_DEGREES != 0 {
        return None;
    }
    Some(if label == 360 { 0 } else { label })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_is_flat() {
        let history = ProjectionHistory::new(8);
        assert_eq!(history.len(), 8);
        assert!(history.iter().all(|s| *s == Sample::default()));
    }

    #[test]
    fn test_shift_keeps_reverse_chronological_order() {
        let mut history = ProjectionHistory::new(6);
        for height in 1..=6 {
            history.shift(height, None);
        }
        let heights: Vec<i32> = history.iter().map(|s| s.height).collect();
        assert_eq!(heights, vec![6, 5, 4, 3, 2, 1]);

        history.shift(7, None);
        let heights: Vec<i32> = history.iter().map(|s| s.height).collect();
        assert_eq!(heights, vec![7, 6, 5, 4, 3, 2]);
        assert_eq!(history.len(), 6);
    }

    #[test]
    fn test_labels_are_spaced_apart() {
        let mut history = ProjectionHistory::new(40);
        for _ in 0..40 {
            history.shift(0, Some(90));
        }
        let labelled: Vec<usize> = history
            .iter()
            .enumerate()
            .filter(|(_, s)| s.angle_label.is_some())
            .map(|(i, _)| i)
            .collect();
        assert!(!labelled.is_empty());
        for pair in labelled.windows(2) {
            assert!(pair[1] - pair[0] > LABEL_SPACING);
        }
    }

    #[test]
    fn test_label_accepted_after_spacing_gap() {
        let mut history = ProjectionHistory::new(20);
        history.shift(0, Some(30));
        for _ in 0..LABEL_SPACING {
            history.shift(0, None);
        }
        history.shift(0, Some(60));
        assert_eq!(history.newest().angle_label, Some(60));
        assert_eq!(history.get(LABEL_SPACING + 1).unwrap().angle_label, Some(30));
    }

    #[test]
    fn test_clear_resets_samples() {
        let mut history = ProjectionHistory::new(4);
        history.shift(12, Some(0));
        history.clear();
        assert!(history.iter().all(|s| *s == Sample::default()));
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_angle_label_rules() {
        let ccw = Direction::CounterClockwise;
        let cw = Direction::Clockwise;

        assert_eq!(angle_label(90.2, true, ccw), Some(90));
        assert_eq!(angle_label(89.4, true, ccw), None);
        assert_eq!(angle_label(90.0, false, ccw), None);
        assert_eq!(angle_label(359.7, true, ccw), Some(0));
        assert_eq!(angle_label(45.0, true, ccw), None);

        assert_eq!(angle_label(90.0, true, cw), Some(-270));
        assert_eq!(angle_label(0.0, true, cw), Some(0));
        assert_eq!(angle_label(359.6, true, cw), Some(0));
        assert_eq!(angle_label(330.0, true, cw), Some(-30));
    }
}
