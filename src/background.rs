//! Decorative scrolling captions behind the waves.
//!
//! Points are generated once and then scrolled; a point leaving through the near edge
//! re-enters at the far edge, so the buffer never grows or shrinks.

use std::ops::Range;

use rand::Rng;

use crate::config::Color;
use crate::geometry::Point;
use crate::scene::Scene;

pub const BACKGROUND_TEXT: &str = "Background";
pub const TIME_TEXT: &str = "Time";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPoint {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScrollingBackground {
    points: Vec<TextPoint>,
    x_bounds: Option<(i32, i32)>,
    y_bounds: Option<(i32, i32)>,
}

impl ScrollingBackground {
    pub fn new() -> Self {
        Self::default()
    }

    /// Background with the usual "Background", "Time" and angle captions.
    pub fn with_standard_captions(
        count: usize,
        x_range: Range<i32>,
        y_range: Range<i32>,
        rng: &mut impl Rng,
    ) -> Self {
        let mut background = Self::new();
        background.gen_random_points(count, x_range.clone(), y_range.clone(), rng, |_| {
            BACKGROUND_TEXT.to_string()
        });
        background.gen_random_points(count, x_range.clone(), y_range.clone(), rng, |_| {
            TIME_TEXT.to_string()
        });
        background.gen_random_points(count, x_range, y_range, rng, |rng| {
            format!("{}°", rng.random_range(0..12) * 30)
        });
        background
    }

    /// Seed `count` points uniformly inside the ranges. The union of all generated
    /// ranges becomes the wraparound bounds.
    pub fn gen_random_points<R: Rng>(
        &mut self,
        count: usize,
        x_range: Range<i32>,
        y_range: Range<i32>,
        rng: &mut R,
        mut text: impl FnMut(&mut R) -> String,
    ) {
        if x_range.is_empty() || y_range.is_empty() {
            return;
        }
        self.x_bounds = Some(widen(self.x_bounds, &x_range));
        self.y_bounds = Some(widen(self.y_bounds, &y_range));
        for _ in 0..count {
            let x = rng.random_range(x_range.clone());
            let y = rng.random_range(y_range.clone());
            let text = text(rng);
            self.points.push(TextPoint { x, y, text });
        }
    }

    pub fn points(&self) -> &[TextPoint] {
        &self.points
    }

    pub fn shift_left(&mut self, amount: i32) {
        let Some((min_x, max_x)) = self.x_bounds else {
            return;
        };
        for point in &mut self.points {
            point.x -= amount;
            if point.x < min_x {
                point.x = max_x;
            }
        }
    }

    pub fn shift_up(&mut self, amount: i32) {
        let Some((min_y, max_y)) = self.y_bounds else {
            return;
        };
        for point in &mut self.points {
            point.y -= amount;
            if point.y < min_y {
                point.y = max_y;
            }
        }
    }

    /// Draw the points that fall inside a `width`×`height` rectangle, offset by
    /// `(x_offset, y_offset)`. Points outside are skipped, not removed.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        scene: &mut Scene,
        x_offset: i32,
        y_offset: i32,
        width: i32,
        height: i32,
        pixel_size: f32,
        color: Color,
        opacity: f32,
    ) {
        for point in &self.points {
            let visible = (0..width).contains(&point.x) && (0..height).contains(&point.y);
            if visible {
                scene.text(
                    Point::from_i32(x_offset + point.x, y_offset + point.y),
                    point.text.clone(),
                    pixel_size,
                    color,
                    opacity,
                );
            }
        }
    }
}

fn widen(bounds: Option<(i32, i32)>, range: &Range<i32>) -> (i32, i32) {
    match bounds {
        Some((min, max)) => (min.min(range.start), max.max(range.end)),
        None => (range.start, range.end),
    }
}
