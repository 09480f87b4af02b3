//! Screen-space points and the translate-then-rotate frames projections draw in.
//!
//! Screen coordinates grow right and down. A positive rotation turns the frame
//! clockwise on screen.

use std::ops::Sub;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_i32(x: i32, y: i32) -> Self {
        Self::new(x as f64, y as f64)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Local frame placed at `origin` and rotated by `rotation_degrees`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub origin: Point,
    pub rotation_degrees: f64,
}

impl Transform {
    pub fn new(origin: Point, rotation_degrees: f64) -> Self {
        Self {
            origin,
            rotation_degrees,
        }
    }

    pub fn translation(origin: Point) -> Self {
        Self::new(origin, 0.0)
    }

    /// Map a point from the local frame to the screen.
    pub fn apply(&self, local: Point) -> Point {
        let (sin, cos) = self.rotation_degrees.to_radians().sin_cos();
        Point::new(
            self.origin.x + local.x * cos - local.y * sin,
            self.origin.y + local.x * sin + local.y * cos,
        )
    }

    /// Map a screen point back into the local frame.
    pub fn invert(&self, screen: Point) -> Point {
        let (sin, cos) = self.rotation_degrees.to_radians().sin_cos();
        let d = screen - self.origin;
        Point::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos)
    }

    pub fn apply_xy(&self, x: f64, y: f64) -> Point {
        self.apply(Point::new(x, y))
    }
}

/// Corners of an axis-aligned local rectangle mapped through `transform`.
pub fn transformed_rect(transform: &Transform, x: f64, y: f64, w: f64, h: f64) -> [Point; 4] {
    [
        transform.apply_xy(x, y),
        transform.apply_xy(x + w, y),
        transform.apply_xy(x + w, y + h),
        transform.apply_xy(x, y + h),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_quarter_turn_points_local_left_to_screen_up() {
        let transform = Transform::new(Point::new(100.0, 100.0), 90.0);
        let p = transform.apply_xy(-10.0, 0.0);
        assert_abs_diff_eq!(p.x, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 90.0, epsilon = 1e-9);

        // local "up" (negative y) becomes screen right
        let q = transform.apply_xy(0.0, -5.0);
        assert_abs_diff_eq!(q.x, 105.0, epsilon = 1e-9);
        assert_abs_diff_eq!(q.y, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invert_undoes_apply() {
        let transform = Transform::new(Point::new(-3.0, 42.0), 37.0);
        let local = Point::new(12.5, -7.25);
        let back = transform.invert(transform.apply(local));
        assert_abs_diff_eq!(back.x, local.x, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y, local.y, epsilon = 1e-9);
    }

    #[test]
    fn test_transformed_rect_without_rotation() {
        let corners = transformed_rect(&Transform::translation(Point::new(1.0, 2.0)), 0.0, 0.0, 3.0, 4.0);
        assert_eq!(corners[0], Point::new(1.0, 2.0));
        assert_eq!(corners[2], Point::new(4.0, 6.0));
    }
}
