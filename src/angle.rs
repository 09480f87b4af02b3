//! Motor position and angle model.
//!
//! The stepper is driven in half-steps: 200 full steps per revolution, 400 half-steps.
//! Positions always live in `[0, HALF_STEPS_PER_REVOLUTION)` and wrap in the direction
//! of travel. Counter-clockwise motion increases the angle, clockwise motion decreases it.

use std::f64::consts::PI;

use crate::protocol::StatusLine;

pub const STEPS_PER_REVOLUTION: u32 = 200;
pub const HALF_STEPS_PER_REVOLUTION: u32 = STEPS_PER_REVOLUTION * 2;

/// Angle covered by a single half-step (0.9°).
pub const DEGREES_PER_HALF_STEP: f64 = 360.0 / HALF_STEPS_PER_REVOLUTION as f64;
pub const HALF_STEPS_PER_DEGREE: f64 = HALF_STEPS_PER_REVOLUTION as f64 / 360.0;

/// Direction of rotation as seen by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Clockwise,
    #[default]
    CounterClockwise,
}

impl Direction {
    /// +1 for counter-clockwise (angle grows), -1 for clockwise.
    pub const fn sign(self) -> f64 {
        match self {
            Direction::Clockwise => -1.0,
            Direction::CounterClockwise => 1.0,
        }
    }

    pub const fn is_clockwise(self) -> bool {
        matches!(self, Direction::Clockwise)
    }
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub fn half_steps_to_degrees(half_steps: i64) -> f64 {
    half_steps as f64 * DEGREES_PER_HALF_STEP
}

/// Unwrapped half-step count nearest to `degrees`.
pub fn degrees_to_half_steps(degrees: f64) -> i64 {
    (degrees * HALF_STEPS_PER_DEGREE).round() as i64
}

/// Half-step position of the motor shaft, always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorPosition {
    half_steps: u32,
}

impl MotorPosition {
    pub const ZERO: MotorPosition = MotorPosition { half_steps: 0 };

    /// Build a position from any half-step count, wrapping modulo one revolution.
    pub fn new(half_steps: i64) -> Self {
        let wrapped = half_steps.rem_euclid(HALF_STEPS_PER_REVOLUTION as i64);
        Self {
            half_steps: wrapped as u32,
        }
    }

    /// Nearest half-step position for an angle; out-of-range angles wrap.
    pub fn from_degrees(degrees: f64) -> Self {
        Self::new(degrees_to_half_steps(degrees))
    }

    pub fn half_steps(self) -> u32 {
        self.half_steps
    }

    pub fn degrees(self) -> f64 {
        half_steps_to_degrees(self.half_steps as i64)
    }

    pub fn radians(self) -> f64 {
        self.degrees() * PI / 180.0
    }

    /// One half-step in `direction`: increment wraps max→0, decrement wraps 0→max.
    pub fn step(self, direction: Direction) -> Self {
        match direction {
            Direction::CounterClockwise => {
                if self.half_steps + 1 >= HALF_STEPS_PER_REVOLUTION {
                    Self::ZERO
                } else {
                    Self {
                        half_steps: self.half_steps + 1,
                    }
                }
            }
            Direction::Clockwise => {
                if self.half_steps == 0 {
                    Self {
                        half_steps: HALF_STEPS_PER_REVOLUTION - 1,
                    }
                } else {
                    Self {
                        half_steps: self.half_steps - 1,
                    }
                }
            }
        }
    }
}

/// Current vector angle as seen by the renderer.
///
/// Fed exclusively by status lines, so simulated and real data take the same path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AngleModel {
    degrees: f64,
    position: MotorPosition,
}

impl AngleModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status line. `offset_degrees` is the hardware angle-advance correction
    /// (zero for the simulator).
    pub fn apply_status(&mut self, status: &StatusLine, offset_degrees: f64) {
        self.degrees = status.angle_degrees + offset_degrees;
        self.position = MotorPosition::new(status.half_steps as i64);
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    pub fn radians(&self) -> f64 {
        self.degrees * PI / 180.0
    }

    pub fn position(&self) -> MotorPosition {
        self.position
    }

    /// Vertical component of a vector of length `amplitude` at the current angle.
    pub fn height(&self, amplitude: i32) -> i32 {
        (amplitude as f64 * self.radians().sin()) as i32
    }

    /// Horizontal component of a vector of length `amplitude` at the current angle.
    pub fn width(&self, amplitude: i32) -> i32 {
        (amplitude as f64 * self.radians().cos()) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_wraps_in_both_directions() {
        for raw in 0..HALF_STEPS_PER_REVOLUTION as i64 {
            let position = MotorPosition::new(raw);
            for direction in [Direction::Clockwise, Direction::CounterClockwise] {
                let next = position.step(direction);
                assert!(next.half_steps() < HALF_STEPS_PER_REVOLUTION);
            }
        }

        let last = MotorPosition::new(HALF_STEPS_PER_REVOLUTION as i64 - 1);
        assert_eq!(last.step(Direction::CounterClockwise), MotorPosition::ZERO);
        assert_eq!(
            MotorPosition::ZERO.step(Direction::Clockwise).half_steps(),
            HALF_STEPS_PER_REVOLUTION - 1
        );
    }

    #[test]
    fn test_new_wraps_out_of_range_counts() {
        assert_eq!(MotorPosition::new(400).half_steps(), 0);
        assert_eq!(MotorPosition::new(401).half_steps(), 1);
        assert_eq!(MotorPosition::new(-1).half_steps(), 399);
        assert_eq!(MotorPosition::new(-800).half_steps(), 0);
    }

    #[test]
    fn test_degree_conversions() {
        assert_relative_eq!(MotorPosition::new(100).degrees(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(MotorPosition::new(1).degrees(), 0.9, epsilon = 1e-9);
        assert_relative_eq!(
            MotorPosition::new(200).radians(),
            std::f64::consts::PI,
            epsilon = 1e-9
        );
        assert_eq!(degrees_to_half_steps(90.0), 100);
        assert_eq!(degrees_to_half_steps(180.0), 200);
        assert_eq!(MotorPosition::from_degrees(360.0), MotorPosition::ZERO);
        assert_eq!(MotorPosition::from_degrees(-90.0).half_steps(), 300);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_relative_eq!(normalize_degrees(370.0), 10.0, epsilon = 1e-9);
        assert_relative_eq!(normalize_degrees(-0.6), 359.4, epsilon = 1e-9);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert!(normalize_degrees(-1e-18) < 360.0);
    }

    #[test]
    fn test_angle_model_applies_offset() {
        let mut model = AngleModel::new();
        let status = StatusLine::new(90.0, MotorPosition::new(100));
        model.apply_status(&status, 1.5);
        assert_relative_eq!(model.degrees(), 91.5, epsilon = 1e-9);
        assert_eq!(model.position().half_steps(), 100);

        model.apply_status(&status, 0.0);
        assert_eq!(model.height(200), 200);
        assert_eq!(model.width(200), 0);
    }
}
