//! In-process stand-in for the motor firmware.
//!
//! Commands are queued as raw text lines and consumed one per tick, after that tick's
//! motion, so every command takes effect on the following tick. While running, each
//! tick advances the vector by the speed level's angle increment (or by exactly one
//! half-step for a pending `h`) and produces the same status line the device would send.

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::angle::{normalize_degrees, Direction, MotorPosition, DEGREES_PER_HALF_STEP};
use crate::protocol::{MotorCommand, SpeedLevel, StatusLine};

/// Slack when deciding whether a goto target was swept over during a tick.
const TARGET_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct MotorSimulator {
    running: bool,
    direction: Direction,
    angle: f64,
    position: MotorPosition,
    target: Option<MotorPosition>,
    half_step_pending: bool,
    speed: SpeedLevel,
    queue: VecDeque<String>,
    motion_finished: bool,
}

impl MotorSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one raw command line. Lines are validated only when consumed.
    pub fn post(&mut self, line: impl Into<String>) {
        self.queue.push_back(line.into());
    }

    pub fn post_command(&mut self, command: &MotorCommand) {
        self.post(command.to_line());
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn position(&self) -> MotorPosition {
        self.position
    }

    pub fn target(&self) -> Option<MotorPosition> {
        self.target
    }

    pub fn speed(&self) -> SpeedLevel {
        self.speed
    }

    /// True once after a half-step completes or a goto target is reached.
    pub fn take_motion_finished(&mut self) -> bool {
        std::mem::take(&mut self.motion_finished)
    }

    /// Advance one tick. Returns the status line emitted if the motor moved.
    pub fn tick(&mut self) -> Option<StatusLine> {
        let status = self.running.then(|| self.advance());
        self.execute_next_command();
        status
    }

    fn advance(&mut self) -> StatusLine {
        let increment = if self.half_step_pending {
            DEGREES_PER_HALF_STEP
        } else {
            self.speed.angle_increment()
        };
        let previous = self.angle;
        self.angle = normalize_degrees(previous + self.direction.sign() * increment);
        self.position = MotorPosition::from_degrees(self.angle);

        if self.half_step_pending {
            self.half_step_pending = false;
            self.running = false;
            self.motion_finished = true;
        }

        if let Some(target) = self.target {
            if self.swept_over(previous, increment, target) {
                info!("Reached target position {} half-steps", target.half_steps());
                self.angle = target.degrees();
                self.position = target;
                self.target = None;
                self.running = false;
                self.motion_finished = true;
            }
        }

        StatusLine::new(self.angle, self.position)
    }

    /// Whether moving `increment` degrees from `previous` in the current direction
    /// reached or passed `target`.
    fn swept_over(&self, previous: f64, increment: f64, target: MotorPosition) -> bool {
        let remaining = ((target.degrees() - previous) * self.direction.sign()).rem_euclid(360.0);
        remaining <= increment + TARGET_EPSILON
    }

    fn execute_next_command(&mut self) {
        let Some(line) = self.queue.pop_front() else {
            return;
        };
        if !line.ends_with('\n') {
            debug!("Ignoring unterminated command {line:?}");
            return;
        }
        match line.parse::<MotorCommand>() {
            Ok(command) => self.apply(command),
            Err(err) => warn!("Ignoring command {line:?}: {err}"),
        }
    }

    /// Apply a command immediately, bypassing the queue.
    pub fn apply(&mut self, command: MotorCommand) {
        match command {
            MotorCommand::Continue => {
                info!("Received continue command");
                self.running = true;
            }
            MotorCommand::Pause => self.running = false,
            MotorCommand::Release => {
                self.running = false;
                self.half_step_pending = false;
                self.target = None;
                self.position = MotorPosition::ZERO;
                self.angle = 0.0;
            }
            MotorCommand::Goto(angle) => {
                let target = MotorPosition::from_degrees(angle);
                info!("Target half steps = {}", target.half_steps());
                self.target = Some(target);
                self.running = true;
            }
            MotorCommand::Calibrate(angle) => {
                info!("Calibrating current position to: {angle}");
                self.position = MotorPosition::from_degrees(angle as f64);
                self.angle = self.position.degrees();
                debug!("New half steps = {}", self.position.half_steps());
            }
            MotorCommand::SetDirection(direction) => self.direction = direction,
            MotorCommand::HalfStep => {
                self.half_step_pending = true;
                self.running = true;
            }
            MotorCommand::Speed(level) => {
                self.speed = level;
                self.running = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run_until_stopped(simulator: &mut MotorSimulator, max_ticks: usize) -> Vec<StatusLine> {
        let mut emitted = Vec::new();
        for _ in 0..max_ticks {
            if let Some(status) = simulator.tick() {
                emitted.push(status);
            }
            if !simulator.is_running() && simulator.pending_commands() == 0 {
                break;
            }
        }
        emitted
    }

    #[test]
    fn test_idle_simulator_emits_nothing() {
        let mut simulator = MotorSimulator::new();
        assert!(simulator.tick().is_none());
        assert!(!simulator.is_running());
        assert_eq!(simulator.direction(), Direction::CounterClockwise);
    }

    #[test]
    fn test_commands_take_effect_on_following_tick() {
        let mut simulator = MotorSimulator::new();
        simulator.post("c\n");
        assert!(simulator.tick().is_none());
        assert!(simulator.is_running());

        let status = simulator.tick().unwrap();
        assert_relative_eq!(status.angle_degrees, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn test_goto_reaches_target_and_pauses() {
        let mut simulator = MotorSimulator::new();
        simulator.post(MotorCommand::Goto(90.0).to_line());

        let emitted = run_until_stopped(&mut simulator, 1000);
        let last = emitted.last().unwrap();
        assert_relative_eq!(last.angle_degrees, 90.0, epsilon = 1e-9);
        assert_eq!(last.half_steps, 100);
        assert_eq!(last.to_line(), "90.00 100\n");
        assert!(!simulator.is_running());
        assert!(simulator.target().is_none());
    }

    #[test]
    fn test_goto_does_not_overshoot_at_fastest_speed() {
        let mut simulator = MotorSimulator::new();
        simulator.apply(MotorCommand::Speed(SpeedLevel::FASTEST));
        simulator.apply(MotorCommand::SetDirection(Direction::Clockwise));
        simulator.apply(MotorCommand::Goto(271.0));

        run_until_stopped(&mut simulator, 1000);
        assert!(!simulator.is_running());
        assert_eq!(simulator.position(), MotorPosition::from_degrees(271.0));
    }

    #[test]
    fn test_half_step_moves_once_and_pauses() {
        let mut simulator = MotorSimulator::new();
        simulator.post("h\n");
        assert!(simulator.tick().is_none());
        assert!(simulator.is_running());

        let status = simulator.tick().unwrap();
        assert_relative_eq!(status.angle_degrees, 0.9, epsilon = 1e-9);
        assert_eq!(status.half_steps, 1);
        assert!(!simulator.is_running());
        assert!(simulator.tick().is_none());
    }

    #[test]
    fn test_finished_motion_is_reported_once() {
        let mut simulator = MotorSimulator::new();
        simulator.apply(MotorCommand::Continue);
        simulator.tick();
        assert!(!simulator.take_motion_finished());

        simulator.apply(MotorCommand::HalfStep);
        simulator.tick();
        assert!(simulator.take_motion_finished());
        assert!(!simulator.take_motion_finished());

        simulator.apply(MotorCommand::Goto(3.0));
        run_until_stopped(&mut simulator, 100);
        assert!(simulator.take_motion_finished());

        // pausing is not a finished motion
        simulator.apply(MotorCommand::Continue);
        simulator.tick();
        simulator.apply(MotorCommand::Pause);
        simulator.tick();
        assert!(!simulator.take_motion_finished());
    }

    #[test]
    fn test_clockwise_half_step_wraps_below_zero() {
        let mut simulator = MotorSimulator::new();
        simulator.apply(MotorCommand::SetDirection(Direction::Clockwise));
        simulator.apply(MotorCommand::HalfStep);

        let status = simulator.tick().unwrap();
        assert_relative_eq!(status.angle_degrees, 359.1, epsilon = 1e-9);
        assert_eq!(status.half_steps, 399);
    }

    #[test]
    fn test_calibrate_keeps_running_state() {
        let mut simulator = MotorSimulator::new();
        simulator.apply(MotorCommand::Continue);
        simulator.post("=180\n");
        simulator.tick();
        assert!(simulator.is_running());
        assert_eq!(simulator.position().half_steps(), 200);
        assert_relative_eq!(simulator.angle(), 180.0, epsilon = 1e-9);

        let mut stopped = MotorSimulator::new();
        stopped.post("=180\n");
        assert!(stopped.tick().is_none());
        assert!(!stopped.is_running());
        assert_eq!(stopped.position().half_steps(), 200);
    }

    #[test]
    fn test_malformed_command_changes_nothing() {
        let mut simulator = MotorSimulator::new();
        simulator.apply(MotorCommand::Calibrate(45));
        let before = (
            simulator.is_running(),
            simulator.direction(),
            simulator.position(),
            simulator.speed(),
        );

        simulator.post("xyz\n");
        simulator.post("c");
        simulator.post("9\n");
        for _ in 0..3 {
            assert!(simulator.tick().is_none());
        }

        let after = (
            simulator.is_running(),
            simulator.direction(),
            simulator.position(),
            simulator.speed(),
        );
        assert_eq!(before, after);
        assert_eq!(simulator.pending_commands(), 0);
    }

    #[test]
    fn test_release_returns_to_rest() {
        let mut simulator = MotorSimulator::new();
        simulator.apply(MotorCommand::Goto(200.0));
        for _ in 0..20 {
            simulator.tick();
        }
        simulator.apply(MotorCommand::Release);
        assert!(!simulator.is_running());
        assert!(simulator.target().is_none());
        assert_eq!(simulator.position(), MotorPosition::ZERO);
        assert_eq!(simulator.angle(), 0.0);
    }

    #[test]
    fn test_speed_sets_increment_and_runs() {
        let mut simulator = MotorSimulator::new();
        simulator.apply(MotorCommand::Speed(SpeedLevel::new(5).unwrap()));
        assert!(simulator.is_running());
        let status = simulator.tick().unwrap();
        assert_relative_eq!(status.angle_degrees, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_counter_clockwise_wraps_past_full_revolution() {
        let mut simulator = MotorSimulator::new();
        simulator.apply(MotorCommand::Calibrate(359));
        simulator.apply(MotorCommand::Speed(SpeedLevel::FASTEST));
        let status = simulator.tick().unwrap();
        assert_relative_eq!(status.angle_degrees, 0.3, epsilon = 1e-9);
        assert!(status.angle_degrees < 1.0);
        assert!(status.half_steps < 400);
    }
}
