//! ASCII line protocol shared by the control panel, the simulator and the device.
//!
//! Commands flow towards the motor, one per newline-terminated line:
//!
//! | line        | command                                  |
//! |-------------|------------------------------------------|
//! | `c`         | continue                                 |
//! | `p`         | pause                                    |
//! | `r`         | release coils / reset to rest            |
//! | `g<float>`  | go to absolute angle in degrees          |
//! | `=<int>`    | calibrate current position to an angle   |
//! | `<` / `>`   | counter-clockwise / clockwise            |
//! | `h`         | one half-step, then pause                |
//! | `1`..`6`    | speed level                              |
//!
//! Status flows back as `"<angle> <half_steps>\n"`, e.g. `"90.00 100\n"`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::angle::{Direction, MotorPosition};

/// Per-tick angle increment of speed level 1, in degrees.
pub const SMALLEST_ANGLE_INCREMENT: f64 = 0.2;

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("invalid argument {argument:?} for command '{command}'")]
    InvalidArgument { command: char, argument: String },
    #[error("speed level {0} outside 1..=6")]
    SpeedOutOfRange(u8),
    #[error("no status fields in line {0:?}")]
    MissingStatusFields(String),
}

/// Speed level 1..=6 selected from the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedLevel(u8);

impl SpeedLevel {
    pub const SLOWEST: SpeedLevel = SpeedLevel(1);
    pub const FASTEST: SpeedLevel = SpeedLevel(6);

    pub fn new(level: u8) -> Result<Self, ProtocolError> {
        if (Self::SLOWEST.0..=Self::FASTEST.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ProtocolError::SpeedOutOfRange(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Degrees the simulated vector advances per tick at this level.
    pub fn angle_increment(self) -> f64 {
        SMALLEST_ANGLE_INCREMENT * self.0 as f64
    }
}

impl Default for SpeedLevel {
    fn default() -> Self {
        Self(3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    Continue,
    Pause,
    Release,
    Goto(f64),
    Calibrate(i32),
    SetDirection(Direction),
    HalfStep,
    Speed(SpeedLevel),
}

impl MotorCommand {
    /// Wire form including the terminating newline.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorCommand::Continue => write!(f, "c"),
            MotorCommand::Pause => write!(f, "p"),
            MotorCommand::Release => write!(f, "r"),
            MotorCommand::Goto(angle) => write!(f, "g{angle}"),
            MotorCommand::Calibrate(angle) => write!(f, "={angle}"),
            MotorCommand::SetDirection(Direction::CounterClockwise) => write!(f, "<"),
            MotorCommand::SetDirection(Direction::Clockwise) => write!(f, ">"),
            MotorCommand::HalfStep => write!(f, "h"),
            MotorCommand::Speed(level) => write!(f, "{}", level.level()),
        }
    }
}

impl FromStr for MotorCommand {
    type Err = ProtocolError;

    /// Parse one command line. A trailing `\n` or `\r\n` is accepted; anything else
    /// around the command makes it unknown.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut chars = line.chars();
        let head = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();

        let command = match (head, rest) {
            ('c', "") => MotorCommand::Continue,
            ('p', "") => MotorCommand::Pause,
            ('r', "") => MotorCommand::Release,
            ('<', "") => MotorCommand::SetDirection(Direction::CounterClockwise),
            ('>', "") => MotorCommand::SetDirection(Direction::Clockwise),
            ('h', "") => MotorCommand::HalfStep,
            ('g', argument) => {
                let angle = argument
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|angle| angle.is_finite())
                    .ok_or_else(|| ProtocolError::InvalidArgument {
                        command: 'g',
                        argument: argument.to_string(),
                    })?;
                MotorCommand::Goto(angle)
            }
            ('=', argument) => {
                let angle = argument.trim().parse::<i32>().map_err(|_| {
                    ProtocolError::InvalidArgument {
                        command: '=',
                        argument: argument.to_string(),
                    }
                })?;
                MotorCommand::Calibrate(angle)
            }
            (digit @ '0'..='9', "") => {
                let level = digit as u8 - b'0';
                MotorCommand::Speed(SpeedLevel::new(level)?)
            }
            _ => return Err(ProtocolError::UnknownCommand(line.to_string())),
        };
        Ok(command)
    }
}

/// Position report emitted by the device or the simulator after each movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusLine {
    pub angle_degrees: f64,
    pub half_steps: u32,
}

impl StatusLine {
    pub fn new(angle_degrees: f64, position: MotorPosition) -> Self {
        Self {
            angle_degrees,
            half_steps: position.half_steps(),
        }
    }

    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.angle_degrees, self.half_steps)
    }
}

impl FromStr for StatusLine {
    type Err = ProtocolError;

    /// Finds the first `<digits>.<digits><whitespace><digits>` run anywhere in the line,
    /// so device chatter around the fields is tolerated.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let missing = || ProtocolError::MissingStatusFields(line.to_string());
        let (angle, half_steps) = find_status_fields(line).ok_or_else(missing)?;
        Ok(Self {
            angle_degrees: angle.parse().map_err(|_| missing())?,
            half_steps: half_steps.parse().map_err(|_| missing())?,
        })
    }
}

fn find_status_fields(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    (0..bytes.len()).find_map(|start| {
        let (angle, steps) = match_status_at(bytes, start)?;
        Some((&line[angle.0..angle.1], &line[steps.0..steps.1]))
    })
}

type Span = (usize, usize);

fn match_status_at(bytes: &[u8], start: usize) -> Option<(Span, Span)> {
    let int_end = digits_end(bytes, start);
    if int_end == start || bytes.get(int_end) != Some(&b'.') {
        return None;
    }
    let frac_end = digits_end(bytes, int_end + 1);
    if frac_end == int_end + 1 {
        return None;
    }
    let gap_end = frac_end
        + bytes[frac_end..]
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
    if gap_end == frac_end {
        return None;
    }
    let steps_end = digits_end(bytes, gap_end);
    if steps_end == gap_end {
        return None;
    }
    Some(((start, frac_end), (gap_end, steps_end)))
}

fn digits_end(bytes: &[u8], from: usize) -> usize {
    from + bytes
        .get(from..)
        .map_or(0, |tail| tail.iter().take_while(|b| b.is_ascii_digit()).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_single_character_commands() {
        assert_eq!("c\n".parse::<MotorCommand>(), Ok(MotorCommand::Continue));
        assert_eq!("p\n".parse::<MotorCommand>(), Ok(MotorCommand::Pause));
        assert_eq!("r\r\n".parse::<MotorCommand>(), Ok(MotorCommand::Release));
        assert_eq!("h".parse::<MotorCommand>(), Ok(MotorCommand::HalfStep));
        assert_eq!(
            "<\n".parse(),
            Ok(MotorCommand::SetDirection(Direction::CounterClockwise))
        );
        assert_eq!(
            ">\n".parse(),
            Ok(MotorCommand::SetDirection(Direction::Clockwise))
        );
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!("g90\n".parse::<MotorCommand>(), Ok(MotorCommand::Goto(90.0)));
        assert_eq!("g12.5\n".parse::<MotorCommand>(), Ok(MotorCommand::Goto(12.5)));
        assert_eq!("=180\n".parse::<MotorCommand>(), Ok(MotorCommand::Calibrate(180)));
        assert_eq!("=-3\n".parse::<MotorCommand>(), Ok(MotorCommand::Calibrate(-3)));
        assert!(matches!(
            "gabc\n".parse::<MotorCommand>(),
            Err(ProtocolError::InvalidArgument { command: 'g', .. })
        ));
        assert!(matches!(
            "=1.5\n".parse::<MotorCommand>(),
            Err(ProtocolError::InvalidArgument { command: '=', .. })
        ));
    }

    #[test]
    fn test_parse_speed_levels() {
        for level in 1..=6u8 {
            let line = format!("{level}\n");
            let command: MotorCommand = line.parse().unwrap();
            assert_eq!(command, MotorCommand::Speed(SpeedLevel::new(level).unwrap()));
        }
        assert_eq!(
            "7\n".parse::<MotorCommand>(),
            Err(ProtocolError::SpeedOutOfRange(7))
        );
        assert_eq!(
            "0\n".parse::<MotorCommand>(),
            Err(ProtocolError::SpeedOutOfRange(0))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert_eq!("\n".parse::<MotorCommand>(), Err(ProtocolError::Empty));
        assert!(matches!(
            "xyz\n".parse::<MotorCommand>(),
            Err(ProtocolError::UnknownCommand(_))
        ));
        assert!(matches!(
            "cc\n".parse::<MotorCommand>(),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_command_wire_form() {
        assert_eq!(MotorCommand::Goto(90.0).to_line(), "g90\n");
        assert_eq!(MotorCommand::Goto(22.5).to_line(), "g22.5\n");
        assert_eq!(MotorCommand::Calibrate(180).to_line(), "=180\n");
        assert_eq!(
            MotorCommand::SetDirection(Direction::Clockwise).to_line(),
            ">\n"
        );
        assert_eq!(MotorCommand::Speed(SpeedLevel::FASTEST).to_line(), "6\n");
    }

    #[test]
    fn test_speed_increment_scales_with_level() {
        assert_relative_eq!(SpeedLevel::SLOWEST.angle_increment(), 0.2);
        assert_relative_eq!(SpeedLevel::default().angle_increment(), 0.6, epsilon = 1e-12);
        assert_relative_eq!(SpeedLevel::FASTEST.angle_increment(), 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_status_line_format_and_parse() {
        let status = StatusLine::new(90.0, MotorPosition::new(100));
        assert_eq!(status.to_line(), "90.00 100\n");

        let parsed: StatusLine = "90.00 100\n".parse().unwrap();
        assert_relative_eq!(parsed.angle_degrees, 90.0);
        assert_eq!(parsed.half_steps, 100);
    }

    #[test]
    fn test_status_line_found_inside_noise() {
        let parsed: StatusLine = "pos: 123.45   137 ok".parse().unwrap();
        assert_relative_eq!(parsed.angle_degrees, 123.45);
        assert_eq!(parsed.half_steps, 137);

        assert!("Received continue command".parse::<StatusLine>().is_err());
        assert!("90 100".parse::<StatusLine>().is_err());
        assert!("90.5\n".parse::<StatusLine>().is_err());
    }
}
