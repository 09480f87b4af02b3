//! Where motor commands go and status lines come from.
//!
//! The simulator and the real controller sit behind the same [`MotorChannel`] trait.
//! Both deliver status as newline-terminated text that is framed and parsed the same
//! way, so nothing downstream knows which one is attached.

use std::io::{self, Read, Write};

use log::{debug, info, warn};
use serialport::{DataBits, SerialPort};
use thiserror::Error;

use crate::config::SerialConfig;
use crate::protocol::{MotorCommand, StatusLine};
use crate::simulator::MotorSimulator;

/// Longest status line accepted before the framer gives up on it.
pub const MAX_LINE_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

pub trait MotorChannel {
    fn name(&self) -> &str;

    /// True for the physical controller. Hardware readings get the angle-advance offset.
    fn is_hardware(&self) -> bool;

    fn send(&mut self, command: &MotorCommand) -> Result<(), ChannelError>;

    /// Advance simulated time by one tick. Hardware runs on its own clock.
    fn tick(&mut self) {}

    /// Status lines received since the last poll, oldest first.
    fn poll(&mut self) -> Result<Vec<StatusLine>, ChannelError>;

    /// Whether a half-step or goto ran to completion since the last call.
    /// The controller firmware does not report this.
    fn take_motion_finished(&mut self) -> bool {
        false
    }
}

/// Splits a byte stream into text lines.
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line_len: usize,
}

impl LineFramer {
    pub fn new(max_line_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_line_len),
            max_line_len,
        }
    }

    /// Add incoming bytes and return every line completed by them, without the line
    /// terminator. Overlong lines are dropped.
    pub fn push_bytes(&mut self, data: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(data);
        let mut lines = Vec::new();

        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.len() > self.max_line_len {
                warn!("Discarding overlong line ({} bytes)", line.len());
                continue;
            }
            lines.push(line.to_string());
        }

        // Prevent the buffer from growing unbounded on a stream without newlines
        if self.buffer.len() > self.max_line_len {
            warn!(
                "No line terminator in {} bytes, discarding buffered data",
                self.buffer.len()
            );
            self.buffer.clear();
        }

        lines
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_status_lines(lines: Vec<String>) -> Vec<StatusLine> {
    lines
        .into_iter()
        .filter_map(|line| match line.parse::<StatusLine>() {
            Ok(status) => Some(status),
            Err(err) => {
                debug!("Ignoring line from motor: {err}");
                None
            }
        })
        .collect()
}

/// In-process simulator, ticked by the application's simulator timer.
pub struct SimulatedChannel {
    simulator: MotorSimulator,
    outgoing: Vec<u8>,
    framer: LineFramer,
}

impl SimulatedChannel {
    pub fn new() -> Self {
        Self {
            simulator: MotorSimulator::new(),
            outgoing: Vec::new(),
            framer: LineFramer::new(MAX_LINE_LEN),
        }
    }

    /// Queue a raw command line, valid or not.
    pub fn post_line(&mut self, line: impl Into<String>) {
        self.simulator.post(line);
    }

    pub fn simulator(&self) -> &MotorSimulator {
        &self.simulator
    }
}

impl Default for SimulatedChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorChannel for SimulatedChannel {
    fn name(&self) -> &str {
        "simulator"
    }

    fn is_hardware(&self) -> bool {
        false
    }

    fn send(&mut self, command: &MotorCommand) -> Result<(), ChannelError> {
        debug!("Simulator <- {command}");
        self.simulator.post_command(command);
        Ok(())
    }

    fn tick(&mut self) {
        if let Some(status) = self.simulator.tick() {
            self.outgoing.extend_from_slice(status.to_line().as_bytes());
        }
    }

    fn poll(&mut self) -> Result<Vec<StatusLine>, ChannelError> {
        let bytes = std::mem::take(&mut self.outgoing);
        Ok(parse_status_lines(self.framer.push_bytes(&bytes)))
    }

    fn take_motion_finished(&mut self) -> bool {
        self.simulator.take_motion_finished()
    }
}

/// Stepper controller on a serial port.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    name: String,
    framer: LineFramer,
    read_buffer: Vec<u8>,
}

impl SerialChannel {
    pub fn open(config: &SerialConfig) -> Result<Self, ChannelError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(data_bits(config.data_bits))
            .timeout(config.read_timeout)
            .open()?;
        info!(
            "Opened serial port {} at {} baud",
            config.port, config.baud_rate
        );
        Ok(Self::from_port(port, config.port.clone()))
    }

    pub fn from_port(port: Box<dyn SerialPort>, name: String) -> Self {
        Self {
            port,
            name,
            framer: LineFramer::new(MAX_LINE_LEN),
            read_buffer: vec![0; 256],
        }
    }
}

fn data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        8 => DataBits::Eight,
        other => {
            warn!("Unsupported data bits {other}, using 8");
            DataBits::Eight
        }
    }
}

impl MotorChannel for SerialChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_hardware(&self) -> bool {
        true
    }

    fn send(&mut self, command: &MotorCommand) -> Result<(), ChannelError> {
        debug!("{} <- {command}", self.name);
        self.port.write_all(command.to_line().as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<StatusLine>, ChannelError> {
        let mut lines = Vec::new();
        while self.port.bytes_to_read()? > 0 {
            let n = match self.port.read(&mut self.read_buffer) {
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
                Err(err) => return Err(err.into()),
            };
            if n == 0 {
                break;
            }
            lines.extend(self.framer.push_bytes(&self.read_buffer[..n]));
        }
        Ok(parse_status_lines(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_framer_handles_split_lines() {
        let mut framer = LineFramer::new(MAX_LINE_LEN);
        assert!(framer.push_bytes(b"12.3").is_empty());
        assert_eq!(framer.pending(), 4);
        let lines = framer.push_bytes(b"0 14\r\n0.90 1\n");
        assert_eq!(lines, vec!["12.30 14".to_string(), "0.90 1".to_string()]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_drops_overlong_input() {
        let mut framer = LineFramer::new(8);
        assert!(framer.push_bytes(b"0123456789").is_empty());
        assert_eq!(framer.pending(), 0);

        let lines = framer.push_bytes(b"abcdefghijk\nok\n");
        assert_eq!(lines, vec!["ok".to_string()]);
    }

    #[test]
    fn test_simulated_channel_round_trip() {
        let mut channel = SimulatedChannel::new();
        assert!(!channel.is_hardware());
        channel.send(&MotorCommand::HalfStep).unwrap();

        channel.tick();
        assert!(channel.poll().unwrap().is_empty());

        channel.tick();
        let statuses = channel.poll().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_relative_eq!(statuses[0].angle_degrees, 0.9, epsilon = 1e-9);
        assert_eq!(statuses[0].half_steps, 1);
        assert!(channel.take_motion_finished());
    }

    #[test]
    fn test_several_ticks_between_polls_are_all_delivered() {
        let mut channel = SimulatedChannel::new();
        channel.send(&MotorCommand::Continue).unwrap();
        for _ in 0..4 {
            channel.tick();
        }
        let statuses = channel.poll().unwrap();
        assert_eq!(statuses.len(), 3);
        assert!(statuses[0].angle_degrees < statuses[2].angle_degrees);
        assert!(channel.poll().unwrap().is_empty());
    }

    #[test]
    fn test_garbage_status_lines_are_skipped() {
        let statuses = parse_status_lines(vec![
            "hello".to_string(),
            "45.00 50".to_string(),
            "12 34".to_string(),
        ]);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].half_steps, 50);
    }
}
