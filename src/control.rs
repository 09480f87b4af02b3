//! Keyboard control panel.
//!
//! Keys map to [`ControlAction`]s. Applying an action mutates the render settings in
//! place and reports which motor commands to send, which histories to clear and
//! whether the render interval changed; the caller owns the channel and the renderer.
//!
//! `/` and `@` open a numeric entry line for a free goto angle and for setting the
//! current position. While an entry is open, keys edit it until Enter or Escape.

use std::time::Duration;

use log::{info, warn};
use winit::keyboard::{Key, NamedKey};

use crate::angle::Direction;
use crate::config::{AppConfig, RenderSettings};
use crate::protocol::{MotorCommand, SpeedLevel};

pub const GOTO_PRESETS: [f64; 16] = [
    0.0, 30.0, 45.0, 60.0, 90.0, 120.0, 135.0, 150.0, 180.0, 210.0, 225.0, 240.0, 270.0, 300.0, 315.0,
    330.0,
];

const AMPLITUDE_RANGE: (i32, i32) = (20, 400);
const PEN_WIDTH_RANGE: (i32, i32) = (1, 40);
const RENDER_TICK_MS_RANGE: (u64, u64) = (5, 500);

/// Printed at startup.
pub const KEY_BINDINGS: &str = "\
1-6 speed | c continue | p pause vector | r release | space pause all | ctrl+space continue all
left/right direction ccw/cw | [ ] half-step ccw/cw | g/G next/previous preset | 0 goto 0
* goto 180 | {/} 180 calibration -/+0.5 | / goto typed angle | @ set position to typed angle
z set as 0 | Z set as 180 | t pause time | X/Y clear sine/cosine history
up/down amplitude | +/- pen width | pgup/pgdn phase | ,/. angle offset | ;/' render tick -/+5ms
v vector | n angle arc | s/k sin/cos component | w/e vertical/horizontal shadow
b boxes | l dotted lines | i tip circles | x/y/u sine, cosine, cosine on x axis
a angles | m 30/60 angles | d radians | f background text | q phase arc
j +1/-1 lines | h all ordinate lines | H ordinate captions | o observer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    RotatingVector,
    AngleArc,
    SinComponent,
    CosComponent,
    VerticalShadow,
    HorizontalShadow,
    ProjectionBoxes,
    DottedLines,
    TipCircles,
    SinOnXAxis,
    CosOnYAxis,
    CosOnXAxis,
    AnglesOnAxis,
    Angles30And60,
    AnglesInRadians,
    BackgroundText,
    PhaseArc,
    UnitOrdinates,
    AllOrdinates,
    OrdinateCaptions,
    Observer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    /// Commands sent to the motor in order.
    Motor(Vec<MotorCommand>),
    /// Move to an absolute angle and let time run.
    Goto(f64),
    /// Goto 180°, corrected by the calibration offset on hardware.
    Goto180,
    /// Declare the current motor position to be this angle.
    SetPosition(i32),
    NextPreset,
    PreviousPreset,
    TogglePauseTime,
    PauseAll,
    ContinueAll,
    Toggle(Toggle),
    ClearSineHistory,
    ClearCosineHistory,
    AdjustAmplitude(i32),
    AdjustPenWidth(i32),
    AdjustPhase(f64),
    AdjustAngleOffset(f64),
    AdjustCalibrationAt180(f64),
    /// Change the render interval by this many milliseconds.
    AdjustRenderTick(i64),
}

impl ControlAction {
    fn motor(command: MotorCommand) -> Self {
        ControlAction::Motor(vec![command])
    }

    pub fn half_step(direction: Direction) -> Self {
        match direction {
            Direction::CounterClockwise => ControlAction::Motor(vec![
                MotorCommand::SetDirection(Direction::CounterClockwise),
                MotorCommand::HalfStep,
            ]),
            // step clockwise once, then restore the default direction
            Direction::Clockwise => ControlAction::Motor(vec![
                MotorCommand::SetDirection(Direction::Clockwise),
                MotorCommand::HalfStep,
                MotorCommand::SetDirection(Direction::CounterClockwise),
            ]),
        }
    }
}

/// What the caller has to do after an action was applied.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ControlOutcome {
    pub commands: Vec<MotorCommand>,
    pub clear_sine: bool,
    pub clear_cosine: bool,
    /// New render interval, if it changed.
    pub render_tick: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Goto,
    SetPosition,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    kind: EntryKind,
    text: String,
}

#[derive(Debug, Default)]
pub struct ControlPanel {
    next_preset: usize,
    time_paused: bool,
    entry: Option<Entry>,
    hardware: bool,
    calibration_offset_at_180: f64,
    render_tick: Duration,
}

impl ControlPanel {
    pub fn new(config: &AppConfig, hardware: bool) -> Self {
        Self {
            hardware,
            calibration_offset_at_180: config.calibration_offset_at_180,
            render_tick: config.timing.render_tick,
            ..Self::default()
        }
    }

    pub fn time_paused(&self) -> bool {
        self.time_paused
    }

    pub fn calibration_offset_at_180(&self) -> f64 {
        self.calibration_offset_at_180
    }

    pub fn render_tick(&self) -> Duration {
        self.render_tick
    }

    /// The motor finished a half-step or reached its goto target.
    pub fn motion_finished(&mut self) {
        if !self.time_paused {
            info!("Motion finished, pausing time");
        }
        self.time_paused = true;
    }

    /// The open entry line, e.g. `goto: 12.5`.
    pub fn entry_prompt(&self) -> Option<String> {
        self.entry.as_ref().map(|entry| {
            let label = match entry.kind {
                EntryKind::Goto => "goto",
                EntryKind::SetPosition => "set position",
            };
            format!("{label}: {}", entry.text)
        })
    }

    pub fn action_for_key(&mut self, key: &Key, ctrl: bool) -> Option<ControlAction> {
        if self.entry.is_some() {
            return self.edit_entry(key);
        }
        let action = match key {
            Key::Named(NamedKey::Space) if ctrl => ControlAction::ContinueAll,
            Key::Named(NamedKey::Space) => ControlAction::PauseAll,
            Key::Named(NamedKey::ArrowLeft) => {
                ControlAction::motor(MotorCommand::SetDirection(Direction::CounterClockwise))
            }
            Key::Named(NamedKey::ArrowRight) => {
                ControlAction::motor(MotorCommand::SetDirection(Direction::Clockwise))
            }
            Key::Named(NamedKey::ArrowUp) => ControlAction::AdjustAmplitude(10),
            Key::Named(NamedKey::ArrowDown) => ControlAction::AdjustAmplitude(-10),
            Key::Named(NamedKey::PageUp) => ControlAction::AdjustPhase(15.0),
            Key::Named(NamedKey::PageDown) => ControlAction::AdjustPhase(-15.0),
            Key::Character(text) if text.as_str() == "/" => return self.open_entry(EntryKind::Goto),
            Key::Character(text) if text.as_str() == "@" => {
                return self.open_entry(EntryKind::SetPosition)
            }
            Key::Character(text) => return character_action(text.as_str()),
            _ => return None,
        };
        Some(action)
    }

    fn open_entry(&mut self, kind: EntryKind) -> Option<ControlAction> {
        self.entry = Some(Entry {
            kind,
            text: String::new(),
        });
        None
    }

    fn edit_entry(&mut self, key: &Key) -> Option<ControlAction> {
        let entry = self.entry.as_mut()?;
        match key {
            Key::Named(NamedKey::Escape) => self.entry = None,
            Key::Named(NamedKey::Backspace) => {
                entry.text.pop();
            }
            Key::Named(NamedKey::Enter) => {
                let entry = self.entry.take()?;
                return entry_action(&entry);
            }
            Key::Character(text) if text.chars().all(is_entry_char) => {
                entry.text.push_str(text.as_str());
            }
            _ => {}
        }
        None
    }

    pub fn apply(&mut self, action: ControlAction, settings: &mut RenderSettings) -> ControlOutcome {
        let mut outcome = ControlOutcome::default();
        match action {
            ControlAction::Motor(commands) => outcome.commands = commands,
            ControlAction::Goto(angle) => outcome.commands.push(self.goto(angle)),
            ControlAction::Goto180 => {
                let angle = if self.hardware {
                    180.0 + self.calibration_offset_at_180
                } else {
                    180.0
                };
                outcome.commands.push(self.goto(angle));
            }
            ControlAction::SetPosition(angle) => {
                info!("Setting current position to {angle}°");
                outcome.commands.push(MotorCommand::Calibrate(angle));
            }
            ControlAction::NextPreset => {
                let angle = GOTO_PRESETS[self.next_preset];
                self.next_preset = (self.next_preset + 1) % GOTO_PRESETS.len();
                outcome.commands.push(self.goto(angle));
            }
            ControlAction::PreviousPreset => {
                let count = GOTO_PRESETS.len();
                // next_preset points one past the last preset sent
                self.next_preset = (self.next_preset + count - 2) % count;
                let angle = GOTO_PRESETS[self.next_preset];
                self.next_preset = (self.next_preset + 1) % count;
                outcome.commands.push(self.goto(angle));
            }
            ControlAction::TogglePauseTime => {
                self.time_paused = !self.time_paused;
                info!("Time {}", if self.time_paused { "paused" } else { "running" });
            }
            ControlAction::PauseAll => {
                self.time_paused = true;
                outcome.commands.push(MotorCommand::Pause);
            }
            ControlAction::ContinueAll => {
                self.time_paused = false;
                outcome.commands.push(MotorCommand::Continue);
            }
            ControlAction::Toggle(toggle) => {
                let enabled = apply_toggle(toggle, settings);
                info!("{toggle:?} {}", if enabled { "on" } else { "off" });
            }
            ControlAction::ClearSineHistory => outcome.clear_sine = true,
            ControlAction::ClearCosineHistory => outcome.clear_cosine = true,
            ControlAction::AdjustAmplitude(delta) => {
                settings.amplitude = (settings.amplitude + delta).clamp(AMPLITUDE_RANGE.0, AMPLITUDE_RANGE.1);
                info!("Amplitude {}", settings.amplitude);
            }
            ControlAction::AdjustPenWidth(delta) => {
                settings.pen_width = (settings.pen_width + delta).clamp(PEN_WIDTH_RANGE.0, PEN_WIDTH_RANGE.1);
                info!("Pen width {}", settings.pen_width);
            }
            ControlAction::AdjustPhase(delta) => {
                settings.phase_shift = (settings.phase_shift + delta).rem_euclid(360.0);
                info!("Cosine phase {}°", settings.phase_shift);
            }
            ControlAction::AdjustAngleOffset(delta) => {
                settings.angle_advance_offset += delta;
                info!("Angle advance offset {:.1}°", settings.angle_advance_offset);
            }
            ControlAction::AdjustCalibrationAt180(delta) => {
                self.calibration_offset_at_180 += delta;
                info!("Calibration at 180° {:.1}°", self.calibration_offset_at_180);
            }
            ControlAction::AdjustRenderTick(delta_ms) => {
                let current = self.render_tick.as_millis() as i64;
                let (min, max) = RENDER_TICK_MS_RANGE;
                let millis = current.saturating_add(delta_ms).clamp(min as i64, max as i64) as u64;
                self.render_tick = Duration::from_millis(millis);
                info!("Render tick {millis} ms");
                outcome.render_tick = Some(self.render_tick);
            }
        }
        outcome
    }

    fn goto(&mut self, angle: f64) -> MotorCommand {
        info!("Going to {angle}°");
        self.time_paused = false;
        MotorCommand::Goto(angle)
    }
}

fn is_entry_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '-'
}

fn entry_action(entry: &Entry) -> Option<ControlAction> {
    let text = entry.text.as_str();
    let action = match entry.kind {
        EntryKind::Goto => text
            .parse::<f64>()
            .ok()
            .filter(|angle| angle.is_finite())
            .map(ControlAction::Goto),
        EntryKind::SetPosition => text.parse::<i32>().ok().map(ControlAction::SetPosition),
    };
    if action.is_none() {
        warn!("Ignoring {:?} entry {text:?}", entry.kind);
    }
    action
}

fn character_action(text: &str) -> Option<ControlAction> {
    let action = match text {
        "1" | "2" | "3" | "4" | "5" | "6" => {
            let level = text.parse::<u8>().ok()?;
            ControlAction::motor(MotorCommand::Speed(SpeedLevel::new(level).ok()?))
        }
        "c" => ControlAction::motor(MotorCommand::Continue),
        "p" => ControlAction::motor(MotorCommand::Pause),
        "r" => ControlAction::motor(MotorCommand::Release),
        "[" => ControlAction::half_step(Direction::CounterClockwise),
        "]" => ControlAction::half_step(Direction::Clockwise),
        "g" => ControlAction::NextPreset,
        "G" => ControlAction::PreviousPreset,
        "0" => ControlAction::Goto(0.0),
        "*" => ControlAction::Goto180,
        "{" => ControlAction::AdjustCalibrationAt180(-0.5),
        "}" => ControlAction::AdjustCalibrationAt180(0.5),
        "z" => ControlAction::SetPosition(0),
        "Z" => ControlAction::SetPosition(180),
        "t" => ControlAction::TogglePauseTime,
        "X" => ControlAction::ClearSineHistory,
        "Y" => ControlAction::ClearCosineHistory,
        "+" | "=" => ControlAction::AdjustPenWidth(1),
        "-" => ControlAction::AdjustPenWidth(-1),
        "," => ControlAction::AdjustAngleOffset(-0.5),
        "." => ControlAction::AdjustAngleOffset(0.5),
        ";" => ControlAction::AdjustRenderTick(-5),
        "'" => ControlAction::AdjustRenderTick(5),
        "v" => ControlAction::Toggle(Toggle::RotatingVector),
        "n" => ControlAction::Toggle(Toggle::AngleArc),
        "s" => ControlAction::Toggle(Toggle::SinComponent),
        "k" => ControlAction::Toggle(Toggle::CosComponent),
        "w" => ControlAction::Toggle(Toggle::VerticalShadow),
        "e" => ControlAction::Toggle(Toggle::HorizontalShadow),
        "b" => ControlAction::Toggle(Toggle::ProjectionBoxes),
        "l" => ControlAction::Toggle(Toggle::DottedLines),
        "i" => ControlAction::Toggle(Toggle::TipCircles),
        "x" => ControlAction::Toggle(Toggle::SinOnXAxis),
        "y" => ControlAction::Toggle(Toggle::CosOnYAxis),
        "u" => ControlAction::Toggle(Toggle::CosOnXAxis),
        "a" => ControlAction::Toggle(Toggle::AnglesOnAxis),
        "m" => ControlAction::Toggle(Toggle::Angles30And60),
        "d" => ControlAction::Toggle(Toggle::AnglesInRadians),
        "f" => ControlAction::Toggle(Toggle::BackgroundText),
        "q" => ControlAction::Toggle(Toggle::PhaseArc),
        "j" => ControlAction::Toggle(Toggle::UnitOrdinates),
        "h" => ControlAction::Toggle(Toggle::AllOrdinates),
        "H" => ControlAction::Toggle(Toggle::OrdinateCaptions),
        "o" => ControlAction::Toggle(Toggle::Observer),
        _ => return None,
    };
    Some(action)
}

/// Flip one setting (or a vertical/horizontal pair together) and return its new state.
fn apply_toggle(toggle: Toggle, s: &mut RenderSettings) -> bool {
    fn flip(flag: &mut bool) -> bool {
        *flag = !*flag;
        *flag
    }
    fn flip_pair(first: &mut bool, second: &mut bool) -> bool {
        let enabled = !*first;
        *first = enabled;
        *second = enabled;
        enabled
    }

    match toggle {
        Toggle::RotatingVector => flip(&mut s.draw_rotating_vector),
        Toggle::AngleArc => flip(&mut s.draw_angle_arc),
        Toggle::SinComponent => flip(&mut s.draw_sin_component),
        Toggle::CosComponent => flip(&mut s.draw_cos_component),
        Toggle::VerticalShadow => flip(&mut s.draw_vertical_shadow),
        Toggle::HorizontalShadow => flip(&mut s.draw_horizontal_shadow),
        Toggle::ProjectionBoxes => flip_pair(
            &mut s.show_vertical_projection_box,
            &mut s.show_horizontal_projection_box,
        ),
        Toggle::DottedLines => flip_pair(
            &mut s.draw_vertical_projection_dotted_line,
            &mut s.draw_horizontal_projection_dotted_line,
        ),
        Toggle::TipCircles => flip_pair(
            &mut s.draw_vertical_projection_tip_circle,
            &mut s.draw_horizontal_projection_tip_circle,
        ),
        Toggle::SinOnXAxis => flip(&mut s.show_sin_on_x_axis),
        Toggle::CosOnYAxis => flip(&mut s.show_cos_on_y_axis),
        Toggle::CosOnXAxis => flip(&mut s.show_cos_on_x_axis),
        Toggle::AnglesOnAxis => flip(&mut s.show_angles_on_axis),
        Toggle::Angles30And60 => flip(&mut s.show_30_and_60_angles),
        Toggle::AnglesInRadians => flip(&mut s.show_angles_in_radians),
        Toggle::BackgroundText => flip(&mut s.show_scrolling_background_text),
        Toggle::PhaseArc => flip(&mut s.phase_shift_arc_and_caption),
        Toggle::UnitOrdinates => flip(&mut s.show_1_and_minus_1_ordinates),
        Toggle::AllOrdinates => flip(&mut s.show_all_ordinates),
        Toggle::OrdinateCaptions => flip(&mut s.show_ordinate_captions),
        Toggle::Observer => flip(&mut s.show_observer),
    }
}
