// ============================================================================
// CRATE LAYOUT
// ============================================================================
//
// A rotating vector driven by a stepper motor (or its simulator), with its sine and
// cosine projections drawn as scrolling waves.
//
//   motor side:  angle -> protocol -> simulator -> channel
//   view side:   history, motion -> projection, background -> render -> canvas
//   shell:       config, control, app

pub mod angle;
pub mod protocol;
pub mod simulator;
pub mod channel;

pub mod history;
pub mod motion;

pub mod geometry;
pub mod scene;
pub mod text;
pub mod assets;
pub mod projection;
pub mod background;
pub mod render;
pub mod canvas;

pub mod config;
pub mod control;
pub mod app;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use angle::{AngleModel, Direction, MotorPosition};
pub use app::{run, App, AppError};
pub use channel::{ChannelError, MotorChannel, SerialChannel, SimulatedChannel};
pub use config::{AppConfig, Color, LayoutConfig, RenderSettings, SerialConfig, TimingConfig};
pub use protocol::{MotorCommand, ProtocolError, SpeedLevel, StatusLine};
pub use render::{FrameInput, Renderer};
pub use scene::{DrawCommand, Layer, Scene};
pub use simulator::MotorSimulator;
