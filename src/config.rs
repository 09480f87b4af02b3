use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;

/// RGB color used by every drawn element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Colors shared by the renderer and the projections
pub mod palette {
    use super::Color;

    pub const BACKGROUND: Color = Color::new(250, 250, 245);
    pub const SINE: Color = Color::new(40, 110, 200);
    pub const COSINE: Color = Color::new(200, 70, 60);
    pub const VECTOR: Color = Color::new(60, 60, 60);
    pub const VECTOR_SWEEP: Color = Color::new(150, 190, 150);
    pub const VECTOR_TIP_CIRCLE: Color = Color::new(30, 30, 30);
    pub const AXIS: Color = Color::new(120, 120, 120);
    pub const BOX: Color = Color::new(100, 100, 100);
    pub const CAPTION: Color = Color::new(50, 50, 50);
    pub const ZERO_MARK: Color = Color::new(200, 50, 50);
    pub const DOTTED: Color = Color::new(20, 20, 20);
    pub const SCROLLING_TEXT: Color = Color::new(140, 140, 160);
}

/// Snapshot of every visualization toggle, taken once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct RenderSettings {
    #[builder(default = 150)]
    pub amplitude: i32,
    #[builder(default = 10)]
    pub pen_width: i32,
    /// Phase of the cosine projection in degrees.
    #[builder(default = 90.0)]
    pub phase_shift: f64,

    #[builder(default = true)]
    pub draw_rotating_vector: bool,
    #[builder(default = true)]
    pub draw_angle_arc: bool,
    #[builder(default = true)]
    pub draw_sin_component: bool,
    #[builder(default = false)]
    pub draw_cos_component: bool,
    #[builder(default = true)]
    pub draw_vertical_shadow: bool,
    #[builder(default = false)]
    pub draw_horizontal_shadow: bool,
    #[builder(default = true)]
    pub show_vertical_projection_box: bool,
    #[builder(default = false)]
    pub show_horizontal_projection_box: bool,
    #[builder(default = true)]
    pub draw_vertical_projection_dotted_line: bool,
    #[builder(default = false)]
    pub draw_horizontal_projection_dotted_line: bool,
    #[builder(default = true)]
    pub draw_vertical_projection_tip_circle: bool,
    #[builder(default = false)]
    pub draw_horizontal_projection_tip_circle: bool,

    #[builder(default = true)]
    pub show_sin_on_x_axis: bool,
    #[builder(default = false)]
    pub show_cos_on_y_axis: bool,
    #[builder(default = false)]
    pub show_cos_on_x_axis: bool,

    #[builder(default = true)]
    pub show_angles_on_axis: bool,
    #[builder(default = false)]
    pub show_30_and_60_angles: bool,
    #[builder(default = false)]
    pub show_angles_in_radians: bool,
    #[builder(default = false)]
    pub show_scrolling_background_text: bool,
    #[builder(default = false)]
    pub phase_shift_arc_and_caption: bool,
    #[builder(default = true)]
    pub show_1_and_minus_1_ordinates: bool,
    #[builder(default = false)]
    pub show_all_ordinates: bool,
    #[builder(default = true)]
    pub show_ordinate_captions: bool,
    #[builder(default = false)]
    pub show_observer: bool,

    /// Degrees added to hardware readings; never applied to simulated data.
    #[builder(default = 0.0)]
    pub angle_advance_offset: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Placement of the vector and its projection axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub x_axis_off_from_top: i32,
    pub x_axis_off_from_right: i32,
    pub wall_separation: i32,
    /// Horizontal distance between history samples, also the background scroll step.
    pub time_x_inc: i32,
    pub history_len: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x_axis_off_from_top: 560,
            x_axis_off_from_right: 520,
            wall_separation: 20,
            time_x_inc: 2,
            history_len: 2300,
        }
    }
}

/// Rates of the independent timers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    pub simulator_tick: Duration,
    pub render_tick: Duration,
    pub startup_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            simulator_tick: Duration::from_millis(20),
            render_tick: Duration::from_millis(20),
            startup_delay: Duration::from_millis(1000),
        }
    }
}

/// Serial link to the motor controller
#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            read_timeout: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub settings: RenderSettings,
    pub layout: LayoutConfig,
    pub timing: TimingConfig,
    pub serial: Option<SerialConfig>,
    pub font_path: Option<PathBuf>,
    pub asset_dir: PathBuf,
    /// Select the slowest speed and start the vector once the startup delay elapses.
    pub autostart: bool,
    /// Degrees added to the 180° goto target when driving real hardware.
    pub calibration_offset_at_180: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Rotating Vector".to_string(),
            window_width: 1600,
            window_height: 900,
            settings: RenderSettings::default(),
            layout: LayoutConfig::default(),
            timing: TimingConfig::default(),
            serial: None,
            font_path: None,
            asset_dir: PathBuf::from("assets"),
            autostart: false,
            calibration_offset_at_180: 0.0,
        }
    }
}
