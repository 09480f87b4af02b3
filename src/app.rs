// ============================================================================
// APPLICATION
// ============================================================================
//
// Three independent clocks drive the window: the simulator tick, the render tick and
// a one-shot startup timer. Status lines are drained from the channel on every wakeup
// and are the only thing that moves the vector. A goto lets time run; time pauses
// again when the simulator reports that the goto or half-step has finished.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::WindowBuilder;

use crate::angle::{AngleModel, Direction};
use crate::assets::{AssetStore, OBSERVER_IMAGE};
use crate::canvas::{render_scene, Canvas};
use crate::channel::MotorChannel;
use crate::config::{AppConfig, RenderSettings};
use crate::control::{ControlPanel, KEY_BINDINGS};
use crate::protocol::{MotorCommand, SpeedLevel};
use crate::render::{FrameInput, Renderer};
use crate::text::{FixedAdvance, FontFace, TextMeasure};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("pixel buffer error: {0}")]
    Pixels(#[from] pixels::Error),
}

/// Fires once per interval. A timer that fell more than one interval behind skips the
/// missed ticks instead of bursting through them.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicTimer {
    interval: Duration,
    next_due: Instant,
}

impl PeriodicTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Takes effect after the next fire.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            debug!("Timer fell behind by {:?}", now - self.next_due);
            self.next_due = now + self.interval;
        }
        true
    }
}

/// Everything the window loop drives, without the window itself.
pub struct App {
    settings: RenderSettings,
    channel: Box<dyn MotorChannel>,
    angle: AngleModel,
    /// Direction the vector last moved in, shown on the captions.
    direction: Direction,
    /// Direction the motor will use for its next move.
    commanded: Direction,
    renderer: Renderer,
    control: ControlPanel,
    font: Option<FontFace>,
    assets: AssetStore,
    simulator_timer: PeriodicTimer,
    render_timer: PeriodicTimer,
    startup_due: Option<Instant>,
    autostart: bool,
}

impl App {
    pub fn new(config: &AppConfig, channel: Box<dyn MotorChannel>, now: Instant) -> Self {
        let font = FontFace::discover(config.font_path.as_deref());
        let assets = AssetStore::load(&config.asset_dir, &[OBSERVER_IMAGE]);
        Self::with_parts(config, channel, font, assets, now)
    }

    pub fn with_parts(
        config: &AppConfig,
        channel: Box<dyn MotorChannel>,
        font: Option<FontFace>,
        assets: AssetStore,
        now: Instant,
    ) -> Self {
        info!("Motor channel: {}", channel.name());
        let control = ControlPanel::new(config, channel.is_hardware());
        Self {
            settings: config.settings,
            channel,
            angle: AngleModel::new(),
            direction: Direction::default(),
            commanded: Direction::default(),
            renderer: Renderer::new(config.layout, &config.settings),
            control,
            font,
            assets,
            simulator_timer: PeriodicTimer::new(config.timing.simulator_tick, now),
            render_timer: PeriodicTimer::new(config.timing.render_tick, now),
            startup_due: Some(now + config.timing.startup_delay),
            autostart: config.autostart,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn angle(&self) -> &AngleModel {
        &self.angle
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn time_paused(&self) -> bool {
        self.control.time_paused()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn entry_prompt(&self) -> Option<String> {
        self.control.entry_prompt()
    }

    pub fn render_interval(&self) -> Duration {
        self.render_timer.interval()
    }

    /// Send commands in order. The shown direction follows the last command that
    /// moves the motor, so a clockwise half-step that restores the default direction
    /// afterwards is still drawn as clockwise.
    pub fn send_all(&mut self, commands: Vec<MotorCommand>) {
        let mut moved = None;
        let mut redirected = false;
        for command in commands {
            match command {
                MotorCommand::SetDirection(direction) => {
                    self.commanded = direction;
                    redirected = true;
                }
                MotorCommand::Continue
                | MotorCommand::Goto(_)
                | MotorCommand::HalfStep
                | MotorCommand::Speed(_) => moved = Some(self.commanded),
                MotorCommand::Pause | MotorCommand::Release | MotorCommand::Calibrate(_) => {}
            }
            if let Err(err) = self.channel.send(&command) {
                warn!("Failed to send {command} to {}: {err}", self.channel.name());
            }
        }
        if let Some(direction) = moved.or(redirected.then_some(self.commanded)) {
            self.direction = direction;
        }
    }

    pub fn handle_key(&mut self, key: &Key, ctrl: bool) {
        let Some(action) = self.control.action_for_key(key, ctrl) else {
            return;
        };
        debug!("Key {key:?} -> {action:?}");
        let outcome = self.control.apply(action, &mut self.settings);
        self.send_all(outcome.commands);
        if let Some(interval) = outcome.render_tick {
            self.render_timer.set_interval(interval);
        }
        if outcome.clear_sine {
            self.renderer.clear_sine_history();
        }
        if outcome.clear_cosine {
            self.renderer.clear_cosine_history();
        }
    }

    /// Run whatever timers are due and drain the channel. Returns true when a frame
    /// should be drawn.
    pub fn update(&mut self, now: Instant) -> bool {
        if self.startup_due.is_some_and(|due| now >= due) {
            self.startup_due = None;
            if self.autostart {
                info!("Starting vector at the slowest speed");
                self.send_all(vec![
                    MotorCommand::Speed(SpeedLevel::SLOWEST),
                    MotorCommand::Continue,
                ]);
            }
        }

        if self.simulator_timer.fire(now) {
            self.channel.tick();
        }

        match self.channel.poll() {
            Ok(statuses) => {
                let offset = if self.channel.is_hardware() {
                    self.settings.angle_advance_offset
                } else {
                    0.0
                };
                for status in &statuses {
                    self.angle.apply_status(status, offset);
                }
            }
            Err(err) => warn!("Failed to read from {}: {err}", self.channel.name()),
        }
        if self.channel.take_motion_finished() {
            self.control.motion_finished();
        }

        self.render_timer.fire(now)
    }

    /// Earliest moment any timer needs attention.
    pub fn next_wakeup(&self) -> Instant {
        let next = self.simulator_timer.next_due().min(self.render_timer.next_due());
        match self.startup_due {
            Some(due) => next.min(due),
            None => next,
        }
    }

    /// Build the next frame and rasterize it into an RGBA buffer.
    pub fn draw(&mut self, frame: &mut [u8], width: u32, height: u32) {
        let input = FrameInput {
            width,
            angle_degrees: self.angle.degrees(),
            direction: self.direction,
            time_paused: self.control.time_paused(),
        };
        let fallback = FixedAdvance::default();
        let measure: &dyn TextMeasure = match &self.font {
            Some(font) => font,
            None => &fallback,
        };
        let scene = self
            .renderer
            .draw_frame(&input, &self.settings, measure, &self.assets);

        let mut canvas = Canvas::new(frame, width as usize, height as usize);
        render_scene(&mut canvas, &scene, self.font.as_ref(), &self.assets);
    }
}

pub fn run(config: AppConfig, channel: Box<dyn MotorChannel>) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(LogicalSize::new(
            config.window_width as f64,
            config.window_height as f64,
        ))
        .build(&event_loop)?;
    let window = Arc::new(window);
    let window_clone = window.clone();

    let mut fb_width = window.inner_size().width.max(1);
    let mut fb_height = window.inner_size().height.max(1);
    let mut pixels = {
        let surface_texture = SurfaceTexture::new(fb_width, fb_height, &window);
        Pixels::new(fb_width, fb_height, surface_texture)?
    };

    info!("Keys:\n{KEY_BINDINGS}");
    let mut app = App::new(&config, channel, Instant::now());
    let mut ctrl_held = false;
    let mut shown_prompt = None;

    event_loop.run(move |event, window_target| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                info!("Window closed");
                window_target.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width == 0 || new_size.height == 0 {
                    return;
                }
                fb_width = new_size.width;
                fb_height = new_size.height;
                if let Err(err) = pixels.resize_surface(fb_width, fb_height) {
                    warn!("Failed to resize surface: {err}");
                }
                if let Err(err) = pixels.resize_buffer(fb_width, fb_height) {
                    warn!("Failed to resize buffer: {err}");
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                ctrl_held = modifiers.state().control_key();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    app.handle_key(&event.logical_key, ctrl_held);
                    let prompt = app.entry_prompt();
                    if prompt != shown_prompt {
                        match &prompt {
                            Some(prompt) => {
                                window_clone.set_title(&format!("{} | {prompt}", config.title))
                            }
                            None => window_clone.set_title(&config.title),
                        }
                        shown_prompt = prompt;
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                app.draw(pixels.frame_mut(), fb_width, fb_height);
                if let Err(err) = pixels.render() {
                    error!("Render failed: {err}");
                    window_target.exit();
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            if app.update(Instant::now()) {
                window_clone.request_redraw();
            }
            window_target.set_control_flow(ControlFlow::WaitUntil(app.next_wakeup()));
        }
        _ => {}
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SimulatedChannel;
    use crate::config::TimingConfig;
    use approx::assert_relative_eq;
    use winit::keyboard::NamedKey;

    fn test_config(autostart: bool) -> AppConfig {
        AppConfig {
            timing: TimingConfig {
                simulator_tick: Duration::from_millis(20),
                render_tick: Duration::from_millis(40),
                startup_delay: Duration::from_millis(100),
            },
            autostart,
            ..AppConfig::default()
        }
    }

    fn test_app(autostart: bool, start: Instant) -> App {
        App::with_parts(
            &test_config(autostart),
            Box::new(SimulatedChannel::new()),
            None,
            AssetStore::new(),
            start,
        )
    }

    #[test]
    fn test_periodic_timer() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::new(Duration::from_millis(10), start);
        assert!(!timer.fire(start));
        assert!(timer.fire(start + Duration::from_millis(10)));
        assert!(!timer.fire(start + Duration::from_millis(15)));
        assert!(timer.fire(start + Duration::from_millis(20)));

        // far behind: one fire, then the schedule restarts from now
        let late = start + Duration::from_millis(200);
        assert!(timer.fire(late));
        assert!(!timer.fire(late));
        assert_eq!(timer.next_due(), late + Duration::from_millis(10));
    }

    #[test]
    fn test_autostart_moves_vector_after_startup_delay() {
        let start = Instant::now();
        let mut app = test_app(true, start);

        for ms in (20..=100).step_by(20) {
            app.update(start + Duration::from_millis(ms));
        }
        assert_eq!(app.angle().degrees(), 0.0);

        for ms in (120..=400).step_by(20) {
            app.update(start + Duration::from_millis(ms));
        }
        assert!(app.angle().degrees() > 0.0);
    }

    #[test]
    fn test_without_autostart_vector_stays_put() {
        let start = Instant::now();
        let mut app = test_app(false, start);
        for ms in (20..=400).step_by(20) {
            app.update(start + Duration::from_millis(ms));
        }
        assert_eq!(app.angle().degrees(), 0.0);
    }

    #[test]
    fn test_simulated_readings_ignore_angle_offset() {
        let start = Instant::now();
        let mut config = test_config(false);
        config.settings.angle_advance_offset = 5.0;
        let mut app = App::with_parts(
            &config,
            Box::new(SimulatedChannel::new()),
            None,
            AssetStore::new(),
            start,
        );

        app.handle_key(&Key::Character("[".into()), false);
        for ms in (20..=200).step_by(20) {
            app.update(start + Duration::from_millis(ms));
        }
        assert_relative_eq!(app.angle().degrees(), 0.9, epsilon = 1e-9);
    }

    #[test]
    fn test_render_timer_requests_frames() {
        let start = Instant::now();
        let mut app = test_app(false, start);
        assert!(!app.update(start + Duration::from_millis(20)));
        assert!(app.update(start + Duration::from_millis(40)));
        assert!(app.next_wakeup() <= start + Duration::from_millis(80));
    }

    #[test]
    fn test_draw_fills_buffer() {
        let start = Instant::now();
        let mut app = test_app(false, start);
        let (width, height) = (1600, 900);
        let mut frame = vec![0u8; width as usize * height as usize * 4];
        app.draw(&mut frame, width, height);
        assert!(frame.chunks_exact(4).all(|px| px[3] == 0xff));
        assert_eq!(app.renderer().sine().history().newest().height, 0);
    }

    fn press(app: &mut App, keys: &[&str]) {
        for text in keys {
            app.handle_key(&Key::Character((*text).into()), false);
        }
    }

    fn run_until(app: &mut App, start: Instant, from_ms: u64, to_ms: u64) {
        for ms in (from_ms..=to_ms).step_by(20) {
            app.update(start + Duration::from_millis(ms));
        }
    }

    #[test]
    fn test_goto_runs_time_until_target_reached() {
        let start = Instant::now();
        let mut app = test_app(false, start);
        app.handle_key(&Key::Named(NamedKey::Space), false);
        assert!(app.time_paused());

        press(&mut app, &["/", "9", "0"]);
        assert_eq!(app.entry_prompt().as_deref(), Some("goto: 90"));
        app.handle_key(&Key::Named(NamedKey::Enter), false);
        assert!(!app.time_paused());
        assert_eq!(app.entry_prompt(), None);

        run_until(&mut app, start, 20, 400);
        assert!(app.angle().degrees() > 0.0);
        assert!(!app.time_paused());

        run_until(&mut app, start, 420, 5000);
        assert_relative_eq!(app.angle().degrees(), 90.0, epsilon = 1e-9);
        assert!(app.time_paused());
    }

    #[test]
    fn test_half_step_pauses_time_and_keeps_its_direction() {
        let start = Instant::now();
        let mut app = test_app(false, start);
        assert!(!app.time_paused());

        press(&mut app, &["]"]);
        assert_eq!(app.direction(), Direction::Clockwise);
        run_until(&mut app, start, 20, 200);
        assert_relative_eq!(app.angle().degrees(), 359.1, epsilon = 1e-9);
        assert!(app.time_paused());
        assert_eq!(app.direction(), Direction::Clockwise);

        // pausing does not move, continuing moves in the restored default direction
        press(&mut app, &["p"]);
        assert_eq!(app.direction(), Direction::Clockwise);
        press(&mut app, &["c"]);
        assert_eq!(app.direction(), Direction::CounterClockwise);
        assert!(app.time_paused());
    }

    #[test]
    fn test_render_tick_key_changes_interval() {
        let start = Instant::now();
        let mut app = test_app(false, start);
        assert_eq!(app.render_interval(), Duration::from_millis(40));

        press(&mut app, &["'"]);
        assert_eq!(app.render_interval(), Duration::from_millis(45));
        assert!(app.update(start + Duration::from_millis(40)));
        assert!(!app.update(start + Duration::from_millis(80)));
        assert!(app.update(start + Duration::from_millis(85)));
    }
}
