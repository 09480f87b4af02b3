// ============================================================================
// FRAME ORCHESTRATION
// ============================================================================
//
// One frame is painted in a fixed order, and later passes deliberately cover earlier
// ones: axis, projection boxes, background, waves, vector, components, shadows, tip
// circles, decorations. The motion estimator runs before the histories shift so a
// frame's own running/stopped classification decides whether it stamps angle captions.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::angle::Direction;
use crate::assets::AssetProvider;
use crate::background::ScrollingBackground;
use crate::config::{palette, Color, LayoutConfig, RenderSettings};
use crate::geometry::Point;
use crate::motion::MotionEstimator;
use crate::projection::{OrdinateGuides, Projection};
use crate::scene::{DrawCommand, Layer, Pen, Scene};
use crate::text::TextMeasure;

const BACKGROUND_SEED: u64 = 10;
const BACKGROUND_POINTS: usize = 15;
const SCROLLING_TEXT_SIZE: f32 = 30.0;
const BOX_CAPTION_SIZE: f32 = 20.0;
const ANGLE_CAPTION_SIZE: f32 = 40.0;
const ANGLE_ARC_RADIUS: f64 = 30.0;

/// Everything the frame needs from outside the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub width: u32,
    pub angle_degrees: f64,
    pub direction: Direction,
    pub time_paused: bool,
}

/// Screen position of the rotating vector for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorGeometry {
    pub origin: Point,
    pub width: i32,
    pub height: i32,
    pub tip: Point,
}

impl VectorGeometry {
    pub fn compute(frame_width: u32, angle_degrees: f64, amplitude: i32, layout: &LayoutConfig) -> Self {
        let origin = Point::from_i32(
            frame_width as i32 - layout.x_axis_off_from_right + layout.wall_separation + amplitude,
            layout.x_axis_off_from_top,
        );
        let (sin, cos) = angle_degrees.to_radians().sin_cos();
        let width = (amplitude as f64 * cos) as i32;
        let height = (amplitude as f64 * sin) as i32;
        Self {
            origin,
            width,
            height,
            tip: Point::new(origin.x + width as f64, origin.y - height as f64),
        }
    }
}

pub struct Renderer {
    layout: LayoutConfig,
    sine: Projection,
    cosine: Projection,
    horizontal_background: ScrollingBackground,
    vertical_background: ScrollingBackground,
    motion: MotionEstimator,
}

impl Renderer {
    pub fn new(layout: LayoutConfig, settings: &RenderSettings) -> Self {
        let mut rng = StdRng::seed_from_u64(BACKGROUND_SEED);
        let horizontal_background =
            ScrollingBackground::with_standard_captions(BACKGROUND_POINTS, -200..1700, 0..800, &mut rng);
        let vertical_background =
            ScrollingBackground::with_standard_captions(BACKGROUND_POINTS / 2, 0..500, 0..800, &mut rng);

        Self {
            sine: Projection::new(0.0, layout.history_len, palette::SINE),
            cosine: Projection::new(settings.phase_shift, layout.history_len, palette::COSINE),
            layout,
            horizontal_background,
            vertical_background,
            motion: MotionEstimator::default(),
        }
    }

    pub fn sine(&self) -> &Projection {
        &self.sine
    }

    pub fn cosine(&self) -> &Projection {
        &self.cosine
    }

    pub fn is_vector_running(&self) -> bool {
        self.motion.is_running()
    }

    pub fn clear_sine_history(&mut self) {
        self.sine.clear();
    }

    pub fn clear_cosine_history(&mut self) {
        self.cosine.clear();
    }

    /// Build the next frame. Unless time is paused this also advances the histories
    /// and the scrolling backgrounds by one step.
    pub fn draw_frame(
        &mut self,
        input: &FrameInput,
        settings: &RenderSettings,
        measure: &dyn TextMeasure,
        assets: &dyn AssetProvider,
    ) -> Scene {
        let amplitude = settings.amplitude;
        let v = VectorGeometry::compute(input.width, input.angle_degrees, amplitude, &self.layout);

        if self.cosine.phase() != settings.phase_shift {
            self.cosine.set_phase(settings.phase_shift);
        }
        let wall = self.layout.wall_separation;
        self.sine.recalculate_position(v.origin, amplitude, wall);
        self.cosine.recalculate_position(v.origin, amplitude, wall);

        let running = self.motion.update(input.angle_degrees);

        let mut scene = Scene::new();
        scene.add_command(DrawCommand::Clear(palette::BACKGROUND));

        scene.begin_layer(Layer::Axis);
        self.draw_axes(&mut scene, settings);

        scene.begin_layer(Layer::ProjectionBoxes);
        self.draw_projection_boxes(&mut scene, settings, &v);

        scene.begin_layer(Layer::Background);
        self.draw_background(&mut scene, settings, &v);
        if !input.time_paused {
            self.horizontal_background.shift_left(self.layout.time_x_inc);
            self.vertical_background.shift_up(self.layout.time_x_inc);
        }

        scene.begin_layer(Layer::Waves);
        if !input.time_paused {
            self.sine.shift(amplitude, input.angle_degrees, running, input.direction);
            self.cosine.shift(amplitude, input.angle_degrees, running, input.direction);
        }
        self.draw_waves(&mut scene, settings, measure);

        scene.begin_layer(Layer::Vector);
        self.draw_rotating_vector(&mut scene, settings, measure, &v, input.angle_degrees);

        scene.begin_layer(Layer::Components);
        if settings.draw_sin_component {
            self.sine
                .draw_vector_component_in_sweep_circle(&mut scene, input.angle_degrees, settings.pen_width);
        }
        if settings.draw_cos_component {
            self.cosine
                .draw_vector_component_in_sweep_circle(&mut scene, input.angle_degrees, settings.pen_width);
        }

        scene.begin_layer(Layer::Shadows);
        self.draw_shadows(&mut scene, settings, &v, input.angle_degrees);

        scene.begin_layer(Layer::TipCircles);
        self.draw_tip_circles(&mut scene, settings, &v, input.angle_degrees);

        scene.begin_layer(Layer::Decorations);
        if settings.show_observer {
            if settings.show_sin_on_x_axis {
                self.sine.draw_observer(&mut scene, assets);
            }
            if settings.show_cos_on_y_axis {
                self.cosine.draw_observer(&mut scene, assets);
            }
        }

        scene
    }

    fn visible_projections(&self, settings: &RenderSettings) -> impl Iterator<Item = &Projection> {
        [
            (settings.show_sin_on_x_axis, &self.sine),
            (settings.show_cos_on_y_axis, &self.cosine),
        ]
        .into_iter()
        .filter_map(|(visible, projection)| visible.then_some(projection))
    }

    fn draw_axes(&self, scene: &mut Scene, settings: &RenderSettings) {
        let guides = OrdinateGuides {
            unit: settings.show_1_and_minus_1_ordinates || settings.show_all_ordinates,
            fractions: settings.show_all_ordinates,
            captions: settings.show_ordinate_captions,
        };
        for projection in self.visible_projections(settings) {
            projection.draw_axis(scene);
            projection.draw_important_ordinates(scene, guides);
            if settings.draw_rotating_vector {
                projection.draw_line_through_sweep_circle(scene);
            }
        }
    }

    fn draw_projection_boxes(&self, scene: &mut Scene, settings: &RenderSettings, v: &VectorGeometry) {
        let amplitude = settings.amplitude as f64;
        let pen_width = settings.pen_width as f64;
        let wall = self.layout.wall_separation as f64;

        if settings.show_vertical_projection_box {
            self.sine.draw_projection_box(scene, settings.pen_width);
            let x = self.sine.anchor().x - pen_width;
            scene.text(Point::new(x - 25.0, v.origin.y - amplitude - 5.0), "+1", BOX_CAPTION_SIZE, palette::BOX, 1.0);
            scene.text(Point::new(x - 18.0, v.origin.y + amplitude + 20.0), "-1", BOX_CAPTION_SIZE, palette::BOX, 1.0);
        }
        if settings.show_horizontal_projection_box {
            self.cosine.draw_projection_box(scene, settings.pen_width);
            let y = v.origin.y - amplitude - wall - pen_width;
            scene.text(Point::new(v.origin.x - amplitude - 23.0, y), "-1", BOX_CAPTION_SIZE, palette::BOX, 1.0);
            scene.text(Point::new(v.origin.x + amplitude + 3.0, y), "+1", BOX_CAPTION_SIZE, palette::BOX, 1.0);
        }
    }

    fn draw_background(&self, scene: &mut Scene, settings: &RenderSettings, v: &VectorGeometry) {
        let amplitude = settings.amplitude;
        let wall = self.layout.wall_separation;
        let half_pen = settings.pen_width / 2;
        let (ox, oy) = (v.origin.x as i32, v.origin.y as i32);

        if settings.show_sin_on_x_axis {
            if settings.show_scrolling_background_text {
                self.horizontal_background.draw(
                    scene,
                    0,
                    oy - amplitude,
                    ox - amplitude,
                    amplitude * 2,
                    SCROLLING_TEXT_SIZE,
                    palette::SCROLLING_TEXT,
                    0.2,
                );
            }
            tinted_rect(
                scene,
                0,
                oy - amplitude - wall,
                ox - amplitude - wall - half_pen,
                2 * (amplitude + wall),
                palette::SINE,
            );
        }

        if settings.show_cos_on_y_axis {
            if settings.show_scrolling_background_text {
                self.vertical_background.draw(
                    scene,
                    ox - amplitude,
                    0,
                    amplitude * 2,
                    oy - amplitude,
                    SCROLLING_TEXT_SIZE,
                    palette::SCROLLING_TEXT,
                    0.2,
                );
            }
            tinted_rect(
                scene,
                ox - amplitude - wall,
                0,
                2 * (amplitude + wall),
                oy - amplitude - wall - half_pen,
                palette::COSINE,
            );
        }
    }

    fn draw_waves(&self, scene: &mut Scene, settings: &RenderSettings, measure: &dyn TextMeasure) {
        let scale = self.layout.time_x_inc;
        for projection in self.visible_projections(settings) {
            projection.draw_wave(scene, scale, settings.pen_width);
            if settings.show_angles_on_axis {
                projection.draw_angles(
                    scene,
                    measure,
                    scale,
                    settings.show_30_and_60_angles,
                    settings.show_angles_in_radians,
                );
            }
        }
        if settings.show_cos_on_x_axis {
            self.cosine
                .draw_wave_rotated(scene, scale, settings.pen_width, self.sine.phase());
        }
    }

    fn draw_rotating_vector(
        &self,
        scene: &mut Scene,
        settings: &RenderSettings,
        measure: &dyn TextMeasure,
        v: &VectorGeometry,
        angle_degrees: f64,
    ) {
        if !settings.draw_rotating_vector {
            return;
        }
        let amplitude = settings.amplitude as f64;
        let axis_pen = Pen::new(palette::AXIS, 2.0);

        scene.add_command(DrawCommand::Ellipse {
            center: v.origin,
            radius: amplitude,
            pen: Some(axis_pen),
            fill: Some(palette::VECTOR_SWEEP),
            opacity: 0.1,
        });
        let reach = amplitude + 10.0;
        scene.line(
            Point::new(v.origin.x - reach, v.origin.y),
            Point::new(v.origin.x + reach, v.origin.y),
            axis_pen,
            0.3,
        );
        scene.line(
            Point::new(v.origin.x, v.origin.y - reach),
            Point::new(v.origin.x, v.origin.y + reach),
            axis_pen,
            0.3,
        );

        scene.line(
            v.origin,
            v.tip,
            Pen::new(palette::VECTOR, settings.pen_width as f32),
            1.0,
        );

        if settings.draw_angle_arc {
            scene.add_command(DrawCommand::Arc {
                center: v.origin,
                radius: ANGLE_ARC_RADIUS,
                start_degrees: 0.0,
                span_degrees: angle_degrees,
                pen: Pen::new(Color::BLACK, 2.0),
                opacity: 0.3,
            });
            let caption = (angle_degrees.round() as i32).to_string();
            let width = measure.text_width(&caption, ANGLE_CAPTION_SIZE);
            scene.text(
                Point::new(
                    v.origin.x - (width / 2.0).trunc(),
                    v.origin.y + amplitude + 50.0,
                ),
                caption,
                ANGLE_CAPTION_SIZE,
                palette::CAPTION,
                0.7,
            );
        }

        if settings.phase_shift_arc_and_caption {
            self.cosine
                .draw_phase_arc_from_given_phase(scene, measure, self.sine.phase(), settings.pen_width);
        }
    }

    fn draw_shadows(&self, scene: &mut Scene, settings: &RenderSettings, v: &VectorGeometry, angle_degrees: f64) {
        if settings.draw_vertical_shadow {
            self.sine
                .draw_vector_projection(scene, angle_degrees, settings.pen_width);
        }
        if settings.draw_horizontal_shadow {
            self.cosine
                .draw_vector_projection(scene, angle_degrees, settings.pen_width);
        }
        if settings.draw_vertical_projection_dotted_line {
            self.sine.draw_dotted_line_from_tip(scene, angle_degrees, v.tip);
        }
        if settings.draw_horizontal_projection_dotted_line {
            self.cosine.draw_dotted_line_from_tip(scene, angle_degrees, v.tip);
        }
    }

    fn draw_tip_circles(&self, scene: &mut Scene, settings: &RenderSettings, v: &VectorGeometry, angle_degrees: f64) {
        if settings.draw_rotating_vector {
            scene.add_command(DrawCommand::Ellipse {
                center: v.tip,
                radius: settings.pen_width as f64 / 2.0,
                pen: Some(Pen::new(palette::VECTOR_TIP_CIRCLE, 2.0)),
                fill: Some(Color::WHITE),
                opacity: 1.0,
            });
        }
        if settings.draw_vertical_projection_tip_circle {
            self.sine.draw_tip_circle(scene, angle_degrees, settings.pen_width);
        }
        if settings.draw_horizontal_projection_tip_circle {
            self.cosine.draw_tip_circle(scene, angle_degrees, settings.pen_width);
        }
        if settings.show_cos_on_x_axis {
            self.cosine
                .draw_tip_circle_unrotated(scene, angle_degrees, settings.pen_width);
        }
    }
}

fn tinted_rect(scene: &mut Scene, x: i32, y: i32, width: i32, height: i32, color: Color) {
    if width <= 0 || height <= 0 {
        return;
    }
    let (x, y, w, h) = (x as f64, y as f64, width as f64, height as f64);
    scene.polygon(
        vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ],
        None,
        Some(color),
        0.05,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use crate::text::FixedAdvance;

    const ALL_LAYERS: [Layer; 9] = [
        Layer::Axis,
        Layer::ProjectionBoxes,
        Layer::Background,
        Layer::Waves,
        Layer::Vector,
        Layer::Components,
        Layer::Shadows,
        Layer::TipCircles,
        Layer::Decorations,
    ];

    fn layout() -> LayoutConfig {
        LayoutConfig {
            history_len: 60,
            ..LayoutConfig::default()
        }
    }

    fn input(angle_degrees: f64) -> FrameInput {
        FrameInput {
            width: 1600,
            angle_degrees,
            direction: Direction::CounterClockwise,
            time_paused: false,
        }
    }

    fn frame(renderer: &mut Renderer, input: &FrameInput, settings: &RenderSettings) -> Scene {
        renderer.draw_frame(input, settings, &FixedAdvance::default(), &AssetStore::new())
    }

    #[test]
    fn test_vector_geometry() {
        let v = VectorGeometry::compute(1600, 90.0, 150, &LayoutConfig::default());
        assert_eq!(v.origin, Point::new(1250.0, 560.0));
        assert_eq!(v.width, 0);
        assert_eq!(v.height, 150);
        assert_eq!(v.tip, Point::new(1250.0, 410.0));

        let v = VectorGeometry::compute(1600, 180.0, 150, &LayoutConfig::default());
        assert_eq!(v.tip, Point::new(1100.0, 560.0));
    }

    #[test]
    fn test_layers_are_painted_in_fixed_order() {
        let settings = RenderSettings::default();
        let mut renderer = Renderer::new(layout(), &settings);
        let scene = frame(&mut renderer, &input(30.0), &settings);

        assert_eq!(scene.layers(), ALL_LAYERS.to_vec());
        assert!(matches!(scene.commands()[0], DrawCommand::Clear(_)));

        // the vector tip circle is painted over the vector itself
        let tips = scene.layer_commands(Layer::TipCircles);
        assert!(tips
            .iter()
            .any(|c| matches!(c, DrawCommand::Ellipse { fill: Some(Color::WHITE), .. })));
        assert!(!scene.layer_commands(Layer::Waves).is_empty());
        assert!(!scene.layer_commands(Layer::Vector).is_empty());
    }

    #[test]
    fn test_disabled_elements_are_not_drawn() {
        let settings = RenderSettings::builder()
            .draw_rotating_vector(false)
            .draw_vertical_shadow(false)
            .draw_vertical_projection_dotted_line(false)
            .draw_vertical_projection_tip_circle(false)
            .show_vertical_projection_box(false)
            .draw_sin_component(false)
            .build();
        let mut renderer = Renderer::new(layout(), &settings);
        let scene = frame(&mut renderer, &input(30.0), &settings);

        for layer in [
            Layer::ProjectionBoxes,
            Layer::Vector,
            Layer::Components,
            Layer::Shadows,
            Layer::TipCircles,
            Layer::Decorations,
        ] {
            assert!(scene.layer_commands(layer).is_empty(), "{layer:?} should be empty");
        }
    }

    #[test]
    fn test_time_pause_freezes_history() {
        let settings = RenderSettings::default();
        let mut renderer = Renderer::new(layout(), &settings);
        frame(&mut renderer, &input(90.0), &settings);
        assert_eq!(renderer.sine().history().newest().height, 150);

        let paused = FrameInput {
            time_paused: true,
            ..input(0.0)
        };
        frame(&mut renderer, &paused, &settings);
        assert_eq!(renderer.sine().history().newest().height, 150);

        frame(&mut renderer, &input(0.0), &settings);
        assert_eq!(renderer.sine().history().newest().height, 0);
        assert_eq!(renderer.sine().history().get(1).unwrap().height, 150);
    }

    #[test]
    fn test_labels_only_stamped_while_rotating() {
        let settings = RenderSettings::default();
        let mut renderer = Renderer::new(layout(), &settings);

        // a stationary vector at 90° never gets a caption
        for _ in 0..20 {
            frame(&mut renderer, &input(90.0), &settings);
        }
        assert!(!renderer.is_vector_running());
        assert!(renderer.sine().history().iter().all(|s| s.angle_label.is_none()));

        let mut angle = 0.0;
        for _ in 0..200 {
            angle = (angle + 0.6_f64) % 360.0;
            frame(&mut renderer, &input(angle), &settings);
        }
        assert!(renderer.is_vector_running());
        assert!(renderer
            .sine()
            .history()
            .iter()
            .any(|s| s.angle_label.is_some()));
    }

    #[test]
    fn test_cosine_follows_phase_setting() {
        let settings = RenderSettings::default();
        let mut renderer = Renderer::new(layout(), &settings);
        frame(&mut renderer, &input(0.0), &settings);
        assert_eq!(renderer.cosine().history().newest().height, 150);

        let shifted = RenderSettings::builder().phase_shift(45.0).build();
        frame(&mut renderer, &input(0.0), &shifted);
        assert_eq!(renderer.cosine().phase(), 45.0);
        assert_eq!(renderer.cosine().history().newest().height, 106);
    }

    #[test]
    fn test_clear_histories() {
        let settings = RenderSettings::default();
        let mut renderer = Renderer::new(layout(), &settings);
        frame(&mut renderer, &input(45.0), &settings);
        renderer.clear_sine_history();
        assert!(renderer.sine().history().iter().all(|s| s.height == 0));
        assert_ne!(renderer.cosine().history().newest().height, 0);
        renderer.clear_cosine_history();
        assert!(renderer.cosine().history().iter().all(|s| s.height == 0));
    }

    #[test]
    fn test_cos_on_x_axis_adds_wave_and_tip() {
        let base = RenderSettings::default();
        let with_cos = RenderSettings::builder().show_cos_on_x_axis(true).build();

        let mut renderer = Renderer::new(layout(), &base);
        let plain = frame(&mut renderer, &input(10.0), &base);
        let mut renderer = Renderer::new(layout(), &with_cos);
        let extra = frame(&mut renderer, &input(10.0), &with_cos);

        let waves = |scene: &Scene| scene.layer_commands(Layer::Waves).len();
        let tips = |scene: &Scene| scene.layer_commands(Layer::TipCircles).len();
        assert_eq!(waves(&extra), waves(&plain) + layout().history_len - 1);
        assert_eq!(tips(&extra), tips(&plain) + 1);
    }

    #[test]
    fn test_ordinate_captions_follow_setting() {
        let unit_captions = |scene: &Scene| {
            scene
                .layer_commands(Layer::Axis)
                .iter()
                .filter(|c| matches!(c, DrawCommand::Text { text, .. } if text == "+1.0" || text == "-1.0"))
                .count()
        };

        let settings = RenderSettings::default();
        let mut renderer = Renderer::new(layout(), &settings);
        assert_eq!(unit_captions(&frame(&mut renderer, &input(30.0), &settings)), 2);

        let hidden = RenderSettings::builder().show_ordinate_captions(false).build();
        let mut renderer = Renderer::new(layout(), &hidden);
        assert_eq!(unit_captions(&frame(&mut renderer, &input(30.0), &hidden)), 0);
    }
}
