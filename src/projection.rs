//! One projection axis of the rotating vector.
//!
//! A projection looks at the vector from a direction set by its phase. Phase 0 is the
//! sine view: the axis sits to the left of the sweep circle and heights are measured
//! upward. Any other phase rotates the whole frame (axis, wave, captions, observer)
//! clockwise on screen around the axis anchor, so phase 90 yields the cosine view above
//! the circle with heights growing to the right.
//!
//! All draw methods only append commands to a [`Scene`]; call them in painting order.

use crate::angle::Direction;
use crate::assets::{AssetProvider, OBSERVER_IMAGE};
use crate::config::{palette, Color};
use crate::geometry::{transformed_rect, Point, Transform};
use crate::history::{angle_label, ProjectionHistory};
use crate::scene::{DrawCommand, Pen, Scene};
use crate::text::{layout_circular_text, CircularText, TextMeasure};

pub const WAVE_OPACITY: f32 = 0.7;
pub const PROJECTION_OPACITY: f32 = 0.7;

/// Length of the drawn axis and ordinate guides, enough to cross any window.
pub const AXIS_LENGTH: f64 = 2500.0;

const ANGLE_CAPTION_SIZE: f32 = 20.0;
const ORDINATE_CAPTION_SIZE: f32 = 16.0;
const PHASE_CAPTION_SIZE: f32 = 22.0;

/// Which guide lines to draw across the wave area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrdinateGuides {
    /// ±1
    pub unit: bool,
    /// ±0.866, ±0.707 and ±0.5
    pub fractions: bool,
    pub captions: bool,
}

const IMPORTANT_ORDINATES: [(f64, &str, bool); 8] = [
    (1.0, "+1.0", true),
    (0.866, "+0.866", false),
    (0.707, "+0.707", false),
    (0.5, "+0.5", false),
    (-0.5, "-0.5", false),
    (-0.707, "-0.707", false),
    (-0.866, "-0.866", false),
    (-1.0, "-1.0", true),
];

#[derive(Debug, Clone)]
pub struct Projection {
    phase: f64,
    color: Color,
    origin: Point,
    amplitude: i32,
    wall_separation: i32,
    anchor: Point,
    unrotated_anchor: Point,
    position_calculated: bool,
    history: ProjectionHistory,
}

impl Projection {
    /// # Panics
    /// Panics if `history_len` is zero.
    pub fn new(phase: f64, history_len: usize, color: Color) -> Self {
        Self {
            phase,
            color,
            origin: Point::default(),
            amplitude: 0,
            wall_separation: 0,
            anchor: Point::default(),
            unrotated_anchor: Point::default(),
            position_calculated: false,
            history: ProjectionHistory::new(history_len),
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn amplitude(&self) -> i32 {
        self.amplitude
    }

    /// Axis anchor for the current phase.
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    /// Axis anchor the projection would have at phase 0.
    pub fn unrotated_anchor(&self) -> Point {
        self.unrotated_anchor
    }

    pub fn history(&self) -> &ProjectionHistory {
        &self.history
    }

    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
        if self.position_calculated {
            self.update_anchors();
        }
    }

    /// Recompute the axis anchor. Must be called whenever origin, amplitude or wall
    /// separation change; calling it again with the same inputs changes nothing.
    pub fn recalculate_position(&mut self, origin: Point, amplitude: i32, wall_separation: i32) {
        self.origin = origin;
        self.amplitude = amplitude;
        self.wall_separation = wall_separation;
        self.update_anchors();
    }

    fn update_anchors(&mut self) {
        self.anchor = self.axis_position_for_phase(self.phase);
        self.unrotated_anchor = self.axis_position_for_phase(0.0);
        self.position_calculated = true;
    }

    pub fn axis_position_for_phase(&self, phase: f64) -> Point {
        let distance = (self.amplitude + self.wall_separation) as f64;
        let (sin, cos) = phase.to_radians().sin_cos();
        Point::new(
            self.origin.x - (distance * cos).trunc(),
            self.origin.y - (distance * sin).trunc(),
        )
    }

    fn frame(&self) -> Transform {
        Transform::new(self.anchor, self.phase)
    }

    /// Height of the vector as seen from this projection.
    pub fn current_height(&self, amplitude: i32, angle_degrees: f64) -> i32 {
        (amplitude as f64 * (angle_degrees + self.phase).to_radians().sin()).round() as i32
    }

    /// Depth of the vector as seen from this projection.
    pub fn current_depth(&self, amplitude: i32, angle_degrees: f64) -> i32 {
        (amplitude as f64 * (angle_degrees + self.phase).to_radians().cos()).round() as i32
    }

    /// Push the current height into the history, stamping an angle caption when due.
    pub fn shift(&mut self, amplitude: i32, angle_degrees: f64, is_running: bool, direction: Direction) {
        let height = self.current_height(amplitude, angle_degrees);
        let label = angle_label(angle_degrees, is_running, direction);
        self.history.shift(height, label);
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Screen position of the projected vector tip on this axis.
    pub fn projected_tip(&self, angle_degrees: f64) -> Point {
        let height = self.current_height(self.amplitude, angle_degrees) as f64;
        let (sin, cos) = (90.0 - self.phase).to_radians().sin_cos();
        Point::new(
            self.anchor.x + (height * cos).trunc(),
            self.anchor.y - (height * sin).trunc(),
        )
    }

    pub fn draw_wave(&self, scene: &mut Scene, abscissa_scale: i32, pen_width: i32) {
        self.draw_wave_rotated(scene, abscissa_scale, pen_width, self.phase);
    }

    /// Draw the history as if this projection had phase `rotation`.
    pub fn draw_wave_rotated(&self, scene: &mut Scene, abscissa_scale: i32, pen_width: i32, rotation: f64) {
        let frame = Transform::new(self.axis_position_for_phase(rotation), rotation);
        let pen = Pen::new(self.color, pen_width as f32);
        let scale = abscissa_scale as f64;

        let samples: Vec<i32> = self.history.iter().map(|s| s.height).collect();
        for (i, pair) in samples.windows(2).enumerate() {
            let x = i as f64 * scale;
            scene.line(
                frame.apply_xy(-x, -pair[0] as f64),
                frame.apply_xy(-(x + scale), -pair[1] as f64),
                pen,
                WAVE_OPACITY,
            );
        }
    }

    /// Tick marks, drop lines and captions for every labelled sample.
    ///
    /// Without `show_multiples_of_30` only multiples of 90 are captioned.
    pub fn draw_angles(
        &self,
        scene: &mut Scene,
        measure: &dyn TextMeasure,
        abscissa_scale: i32,
        show_multiples_of_30: bool,
        show_in_radians: bool,
    ) {
        let frame = self.frame();
        let pen = Pen::new(palette::CAPTION, 2.0);
        let zero_pen = Pen::new(palette::ZERO_MARK, 2.0);
        let amplitude = self.amplitude as f64;
        let (sin, cos) = self.phase.to_radians().sin_cos();

        let count = self.history.len().saturating_sub(1);
        for (i, sample) in self.history.iter().take(count).enumerate() {
            let Some(label) = sample.angle_label else {
                continue;
            };
            if !show_multiples_of_30 && label % 90 != 0 {
                continue;
            }

            let x = -(i as f64) * abscissa_scale as f64;
            scene.line(frame.apply_xy(x, -1.0), frame.apply_xy(x, 1.0), pen, 0.3);
            scene.line(
                frame.apply_xy(x, 0.0),
                frame.apply_xy(x, -sample.height as f64),
                pen,
                0.1,
            );
            if label == 0 || label == 360 {
                scene.line(
                    frame.apply_xy(x, -amplitude - 10.0),
                    frame.apply_xy(x, amplitude + 10.0),
                    zero_pen,
                    0.3,
                );
            }

            // Captions stay upright; only their anchor follows the rotated axis.
            let caption = if show_in_radians {
                radian_caption(label)
            } else {
                label.to_string()
            };
            let width = measure.text_width(&caption, ANGLE_CAPTION_SIZE).trunc();
            let distance = i as f64 * abscissa_scale as f64;
            let caption_x = self.anchor.x - (distance * cos).trunc();
            let caption_y = self.anchor.y - (distance * sin).trunc();
            let half = (width / 2.0).trunc();
            let x_correction = half + ((half + 10.0) * sin).trunc();
            let y_correction = 10.0 + (ANGLE_CAPTION_SIZE as f64 * cos).trunc();
            scene.text(
                Point::new(caption_x - x_correction, caption_y + y_correction),
                caption,
                ANGLE_CAPTION_SIZE,
                palette::CAPTION,
                0.3,
            );
        }
    }

    /// Filled bar from the axis to the current height.
    pub fn draw_vector_projection(&self, scene: &mut Scene, angle_degrees: f64, pen_width: i32) {
        let height = self.current_height(self.amplitude, angle_degrees) as f64;
        let pw = pen_width as f64;
        let corners = transformed_rect(&self.frame(), -(pw / 2.0).trunc(), 0.0, pw, -height);
        scene.polygon(
            corners.to_vec(),
            Some(Pen::new(self.color, 1.0)),
            Some(self.color),
            PROJECTION_OPACITY,
        );
    }

    /// The two legs of the component triangle inside the sweep circle.
    pub fn draw_vector_component_in_sweep_circle(&self, scene: &mut Scene, angle_degrees: f64, pen_width: i32) {
        let height = self.current_height(self.amplitude, angle_degrees) as f64;
        let depth = self.current_depth(self.amplitude, angle_degrees) as f64;
        let frame = Transform::new(self.origin, self.phase);
        let pen = Pen::new(self.color, pen_width as f32);

        scene.line(frame.apply_xy(0.0, 0.0), frame.apply_xy(0.0, -height), pen, PROJECTION_OPACITY);
        scene.line(
            frame.apply_xy(depth, 0.0),
            frame.apply_xy(depth, -height),
            pen,
            PROJECTION_OPACITY,
        );
    }

    /// Outline of the range the projection bar can occupy.
    pub fn draw_projection_box(&self, scene: &mut Scene, pen_width: i32) {
        let pw = pen_width as f64;
        let amplitude = self.amplitude as f64;
        let corners = transformed_rect(&self.frame(), -(pw / 2.0).trunc(), -amplitude, pw, 2.0 * amplitude);
        scene.polygon(corners.to_vec(), Some(Pen::new(palette::BOX, 2.0)), None, 0.2);
    }

    pub fn draw_dotted_line_from_tip(&self, scene: &mut Scene, angle_degrees: f64, vector_tip: Point) {
        scene.line(
            self.projected_tip(angle_degrees),
            vector_tip,
            Pen::dotted(palette::DOTTED, 5.0),
            0.1,
        );
    }

    pub fn draw_tip_circle(&self, scene: &mut Scene, angle_degrees: f64, pen_width: i32) {
        tip_circle(scene, self.projected_tip(angle_degrees), pen_width);
    }

    /// Tip circle on the phase-0 axis, for a wave drawn there with `draw_wave_rotated`.
    pub fn draw_tip_circle_unrotated(&self, scene: &mut Scene, angle_degrees: f64, pen_width: i32) {
        let height = self.current_height(self.amplitude, angle_degrees) as f64;
        let center = Point::new(self.unrotated_anchor.x, self.unrotated_anchor.y - height);
        tip_circle(scene, center, pen_width);
    }

    /// Faint guide lines at the ordinates of notable angles.
    pub fn draw_important_ordinates(&self, scene: &mut Scene, guides: OrdinateGuides) {
        let frame = self.frame();
        let pen = Pen::new(palette::AXIS, 1.0);
        for (value, caption, is_unit) in IMPORTANT_ORDINATES {
            let enabled = if is_unit { guides.unit } else { guides.fractions };
            if !enabled {
                continue;
            }
            let y = -(self.amplitude as f64 * value).round();
            scene.line(frame.apply_xy(-10.0, y), frame.apply_xy(-AXIS_LENGTH, y), pen, 0.1);
            if guides.captions {
                scene.add_command(DrawCommand::Text {
                    origin: frame.apply_xy(-70.0, y),
                    text: caption.to_string(),
                    pixel_size: ORDINATE_CAPTION_SIZE,
                    color: palette::CAPTION,
                    opacity: 0.7,
                    rotation_degrees: self.phase,
                });
            }
        }
    }

    /// Diameter of the sweep circle parallel to this projection's axis.
    pub fn draw_line_through_sweep_circle(&self, scene: &mut Scene) {
        let length = (2 * self.amplitude + 20) as f64;
        let (sin, cos) = self.phase.to_radians().sin_cos();
        let half_x = ((length * cos).trunc() / 2.0).trunc();
        let half_y = ((length * sin).trunc() / 2.0).trunc();
        scene.line(
            Point::new(self.origin.x - half_x, self.origin.y - half_y),
            Point::new(self.origin.x + half_x, self.origin.y + half_y),
            Pen::new(palette::AXIS, 2.0),
            0.3,
        );
    }

    /// Arc between `given_phase` and this projection's phase, captioned with the lead
    /// and lag angles.
    pub fn draw_phase_arc_from_given_phase(
        &self,
        scene: &mut Scene,
        measure: &dyn TextMeasure,
        given_phase: f64,
        pen_width: i32,
    ) {
        let radius = (self.amplitude - pen_width / 2) as f64;
        scene.add_command(DrawCommand::Arc {
            center: self.origin,
            radius,
            start_degrees: -given_phase,
            span_degrees: given_phase - self.phase,
            pen: Pen::new(self.color, pen_width as f32),
            opacity: 1.0,
        });

        let (lead, lag) = lead_and_lag(self.phase);
        let lead_text = format!("  {lead}° lead  ");
        let lag_text = format!("  {lag}° lag  ");

        let clockwise = !(0.0..=180.0).contains(&self.phase);
        let params = CircularText {
            center: self.origin,
            radius: (self.amplitude + 15) as f64,
            clockwise,
            angle_degrees: -self.phase,
            align_start: !clockwise,
            pixel_size: PHASE_CAPTION_SIZE,
        };
        self.draw_circular_text(scene, measure, &params, &lead_text, 1.0);
        let params = CircularText {
            align_start: clockwise,
            ..params
        };
        self.draw_circular_text(scene, measure, &params, &lag_text, 1.0);
    }

    /// Caption laid along a circle, one character at a time.
    pub fn draw_circular_text(
        &self,
        scene: &mut Scene,
        measure: &dyn TextMeasure,
        params: &CircularText,
        text: &str,
        opacity: f32,
    ) {
        for glyph in layout_circular_text(&measure, params, text) {
            scene.add_command(DrawCommand::Text {
                origin: glyph.origin,
                text: glyph.text,
                pixel_size: params.pixel_size,
                color: self.color,
                opacity,
                rotation_degrees: glyph.rotation_degrees,
            });
        }
    }

    pub fn draw_axis(&self, scene: &mut Scene) {
        let frame = self.frame();
        scene.line(
            frame.apply_xy(0.0, 0.0),
            frame.apply_xy(-AXIS_LENGTH, 0.0),
            Pen::new(palette::AXIS, 2.0),
            1.0,
        );
    }

    /// Observer picture looking at the vector from beyond the sweep circle.
    /// Nothing is drawn if the image is not available.
    pub fn draw_observer(&self, scene: &mut Scene, assets: &dyn AssetProvider) {
        let Some((_, height)) = assets.image_size(OBSERVER_IMAGE) else {
            return;
        };
        let distance = 2 * (self.amplitude + self.wall_separation) + 35;
        scene.add_command(DrawCommand::Image {
            name: OBSERVER_IMAGE.to_string(),
            frame: self.frame(),
            top_left: Point::new(distance as f64, -((height / 2) as f64)),
            opacity: 0.7,
        });
    }
}

fn tip_circle(scene: &mut Scene, center: Point, pen_width: i32) {
    scene.add_command(DrawCommand::Ellipse {
        center,
        radius: pen_width as f64 / 2.0,
        pen: Some(Pen::new(palette::VECTOR_TIP_CIRCLE, 2.0)),
        fill: Some(Color::WHITE),
        opacity: 1.0,
    });
}

/// Lead and lag of a phase, both in `[0, 360)`.
pub fn lead_and_lag(phase: f64) -> (i32, i32) {
    let phase = phase.trunc() as i32;
    (phase.rem_euclid(360), (360 - phase).rem_euclid(360))
}

/// Angle in degrees written as a multiple of π, e.g. `π/6`, `3π/2`, `-π`.
pub fn radian_caption(degrees: i32) -> String {
    if degrees == 0 {
        return "0".to_string();
    }
    let sign = if degrees < 0 { "-" } else { "" };
    let magnitude = degrees.unsigned_abs();
    let divisor = gcd(magnitude, 180);
    let numerator = magnitude / divisor;
    let denominator = 180 / divisor;

    let mut caption = String::from(sign);
    if numerator != 1 {
        caption.push_str(&numerator.to_string());
    }
    caption.push('π');
    if denominator != 1 {
        caption.push('/');
        caption.push_str(&denominator.to_string());
    }
    caption
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
