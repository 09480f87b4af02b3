// ============================================================================
// RASTERIZATION
// ============================================================================
//
// Turns a `Scene` into RGBA pixels. Every primitive is clipped to its own bounding box
// and blended with the frame using the command's opacity.

use rusttype::{point, Scale};

use crate::assets::AssetProvider;
use crate::config::Color;
use crate::geometry::{Point, Transform};
use crate::scene::{DrawCommand, LineStyle, Pen, Scene};
use crate::text::FontFace;

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        let height = height.min(frame.len() / (width.max(1) * 4));
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        let mut out = [0; 4];
        out.copy_from_slice(&self.frame[idx..idx + 4]);
        Some(out)
    }

    /// Alpha-blend `color` into one pixel; out-of-bounds writes are dropped.
    fn blend(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        let idx = (y as usize * self.width + x as usize) * 4;
        let src = [color.r as f32, color.g as f32, color.b as f32];
        for (channel, value) in src.iter().enumerate() {
            let dst = self.frame[idx + channel] as f32;
            self.frame[idx + channel] = (value * alpha + dst * (1.0 - alpha)).round() as u8;
        }
        self.frame[idx + 3] = 0xff;
    }

    /// Pixel range covering `[min, max]` clipped to the canvas.
    fn clip(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<(i32, i32, i32, i32)> {
        let x0 = min_x.floor().max(0.0) as i32;
        let y0 = min_y.floor().max(0.0) as i32;
        let x1 = max_x.ceil().min(self.width as f64 - 1.0) as i32;
        let y1 = max_y.ceil().min(self.height as f64 - 1.0) as i32;
        (x0 <= x1 && y0 <= y1).then_some((x0, y0, x1, y1))
    }
}

/// Paint every command of `scene` in order. Text needs `font`; images come from `assets`.
pub fn render_scene(canvas: &mut Canvas, scene: &Scene, font: Option<&FontFace>, assets: &dyn AssetProvider) {
    for command in scene.commands() {
        match command {
            DrawCommand::Clear(color) => canvas.clear(*color),
            DrawCommand::Line {
                from,
                to,
                pen,
                opacity,
            } => draw_thick_line_aa(canvas, *from, *to, pen, *opacity),
            DrawCommand::Polygon {
                points,
                pen,
                fill,
                opacity,
            } => {
                if let Some(color) = fill {
                    fill_polygon(canvas, points, *color, *opacity);
                }
                if let Some(pen) = pen {
                    stroke_polygon(canvas, points, pen, *opacity);
                }
            }
            DrawCommand::Ellipse {
                center,
                radius,
                pen,
                fill,
                opacity,
            } => {
                if let Some(color) = fill {
                    fill_circle(canvas, *center, *radius, *color, *opacity);
                }
                if let Some(pen) = pen {
                    draw_arc(canvas, *center, *radius, 0.0, 360.0, pen, *opacity);
                }
            }
            DrawCommand::Arc {
                center,
                radius,
                start_degrees,
                span_degrees,
                pen,
                opacity,
            } => draw_arc(canvas, *center, *radius, *start_degrees, *span_degrees, pen, *opacity),
            DrawCommand::Text {
                origin,
                text,
                pixel_size,
                color,
                opacity,
                rotation_degrees,
            } => {
                if let Some(font) = font {
                    draw_text(
                        canvas,
                        font,
                        *origin,
                        text,
                        *pixel_size,
                        *color,
                        *opacity,
                        *rotation_degrees,
                    );
                }
            }
            DrawCommand::Image {
                name,
                frame,
                top_left,
                opacity,
            } => {
                if let Some(image) = assets.image(name) {
                    draw_image(canvas, image, frame, *top_left, *opacity);
                }
            }
        }
    }
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

/// Round-capped thick line. Dotted pens leave gaps of twice the pen width between dots.
///
/// Walks the major axis and only tests the band of pixels around the line on each
/// step, so long diagonals cost proportional to their length.
fn draw_thick_line_aa(canvas: &mut Canvas, from: Point, to: Point, pen: &Pen, opacity: f32) {
    let thickness = pen.width.max(1.0) as f64;
    let pad = thickness / 2.0 + 1.0;

    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len_sq = dx * dx + dy * dy;
    let len = len_sq.sqrt();

    let steep = dy.abs() > dx.abs();
    let (a0, a1, da, db, b0) = if steep {
        (from.y, to.y, dy, dx, from.x)
    } else {
        (from.x, to.x, dx, dy, from.y)
    };
    let (a_limit, b_limit) = if steep {
        (canvas.height, canvas.width)
    } else {
        (canvas.width, canvas.height)
    };
    let (lo, hi) = (a0.min(a1), a0.max(a1));
    let slope = if da != 0.0 { db / da } else { 0.0 };
    let half_band = if da != 0.0 { pad * len / da.abs() } else { pad };
    // minor-axis coordinate of the segment point at major coordinate `a`
    let center = |a: f64| b0 + (a.clamp(lo, hi) - a0) * slope;

    let a_start = (lo - pad).floor().max(0.0) as i32;
    let a_end = (hi + pad).ceil().min(a_limit as f64 - 1.0) as i32;
    for a in a_start..=a_end {
        let (c1, c2) = (center(a as f64 - pad), center(a as f64 + pad));
        let b_start = (c1.min(c2) - half_band).floor().max(0.0) as i32;
        let b_end = (c1.max(c2) + half_band).ceil().min(b_limit as f64 - 1.0) as i32;
        for b in b_start..=b_end {
            let (x, y) = if steep { (b, a) } else { (a, b) };
            let px = x as f64 - from.x;
            let py = y as f64 - from.y;
            let t = if len_sq > 0.0 {
                ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            if pen.style == LineStyle::Dotted && (t * len) % (3.0 * thickness) > thickness {
                continue;
            }
            let lx = from.x + t * dx;
            let ly = from.y + t * dy;
            let dist = (lx - x as f64).hypot(ly - y as f64);
            let aa = (1.0 - (dist - thickness / 2.0).clamp(0.0, 1.0)) as f32;
            if aa > 0.01 {
                canvas.blend(x, y, pen.color, aa * opacity);
            }
        }
    }
}

fn stroke_polygon(canvas: &mut Canvas, points: &[Point], pen: &Pen, opacity: f32) {
    if points.len() < 2 {
        return;
    }
    for (i, from) in points.iter().enumerate() {
        let to = points[(i + 1) % points.len()];
        draw_thick_line_aa(canvas, *from, to, pen, opacity);
    }
}

/// Even-odd fill sampled at pixel centers.
fn fill_polygon(canvas: &mut Canvas, points: &[Point], color: Color, opacity: f32) {
    if points.len() < 3 {
        return;
    }
    let (min_x, max_x) = points
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
    let (min_y, max_y) = points
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    let Some((x0, y0, x1, y1)) = canvas.clip(min_x, min_y, max_x, max_y) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            if contains(points, Point::new(x as f64 + 0.5, y as f64 + 0.5)) {
                canvas.blend(x, y, color, opacity);
            }
        }
    }
}

fn contains(points: &[Point], p: Point) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn fill_circle(canvas: &mut Canvas, center: Point, radius: f64, color: Color, opacity: f32) {
    let Some((x0, y0, x1, y1)) = canvas.clip(
        center.x - radius - 1.0,
        center.y - radius - 1.0,
        center.x + radius + 1.0,
        center.y + radius + 1.0,
    ) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dist = (x as f64 - center.x).hypot(y as f64 - center.y);
            let aa = if dist > radius {
                1.0 - (dist - radius).min(1.0)
            } else {
                1.0
            };
            if aa > 0.0 {
                canvas.blend(x, y, color, aa as f32 * opacity);
            }
        }
    }
}

/// Stroke part of a circle. Angles are in degrees, counter-clockwise on screen; a
/// negative span runs clockwise.
fn draw_arc(
    canvas: &mut Canvas,
    center: Point,
    radius: f64,
    start_degrees: f64,
    span_degrees: f64,
    pen: &Pen,
    opacity: f32,
) {
    let half = pen.width.max(1.0) as f64 / 2.0;
    let outer = radius + half + 1.0;
    let Some((x0, y0, x1, y1)) = canvas.clip(
        center.x - outer,
        center.y - outer,
        center.x + outer,
        center.y + outer,
    ) else {
        return;
    };

    let (start, span) = if span_degrees < 0.0 {
        (start_degrees + span_degrees, -span_degrees)
    } else {
        (start_degrees, span_degrees)
    };
    let full_circle = span >= 360.0;

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 - center.x;
            let dy = y as f64 - center.y;
            let dist = dx.hypot(dy);
            let aa = 1.0 - ((dist - radius).abs() - half).clamp(0.0, 1.0);
            if aa <= 0.0 {
                continue;
            }
            if !full_circle {
                // screen y grows downward, arc angles grow counter-clockwise
                let angle = (-dy).atan2(dx).to_degrees();
                if (angle - start).rem_euclid(360.0) > span {
                    continue;
                }
            }
            canvas.blend(x, y, pen.color, aa as f32 * opacity);
        }
    }
}

/// Text with its baseline starting at `origin`, turned clockwise by `rotation_degrees`.
#[allow(clippy::too_many_arguments)]
fn draw_text(
    canvas: &mut Canvas,
    font: &FontFace,
    origin: Point,
    text: &str,
    pixel_size: f32,
    color: Color,
    opacity: f32,
    rotation_degrees: f64,
) {
    let scale = Scale::uniform(pixel_size);
    let transform = Transform::new(origin, rotation_degrees);
    let upright = rotation_degrees.rem_euclid(360.0) == 0.0;

    for glyph in font.font().layout(text, scale, point(0.0, 0.0)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, v| {
            if v <= 0.001 {
                return;
            }
            let local = Point::new((bb.min.x + gx as i32) as f64, (bb.min.y + gy as i32) as f64);
            if upright {
                let x = (origin.x + local.x).round() as i32;
                let y = (origin.y + local.y).round() as i32;
                canvas.blend(x, y, color, v * opacity);
            } else {
                draw_antialiased_pixel(canvas, transform.apply(local), color, v * opacity);
            }
        });
    }
}

/// Spread one sample over the four nearest pixels.
fn draw_antialiased_pixel(canvas: &mut Canvas, p: Point, color: Color, alpha: f32) {
    let x_floor = p.x.floor();
    let y_floor = p.y.floor();
    let x_frac = p.x - x_floor;
    let y_frac = p.y - y_floor;
    let (x, y) = (x_floor as i32, y_floor as i32);

    let samples = [
        (x, y, (1.0 - x_frac) * (1.0 - y_frac)),
        (x + 1, y, x_frac * (1.0 - y_frac)),
        (x, y + 1, (1.0 - x_frac) * y_frac),
        (x + 1, y + 1, x_frac * y_frac),
    ];
    for (px, py, weight) in samples {
        let final_alpha = alpha * weight as f32;
        if final_alpha > 0.001 {
            canvas.blend(px, py, color, final_alpha);
        }
    }
}

/// Nearest-neighbour image blit through `frame`, honouring the image's own alpha.
fn draw_image(canvas: &mut Canvas, image: &image::RgbaImage, frame: &Transform, top_left: Point, opacity: f32) {
    let (w, h) = (image.width() as f64, image.height() as f64);
    let corners = [
        frame.apply(top_left),
        frame.apply(Point::new(top_left.x + w, top_left.y)),
        frame.apply(Point::new(top_left.x + w, top_left.y + h)),
        frame.apply(Point::new(top_left.x, top_left.y + h)),
    ];
    let (min_x, max_x) = corners
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
    let (min_y, max_y) = corners
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    let Some((x0, y0, x1, y1)) = canvas.clip(min_x, min_y, max_x, max_y) else {
        return;
    };

    for y in y0..=y1 {
        for x in x0..=x1 {
            let local = frame.invert(Point::new(x as f64 + 0.5, y as f64 + 0.5));
            let u = (local.x - top_left.x).floor();
            let v = (local.y - top_left.y).floor();
            if u < 0.0 || v < 0.0 || u >= w || v >= h {
                continue;
            }
            let px = image.get_pixel(u as u32, v as u32);
            let alpha = px[3] as f32 / 255.0 * opacity;
            if alpha > 0.0 {
                canvas.blend(x, y, Color::new(px[0], px[1], px[2]), alpha);
            }
        }
    }
}
