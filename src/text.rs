use std::path::{Path, PathBuf};

use log::{info, warn};
use rusttype::{point, Font, Scale};
use thiserror::Error;

use crate::geometry::Point;

/// Fonts tried, in order, when no font file is given on the command line.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a usable TrueType/OpenType font")]
    Invalid(PathBuf),
}

/// Width of rendered text, needed to lay out captions.
pub trait TextMeasure {
    fn text_width(&self, text: &str, pixel_size: f32) -> f64;
}

/// Monospace approximation used when no font could be loaded.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance {
    /// Advance of a single character as a fraction of the pixel size.
    pub ratio: f64,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { ratio: 0.55 }
    }
}

impl TextMeasure for FixedAdvance {
    fn text_width(&self, text: &str, pixel_size: f32) -> f64 {
        text.chars().count() as f64 * pixel_size as f64 * self.ratio
    }
}

pub struct FontFace {
    font: Font<'static>,
}

impl FontFace {
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| FontError::Invalid(path.to_path_buf()))?;
        Ok(Self { font })
    }

    /// Load `explicit` if given, otherwise the first system font that parses.
    pub fn discover(explicit: Option<&Path>) -> Option<Self> {
        if let Some(path) = explicit {
            match Self::load(path) {
                Ok(face) => {
                    info!("Loaded font {}", path.display());
                    return Some(face);
                }
                Err(err) => warn!("{err}"),
            }
        }
        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            if let Ok(face) = Self::load(path) {
                info!("Using system font {}", path.display());
                return Some(face);
            }
        }
        warn!("No font found, captions will not be drawn");
        None
    }

    pub fn font(&self) -> &Font<'static> {
        &self.font
    }
}

impl TextMeasure for FontFace {
    fn text_width(&self, text: &str, pixel_size: f32) -> f64 {
        let scale = Scale::uniform(pixel_size);
        let glyphs: Vec<_> = self.font.layout(text, scale, point(0.0, 0.0)).collect();
        match (glyphs.first(), glyphs.last()) {
            (Some(first), Some(last)) => (last.position().x - first.position().x
                + last.unpositioned().h_metrics().advance_width) as f64,
            _ => 0.0,
        }
    }
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn text_width(&self, text: &str, pixel_size: f32) -> f64 {
        (**self).text_width(text, pixel_size)
    }
}

/// One character of a caption laid out along a circle.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGlyph {
    pub text: String,
    pub origin: Point,
    pub rotation_degrees: f64,
}

/// Where a circular caption starts and which way it runs.
#[derive(Debug, Clone, Copy)]
pub struct CircularText {
    pub center: Point,
    pub radius: f64,
    pub clockwise: bool,
    /// Angle in degrees, counter-clockwise from three o'clock.
    pub angle_degrees: f64,
    /// Anchor the start of the string at `angle_degrees`; otherwise its end.
    pub align_start: bool,
    pub pixel_size: f32,
}

/// Lay out `text` character by character along a circle.
///
/// Each character advances the angular position by its width divided by the radius. The
/// baseline sits slightly outside the circle for counter-clockwise text and inside it for
/// clockwise text so both read upright from the same side.
pub fn layout_circular_text(
    measure: &impl TextMeasure,
    params: &CircularText,
    text: &str,
) -> Vec<PlacedGlyph> {
    let direction = if params.clockwise { -1.0 } else { 1.0 };

    let mut angle = params.angle_degrees.to_radians();
    if !params.align_start {
        angle -= direction * measure.text_width(text, params.pixel_size) / params.radius;
    }

    let radius = params.radius + direction * 6.0;
    let mut placed = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let ch = ch.to_string();
        let x_off = (radius * angle.cos()).round();
        let y_off = (radius * angle.sin()).round();
        placed.push(PlacedGlyph {
            origin: Point::new(params.center.x + x_off, params.center.y - y_off),
            rotation_degrees: -angle.to_degrees() - direction * 90.0,
            text: ch.clone(),
        });
        angle += direction * measure.text_width(&ch, params.pixel_size) / radius;
    }
    placed
}
