// ============================================================================
// RETAINED MODE ABSTRACTIONS
// ============================================================================
//
// The core never touches pixels. Each frame is built as a list of draw commands in
// painting order; later commands are painted over earlier ones. The rasterizer in
// `canvas` (or a test) consumes the list.

use crate::config::Color;
use crate::geometry::{Point, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub color: Color,
    pub width: f32,
    pub style: LineStyle,
}

impl Pen {
    pub const fn new(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            style: LineStyle::Solid,
        }
    }

    pub const fn dotted(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            style: LineStyle::Dotted,
        }
    }
}

/// Painting passes of a frame, in the order they must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Axis,
    ProjectionBoxes,
    Background,
    Waves,
    Vector,
    Components,
    Shadows,
    TipCircles,
    Decorations,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Line {
        from: Point,
        to: Point,
        pen: Pen,
        opacity: f32,
    },
    /// Closed polygon (rectangles in rotated frames end up here).
    Polygon {
        points: Vec<Point>,
        pen: Option<Pen>,
        fill: Option<Color>,
        opacity: f32,
    },
    Ellipse {
        center: Point,
        radius: f64,
        pen: Option<Pen>,
        fill: Option<Color>,
        opacity: f32,
    },
    /// Circular arc. Angles in degrees, 0 at three o'clock, positive counter-clockwise
    /// on screen.
    Arc {
        center: Point,
        radius: f64,
        start_degrees: f64,
        span_degrees: f64,
        pen: Pen,
        opacity: f32,
    },
    /// Text whose baseline starts at `origin`, turned clockwise by `rotation_degrees`.
    Text {
        origin: Point,
        text: String,
        pixel_size: f32,
        color: Color,
        opacity: f32,
        rotation_degrees: f64,
    },
    /// Named image drawn with its top-left corner at `top_left` in the `frame` space.
    Image {
        name: String,
        frame: Transform,
        top_left: Point,
        opacity: f32,
    },
}

#[derive(Debug, Default)]
pub struct Scene {
    commands: Vec<DrawCommand>,
    layers: Vec<(Layer, usize)>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Mark the start of a painting pass.
    pub fn begin_layer(&mut self, layer: Layer) {
        self.layers.push((layer, self.commands.len()));
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Passes in the order they were started.
    pub fn layers(&self) -> Vec<Layer> {
        self.layers.iter().map(|(layer, _)| *layer).collect()
    }

    /// Commands painted during `layer`.
    pub fn layer_commands(&self, layer: Layer) -> &[DrawCommand] {
        let Some(index) = self.layers.iter().position(|(l, _)| *l == layer) else {
            return &[];
        };
        let start = self.layers[index].1;
        let end = self
            .layers
            .get(index + 1)
            .map_or(self.commands.len(), |(_, next)| *next);
        &self.commands[start..end]
    }

    pub fn line(&mut self, from: Point, to: Point, pen: Pen, opacity: f32) {
        self.add_command(DrawCommand::Line {
            from,
            to,
            pen,
            opacity,
        });
    }

    pub fn polygon(&mut self, points: Vec<Point>, pen: Option<Pen>, fill: Option<Color>, opacity: f32) {
        self.add_command(DrawCommand::Polygon {
            points,
            pen,
            fill,
            opacity,
        });
    }

    pub fn text(&mut self, origin: Point, text: impl Into<String>, pixel_size: f32, color: Color, opacity: f32) {
        self.add_command(DrawCommand::Text {
            origin,
            text: text.into(),
            pixel_size,
            color,
            opacity,
            rotation_degrees: 0.0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_commands_split_by_markers() {
        let pen = Pen::new(Color::BLACK, 1.0);
        let mut scene = Scene::new();
        scene.begin_layer(Layer::Axis);
        scene.line(Point::new(0.0, 0.0), Point::new(1.0, 0.0), pen, 1.0);
        scene.begin_layer(Layer::Waves);
        scene.line(Point::new(0.0, 0.0), Point::new(0.0, 1.0), pen, 1.0);
        scene.line(Point::new(0.0, 0.0), Point::new(1.0, 1.0), pen, 1.0);
        scene.begin_layer(Layer::TipCircles);

        assert_eq!(scene.layers(), vec![Layer::Axis, Layer::Waves, Layer::TipCircles]);
        assert_eq!(scene.layer_commands(Layer::Axis).len(), 1);
        assert_eq!(scene.layer_commands(Layer::Waves).len(), 2);
        assert!(scene.layer_commands(Layer::TipCircles).is_empty());
        assert!(scene.layer_commands(Layer::Shadows).is_empty());
    }
}
