//! Drawing target abstraction. Renderers only talk to `Surface`, so the same code paints
//! a browser canvas or records commands for tests.

use crate::domain::chart::{CanvasPoint, Color, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
    /// `[dash, gap]` in pixels; `None` is a solid line
    pub dash: Option<[f64; 2]>,
}

impl StrokeStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self { color, width, dash: None }
    }

    pub fn dashed(color: Color, width: f64) -> Self {
        Self { color, width, dash: Some([4.0, 4.0]) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_css(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub font_size: f64,
    pub align: TextAlign,
}

impl TextStyle {
    pub fn new(color: Color, font_size: f64) -> Self {
        Self { color, font_size, align: TextAlign::Left }
    }

    pub fn aligned(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn font(&self) -> String {
        format!("{}px -apple-system, BlinkMacSystemFont, 'Trebuchet MS', Roboto, sans-serif", self.font_size)
    }
}

/// One layer's 2D drawing target
pub trait Surface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    /// Make the whole surface transparent
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, style: &StrokeStyle);
    fn line(&mut self, from: CanvasPoint, to: CanvasPoint, style: &StrokeStyle);
    fn polyline(&mut self, points: &[CanvasPoint], style: &StrokeStyle);
    fn fill_polygon(&mut self, points: &[CanvasPoint], color: Color);
    fn fill_circle(&mut self, center: CanvasPoint, radius: f64, color: Color);
    /// Text with its vertical middle at `at.y`
    fn text(&mut self, text: &str, at: CanvasPoint, style: &TextStyle);
    fn measure_text(&self, text: &str, font_size: f64) -> f64;
}

/// Everything a `RecordingSurface` captured
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, style: StrokeStyle },
    Line { from: CanvasPoint, to: CanvasPoint, style: StrokeStyle },
    Polyline { points: Vec<CanvasPoint>, style: StrokeStyle },
    FillPolygon { points: Vec<CanvasPoint>, color: Color },
    FillCircle { center: CanvasPoint, radius: f64, color: Color },
    Text { text: String, at: CanvasPoint, style: TextStyle },
}

/// In-memory surface that records draw calls
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, commands: Vec::new() }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, style: &StrokeStyle) {
        self.commands.push(DrawCommand::StrokeRect { rect, style: *style });
    }

    fn line(&mut self, from: CanvasPoint, to: CanvasPoint, style: &StrokeStyle) {
        self.commands.push(DrawCommand::Line { from, to, style: *style });
    }

    fn polyline(&mut self, points: &[CanvasPoint], style: &StrokeStyle) {
        self.commands.push(DrawCommand::Polyline { points: points.to_vec(), style: *style });
    }

    fn fill_polygon(&mut self, points: &[CanvasPoint], color: Color) {
        self.commands.push(DrawCommand::FillPolygon { points: points.to_vec(), color });
    }

    fn fill_circle(&mut self, center: CanvasPoint, radius: f64, color: Color) {
        self.commands.push(DrawCommand::FillCircle { center, radius, color });
    }

    fn text(&mut self, text: &str, at: CanvasPoint, style: &TextStyle) {
        self.commands.push(DrawCommand::Text { text: text.to_string(), at, style: *style });
    }

    fn measure_text(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * 0.6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_recording() {
        let mut surface = RecordingSurface::new(100.0, 50.0);
        surface.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        surface.clear();
        surface.text("42", CanvasPoint::new(1.0, 1.0), &TextStyle::new(Color::BLACK, 11.0));
        assert_eq!(surface.commands().len(), 2);
        assert_eq!(surface.texts(), vec!["42"]);
    }
}
