//! Drawings layer: committed annotations, the selection and the creation preview.

use super::frame::{FrameInput, format_price};
use super::grid_renderer::AXIS_FONT_SIZE;
use super::surface::{StrokeStyle, Surface, TextAlign, TextStyle};
use crate::domain::chart::{CanvasPoint, ChartPoint, CoordinateSystem, Rect};
use crate::domain::drawing::hit_test::channel_segments;
use crate::domain::drawing::{Drawing, DrawingShape, DrawingStyle, FIB_LEVELS, fib_level_price};

const ARROW_HEAD_ANGLE: f64 = 0.45;
const PREVIEW_ALPHA: f32 = 0.6;

fn stroke_of(style: &DrawingStyle) -> StrokeStyle {
    if style.dashed {
        StrokeStyle::dashed(style.color, style.line_width)
    } else {
        StrokeStyle::solid(style.color, style.line_width)
    }
}

/// Stroked outline of a shape in pixels, one polyline per edge
pub fn shape_outline(shape: &DrawingShape, cs: &CoordinateSystem<'_>) -> Vec<Vec<CanvasPoint>> {
    let px: Vec<CanvasPoint> = shape.points().iter().map(|p| cs.to_pixel(*p)).collect();
    let area = cs.area;
    match shape {
        DrawingShape::TrendLine { .. } | DrawingShape::Arrow { .. } | DrawingShape::Fibonacci { .. } => {
            vec![vec![px[0], px[1]]]
        }
        DrawingShape::HorizontalLine { .. } => {
            vec![vec![CanvasPoint::new(area.x, px[0].y), CanvasPoint::new(area.right(), px[0].y)]]
        }
        DrawingShape::VerticalLine { .. } => {
            vec![vec![CanvasPoint::new(px[0].x, area.y), CanvasPoint::new(px[0].x, area.bottom())]]
        }
        DrawingShape::Rectangle { .. } => {
            let rect = Rect::from_corners(px[0], px[1]);
            vec![vec![
                CanvasPoint::new(rect.x, rect.y),
                CanvasPoint::new(rect.right(), rect.y),
                CanvasPoint::new(rect.right(), rect.bottom()),
                CanvasPoint::new(rect.x, rect.bottom()),
                CanvasPoint::new(rect.x, rect.y),
            ]]
        }
        DrawingShape::Channel { .. } => channel_segments(px[0], px[1], px[2])
            .iter()
            .map(|(a, b)| vec![*a, *b])
            .collect(),
        DrawingShape::Text { .. } => Vec::new(),
    }
}

/// Arrow head triangle at `tip` for a shaft coming from `tail`
pub fn arrow_head(tail: CanvasPoint, tip: CanvasPoint, line_width: f64) -> [CanvasPoint; 3] {
    let angle = (tip.y - tail.y).atan2(tip.x - tail.x);
    let length = 10.0 + 2.0 * line_width;
    let wing = |side: f64| {
        let a = angle + side * ARROW_HEAD_ANGLE;
        CanvasPoint::new(tip.x - length * a.cos(), tip.y - length * a.sin())
    };
    [tip, wing(1.0), wing(-1.0)]
}

#[derive(Debug, Default)]
pub struct DrawingRenderer;

impl DrawingRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Paint every visible drawing in z order, then selection handles and the preview.
    /// Returns the number of committed drawings painted.
    pub fn render(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) -> usize {
        surface.clear();
        if !frame.has_data() {
            return 0;
        }
        let drawings = frame.drawings.paint_order();
        for drawing in &drawings {
            self.paint_shape(surface, frame, &drawing.shape, &drawing.style);
        }

        let state = frame.drawings.state();
        match frame.drawings.selected().filter(|d| d.visible) {
            Some(selected) => self.paint_selection(surface, frame, selected),
            None => {
                let hovered = state.hovered_id.as_deref().and_then(|id| frame.drawings.get(id));
                if let Some(hovered) = hovered.filter(|d| d.visible) {
                    self.paint_handles(surface, frame, hovered, 0.5);
                }
            }
        }
        self.paint_preview(surface, frame);
        drawings.len()
    }

    fn paint_shape(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>, shape: &DrawingShape, style: &DrawingStyle) {
        let cs = &frame.cs;
        let stroke = stroke_of(style);
        let px: Vec<CanvasPoint> = shape.points().iter().map(|p| cs.to_pixel(*p)).collect();

        match shape {
            DrawingShape::Rectangle { .. } => {
                let rect = Rect::from_corners(px[0], px[1]);
                if let Some(fill) = style.fill {
                    surface.fill_rect(rect, fill);
                }
                surface.stroke_rect(rect, &stroke);
            }
            DrawingShape::Fibonacci { points } => self.paint_fibonacci(surface, frame, *points, style),
            DrawingShape::Text { content, .. } => {
                surface.text(content, px[0], &TextStyle::new(style.color, style.font_size));
            }
            DrawingShape::Arrow { .. } => {
                surface.line(px[0], px[1], &stroke);
                surface.fill_polygon(&arrow_head(px[0], px[1], style.line_width), style.color);
            }
            DrawingShape::Channel { .. } => {
                let [(a0, b0), (a1, b1)] = channel_segments(px[0], px[1], px[2]);
                if let Some(fill) = style.fill {
                    surface.fill_polygon(&[a0, b0, b1, a1], fill);
                }
                surface.line(a0, b0, &stroke);
                surface.line(a1, b1, &stroke);
            }
            DrawingShape::TrendLine { .. } | DrawingShape::HorizontalLine { .. } | DrawingShape::VerticalLine { .. } => {
                for edge in shape_outline(shape, cs) {
                    surface.polyline(&edge, &stroke);
                }
            }
        }
    }

    fn paint_fibonacci(
        &self,
        surface: &mut dyn Surface,
        frame: &FrameInput<'_>,
        points: [ChartPoint; 2],
        style: &DrawingStyle,
    ) {
        let cs = &frame.cs;
        let (start, end) = (cs.to_pixel(points[0]), cs.to_pixel(points[1]));
        let (left, right) = (start.x.min(end.x), start.x.max(end.x));
        let level_stroke = StrokeStyle::solid(style.color, 1.0);
        let label = TextStyle::new(style.color, AXIS_FONT_SIZE).aligned(TextAlign::Right);

        surface.line(start, end, &StrokeStyle::dashed(style.color, 1.0));
        for level in FIB_LEVELS {
            let price = fib_level_price(points[0], points[1], level);
            let y = cs.price_to_y(price);
            surface.line(CanvasPoint::new(left, y), CanvasPoint::new(right, y), &level_stroke);
            let text = format!("{level} ({})", format_price(price, 2));
            surface.text(&text, CanvasPoint::new(left - 4.0, y), &label);
        }
    }

    fn paint_selection(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>, drawing: &Drawing) {
        let glow = StrokeStyle::solid(frame.palette.selection.with_alpha(0.35), drawing.style.line_width + 4.0);
        for edge in shape_outline(&drawing.shape, &frame.cs) {
            surface.polyline(&edge, &glow);
        }
        self.paint_handles(surface, frame, drawing, 1.0);
    }

    fn paint_handles(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>, drawing: &Drawing, alpha: f32) {
        let radius = (frame.config.anchor_radius_px - 1.0).max(3.0);
        for (index, point) in drawing.points().iter().enumerate() {
            let center = frame.cs.to_pixel(*point);
            let hot = frame.drawings.state().hovered_anchor == Some(index)
                && frame.drawings.state().selected_id.as_deref() == Some(drawing.id.as_str());
            let outer = if hot { radius + 1.5 } else { radius };
            surface.fill_circle(center, outer, frame.palette.selection.with_alpha(alpha));
            surface.fill_circle(center, outer - 1.5, frame.palette.background);
        }
    }

    /// Ghost of the drawing being created, following the pointer
    fn paint_preview(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) {
        let state = frame.drawings.state();
        let Some(kind) = state.active_tool else {
            return;
        };
        let marker = frame.palette.selection;
        for point in &state.temp_points {
            surface.fill_circle(frame.cs.to_pixel(*point), 3.0, marker);
        }
        let Some(cursor) = frame.drawing_preview else {
            return;
        };

        let mut points = state.temp_points.clone();
        points.push(cursor);
        if points.len() == kind.point_count() {
            let text = Some(frame.drawings.pending_text().to_string());
            if let Ok(shape) = DrawingShape::from_points(kind, &points, text) {
                let base = kind.default_style();
                let ghost = DrawingStyle { color: base.color.with_alpha(PREVIEW_ALPHA), ..base };
                self.paint_shape(surface, frame, &shape, &ghost);
            }
        } else {
            let pixels: Vec<CanvasPoint> = points.iter().map(|p| frame.cs.to_pixel(*p)).collect();
            surface.polyline(&pixels, &StrokeStyle::dashed(marker, 1.0));
        }
    }
}
