use super::frame::{FrameInput, format_price, precision_for_step};
use super::grid_renderer::{AXIS_FONT_SIZE, price_ticks};
use super::surface::{StrokeStyle, Surface, TextStyle};
use crate::domain::chart::{CanvasPoint, Color, Rect};
use crate::domain::price_line::{PriceLineSide, PriceLineView};

const TAG_HEIGHT: f64 = 18.0;
const GLYPH_SIZE: f64 = 5.0;

#[derive(Debug, Default)]
pub struct PriceLineRenderer;

impl PriceLineRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Paint stop-loss and take-profit lines at their displayed price. Returns the number
    /// of lines inside the pane.
    pub fn render(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) -> usize {
        surface.clear();
        if !frame.has_data() || frame.price_lines.is_empty() {
            return 0;
        }
        let cs = &frame.cs;
        let (_, step) = price_ticks(cs.price_range(), cs.area.height, frame.config.price_tick_spacing_px);
        let precision = (precision_for_step(step) + 2).min(8);

        let mut painted = 0;
        for view in frame.price_lines.views() {
            let y = cs.price_to_y(view.display_price);
            if y < cs.area.y || y > cs.area.bottom() {
                continue;
            }
            self.paint_line(surface, frame, &view, y, precision);
            painted += 1;
        }
        painted
    }

    fn color(frame: &FrameInput<'_>, side: PriceLineSide) -> Color {
        match side {
            PriceLineSide::StopLoss => frame.palette.stop_loss,
            PriceLineSide::TakeProfit => frame.palette.take_profit,
        }
    }

    fn paint_line(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>, view: &PriceLineView<'_>, y: f64, precision: usize) {
        let area = frame.cs.area;
        let color = Self::color(frame, view.line.side);
        let active = view.hovered || view.dragging;
        let width = if active { 2.0 } else { 1.0 };
        surface.line(CanvasPoint::new(area.x, y), CanvasPoint::new(area.right(), y), &StrokeStyle::dashed(color, width));

        let price = format_price(view.display_price, precision);
        let mut label = format!("{} {}", view.line.side.label(), price);
        if view.pending {
            label.push_str(" …");
        }
        let label_width = surface.measure_text(&label, AXIS_FONT_SIZE) + 12.0;
        surface.fill_rect(Rect::new(area.x + 8.0, y - TAG_HEIGHT / 2.0, label_width, TAG_HEIGHT), color);
        let text = TextStyle::new(frame.palette.background, AXIS_FONT_SIZE);
        surface.text(&label, CanvasPoint::new(area.x + 14.0, y), &text);

        let axis = frame.layout.price_axis();
        surface.fill_rect(Rect::new(axis.x, y - TAG_HEIGHT / 2.0, axis.width, TAG_HEIGHT), color);
        surface.text(&price, CanvasPoint::new(axis.x + 6.0, y), &text);

        if active {
            self.paint_glyphs(surface, CanvasPoint::new(area.x + 8.0 + label_width + 10.0, y), color);
        }
    }

    /// Up and down arrows hinting the line can be dragged
    fn paint_glyphs(&self, surface: &mut dyn Surface, center: CanvasPoint, color: Color) {
        let (x, y, s) = (center.x, center.y, GLYPH_SIZE);
        surface.fill_polygon(
            &[CanvasPoint::new(x, y - 2.0 * s), CanvasPoint::new(x - s, y - s), CanvasPoint::new(x + s, y - s)],
            color,
        );
        surface.fill_polygon(
            &[CanvasPoint::new(x, y + 2.0 * s), CanvasPoint::new(x - s, y + s), CanvasPoint::new(x + s, y + s)],
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::Viewport;
    use crate::domain::price_line::PriceLine;
    use crate::infrastructure::rendering::frame::fixtures::{Scene, rising_candles};
    use crate::infrastructure::rendering::surface::{DrawCommand, RecordingSurface};

    fn scene_with_lines() -> Scene {
        let mut scene = Scene::new(rising_candles());
        scene.price_lines.set_lines(vec![
            PriceLine { price: 150.0, position_id: "p1".into(), side: PriceLineSide::StopLoss },
            PriceLine { price: 180.0, position_id: "p1".into(), side: PriceLineSide::TakeProfit },
            PriceLine { price: 5_000.0, position_id: "p2".into(), side: PriceLineSide::TakeProfit },
        ]);
        scene
    }

    #[test]
    fn lines_inside_the_pane_are_labelled() {
        let scene = scene_with_lines();
        let mut surface = RecordingSurface::new(1070.0, 738.0);
        assert_eq!(PriceLineRenderer::new().render(&mut surface, &scene.frame()), 2);

        let texts = surface.texts();
        assert!(texts.contains(&"SL 150.00"));
        assert!(texts.contains(&"TP 180.00"));
        assert!(texts.contains(&"150.00"));
        assert_eq!(surface.count(|c| matches!(c, DrawCommand::FillPolygon { .. })), 0);
    }

    #[test]
    fn hovered_line_shows_drag_glyphs() {
        let mut scene = scene_with_lines();
        let cs = Viewport::from_config(&scene.config).transform(&scene.candles, scene.layout.price_pane(), 60_000.0);
        let y = cs.price_to_y(150.0);
        assert!(scene.price_lines.hover(Some(y + 3.0), &cs));

        let mut surface = RecordingSurface::new(1070.0, 738.0);
        PriceLineRenderer::new().render(&mut surface, &scene.frame());
        assert_eq!(surface.count(|c| matches!(c, DrawCommand::FillPolygon { .. })), 2);
        let thick = surface.count(|c| matches!(c, DrawCommand::Line { style, .. } if style.width == 2.0));
        assert_eq!(thick, 1);
    }

    #[test]
    fn nothing_without_lines() {
        let scene = Scene::new(rising_candles());
        let mut surface = RecordingSurface::new(1070.0, 738.0);
        assert_eq!(PriceLineRenderer::new().render(&mut surface, &scene.frame()), 0);
        assert_eq!(surface.commands(), &[DrawCommand::Clear]);
    }
}
