use super::frame::{FrameInput, format_price, precision_for_step};
use super::grid_renderer::{AXIS_FONT_SIZE, price_ticks};
use super::surface::{StrokeStyle, Surface, TextAlign, TextStyle};
use crate::domain::chart::{CanvasPoint, Rect};
use crate::time_utils::format_crosshair_time;

const LABEL_HEIGHT: f64 = 18.0;

#[derive(Debug, Default)]
pub struct CrosshairRenderer;

impl CrosshairRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Paint the crosshair snapped to the candle under the pointer. Returns false when
    /// hidden.
    pub fn render(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) -> bool {
        surface.clear();
        let Some(pointer) = frame.crosshair else {
            return false;
        };
        let plot = frame.layout.plot_area();
        if !frame.has_data() || !plot.contains(pointer) {
            return false;
        }
        let cs = &frame.cs;
        let style = StrokeStyle::dashed(frame.palette.crosshair, 1.0);
        let label = TextStyle::new(frame.palette.crosshair_label, AXIS_FONT_SIZE);

        let (x, time) = match cs.index_at(pointer.x) {
            Some(index) => (cs.index_to_x(index as f64), cs.candles()[index].time() as f64),
            None => (pointer.x, cs.x_to_time(pointer.x)),
        };
        surface.line(CanvasPoint::new(x, plot.y), CanvasPoint::new(x, plot.bottom()), &style);
        surface.line(CanvasPoint::new(plot.x, pointer.y), CanvasPoint::new(plot.right(), pointer.y), &style);

        // Price label only over the price pane; sub-panels have their own scales
        if cs.area.contains(pointer) {
            let (_, step) = price_ticks(cs.price_range(), cs.area.height, frame.config.price_tick_spacing_px);
            let price = format_price(cs.y_to_price(pointer.y), (precision_for_step(step) + 2).min(8));
            let axis = frame.layout.price_axis();
            surface.fill_rect(Rect::new(axis.x, pointer.y - LABEL_HEIGHT / 2.0, axis.width, LABEL_HEIGHT), frame.palette.crosshair);
            surface.text(&price, CanvasPoint::new(axis.x + 6.0, pointer.y), &label);
        }

        let text = format_crosshair_time(time.max(0.0) as u64, frame.intraday);
        let axis = frame.layout.time_axis();
        let width = surface.measure_text(&text, AXIS_FONT_SIZE) + 12.0;
        let tag = Rect::new(x - width / 2.0, axis.y, width, axis.height.min(LABEL_HEIGHT + 4.0));
        surface.fill_rect(tag, frame.palette.crosshair);
        surface.text(&text, CanvasPoint::new(x, tag.y + tag.height / 2.0), &label.aligned(TextAlign::Center));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rendering::frame::fixtures::{Scene, rising_candles};
    use crate::infrastructure::rendering::surface::{DrawCommand, RecordingSurface};

    #[test]
    fn snaps_to_candle_and_labels_both_axes() {
        let scene = Scene::new(rising_candles());
        let mut frame = scene.frame();
        // plot starts at x = 10 with 9.9px per candle; this is the center of candle 50
        frame.crosshair = Some(CanvasPoint::new(10.0 + 50.5 * 9.9, 300.0));

        let mut surface = RecordingSurface::new(1070.0, 738.0);
        assert!(CrosshairRenderer::new().render(&mut surface, &frame));
        assert_eq!(surface.count(|c| matches!(c, DrawCommand::Line { style, .. } if style.dash.is_some())), 2);
        let texts = surface.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1], "1970-01-01 00:50");
    }

    #[test]
    fn hidden_without_pointer_or_outside_plot() {
        let scene = Scene::new(rising_candles());
        let mut surface = RecordingSurface::new(1070.0, 738.0);
        assert!(!CrosshairRenderer::new().render(&mut surface, &scene.frame()));
        assert_eq!(surface.commands(), &[DrawCommand::Clear]);

        let mut frame = scene.frame();
        frame.crosshair = Some(CanvasPoint::new(1040.0, 300.0));
        assert!(!CrosshairRenderer::new().render(&mut surface, &frame));
    }
}
