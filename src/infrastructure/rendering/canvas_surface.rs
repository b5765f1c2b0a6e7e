use super::surface::{StrokeStyle, Surface, TextStyle};
use crate::domain::chart::{CanvasPoint, Color, Rect};
use crate::domain::logging::LogComponent;
use crate::log_warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

/// `Surface` over one `<canvas>` with a 2D context. Coordinates are CSS pixels; the
/// backing store is scaled by the device pixel ratio.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2D context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| JsValue::from_str("Failed to cast to 2D context"))?;
        let (width, height) = (canvas.width() as f64, canvas.height() as f64);
        Ok(Self { canvas, context, width, height })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        self.width = width;
        self.height = height;
        self.canvas.set_width((width * ratio).round() as u32);
        self.canvas.set_height((height * ratio).round() as u32);
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{width}px"));
        let _ = style.set_property("height", &format!("{height}px"));
        if self.context.set_transform(ratio, 0.0, 0.0, ratio, 0.0, 0.0).is_err() {
            log_warn!(LogComponent::Infrastructure("CanvasSurface"), "setTransform failed");
        }
    }

    fn apply_stroke(&self, style: &StrokeStyle) {
        self.context.set_stroke_style(&JsValue::from_str(&style.color.to_css()));
        self.context.set_line_width(style.width);
        let dash = js_sys::Array::new();
        if let Some([on, off]) = style.dash {
            dash.push(&JsValue::from_f64(on));
            dash.push(&JsValue::from_f64(off));
        }
        let _ = self.context.set_line_dash(&dash);
    }

    fn trace(&self, points: &[CanvasPoint]) -> bool {
        let Some((first, rest)) = points.split_first() else {
            return false;
        };
        self.context.begin_path();
        self.context.move_to(first.x, first.y);
        for point in rest {
            self.context.line_to(point.x, point.y);
        }
        true
    }
}

impl Surface for CanvasSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.context.clear_rect(0.0, 0.0, self.width, self.height);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.context.set_fill_style(&JsValue::from_str(&color.to_css()));
        self.context.fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn stroke_rect(&mut self, rect: Rect, style: &StrokeStyle) {
        self.apply_stroke(style);
        self.context.stroke_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn line(&mut self, from: CanvasPoint, to: CanvasPoint, style: &StrokeStyle) {
        self.polyline(&[from, to], style);
    }

    fn polyline(&mut self, points: &[CanvasPoint], style: &StrokeStyle) {
        if points.len() < 2 {
            return;
        }
        self.apply_stroke(style);
        if self.trace(points) {
            self.context.stroke();
        }
    }

    fn fill_polygon(&mut self, points: &[CanvasPoint], color: Color) {
        if points.len() < 3 {
            return;
        }
        self.context.set_fill_style(&JsValue::from_str(&color.to_css()));
        if self.trace(points) {
            self.context.close_path();
            self.context.fill();
        }
    }

    fn fill_circle(&mut self, center: CanvasPoint, radius: f64, color: Color) {
        self.context.set_fill_style(&JsValue::from_str(&color.to_css()));
        self.context.begin_path();
        if self.context.arc(center.x, center.y, radius, 0.0, std::f64::consts::TAU).is_ok() {
            self.context.fill();
        }
    }

    fn text(&mut self, text: &str, at: CanvasPoint, style: &TextStyle) {
        self.context.set_font(&style.font());
        self.context.set_fill_style(&JsValue::from_str(&style.color.to_css()));
        self.context.set_text_align(style.align.as_css());
        self.context.set_text_baseline("middle");
        let _ = self.context.fill_text(text, at.x, at.y);
    }

    fn measure_text(&self, text: &str, font_size: f64) -> f64 {
        self.context.set_font(&TextStyle::new(Color::BLACK, font_size).font());
        self.context
            .measure_text(text)
            .map(|metrics| metrics.width())
            .unwrap_or(text.chars().count() as f64 * font_size * 0.6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn resize_scales_backing_store() {
        let document = web_sys::window().and_then(|w| w.document()).unwrap();
        let canvas: HtmlCanvasElement = document.create_element("canvas").unwrap().dyn_into().unwrap();
        let mut surface = CanvasSurface::new(canvas).unwrap();
        surface.resize(300.0, 150.0, 2.0);
        assert_eq!(surface.canvas().width(), 600);
        assert_eq!(surface.width(), 300.0);
        surface.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
        assert!(surface.measure_text("abc", 12.0) > 0.0);
    }
}
