//! Background layer: fill, grid lines, both axes and the empty-data placeholder.

use super::frame::{FrameInput, format_price, precision_for_step};
use super::surface::{StrokeStyle, Surface, TextAlign, TextStyle};
use crate::domain::chart::{CanvasPoint, CoordinateSystem, PriceRange, Rect, Theme, VisibleRange};
use crate::domain::logging::LogComponent;
use crate::log_trace;
use crate::time_utils::{crosses_boundary, format_time_label};

pub const AXIS_FONT_SIZE: f64 = 11.0;
pub const PLACEHOLDER_TEXT: &str = "Waiting for data…";

/// Round a raw step up to 1, 2 or 5 times a power of ten
pub fn nice_step(raw: f64) -> f64 {
    if !(raw > 0.0 && raw.is_finite()) {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Price ticks every ~`target_px`, between 4 and 12 of them. Returns the ticks and the step.
pub fn price_ticks(range: PriceRange, pane_height: f64, target_px: f64) -> (Vec<f64>, f64) {
    let count = (pane_height / target_px.max(1.0)).round().clamp(4.0, 12.0);
    let step = nice_step(range.span() / count);
    let first = (range.min / step).ceil();
    let ticks = (0..)
        .map(|k| (first + k as f64) * step)
        .take_while(|value| *value <= range.max + step * 1e-9)
        .take(64)
        .collect();
    (ticks, step)
}

/// Candle indices carrying a time label, between 5 and 12 across the width.
///
/// Ticks sit on multiples of a fixed stride so they stay put while panning.
pub fn time_ticks(visible: VisibleRange, chart_width: f64, target_px: f64) -> Vec<usize> {
    if visible.is_empty() {
        return Vec::new();
    }
    let count = (chart_width / target_px.max(1.0)).round().clamp(5.0, 12.0) as usize;
    let stride = visible.len().div_ceil(count).max(1);
    let first = visible.start.div_ceil(stride) * stride;
    (first..visible.end).step_by(stride).collect()
}

/// What the background depends on; unchanged key means no repaint
#[derive(Debug, Clone, PartialEq)]
struct GridKey {
    price_range: PriceRange,
    visible: VisibleRange,
    spacing: f64,
    offset_x: f64,
    offset_y: f64,
    width: f64,
    height: f64,
    panels: Vec<Rect>,
    theme: Theme,
    has_data: bool,
}

impl GridKey {
    fn of(frame: &FrameInput<'_>) -> Self {
        let cs = &frame.cs;
        Self {
            price_range: cs.price_range(),
            visible: cs.visible,
            spacing: cs.spacing,
            offset_x: cs.offset_x,
            offset_y: cs.price_scale.offset_y,
            width: frame.layout.width,
            height: frame.layout.height,
            panels: (0..frame.layout.sub_panels).filter_map(|i| frame.layout.sub_panel(i)).collect(),
            theme: frame.theme,
            has_data: frame.has_data(),
        }
    }
}

#[derive(Debug, Default)]
pub struct GridRenderer {
    last_key: Option<GridKey>,
}

impl GridRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.last_key = None;
    }

    /// Paint when ranges or size changed. Returns true when the surface was touched.
    pub fn render(&mut self, surface: &mut dyn Surface, frame: &FrameInput<'_>) -> bool {
        let key = GridKey::of(frame);
        if self.last_key.as_ref() == Some(&key) {
            return false;
        }
        log_trace!(LogComponent::Infrastructure("GridRenderer"), "repaint {:?}", key.visible);
        self.last_key = Some(key);

        let palette = frame.palette;
        surface.clear();
        surface.fill_rect(Rect::new(0.0, 0.0, frame.layout.width, frame.layout.height), palette.background);

        if !frame.has_data() {
            let plot = frame.layout.plot_area();
            let style = TextStyle::new(palette.placeholder_text, 14.0).aligned(TextAlign::Center);
            surface.text(PLACEHOLDER_TEXT, CanvasPoint::new(plot.x + plot.width / 2.0, plot.y + plot.height / 2.0), &style);
            return true;
        }

        self.paint_price_grid(surface, frame);
        self.paint_time_grid(surface, frame);
        self.paint_panel_separators(surface, frame);
        true
    }

    fn paint_price_grid(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) {
        let cs = &frame.cs;
        let pane = cs.area;
        let axis = frame.layout.price_axis();
        let (ticks, step) = price_ticks(cs.price_range(), pane.height, frame.config.price_tick_spacing_px);
        let precision = precision_for_step(step);
        let grid = StrokeStyle::solid(frame.palette.grid, 1.0);
        let label = TextStyle::new(frame.palette.axis_text, AXIS_FONT_SIZE);

        surface.fill_rect(axis, frame.palette.axis_background);
        for price in ticks {
            let y = cs.price_to_y(price);
            if y < pane.y || y > pane.bottom() {
                continue;
            }
            surface.line(CanvasPoint::new(pane.x, y), CanvasPoint::new(pane.right(), y), &grid);
            surface.text(&format_price(price, precision), CanvasPoint::new(axis.x + 6.0, y), &label);
        }
    }

    fn paint_time_grid(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) {
        let cs: &CoordinateSystem<'_> = &frame.cs;
        let plot = frame.layout.plot_area();
        let axis = frame.layout.time_axis();
        let candles = cs.candles();
        let grid = StrokeStyle::solid(frame.palette.grid, 1.0);
        let primary = TextStyle::new(frame.palette.axis_text, AXIS_FONT_SIZE).aligned(TextAlign::Center);

        surface.fill_rect(axis, frame.palette.axis_background);
        let mut previous: Option<u64> = None;
        for index in time_ticks(cs.visible, plot.width, frame.config.time_tick_spacing_px) {
            let x = cs.index_to_x(index as f64);
            if x < plot.x || x > plot.right() {
                continue;
            }
            let time = candles[index].time();
            surface.line(CanvasPoint::new(x, plot.y), CanvasPoint::new(x, plot.bottom()), &grid);
            let label = format_time_label(time, frame.intraday);
            let text = match previous {
                Some(prev) if crosses_boundary(prev, time, frame.intraday) => label.secondary,
                _ => label.primary,
            };
            surface.text(&text, CanvasPoint::new(x, axis.y + axis.height / 2.0), &primary);
            previous = Some(time);
        }
    }

    fn paint_panel_separators(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) {
        let separator = StrokeStyle::solid(frame.palette.grid, 1.0);
        for panel in (0..frame.layout.sub_panels).filter_map(|i| frame.layout.sub_panel(i)) {
            surface.line(CanvasPoint::new(0.0, panel.y), CanvasPoint::new(frame.layout.width, panel.y), &separator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rendering::frame::fixtures::{Scene, rising_candles};
    use crate::infrastructure::rendering::surface::{DrawCommand, RecordingSurface};

    #[test]
    fn nice_steps() {
        assert_eq!(nice_step(7.3), 10.0);
        assert_eq!(nice_step(1.7), 2.0);
        assert!((nice_step(0.031) - 0.05).abs() < 1e-12);
        assert_eq!(nice_step(450.0), 500.0);
    }

    #[test]
    fn price_tick_count_is_clamped() {
        let range = PriceRange::new(100.0, 200.0);
        let (ticks, step) = price_ticks(range, 700.0, 70.0);
        assert_eq!(step, 10.0);
        assert_eq!(ticks.first(), Some(&100.0));
        assert_eq!(ticks.last(), Some(&200.0));

        let (_, step) = price_ticks(range, 50.0, 70.0);
        assert_eq!(step, 50.0);
        let (ticks, step) = price_ticks(range, 5000.0, 70.0);
        assert_eq!(step, 10.0);
        assert_eq!(ticks.len(), 11);
    }

    #[test]
    fn time_ticks_use_stable_stride() {
        let ticks = time_ticks(VisibleRange::new(0, 100), 1000.0, 100.0);
        assert_eq!(ticks, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
        let panned = time_ticks(VisibleRange::new(3, 103), 1000.0, 100.0);
        assert_eq!(panned.first(), Some(&10));
        assert!(time_ticks(VisibleRange::default(), 1000.0, 100.0).is_empty());
    }

    #[test]
    fn empty_series_shows_placeholder() {
        let scene = Scene::new(Vec::new());
        let mut surface = RecordingSurface::new(1070.0, 738.0);
        assert!(GridRenderer::new().render(&mut surface, &scene.frame()));
        assert_eq!(surface.texts(), vec![PLACEHOLDER_TEXT]);
    }

    #[test]
    fn repaints_only_when_key_changes() {
        let scene = Scene::new(rising_candles());
        let mut grid = GridRenderer::new();
        let mut surface = RecordingSurface::new(1070.0, 738.0);
        assert!(grid.render(&mut surface, &scene.frame()));
        let labels = surface.count(|c| matches!(c, DrawCommand::Text { .. }));
        assert!(labels > 8);
        assert!(!grid.render(&mut surface, &scene.frame()));
        grid.invalidate();
        assert!(grid.render(&mut surface, &scene.frame()));
    }
}
