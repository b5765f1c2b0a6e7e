use super::transform::CoordinateSystem;
use super::value_objects::{PriceRange, Rect, VisibleRange};
use crate::domain::config::ChartConfig;
use crate::domain::market_data::Candle;
use crate::log_trace;
use crate::domain::logging::LogComponent;

/// Zoom and pan state of the price pane.
///
/// `zoom = 1` fits the whole series into the chart width. `offset_x`/`offset_y` are pixel
/// shifts applied after the linear mappings.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    min_zoom: f64,
    max_zoom: f64,
    default_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_config(&ChartConfig::default())
    }
}

impl Viewport {
    pub fn new(min_zoom: f64, max_zoom: f64, default_zoom: f64) -> Self {
        let default_zoom = default_zoom.clamp(min_zoom, max_zoom);
        Self { zoom: default_zoom, offset_x: 0.0, offset_y: 0.0, min_zoom, max_zoom, default_zoom }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(config.min_zoom, config.max_zoom, config.default_zoom)
    }

    pub fn zoom_bounds(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    /// Zoom by `delta` keeping the content under `pixel_x` in place.
    ///
    /// Returns false when the zoom was already at the bound in that direction.
    pub fn zoom_at(&mut self, pixel_x: f64, delta: f64, chart: Rect) -> bool {
        if !delta.is_finite() || chart.width <= 0.0 {
            return false;
        }
        let ratio = ((pixel_x - chart.x) / chart.width).clamp(0.0, 1.0);
        let old = self.zoom;
        let new = (old + delta).clamp(self.min_zoom, self.max_zoom);
        if new == old {
            return false;
        }
        let scale = new / old;
        self.offset_x = self.offset_x * scale + chart.width * (1.0 - scale) * ratio;
        self.zoom = new;
        log_trace!(LogComponent::Domain("Viewport"), "zoom {:.3} -> {:.3} at r={:.3}", old, new, ratio);
        true
    }

    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) {
        if delta_x.is_finite() {
            self.offset_x += delta_x;
        }
        if delta_y.is_finite() {
            self.offset_y += delta_y;
        }
    }

    pub fn reset(&mut self) {
        self.zoom = self.default_zoom;
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }

    /// Pixel distance between neighbouring candle centers
    pub fn spacing(&self, candle_count: usize, chart_width: f64) -> f64 {
        chart_width / candle_count.max(1) as f64 * self.zoom
    }

    pub fn visible_range(&self, candle_count: usize, chart_width: f64) -> VisibleRange {
        if candle_count == 0 {
            return VisibleRange::default();
        }
        let spacing = self.spacing(candle_count, chart_width);
        let n = candle_count as f64;
        let start = (-self.offset_x / spacing).floor().clamp(0.0, n) as usize;
        let end = ((chart_width - self.offset_x) / spacing).ceil().clamp(0.0, n) as usize;
        VisibleRange::new(start, end)
    }

    /// Auto-scaled price range over the visible candles, padded by zoom.
    ///
    /// Falls back to the whole series when panned past the data.
    pub fn price_range(&self, candles: &[Candle], visible: VisibleRange) -> PriceRange {
        let window = if visible.is_empty() { candles } else { &candles[visible.start..visible.end] };
        let bounds = window.iter().fold(None, |acc: Option<(f64, f64)>, c| match acc {
            None => Some((c.low(), c.high())),
            Some((lo, hi)) => Some((lo.min(c.low()), hi.max(c.high()))),
        });
        match bounds {
            Some((lo, hi)) => PriceRange::new(lo, hi).padded(self.zoom),
            None => PriceRange::default(),
        }
    }

    /// Keep the content at the chart center in place after `added` candles were
    /// prepended to a series of `old_count`.
    pub fn adjust_for_prepend(&mut self, old_count: usize, added: usize, chart_width: f64) {
        if old_count == 0 || added == 0 {
            return;
        }
        let new_count = old_count + added;
        let old_spacing = self.spacing(old_count, chart_width);
        let anchor_px = chart_width / 2.0;
        let anchor_index = (anchor_px - self.offset_x) / old_spacing;

        self.zoom = (self.zoom * new_count as f64 / old_count as f64).clamp(self.min_zoom, self.max_zoom);
        let new_spacing = self.spacing(new_count, chart_width);
        self.offset_x = anchor_px - (anchor_index + added as f64) * new_spacing;
    }

    /// Freeze the current state into a transform for one frame
    pub fn transform<'a>(&self, candles: &'a [Candle], area: Rect, interval_ms: f64) -> CoordinateSystem<'a> {
        let visible = self.visible_range(candles.len(), area.width);
        let price_range = self.price_range(candles, visible);
        CoordinateSystem::new(
            candles,
            area,
            price_range,
            self.spacing(candles.len(), area.width),
            self.offset_x,
            self.offset_y,
            visible,
            interval_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 500.0)
    }

    #[test]
    fn zoom_is_clamped() {
        let mut viewport = Viewport::new(0.5, 4.0, 1.0);
        assert!(viewport.zoom_at(500.0, 100.0, chart()));
        assert_eq!(viewport.zoom, 4.0);
        assert!(!viewport.zoom_at(500.0, 1.0, chart()));
        viewport.zoom_at(500.0, -100.0, chart());
        assert_eq!(viewport.zoom, 0.5);
    }

    #[test]
    fn zoom_keeps_cursor_content_fixed() {
        for ratio in [0.1, 0.5, 0.9] {
            let mut viewport = Viewport::new(0.5, 50.0, 1.0);
            viewport.pan_by(-37.0, 0.0);
            let cursor = 1000.0 * ratio;
            let n = 200;
            let index_before = (cursor - viewport.offset_x) / viewport.spacing(n, 1000.0);
            viewport.zoom_at(cursor, 1.5, chart());
            let x_after = index_before * viewport.spacing(n, 1000.0) + viewport.offset_x;
            assert!((x_after - cursor).abs() < 1.0, "ratio {ratio}: {x_after} vs {cursor}");
        }
    }

    #[test]
    fn visible_range_follows_pan() {
        let mut viewport = Viewport::new(0.5, 50.0, 2.0);
        assert_eq!(viewport.visible_range(100, 1000.0), VisibleRange::new(0, 50));
        viewport.pan_by(-200.0, 0.0);
        assert_eq!(viewport.visible_range(100, 1000.0), VisibleRange::new(10, 60));
        assert!(viewport.visible_range(0, 1000.0).is_empty());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut viewport = Viewport::new(0.5, 50.0, 1.0);
        viewport.zoom_at(10.0, 3.0, chart());
        viewport.pan_by(5.0, 7.0);
        viewport.reset();
        assert_eq!(viewport, Viewport::new(0.5, 50.0, 1.0));
    }

    #[test]
    fn prepend_keeps_spacing_and_content() {
        let mut viewport = Viewport::new(0.5, 50.0, 1.0);
        let before = viewport.spacing(100, 1000.0);
        viewport.adjust_for_prepend(100, 50, 1000.0);
        assert!((viewport.zoom - 1.5).abs() < 1e-12);
        assert!((viewport.spacing(150, 1000.0) - before).abs() < 1e-9);
        // old index 0 is now index 50 and must stay at the same pixel
        let x = 50.5 * viewport.spacing(150, 1000.0) + viewport.offset_x;
        assert!((x - 0.5 * before).abs() < 1e-6);
    }
}
