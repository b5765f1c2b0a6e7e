use super::frame::{FrameInput, format_price, precision_for_step};
use super::grid_renderer::{AXIS_FONT_SIZE, price_ticks};
use super::surface::{StrokeStyle, Surface, TextStyle};
use crate::domain::chart::{CanvasPoint, Color, CoordinateSystem, Rect};
use crate::domain::market_data::Candle;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Precomputed pixel geometry of one candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleGeometry {
    pub x: f64,
    pub high_y: f64,
    pub low_y: f64,
    pub body: Rect,
    pub bullish: bool,
}

/// Geometry for one candle: 1px wick from high to low, body between open and close
/// with at least 1px height
pub fn candle_geometry(cs: &CoordinateSystem<'_>, index: usize, candle: &Candle) -> CandleGeometry {
    let x = cs.index_to_x(index as f64);
    let width = cs.candle_width();
    let open_y = cs.price_to_y(candle.open());
    let close_y = cs.price_to_y(candle.close());
    let top = open_y.min(close_y);
    let height = (open_y - close_y).abs().max(1.0);
    CandleGeometry {
        x,
        high_y: cs.price_to_y(candle.high()),
        low_y: cs.price_to_y(candle.low()),
        body: Rect::new(x - width / 2.0, top, width, height),
        bullish: candle.is_bullish(),
    }
}

/// Geometry of every candle that overlaps the pane horizontally
pub fn visible_geometry(cs: &CoordinateSystem<'_>) -> Vec<CandleGeometry> {
    let half = cs.candle_width() / 2.0;
    let candles = cs.candles();
    let visible = cs.visible;
    let window = &candles[visible.start.min(candles.len())..visible.end.min(candles.len())];

    #[cfg(feature = "parallel")]
    let iter = window.par_iter().enumerate();
    #[cfg(not(feature = "parallel"))]
    let iter = window.iter().enumerate();

    iter.map(|(k, candle)| candle_geometry(cs, visible.start + k, candle))
        .filter(|g| cs.is_x_visible(g.x, half))
        .collect()
}

#[derive(Debug, Default)]
pub struct CandleRenderer;

impl CandleRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Paint candles and the last-price marker. Returns the number of candles drawn.
    pub fn render(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) -> usize {
        surface.clear();
        let cs = &frame.cs;
        let palette = frame.palette;
        let geometry = visible_geometry(cs);

        for candle in &geometry {
            let color = if candle.bullish { palette.bullish } else { palette.bearish };
            let wick = StrokeStyle::solid(color, 1.0);
            surface.line(CanvasPoint::new(candle.x, candle.high_y), CanvasPoint::new(candle.x, candle.low_y), &wick);
            surface.fill_rect(candle.body, color);
        }

        if let Some(last) = cs.candles().last() {
            self.render_last_price(surface, frame, last, palette.last_price);
        }
        geometry.len()
    }

    fn render_last_price(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>, last: &Candle, color: Color) {
        let cs = &frame.cs;
        let price = last.close();
        if !cs.price_range().contains(price) {
            return;
        }
        let y = cs.price_to_y(price);
        if y < cs.area.y || y > cs.area.bottom() {
            return;
        }
        surface.line(CanvasPoint::new(cs.area.x, y), CanvasPoint::new(cs.area.right(), y), &StrokeStyle::dashed(color, 1.0));

        let (_, step) = price_ticks(cs.price_range(), cs.area.height, frame.config.price_tick_spacing_px);
        let axis = frame.layout.price_axis();
        let tag = Rect::new(axis.x, y - 9.0, axis.width, 18.0);
        surface.fill_rect(tag, color);
        let text = TextStyle::new(frame.palette.background, AXIS_FONT_SIZE);
        surface.text(&format_price(price, (precision_for_step(step) + 2).min(8)), CanvasPoint::new(axis.x + 6.0, y), &text);
    }
}
