use crate::domain::chart::{CanvasPoint, ChartLayout, ChartPoint, CoordinateSystem, Palette, Theme};
use crate::domain::config::ChartConfig;
use crate::domain::drawing::DrawingManager;
use crate::domain::indicators::IndicatorFrame;
use crate::domain::price_line::PriceLineController;

/// Read-only snapshot handed to every layer renderer for one paint
pub struct FrameInput<'a> {
    pub cs: CoordinateSystem<'a>,
    pub layout: ChartLayout,
    pub palette: &'a Palette,
    pub theme: Theme,
    /// Intraday intervals label ticks with clock time
    pub intraday: bool,
    pub config: &'a ChartConfig,
    pub indicators: &'a IndicatorFrame,
    pub drawings: &'a DrawingManager,
    /// Pointer position in chart space while a drawing is being created
    pub drawing_preview: Option<ChartPoint>,
    pub price_lines: &'a PriceLineController,
    /// Crosshair position; `None` when the pointer left the canvas
    pub crosshair: Option<CanvasPoint>,
}

impl FrameInput<'_> {
    pub fn has_data(&self) -> bool {
        !self.cs.candles().is_empty()
    }
}

/// Format a price with `precision` decimals
pub fn format_price(price: f64, precision: usize) -> String {
    format!("{:.*}", precision, price)
}

/// Decimals needed so that neighbouring ticks `step` apart print differently
pub fn precision_for_step(step: f64) -> usize {
    if !(step > 0.0 && step.is_finite()) {
        return 2;
    }
    (-step.log10().floor()).clamp(0.0, 8.0) as usize
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_tracks_step_magnitude() {
        assert_eq!(precision_for_step(100.0), 0);
        assert_eq!(precision_for_step(0.5), 1);
        assert_eq!(precision_for_step(0.05), 2);
        assert_eq!(precision_for_step(0.0002), 4);
        assert_eq!(format_price(50_123.456, 1), "50123.5");
    }
}
