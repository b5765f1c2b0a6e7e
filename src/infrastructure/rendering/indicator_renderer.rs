use super::frame::FrameInput;
use super::grid_renderer::AXIS_FONT_SIZE;
use super::surface::{StrokeStyle, Surface, TextStyle};
use crate::domain::chart::{CanvasPoint, Color, CoordinateSystem, PriceRange, Rect, ValueScale};
use crate::domain::indicators::{ComputedIndicator, IndicatorLine, LineKind};

/// Colors for the secondary components of multi-line indicators
const COMPONENT_COLORS: [u32; 4] = [0xff9800, 0x2962ff, 0xe91e63, 0x00bcd4];

/// Split aligned values into runs of consecutive candles so gaps are not bridged
pub fn line_runs(line: &IndicatorLine, cs: &CoordinateSystem<'_>, y: impl Fn(f64) -> f64) -> Vec<Vec<CanvasPoint>> {
    let count = cs.candles().len();
    let (start, end) = (cs.visible.start.saturating_sub(1), (cs.visible.end + 1).min(count));
    let mut runs: Vec<Vec<CanvasPoint>> = Vec::new();
    let mut previous: Option<usize> = None;
    for (index, value) in line.aligned(count).filter(|(i, _)| *i >= start && *i < end) {
        let point = CanvasPoint::new(cs.index_to_x(index as f64), y(value));
        match (previous, runs.last_mut()) {
            (Some(p), Some(run)) if p + 1 == index => run.push(point),
            _ => runs.push(vec![point]),
        }
        previous = Some(index);
    }
    runs
}

/// Vertical scale of a separate panel: the type's fixed bounds, else the visible values
pub fn panel_scale(indicator: &ComputedIndicator, cs: &CoordinateSystem<'_>, area: Rect) -> Option<ValueScale> {
    let range = match indicator.config.indicator_type.fixed_range() {
        Some((lo, hi)) => PriceRange::new(lo, hi),
        None => {
            let (lo, hi) = indicator.result.value_range(cs.candles().len(), cs.visible)?;
            PriceRange::new(lo, hi).padded(1.0)
        }
    };
    let inset = Rect::new(area.x, area.y + 4.0, area.width, (area.height - 8.0).max(1.0));
    Some(ValueScale::new(range, inset))
}

#[derive(Debug, Default)]
pub struct IndicatorRenderer;

impl IndicatorRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Paint overlays on the price pane and separate indicators in their panels.
    /// Returns the number of indicators painted.
    pub fn render(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>) -> usize {
        surface.clear();
        if !frame.has_data() {
            return 0;
        }
        let cs = &frame.cs;
        let mut painted = 0;

        for (slot, indicator) in frame.indicators.overlays().enumerate() {
            let scale = cs.price_scale;
            self.paint_lines(surface, frame, indicator, |v| scale.value_to_y(v));
            self.paint_label(surface, indicator, cs.area, slot);
            painted += 1;
        }

        for indicator in frame.indicators.indicators.iter() {
            let Some(panel) = indicator.panel.and_then(|p| frame.layout.sub_panel(p)) else {
                continue;
            };
            let Some(scale) = panel_scale(indicator, cs, panel) else {
                self.paint_label(surface, indicator, panel, 0);
                continue;
            };
            let reference = StrokeStyle::dashed(frame.palette.reference_line, 1.0);
            for level in indicator.config.indicator_type.reference_lines() {
                let y = scale.value_to_y(*level);
                if y >= panel.y && y <= panel.bottom() {
                    surface.line(CanvasPoint::new(panel.x, y), CanvasPoint::new(panel.right(), y), &reference);
                }
            }
            self.paint_lines(surface, frame, indicator, |v| scale.value_to_y(v));
            self.paint_label(surface, indicator, panel, 0);
            painted += 1;
        }
        painted
    }

    fn line_color(indicator: &ComputedIndicator, component: usize) -> Color {
        match component {
            0 => indicator.config.color,
            k => Color::from_hex(COMPONENT_COLORS[(k - 1) % COMPONENT_COLORS.len()]),
        }
    }

    fn paint_lines(
        &self,
        surface: &mut dyn Surface,
        frame: &FrameInput<'_>,
        indicator: &ComputedIndicator,
        y: impl Fn(f64) -> f64 + Copy,
    ) {
        let cs = &frame.cs;
        let width = indicator.config.line_width;
        for (component, line) in indicator.result.lines().enumerate() {
            let color = Self::line_color(indicator, component);
            match line.kind {
                LineKind::Line => {
                    let style = if line.dashed {
                        StrokeStyle::dashed(color, width)
                    } else {
                        StrokeStyle::solid(color, width)
                    };
                    for run in line_runs(line, cs, y) {
                        if run.len() > 1 {
                            surface.polyline(&run, &style);
                        }
                    }
                }
                LineKind::Dots => {
                    for point in line_runs(line, cs, y).into_iter().flatten() {
                        surface.fill_circle(point, (width + 0.5).max(1.5), color);
                    }
                }
                LineKind::Histogram => {
                    let zero = y(0.0);
                    let bar = (cs.candle_width() * 0.8).max(1.0);
                    for point in line_runs(line, cs, y).into_iter().flatten() {
                        let color = if point.y <= zero { frame.palette.bullish } else { frame.palette.bearish };
                        let rect = Rect::new(point.x - bar / 2.0, point.y.min(zero), bar, (point.y - zero).abs().max(1.0));
                        surface.fill_rect(rect, color.with_alpha(0.6));
                    }
                }
            }
        }
    }

    fn paint_label(&self, surface: &mut dyn Surface, indicator: &ComputedIndicator, area: Rect, slot: usize) {
        let mut text = indicator.config.label();
        if let Some(value) = indicator.result.main.last_value() {
            text.push_str(&format!("  {value:.2}"));
        }
        let at = CanvasPoint::new(area.x + 6.0, area.y + 10.0 + slot as f64 * 16.0);
        surface.text(&text, at, &TextStyle::new(indicator.config.color, AXIS_FONT_SIZE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::VisibleRange;
    use crate::domain::indicators::{IndicatorEngine, IndicatorType};
    use crate::domain::market_data::Candle;
    use crate::infrastructure::rendering::frame::fixtures::{Scene, rising_candles};
    use crate::infrastructure::rendering::surface::{DrawCommand, RecordingSurface};

    fn cs(candles: &[Candle]) -> CoordinateSystem<'_> {
        CoordinateSystem::new(
            candles,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            PriceRange::new(0.0, 100.0),
            10.0,
            0.0,
            0.0,
            VisibleRange::new(0, candles.len()),
            60_000.0,
        )
    }

    #[test]
    fn runs_break_at_gaps() {
        let candles: Vec<Candle> = (0..6u64).map(|i| Candle::from_values(i, 1.0, 1.0, 1.0, 1.0, 0.0)).collect();
        let line = IndicatorLine::new("main", vec![1.0, 2.0, f64::NAN, 4.0, 5.0]);
        let runs = line_runs(&line, &cs(&candles), |v| v);
        let lengths: Vec<usize> = runs.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![2, 2]);
        assert_eq!(runs[0][0], CanvasPoint::new(15.0, 1.0));
    }

    #[test]
    fn overlays_and_panels_are_painted() {
        let scene = Scene::new(rising_candles());
        let mut engine = IndicatorEngine::new(3);
        engine.add(IndicatorType::Sma);
        engine.add(IndicatorType::Rsi);
        let frame = engine.update(&scene.series());
        let scene = scene.with_indicators(frame);
        let mut surface = RecordingSurface::new(1070.0, 738.0);

        assert_eq!(IndicatorRenderer::new().render(&mut surface, &scene.frame()), 2);
        // RSI 30/50/70 guides
        let guides = surface.count(|c| matches!(c, DrawCommand::Line { style, .. } if style.dash.is_some()));
        assert_eq!(guides, 3);
        let labels = surface.texts();
        assert!(labels.iter().any(|t| t.starts_with("SMA (20)")));
        assert!(labels.iter().any(|t| t.starts_with("RSI (14)")));
    }

    #[test]
    fn fixed_range_scale_for_oscillators() {
        let scene = Scene::new(rising_candles());
        let mut engine = IndicatorEngine::new(3);
        engine.add(IndicatorType::Rsi);
        let frame = engine.update(&scene.series());
        let candles = rising_candles();
        let rsi = &frame.indicators[0];
        let scale = panel_scale(rsi, &cs(&candles), Rect::new(0.0, 0.0, 100.0, 108.0)).unwrap();
        assert_eq!(scale.range, PriceRange::new(0.0, 100.0));
        assert_eq!(scale.value_to_y(50.0), 54.0);
    }
}
