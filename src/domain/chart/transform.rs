use super::value_objects::{CanvasPoint, ChartPoint, PriceRange, Rect, VisibleRange};
use crate::domain::market_data::Candle;

/// Linear value-to-pixel mapping over a vertical pane. Used for sub-panels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueScale {
    pub range: PriceRange,
    pub area: Rect,
    pub offset_y: f64,
}

impl ValueScale {
    pub fn new(range: PriceRange, area: Rect) -> Self {
        Self { range, area, offset_y: 0.0 }
    }

    pub fn value_to_y(&self, value: f64) -> f64 {
        self.area.y + (self.range.max - value) / self.range.span() * self.area.height + self.offset_y
    }

    pub fn y_to_value(&self, y: f64) -> f64 {
        self.range.max - (y - self.area.y - self.offset_y) / self.area.height * self.range.span()
    }
}

/// Chart-space to pixel-space mapping frozen for one frame.
///
/// X runs over candle index space: candle `i` is centered at
/// `left + (i + 0.5) * spacing + offset_x`. Timestamps map to fractional indices by
/// interpolating between neighbouring candles; outside the data they extrapolate with the
/// nearest bar duration. Both axes are exact inverses up to rounding.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateSystem<'a> {
    candles: &'a [Candle],
    pub area: Rect,
    pub price_scale: ValueScale,
    pub spacing: f64,
    pub offset_x: f64,
    pub visible: VisibleRange,
    interval_ms: f64,
}

impl<'a> CoordinateSystem<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        candles: &'a [Candle],
        area: Rect,
        price_range: PriceRange,
        spacing: f64,
        offset_x: f64,
        offset_y: f64,
        visible: VisibleRange,
        interval_ms: f64,
    ) -> Self {
        let mut price_scale = ValueScale::new(price_range, area);
        price_scale.offset_y = offset_y;
        Self {
            candles,
            area,
            price_scale,
            spacing: if spacing > 0.0 && spacing.is_finite() { spacing } else { 1.0 },
            offset_x,
            visible,
            interval_ms: if interval_ms > 0.0 { interval_ms } else { 60_000.0 },
        }
    }

    pub fn candles(&self) -> &'a [Candle] {
        self.candles
    }

    pub fn price_range(&self) -> PriceRange {
        self.price_scale.range
    }

    pub fn index_to_x(&self, index: f64) -> f64 {
        self.area.x + (index + 0.5) * self.spacing + self.offset_x
    }

    pub fn x_to_index(&self, x: f64) -> f64 {
        (x - self.area.x - self.offset_x) / self.spacing - 0.5
    }

    pub fn price_to_y(&self, price: f64) -> f64 {
        self.price_scale.value_to_y(price)
    }

    pub fn y_to_price(&self, y: f64) -> f64 {
        self.price_scale.y_to_value(y)
    }

    pub fn time_to_index(&self, time: f64) -> f64 {
        let c = self.candles;
        match c.len() {
            0 => time / self.interval_ms,
            1 => (time - c[0].timestamp.as_f64()) / self.interval_ms,
            n => {
                let first = c[0].timestamp.as_f64();
                let last = c[n - 1].timestamp.as_f64();
                if time <= first {
                    let step = c[1].timestamp.as_f64() - first;
                    return (time - first) / step;
                }
                if time >= last {
                    let step = last - c[n - 2].timestamp.as_f64();
                    return (n - 1) as f64 + (time - last) / step;
                }
                // first index whose time is greater than `time`; 1..n-1 here
                let upper = c.partition_point(|candle| candle.timestamp.as_f64() <= time);
                let lower = upper - 1;
                let t0 = c[lower].timestamp.as_f64();
                let t1 = c[upper].timestamp.as_f64();
                lower as f64 + (time - t0) / (t1 - t0)
            }
        }
    }

    pub fn index_to_time(&self, index: f64) -> f64 {
        let c = self.candles;
        match c.len() {
            0 => index * self.interval_ms,
            1 => c[0].timestamp.as_f64() + index * self.interval_ms,
            n => {
                let first = c[0].timestamp.as_f64();
                let last = c[n - 1].timestamp.as_f64();
                let last_index = (n - 1) as f64;
                if index <= 0.0 {
                    return first + index * (c[1].timestamp.as_f64() - first);
                }
                if index >= last_index {
                    return last + (index - last_index) * (last - c[n - 2].timestamp.as_f64());
                }
                let lower = index.floor() as usize;
                let t0 = c[lower].timestamp.as_f64();
                let t1 = c[lower + 1].timestamp.as_f64();
                t0 + (index - lower as f64) * (t1 - t0)
            }
        }
    }

    pub fn time_to_x(&self, time: f64) -> f64 {
        self.index_to_x(self.time_to_index(time))
    }

    pub fn x_to_time(&self, x: f64) -> f64 {
        self.index_to_time(self.x_to_index(x))
    }

    pub fn to_pixel(&self, point: ChartPoint) -> CanvasPoint {
        CanvasPoint::new(self.time_to_x(point.timestamp), self.price_to_y(point.price))
    }

    pub fn to_chart_point(&self, pixel: CanvasPoint) -> ChartPoint {
        ChartPoint::new(self.x_to_time(pixel.x), self.y_to_price(pixel.y))
    }

    /// Body width: `clamp(spacing * 0.7, 2, 20)`
    pub fn candle_width(&self) -> f64 {
        (self.spacing * 0.7).clamp(2.0, 20.0)
    }

    /// True when any part of `[x - half_width, x + half_width]` lies inside the area
    pub fn is_x_visible(&self, x: f64, half_width: f64) -> bool {
        x + half_width >= self.area.x && x - half_width <= self.area.right()
    }

    /// Nearest candle index under a pixel column, if any
    pub fn index_at(&self, x: f64) -> Option<usize> {
        let index = self.x_to_index(x).round();
        if index < 0.0 || index as usize >= self.candles.len() {
            return None;
        }
        Some(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(times: &[u64]) -> Vec<Candle> {
        times.iter().map(|t| Candle::from_values(*t, 10.0, 12.0, 8.0, 11.0, 1.0)).collect()
    }

    fn system(candles: &[Candle]) -> CoordinateSystem<'_> {
        CoordinateSystem::new(
            candles,
            Rect::new(10.0, 20.0, 400.0, 300.0),
            PriceRange::new(100.0, 200.0),
            40.0,
            -15.0,
            7.0,
            VisibleRange::new(0, candles.len()),
            60_000.0,
        )
    }

    #[test]
    fn candle_centers_follow_spacing() {
        let data = candles(&[0, 60_000, 120_000]);
        let cs = system(&data);
        assert_eq!(cs.time_to_x(0.0), 10.0 + 20.0 - 15.0);
        assert_eq!(cs.time_to_x(60_000.0), 10.0 + 60.0 - 15.0);
        assert_eq!(cs.index_at(cs.time_to_x(120_000.0)), Some(2));
    }

    #[test]
    fn gaps_interpolate_between_neighbours() {
        let data = candles(&[0, 60_000, 600_000]);
        let cs = system(&data);
        assert_eq!(cs.time_to_index(330_000.0), 1.5);
        assert_eq!(cs.index_to_time(1.5), 330_000.0);
        assert_eq!(cs.time_to_index(660_000.0), 2.0 + 60_000.0 / 540_000.0);
        assert_eq!(cs.time_to_index(-60_000.0), -1.0);
    }

    #[test]
    fn price_axis_is_inverted_and_offset() {
        let data = candles(&[0]);
        let cs = system(&data);
        assert_eq!(cs.price_to_y(200.0), 27.0);
        assert_eq!(cs.price_to_y(100.0), 327.0);
        assert_eq!(cs.y_to_price(177.0), 150.0);
    }

    #[test]
    fn round_trip_with_single_and_no_candles() {
        for data in [candles(&[]), candles(&[5_000])] {
            let cs = system(&data);
            let p = ChartPoint::new(185_000.0, 133.3);
            let back = cs.to_chart_point(cs.to_pixel(p));
            assert!((back.timestamp - p.timestamp).abs() < 1e-6);
            assert!((back.price - p.price).abs() < 1e-9);
        }
    }

    #[test]
    fn candle_width_is_clamped() {
        let data = candles(&[0]);
        let mut cs = system(&data);
        assert_eq!(cs.candle_width(), 20.0);
        cs.spacing = 1.0;
        assert_eq!(cs.candle_width(), 2.0);
        cs.spacing = 10.0;
        assert!((cs.candle_width() - 7.0).abs() < 1e-12);
    }
}
