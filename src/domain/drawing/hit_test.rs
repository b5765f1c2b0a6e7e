use super::entities::{Drawing, DrawingShape};
use crate::domain::chart::{CanvasPoint, CoordinateSystem, Rect};
use crate::domain::config::ChartConfig;

/// Pixel radii used by hit testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTolerance {
    pub line: f64,
    pub anchor: f64,
    pub text_radius: f64,
}

impl Default for HitTolerance {
    fn default() -> Self {
        Self { line: 5.0, anchor: 6.0, text_radius: 12.0 }
    }
}

impl HitTolerance {
    pub fn from_config(config: &ChartConfig) -> Self {
        Self {
            line: config.hit_tolerance_px,
            anchor: config.anchor_radius_px,
            text_radius: config.text_hit_radius_px,
        }
    }
}

/// Shortest distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: CanvasPoint, a: CanvasPoint, b: CanvasPoint) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    p.distance_to(CanvasPoint::new(a.x + t * dx, a.y + t * dy))
}

/// Both channel edges in pixels: the main segment and its parallel through the third point
pub fn channel_segments(
    a: CanvasPoint,
    b: CanvasPoint,
    c: CanvasPoint,
) -> [(CanvasPoint, CanvasPoint); 2] {
    let line_y = if b.x == a.x { a.y } else { a.y + (b.y - a.y) * (c.x - a.x) / (b.x - a.x) };
    let shift = c.y - line_y;
    [(a, b), (CanvasPoint::new(a.x, a.y + shift), CanvasPoint::new(b.x, b.y + shift))]
}

/// True when `pixel` lies on `drawing` within tolerance
pub fn hits(drawing: &Drawing, pixel: CanvasPoint, cs: &CoordinateSystem<'_>, tol: &HitTolerance) -> bool {
    let px: Vec<CanvasPoint> = drawing.points().iter().map(|p| cs.to_pixel(*p)).collect();
    match &drawing.shape {
        DrawingShape::TrendLine { .. } | DrawingShape::Arrow { .. } | DrawingShape::Fibonacci { .. } => {
            distance_to_segment(pixel, px[0], px[1]) <= tol.line
        }
        DrawingShape::HorizontalLine { .. } => (pixel.y - px[0].y).abs() <= tol.line,
        DrawingShape::VerticalLine { .. } => (pixel.x - px[0].x).abs() <= tol.line,
        DrawingShape::Rectangle { .. } => Rect::from_corners(px[0], px[1]).inflate(tol.line).contains(pixel),
        DrawingShape::Text { .. } => pixel.distance_to(px[0]) <= tol.text_radius,
        DrawingShape::Channel { .. } => channel_segments(px[0], px[1], px[2])
            .iter()
            .any(|(a, b)| distance_to_segment(pixel, *a, *b) <= tol.line),
    }
}

/// Index of the anchor of `drawing` under `pixel`, nearest first
pub fn anchor_at(drawing: &Drawing, pixel: CanvasPoint, cs: &CoordinateSystem<'_>, radius: f64) -> Option<usize> {
    drawing
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| (i, pixel.distance_to(cs.to_pixel(*p))))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::{ChartPoint, PriceRange, VisibleRange};
    use crate::domain::drawing::entities::DrawingKind;
    use crate::domain::market_data::Candle;

    /// 1 ms = 1 px horizontally, 1 price unit = 1 px vertically, y grows downward from price 1000
    fn identity_like(candles: &[Candle]) -> CoordinateSystem<'_> {
        CoordinateSystem::new(
            candles,
            Rect::new(0.0, 0.0, 1000.0, 1000.0),
            PriceRange::new(0.0, 1000.0),
            1.0,
            -0.5,
            0.0,
            VisibleRange::new(0, 0),
            1.0,
        )
    }

    fn drawing(kind: DrawingKind, points: &[(f64, f64)]) -> Drawing {
        let points: Vec<ChartPoint> = points.iter().map(|(t, p)| ChartPoint::new(*t, *p)).collect();
        Drawing::new("d", DrawingShape::from_points(kind, &points, Some("note".into())).unwrap(), 0, 0)
    }

    #[test]
    fn pixel_mapping_is_identity_in_fixture() {
        let cs = identity_like(&[]);
        assert_eq!(cs.to_pixel(ChartPoint::new(100.0, 900.0)), CanvasPoint::new(100.0, 100.0));
    }

    #[test]
    fn segment_distance_clamps_to_ends() {
        let a = CanvasPoint::new(0.0, 0.0);
        let b = CanvasPoint::new(10.0, 0.0);
        assert_eq!(distance_to_segment(CanvasPoint::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(CanvasPoint::new(13.0, 4.0), a, b), 5.0);
    }

    #[test]
    fn trend_line_tolerance_boundary() {
        let cs = identity_like(&[]);
        let line = drawing(DrawingKind::TrendLine, &[(100.0, 900.0), (300.0, 900.0)]);
        let tol = HitTolerance::default();
        assert!(hits(&line, CanvasPoint::new(200.0, 105.0), &cs, &tol));
        assert!(!hits(&line, CanvasPoint::new(200.0, 106.0), &cs, &tol));
    }

    #[test]
    fn horizontal_line_ignores_x() {
        let cs = identity_like(&[]);
        let line = drawing(DrawingKind::HorizontalLine, &[(100.0, 500.0)]);
        let tol = HitTolerance::default();
        assert!(hits(&line, CanvasPoint::new(900.0, 504.0), &cs, &tol));
        assert!(!hits(&line, CanvasPoint::new(100.0, 510.0), &cs, &tol));
    }

    #[test]
    fn rectangle_contains_inflated() {
        let cs = identity_like(&[]);
        let rect = drawing(DrawingKind::Rectangle, &[(100.0, 900.0), (200.0, 800.0)]);
        let tol = HitTolerance::default();
        assert!(hits(&rect, CanvasPoint::new(150.0, 150.0), &cs, &tol));
        assert!(hits(&rect, CanvasPoint::new(95.0, 150.0), &cs, &tol));
        assert!(!hits(&rect, CanvasPoint::new(94.0, 150.0), &cs, &tol));
    }

    #[test]
    fn channel_hits_parallel_edge() {
        let cs = identity_like(&[]);
        let channel = drawing(DrawingKind::Channel, &[(100.0, 900.0), (300.0, 900.0), (200.0, 850.0)]);
        let tol = HitTolerance::default();
        assert!(hits(&channel, CanvasPoint::new(120.0, 150.0), &cs, &tol));
        assert!(hits(&channel, CanvasPoint::new(120.0, 100.0), &cs, &tol));
        assert!(!hits(&channel, CanvasPoint::new(120.0, 125.0), &cs, &tol));
    }

    #[test]
    fn text_uses_radius() {
        let cs = identity_like(&[]);
        let text = drawing(DrawingKind::Text, &[(100.0, 900.0)]);
        let tol = HitTolerance::default();
        assert!(hits(&text, CanvasPoint::new(110.0, 100.0), &cs, &tol));
        assert!(!hits(&text, CanvasPoint::new(113.0, 100.0), &cs, &tol));
    }

    #[test]
    fn anchor_prefers_nearest() {
        let cs = identity_like(&[]);
        let line = drawing(DrawingKind::TrendLine, &[(100.0, 900.0), (104.0, 900.0)]);
        assert_eq!(anchor_at(&line, CanvasPoint::new(103.0, 100.0), &cs, 6.0), Some(1));
        assert_eq!(anchor_at(&line, CanvasPoint::new(150.0, 100.0), &cs, 6.0), None);
    }
}
