use price_chart_canvas::domain::chart::{CanvasPoint, ChartPoint, Rect, Viewport};
use price_chart_canvas::domain::market_data::Candle;
use quickcheck_macros::quickcheck;

const AREA: Rect = Rect { x: 10.0, y: 10.0, width: 990.0, height: 700.0 };

fn rising(count: u64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let base = 100.0 + i as f64;
            Candle::from_values(i * 60_000, base, base + 2.0, base - 2.0, base + 1.0, 1.0)
        })
        .collect()
}

#[quickcheck]
fn zoom_stays_within_bounds(steps: Vec<(f64, f64)>) -> bool {
    let mut viewport = Viewport::new(0.5, 50.0, 1.0);
    steps.into_iter().all(|(pixel_x, delta)| {
        viewport.zoom_at(pixel_x, delta, AREA);
        (0.5..=50.0).contains(&viewport.zoom)
    })
}

#[quickcheck]
fn pixel_mapping_round_trips(px: u16, py: u16, zoom_steps: u8) -> bool {
    let candles = rising(100);
    let mut viewport = Viewport::default();
    for _ in 0..zoom_steps % 8 {
        viewport.zoom_at(400.0, 0.7, AREA);
    }
    let cs = viewport.transform(&candles, AREA, 60_000.0);
    let pixel = CanvasPoint::new(AREA.x + (px % 990) as f64, AREA.y + (py % 700) as f64);
    let back = cs.to_pixel(cs.to_chart_point(pixel));
    (back.x - pixel.x).abs() < 1e-6 && (back.y - pixel.y).abs() < 1e-6
}

#[quickcheck]
fn chart_points_round_trip(index: u8, price_step: u8) -> bool {
    let candles = rising(100);
    let cs = Viewport::default().transform(&candles, AREA, 60_000.0);
    let point = ChartPoint::new(index as f64 * 30_000.0, 90.0 + price_step as f64 * 0.5);
    let back = cs.to_chart_point(cs.to_pixel(point));
    (back.timestamp - point.timestamp).abs() < 1e-3 && (back.price - point.price).abs() < 1e-6
}

#[test]
fn zoom_keeps_point_under_cursor() {
    let candles = rising(100);
    for ratio in [0.1, 0.5, 0.9] {
        let pixel_x = AREA.x + AREA.width * ratio;
        let mut viewport = Viewport::default();
        let before = viewport.transform(&candles, AREA, 60_000.0);
        let time = before.x_to_time(pixel_x);

        assert!(viewport.zoom_at(pixel_x, 1.5, AREA));
        let after = viewport.transform(&candles, AREA, 60_000.0);
        let drift = (after.time_to_x(time) - pixel_x).abs();
        assert!(drift < 1.0, "ratio {ratio}: drift {drift}px");
    }
}

#[test]
fn empty_series_has_empty_visible_range() {
    let viewport = Viewport::default();
    assert!(viewport.visible_range(0, AREA.width).is_empty());
    let cs = viewport.transform(&[], AREA, 60_000.0);
    assert!(cs.price_range().span() > 0.0);
    assert!(cs.price_to_y(50.0).is_finite());
}
