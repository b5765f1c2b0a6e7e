use futures::executor::block_on;
use price_chart_canvas::application::{ChartController, ChartEffect};
use price_chart_canvas::domain::chart::CanvasPoint;
use price_chart_canvas::domain::config::ChartConfig;
use price_chart_canvas::domain::drawing::DrawingKind;
use price_chart_canvas::domain::errors::{CommitError, DrawingError};
use price_chart_canvas::domain::indicators::IndicatorType;
use price_chart_canvas::domain::market_data::{
    Candle, CandleFeed, HistoryRequest, StaticCandleFeed, Symbol, TimeInterval,
};
use price_chart_canvas::domain::price_line::{CommitConfirmation, PriceLine, PriceLineKey, PriceLineSide};

fn chart() -> ChartController {
    ChartController::new(ChartConfig::default(), Symbol::from("btcusdt"), TimeInterval::OneMinute, 1070.0, 738.0)
}

fn candles(range: std::ops::RangeInclusive<u64>, close: impl Fn(u64) -> f64) -> Vec<Candle> {
    range
        .map(|i| {
            let c = close(i);
            Candle::from_values(i * 60_000, c, c + 1.0, c - 1.0, c, 1.0)
        })
        .collect()
}

fn history_tickets(effects: Vec<ChartEffect>) -> Vec<price_chart_canvas::application::HistoryTicket> {
    effects
        .into_iter()
        .filter_map(|effect| match effect {
            ChartEffect::FetchHistory(ticket) => Some(ticket),
            _ => None,
        })
        .collect()
}

#[test]
fn history_pages_until_the_feed_runs_dry() {
    let feed = StaticCandleFeed::new(candles(1..=600, |i| 100.0 + i as f64));
    let mut chart = chart();
    let latest = block_on(feed.fetch(HistoryRequest {
        symbol: chart.symbol().clone(),
        interval: chart.interval(),
        end_time: None,
        limit: 100,
    }))
    .unwrap();

    let mut pending = history_tickets(chart.set_candles(latest));
    assert_eq!(chart.series().len(), 100);
    let mut pages = 0;
    while let Some(ticket) = pending.pop() {
        pages += 1;
        assert!(pages < 10, "history never settled");
        let page = block_on(feed.fetch(ticket.request.clone()));
        pending.extend(history_tickets(chart.on_history_page(&ticket, page)));
        if pending.is_empty() && !chart.history().is_exhausted() {
            // scroll back to the oldest candle to ask for more
            pending.extend(history_tickets(chart.pan_by(1.0e7, 0.0)));
        }
    }
    assert_eq!(chart.series().len(), 600);
    assert!(chart.history().is_exhausted());
    assert_eq!(chart.series().first().map(Candle::time), Some(60_000));
}

#[test]
fn sma_twenty_over_closes_one_to_hundred() {
    let mut chart = chart();
    chart.set_candles(candles(1..=100, |i| i as f64));
    chart.add_indicator(IndicatorType::Sma);

    let computed = &chart.indicator_frame().indicators[0];
    let line = computed.result.lines().next().unwrap();
    assert_eq!(line.value_at(19, 100), Some(10.5));
    assert_eq!(line.value_at(18, 100), None);
    assert!(computed.panel.is_none());
}

#[test]
fn adding_then_removing_an_indicator_restores_the_rendered_set() {
    let mut chart = chart();
    chart.set_candles(candles(1..=100, |i| 100.0 + (i as f64).sin()));
    chart.add_indicator(IndicatorType::Ema);
    let before = chart.indicators().rendered_ids();

    let id = chart.add_indicator(IndicatorType::Macd);
    assert_eq!(chart.indicators().rendered_ids().len(), before.len() + 1);
    chart.remove_indicator(&id).unwrap();
    assert_eq!(chart.indicators().rendered_ids(), before);
    assert_eq!(chart.indicator_frame().disposed, vec![id]);
}

#[test]
fn drawing_points_complete_at_cardinality() {
    let mut chart = chart();
    chart.set_candles(candles(1..=100, |i| 100.0 + i as f64));
    chart.set_drawing_tool(Some(DrawingKind::Channel));

    for (n, x) in [200.0, 400.0, 300.0].into_iter().enumerate() {
        assert_eq!(chart.drawings().drawings().len(), 0, "completed early at point {n}");
        chart.on_pointer_down(CanvasPoint::new(x, 300.0 + n as f64 * 20.0));
        chart.on_pointer_up(CanvasPoint::new(x, 300.0 + n as f64 * 20.0));
    }
    assert_eq!(chart.drawings().drawings().len(), 1);
    assert!(chart.drawings().state().temp_points.is_empty());
}

#[test]
fn hit_test_respects_tolerance() {
    let mut chart = chart();
    chart.set_candles(candles(1..=100, |i| 100.0 + i as f64));
    chart.set_drawing_tool(Some(DrawingKind::HorizontalLine));
    chart.on_pointer_down(CanvasPoint::new(300.0, 200.0));
    chart.on_pointer_up(CanvasPoint::new(300.0, 200.0));
    let id = chart.drawings().drawings()[0].id.clone();

    let cs = chart.coordinate_system();
    assert_eq!(chart.drawings().hit_test(CanvasPoint::new(600.0, 204.5), &cs), Some(id));
    assert_eq!(chart.drawings().hit_test(CanvasPoint::new(600.0, 206.0), &cs), None);
}

#[test]
fn malformed_import_keeps_existing_drawings() {
    let mut chart = chart();
    chart.set_candles(candles(1..=100, |i| 100.0 + i as f64));
    chart.set_drawing_tool(Some(DrawingKind::VerticalLine));
    chart.on_pointer_down(CanvasPoint::new(300.0, 200.0));
    chart.on_pointer_up(CanvasPoint::new(300.0, 200.0));
    let exported = chart.export_drawings(42).unwrap();

    let err = chart.import_drawings(r#"{"version":"1.0","drawings":{},"timestamp":1}"#).unwrap_err();
    assert!(matches!(err, DrawingError::Import(_)));
    assert_eq!(chart.drawings().drawings().len(), 1);

    let mut other = self::chart();
    assert_eq!(other.import_drawings(&exported), Ok(1));
    assert_eq!(other.drawings().drawings(), chart.drawings().drawings());
}

#[test]
fn stop_loss_commit_confirms_or_rolls_back() {
    let mut chart = chart();
    chart.set_candles(candles(1..=100, |_| 50_000.0));
    chart.set_price_lines(vec![PriceLine {
        price: 50_000.0,
        position_id: "p1".into(),
        side: PriceLineSide::StopLoss,
    }]);
    let key = PriceLineKey { position_id: "p1".into(), side: PriceLineSide::StopLoss };

    let drag_to = |chart: &mut ChartController, price: f64| {
        let from = chart.coordinate_system().price_to_y(chart.price_lines().display_price(&key).unwrap());
        let to = chart.coordinate_system().price_to_y(price);
        chart.on_pointer_down(CanvasPoint::new(500.0, from));
        chart.on_pointer_move(CanvasPoint::new(500.0, to));
        chart.on_pointer_up(CanvasPoint::new(500.0, to))
    };

    let effects = drag_to(&mut chart, 49_999.5);
    let [ChartEffect::CommitPriceLine(request)] = effects.as_slice() else {
        panic!("expected one commit, got {effects:?}");
    };
    let restored = chart.reject_commit(request, &CommitError::Timeout).unwrap();
    assert_eq!(restored, 50_000.0);
    assert_eq!(chart.price_lines().display_price(&key), Some(50_000.0));

    let effects = drag_to(&mut chart, 50_000.5);
    let [ChartEffect::CommitPriceLine(request)] = effects.as_slice() else {
        panic!("expected one commit, got {effects:?}");
    };
    chart
        .confirm_commit(request, &CommitConfirmation { confirmed_price: 50_000.5, order_id: "o-1".into() })
        .unwrap();
    assert_eq!(chart.price_lines().display_price(&key), Some(50_000.5));
    assert_eq!(
        chart.confirm_commit(request, &CommitConfirmation { confirmed_price: 1.0, order_id: String::new() }),
        Err(CommitError::NotPending("p1".into()))
    );
}
