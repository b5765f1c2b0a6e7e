//! JS-facing chart handle.
//!
//! `ChartHandle` owns the controller, one `<canvas>` per layer stacked inside a container
//! element, the DOM listeners, and the async work spawned for effects. All state lives in
//! one `Rc<RefCell<..>>`; callbacks hold weak references so dropping the handle tears
//! everything down.

use crate::application::{ChartController, ChartEffect, HistoryTicket};
use crate::domain::chart::{CanvasPoint, Theme};
use crate::domain::config::ChartConfig;
use crate::domain::drawing::DrawingKind;
use crate::domain::errors::{ChartError, CommitError, ConfigError, DrawingError, FeedError, IndicatorError};
use crate::domain::indicators::{
    DisplayType, IndicatorConfig, IndicatorParams, IndicatorResult, IndicatorResultWire, IndicatorType,
};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, CandleFeed, CandleRecord, HistoryRequest, Symbol, TickOutcome, TimeInterval};
use crate::domain::price_line::{CommitConfirmation, CommitRequest, PriceLine};
use crate::infrastructure::http::BinanceRestClient;
use crate::infrastructure::rendering::{CanvasSurface, FrameScheduler, LayerId, LayerStack};
use crate::{log_debug, log_error, log_info, log_warn};
use futures::future::{self, AbortHandle, Abortable, Either};
use gloo::events::{EventListener, EventListenerOptions};
use gloo::render::{AnimationFrame, request_animation_frame};
use gloo_timers::future::TimeoutFuture;
use js_sys::{Function, Promise};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};
use web_sys::{Event, EventTarget, HtmlCanvasElement, HtmlElement, KeyboardEvent, MouseEvent, WheelEvent};

/// How long a commit promise may stay unsettled before the line rolls back
const COMMIT_TIMEOUT_MS: u32 = 10_000;

struct ChartState {
    controller: ChartController,
    layers: LayerStack<CanvasSurface>,
    scheduler: FrameScheduler,
    frame: Option<AnimationFrame>,
    feed: BinanceRestClient,
    history_abort: Option<AbortHandle>,
    on_commit: Option<Function>,
    on_commit_error: Option<Function>,
    on_click: Option<Function>,
}

type Shared = Rc<RefCell<ChartState>>;

fn js_error(err: impl Into<ChartError>) -> JsValue {
    let err: ChartError = err.into();
    log_warn!(LogComponent::Presentation("ChartHandle"), "{}", err);
    js_sys::Error::new(&err.to_string()).into()
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| js_error(ConfigError::Parse(format!("{what}: {e}"))))
}

fn parse_interval(interval: &str) -> Result<TimeInterval, JsValue> {
    TimeInterval::from_str(interval).map_err(|_| js_error(ConfigError::Invalid(format!("unknown interval {interval}"))))
}

fn parse_candles(json: &str) -> Result<Vec<Candle>, JsValue> {
    let records: Vec<CandleRecord> = parse_json(json, "candles")?;
    Ok(records.into_iter().map(Candle::from).collect())
}

// ---- frame scheduling -----------------------------------------------------------------

/// Move the controller's dirty layers to the scheduler and request a frame if none is pending
fn request_frame(shared: &Shared) {
    let mut state = shared.borrow_mut();
    let dirty = state.controller.take_dirty();
    if !state.scheduler.request(dirty) {
        return;
    }
    let weak = Rc::downgrade(shared);
    // the previous frame already fired; replacing it releases its closure
    state.frame = Some(request_animation_frame(move |_| paint(&weak)));
}

fn paint(weak: &Weak<RefCell<ChartState>>) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let mut guard = shared.borrow_mut();
    let state = &mut *guard;
    let mut dirty = state.scheduler.flush();
    dirty.merge(state.controller.take_dirty());
    let frame = state.controller.frame();
    let painted = state.layers.compose(dirty, &frame);
    log_debug!(LogComponent::Presentation("ChartHandle"), "painted {:?}", painted);
}

// ---- effects --------------------------------------------------------------------------

fn run_effects(shared: &Shared, effects: Vec<ChartEffect>) {
    for effect in effects {
        match effect {
            ChartEffect::CommitPriceLine(request) => spawn_commit(shared, request),
            ChartEffect::ChartClicked { price, timestamp } => {
                let callback = shared.borrow().on_click.clone();
                if let Some(callback) = callback {
                    let called =
                        callback.call2(&JsValue::NULL, &JsValue::from_f64(price), &JsValue::from_f64(timestamp));
                    if let Err(err) = called {
                        log_warn!(LogComponent::Presentation("ChartHandle"), "click handler threw: {}", describe(&err));
                    }
                }
            }
            ChartEffect::FetchHistory(ticket) => spawn_history(shared, ticket),
        }
    }
    request_frame(shared);
}

fn spawn_commit(shared: &Shared, request: CommitRequest) {
    let weak = Rc::downgrade(shared);
    let callback = shared.borrow().on_commit.clone();
    let Some(callback) = callback else {
        settle_commit(&weak, &request, Err(CommitError::Rejected("no commit handler registered".into())));
        return;
    };
    log_info!(
        LogComponent::Presentation("ChartHandle"),
        "committing {} {} at {} (#{})",
        request.position_id,
        request.side,
        request.new_price,
        request.sequence
    );
    let reply = callback.call3(
        &JsValue::NULL,
        &JsValue::from_str(&request.position_id),
        &JsValue::from_str(request.side.as_ref()),
        &JsValue::from_f64(request.new_price),
    );
    spawn_local(async move {
        let outcome = match reply {
            Ok(value) => await_confirmation(value).await,
            Err(err) => Err(CommitError::Rejected(describe(&err))),
        };
        settle_commit(&weak, &request, outcome);
    });
}

async fn await_confirmation(value: JsValue) -> Result<CommitConfirmation, CommitError> {
    let reply = JsFuture::from(Promise::resolve(&value));
    let timeout = TimeoutFuture::new(COMMIT_TIMEOUT_MS);
    match future::select(Box::pin(reply), Box::pin(timeout)).await {
        Either::Left((Ok(value), _)) => {
            let json = js_sys::JSON::stringify(&value)
                .map(String::from)
                .map_err(|e| CommitError::Rejected(describe(&e)))?;
            serde_json::from_str(&json).map_err(|e| CommitError::Rejected(format!("malformed confirmation: {e}")))
        }
        Either::Left((Err(err), _)) => Err(CommitError::Rejected(describe(&err))),
        Either::Right(_) => Err(CommitError::Timeout),
    }
}

fn settle_commit(
    weak: &Weak<RefCell<ChartState>>,
    request: &CommitRequest,
    outcome: Result<CommitConfirmation, CommitError>,
) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let error_callback = {
        let mut state = shared.borrow_mut();
        let settled = match &outcome {
            Ok(confirmation) => state.controller.confirm_commit(request, confirmation),
            Err(err) => state.controller.reject_commit(request, err).map(|_| ()),
        };
        if let Err(err) = settled {
            log_warn!(
                LogComponent::Presentation("ChartHandle"),
                "commit #{} for {} not settled: {}",
                request.sequence,
                request.position_id,
                err
            );
        }
        state.on_commit_error.clone()
    };
    if let Err(err) = outcome {
        log_error!(
            LogComponent::Presentation("ChartHandle"),
            "commit for {} {} failed: {}",
            request.position_id,
            request.side,
            err
        );
        if let Some(callback) = error_callback {
            let called = callback.call3(
                &JsValue::NULL,
                &JsValue::from_str(&request.position_id),
                &JsValue::from_str(request.side.as_ref()),
                &JsValue::from_str(&err.to_string()),
            );
            if let Err(thrown) = called {
                log_warn!(LogComponent::Presentation("ChartHandle"), "commit error handler threw: {}", describe(&thrown));
            }
        }
    }
    request_frame(&shared);
}

fn spawn_history(shared: &Shared, ticket: HistoryTicket) {
    let (handle, registration) = AbortHandle::new_pair();
    let fetch = {
        let mut state = shared.borrow_mut();
        if let Some(previous) = state.history_abort.replace(handle) {
            previous.abort();
        }
        state.feed.fetch(ticket.request.clone())
    };
    let weak = Rc::downgrade(shared);
    spawn_local(async move {
        let Ok(outcome) = Abortable::new(fetch, registration).await else {
            log_debug!(LogComponent::Presentation("ChartHandle"), "history page aborted");
            return;
        };
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let effects = shared.borrow_mut().controller.on_history_page(&ticket, outcome);
        run_effects(&shared, effects);
    });
}

// ---- DOM ------------------------------------------------------------------------------

fn create_layer_canvas(container: &HtmlElement, layer: LayerId, width: f64, height: f64) -> Result<CanvasSurface, JsValue> {
    let canvas: HtmlCanvasElement = gloo::utils::document()
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| JsValue::from_str("canvas element expected"))?;
    canvas.set_attribute("data-layer", layer.as_ref())?;
    let style = canvas.style();
    style.set_property("position", "absolute")?;
    style.set_property("left", "0")?;
    style.set_property("top", "0")?;
    style.set_property("pointer-events", "none")?;
    style.set_property("z-index", &layer.z_index().to_string())?;
    container.append_child(&canvas)?;
    let mut surface = CanvasSurface::new(canvas)?;
    surface.resize(width, height, gloo::utils::window().device_pixel_ratio());
    Ok(surface)
}

fn pointer_position(container: &HtmlElement, event: &MouseEvent) -> CanvasPoint {
    let rect = container.get_bounding_client_rect();
    CanvasPoint::new(event.client_x() as f64 - rect.left(), event.client_y() as f64 - rect.top())
}

type PointerHandler = fn(&mut ChartController, CanvasPoint) -> Vec<ChartEffect>;

fn pointer_listener(shared: &Shared, container: &HtmlElement, target: &EventTarget, name: &'static str, handler: PointerHandler) -> EventListener {
    let weak = Rc::downgrade(shared);
    let container = container.clone();
    EventListener::new(target, name, move |event: &Event| {
        let (Some(shared), Some(mouse)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
            return;
        };
        let pixel = pointer_position(&container, mouse);
        let (effects, cursor) = {
            let mut state = shared.borrow_mut();
            let effects = handler(&mut state.controller, pixel);
            (effects, state.controller.cursor())
        };
        let _ = container.style().set_property("cursor", cursor);
        run_effects(&shared, effects);
    })
}

fn wheel_listener(shared: &Shared, container: &HtmlElement) -> EventListener {
    let weak = Rc::downgrade(shared);
    let target = container.clone();
    EventListener::new_with_options(container, "wheel", EventListenerOptions::enable_prevent_default(), move |event| {
        let (Some(shared), Some(wheel)) = (weak.upgrade(), event.dyn_ref::<WheelEvent>()) else {
            return;
        };
        wheel.prevent_default();
        let pixel = pointer_position(&target, wheel);
        let effects = shared.borrow_mut().controller.on_wheel(pixel.x, wheel.delta_y());
        run_effects(&shared, effects);
    })
}

fn key_listener(shared: &Shared) -> EventListener {
    let weak = Rc::downgrade(shared);
    let window = gloo::utils::window();
    EventListener::new_with_options(&window, "keydown", EventListenerOptions::enable_prevent_default(), move |event| {
        let (Some(shared), Some(key)) = (weak.upgrade(), event.dyn_ref::<KeyboardEvent>()) else {
            return;
        };
        let typing = event
            .target()
            .and_then(|t| t.dyn_into::<HtmlElement>().ok())
            .is_some_and(|el| matches!(el.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT") || el.is_content_editable());
        if typing {
            return;
        }
        let consumed = shared.borrow_mut().controller.on_key(&key.key());
        if consumed {
            key.prevent_default();
            request_frame(&shared);
        }
    })
}

// ---- JS API ---------------------------------------------------------------------------

#[wasm_bindgen]
pub struct ChartHandle {
    state: Shared,
    container: HtmlElement,
    listeners: Vec<EventListener>,
}

#[wasm_bindgen]
impl ChartHandle {
    /// Mount a chart into the element with id `container_id`. `config_json` may be a
    /// partial `ChartConfig` document.
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str, symbol: &str, interval: &str, config_json: Option<String>) -> Result<ChartHandle, JsValue> {
        let config = match config_json {
            Some(json) => ChartConfig::from_json(&json).map_err(js_error)?,
            None => ChartConfig::default(),
        };
        let interval = parse_interval(interval)?;
        let container: HtmlElement = gloo::utils::document()
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id {container_id}")))?
            .dyn_into()
            .map_err(|_| JsValue::from_str("chart container must be an HTML element"))?;
        container.style().set_property("position", "relative")?;
        let (width, height) = (container.client_width() as f64, container.client_height() as f64);

        let layers = LayerStack::try_new(|layer| create_layer_canvas(&container, layer, width, height))?;
        let controller = ChartController::new(config, Symbol::from(symbol), interval, width, height);
        let state = Rc::new(RefCell::new(ChartState {
            controller,
            layers,
            scheduler: FrameScheduler::new(),
            frame: None,
            feed: BinanceRestClient::default(),
            history_abort: None,
            on_commit: None,
            on_commit_error: None,
            on_click: None,
        }));

        let window = gloo::utils::window();
        let listeners = vec![
            pointer_listener(&state, &container, &container, "mousedown", ChartController::on_pointer_down),
            pointer_listener(&state, &container, &container, "mousemove", ChartController::on_pointer_move),
            pointer_listener(&state, &container, &window, "mouseup", ChartController::on_pointer_up),
            pointer_listener(&state, &container, &container, "mouseleave", |controller, _| {
                controller.on_pointer_leave();
                Vec::new()
            }),
            wheel_listener(&state, &container),
            key_listener(&state),
        ];
        log_info!(LogComponent::Presentation("ChartHandle"), "mounted in #{} ({}x{})", container_id, width, height);
        request_frame(&state);
        Ok(ChartHandle { state, container, listeners })
    }

    /// Use another REST endpoint for history pages
    #[wasm_bindgen(js_name = setFeedUrl)]
    pub fn set_feed_url(&self, base_url: &str) {
        self.state.borrow_mut().feed = BinanceRestClient::new(base_url);
    }

    /// Fetch the latest page for the current symbol and show it. Resolves to the candle count.
    pub fn load(&self, limit: Option<u32>) -> Promise {
        let shared = self.state.clone();
        let (fetch, generation) = {
            let state = shared.borrow();
            let request = HistoryRequest {
                symbol: state.controller.symbol().clone(),
                interval: state.controller.interval(),
                end_time: None,
                limit: limit.unwrap_or(state.controller.config().history_page_limit),
            };
            (state.feed.fetch(request), state.controller.history().generation())
        };
        future_to_promise(async move {
            let candles = fetch.await.map_err(js_error)?;
            if shared.borrow().controller.history().generation() != generation {
                return Err(js_error(FeedError::Network("symbol changed during load".into())));
            }
            let effects = shared.borrow_mut().controller.set_candles(candles);
            let count = shared.borrow().controller.series().len();
            run_effects(&shared, effects);
            Ok(JsValue::from_f64(count as f64))
        })
    }

    /// Replace the series with `[{time, open, high, low, close, volume}]`. Returns the kept count.
    #[wasm_bindgen(js_name = setCandles)]
    pub fn set_candles(&self, json: &str) -> Result<usize, JsValue> {
        let candles = parse_candles(json)?;
        let effects = self.state.borrow_mut().controller.set_candles(candles);
        let count = self.state.borrow().controller.series().len();
        run_effects(&self.state, effects);
        Ok(count)
    }

    /// Apply one live candle. Returns false when it was older than the tail or invalid.
    #[wasm_bindgen(js_name = applyTick)]
    pub fn apply_tick(&self, json: &str) -> Result<bool, JsValue> {
        let record: CandleRecord = parse_json(json, "tick")?;
        let outcome = self.state.borrow_mut().controller.apply_tick(record.into());
        request_frame(&self.state);
        Ok(outcome != TickOutcome::Ignored)
    }

    /// Switch market. Pending history is aborted and the view resets.
    #[wasm_bindgen(js_name = setSymbol)]
    pub fn set_symbol(&self, symbol: &str, interval: &str) -> Result<(), JsValue> {
        let interval = parse_interval(interval)?;
        {
            let mut state = self.state.borrow_mut();
            if let Some(handle) = state.history_abort.take() {
                handle.abort();
            }
            state.controller.set_symbol(Symbol::from(symbol), interval);
        }
        request_frame(&self.state);
        Ok(())
    }

    /// Resolves once the first candles for the current symbol are in
    #[wasm_bindgen(js_name = dataReady)]
    pub fn data_ready(&self) -> Promise {
        let ready = self.state.borrow_mut().controller.data_ready();
        future_to_promise(async move {
            ready.await.map(|_| JsValue::TRUE).map_err(|_| JsValue::from_str("symbol changed before data arrived"))
        })
    }

    #[wasm_bindgen(js_name = candleCount)]
    pub fn candle_count(&self) -> usize {
        self.state.borrow().controller.series().len()
    }

    pub fn resize(&self, width: f64, height: f64) {
        {
            let mut state = self.state.borrow_mut();
            let ratio = gloo::utils::window().device_pixel_ratio();
            for (_, surface) in state.layers.surfaces_mut() {
                surface.resize(width, height, ratio);
            }
            state.layers.invalidate();
            state.controller.resize(width, height);
        }
        request_frame(&self.state);
    }

    #[wasm_bindgen(js_name = setTheme)]
    pub fn set_theme(&self, theme: &str) -> Result<(), JsValue> {
        let theme = Theme::from_str(theme).map_err(|_| js_error(ConfigError::Invalid(format!("unknown theme {theme}"))))?;
        self.apply_theme(theme);
        Ok(())
    }

    #[wasm_bindgen(js_name = toggleTheme)]
    pub fn toggle_theme(&self) -> String {
        let theme = self.state.borrow().controller.theme().toggled();
        self.apply_theme(theme);
        theme.to_string()
    }

    fn apply_theme(&self, theme: Theme) {
        {
            let mut state = self.state.borrow_mut();
            state.controller.set_theme(theme);
            state.layers.invalidate();
        }
        request_frame(&self.state);
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&self) {
        self.state.borrow_mut().controller.reset_view();
        request_frame(&self.state);
    }

    // ---- indicators ---------------------------------------------------------------------

    /// Add an indicator by type name (`SMA`, `BOLLINGER_BANDS`, ...). Returns its id.
    #[wasm_bindgen(js_name = addIndicator)]
    pub fn add_indicator(&self, indicator_type: &str) -> Result<String, JsValue> {
        let indicator_type = IndicatorType::from_str(indicator_type)
            .map_err(|_| js_error(IndicatorError::UnknownIndicator(indicator_type.to_string())))?;
        let id = self.state.borrow_mut().controller.add_indicator(indicator_type);
        request_frame(&self.state);
        Ok(id)
    }

    /// Re-add indicators saved with `indicatorConfigs`
    #[wasm_bindgen(js_name = restoreIndicators)]
    pub fn restore_indicators(&self, json: &str) -> Result<(), JsValue> {
        let saved: Vec<IndicatorConfig> = parse_json(json, "indicator configs")?;
        {
            let mut state = self.state.borrow_mut();
            for config in saved {
                state.controller.restore_indicator(config);
            }
        }
        request_frame(&self.state);
        Ok(())
    }

    #[wasm_bindgen(js_name = removeIndicator)]
    pub fn remove_indicator(&self, id: &str) -> Result<(), JsValue> {
        self.state.borrow_mut().controller.remove_indicator(id).map_err(js_error)?;
        request_frame(&self.state);
        Ok(())
    }

    #[wasm_bindgen(js_name = toggleIndicator)]
    pub fn toggle_indicator(&self, id: &str, enabled: bool) -> Result<(), JsValue> {
        self.state.borrow_mut().controller.toggle_indicator(id, enabled).map_err(js_error)?;
        request_frame(&self.state);
        Ok(())
    }

    /// Merge `{name: value}` overrides into the indicator's params
    #[wasm_bindgen(js_name = updateIndicatorParams)]
    pub fn update_indicator_params(&self, id: &str, json: &str) -> Result<(), JsValue> {
        let params: IndicatorParams = parse_json(json, "indicator params")?;
        self.state.borrow_mut().controller.update_indicator_params(id, &params).map_err(js_error)?;
        request_frame(&self.state);
        Ok(())
    }

    #[wasm_bindgen(js_name = setIndicatorDisplay)]
    pub fn set_indicator_display(&self, id: &str, display: &str) -> Result<(), JsValue> {
        let display = DisplayType::from_str(display)
            .map_err(|_| js_error(ConfigError::Invalid(format!("unknown display type {display}"))))?;
        self.state.borrow_mut().controller.set_indicator_display(id, display).map_err(js_error)?;
        request_frame(&self.state);
        Ok(())
    }

    /// Draw an externally computed `{mainLine, additionalLines}` result for `id`
    #[wasm_bindgen(js_name = setIndicatorResult)]
    pub fn set_indicator_result(&self, id: &str, json: &str) -> Result<(), JsValue> {
        let wire: IndicatorResultWire = parse_json(json, "indicator result")?;
        {
            let mut state = self.state.borrow_mut();
            let result = IndicatorResult::from_wire(wire, state.controller.series().candles());
            state.controller.set_indicator_result(id, result).map_err(js_error)?;
        }
        request_frame(&self.state);
        Ok(())
    }

    #[wasm_bindgen(js_name = clearIndicators)]
    pub fn clear_indicators(&self) {
        self.state.borrow_mut().controller.clear_indicators();
        request_frame(&self.state);
    }

    #[wasm_bindgen(js_name = indicatorConfigs)]
    pub fn indicator_configs(&self) -> Result<String, JsValue> {
        let state = self.state.borrow();
        serde_json::to_string(state.controller.indicators().configs())
            .map_err(|e| js_error(ConfigError::Parse(e.to_string())))
    }

    // ---- drawings -----------------------------------------------------------------------

    /// Arm a drawing tool (`trendLine`, `fibonacci`, ...) or disarm with `undefined`
    #[wasm_bindgen(js_name = setDrawingTool)]
    pub fn set_drawing_tool(&self, tool: Option<String>) -> Result<(), JsValue> {
        let tool = tool
            .map(|name| DrawingKind::from_str(&name).map_err(|_| js_error(DrawingError::InvalidState(format!("unknown tool {name}")))))
            .transpose()?;
        self.state.borrow_mut().controller.set_drawing_tool(tool);
        request_frame(&self.state);
        Ok(())
    }

    /// Text placed by the next text drawing
    #[wasm_bindgen(js_name = setPendingText)]
    pub fn set_pending_text(&self, text: &str) {
        self.state.borrow_mut().controller.edit_drawings(|drawings| drawings.set_pending_text(text));
    }

    #[wasm_bindgen(js_name = selectedDrawing)]
    pub fn selected_drawing(&self) -> Option<String> {
        self.state.borrow().controller.drawings().state().selected_id.clone()
    }

    #[wasm_bindgen(js_name = deleteDrawing)]
    pub fn delete_drawing(&self, id: &str) -> Result<(), JsValue> {
        self.edit_drawing(|drawings| drawings.delete(id).map(|_| ()))
    }

    #[wasm_bindgen(js_name = setDrawingLocked)]
    pub fn set_drawing_locked(&self, id: &str, locked: bool) -> Result<(), JsValue> {
        self.edit_drawing(|drawings| drawings.set_locked(id, locked))
    }

    #[wasm_bindgen(js_name = setDrawingVisible)]
    pub fn set_drawing_visible(&self, id: &str, visible: bool) -> Result<(), JsValue> {
        self.edit_drawing(|drawings| drawings.set_visible(id, visible))
    }

    #[wasm_bindgen(js_name = bringDrawingToFront)]
    pub fn bring_drawing_to_front(&self, id: &str) -> Result<(), JsValue> {
        self.edit_drawing(|drawings| drawings.bring_to_front(id))
    }

    #[wasm_bindgen(js_name = clearDrawings)]
    pub fn clear_drawings(&self) {
        self.state.borrow_mut().controller.edit_drawings(|drawings| drawings.clear_all());
        request_frame(&self.state);
    }

    fn edit_drawing(
        &self,
        edit: impl FnOnce(&mut crate::domain::drawing::DrawingManager) -> Result<(), DrawingError>,
    ) -> Result<(), JsValue> {
        let result = self.state.borrow_mut().controller.edit_drawings(edit);
        request_frame(&self.state);
        result.map_err(js_error)
    }

    #[wasm_bindgen(js_name = exportDrawings)]
    pub fn export_drawings(&self) -> Result<String, JsValue> {
        let now = js_sys::Date::now() as u64;
        self.state.borrow().controller.export_drawings(now).map_err(js_error)
    }

    /// Replace all drawings. On error the current drawings are kept.
    #[wasm_bindgen(js_name = importDrawings)]
    pub fn import_drawings(&self, json: &str) -> Result<usize, JsValue> {
        let count = self.state.borrow_mut().controller.import_drawings(json).map_err(js_error)?;
        request_frame(&self.state);
        Ok(count)
    }

    // ---- price lines & callbacks --------------------------------------------------------

    /// Replace the lines with `[{price, positionId, side}]`
    #[wasm_bindgen(js_name = setPriceLines)]
    pub fn set_price_lines(&self, json: &str) -> Result<(), JsValue> {
        let lines: Vec<PriceLine> = parse_json(json, "price lines")?;
        self.state.borrow_mut().controller.set_price_lines(lines);
        request_frame(&self.state);
        Ok(())
    }

    /// `(positionId, side, newPrice) => Promise<{confirmedPrice, orderId}>`
    #[wasm_bindgen(js_name = onCommit)]
    pub fn on_commit(&self, callback: Function) {
        self.state.borrow_mut().on_commit = Some(callback);
    }

    /// `(positionId, side, message) => void`, called after a commit was rolled back
    #[wasm_bindgen(js_name = onCommitError)]
    pub fn on_commit_error(&self, callback: Function) {
        self.state.borrow_mut().on_commit_error = Some(callback);
    }

    /// `(price, timestamp) => void`
    #[wasm_bindgen(js_name = onChartClick)]
    pub fn on_chart_click(&self, callback: Function) {
        self.state.borrow_mut().on_click = Some(callback);
    }

    /// Remove listeners and canvases. The handle is inert afterwards.
    pub fn destroy(&mut self) {
        self.listeners.clear();
        let mut state = self.state.borrow_mut();
        if let Some(handle) = state.history_abort.take() {
            handle.abort();
        }
        state.frame = None;
        for (_, surface) in state.layers.surfaces_mut() {
            surface.canvas().remove();
        }
        let _ = self.container.style().remove_property("cursor");
        log_info!(LogComponent::Presentation("ChartHandle"), "destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_line::PriceLineSide;
    use js_sys::{Array, Reflect};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn mounted(id: &str) -> ChartHandle {
        let document = gloo::utils::document();
        let container: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        container.set_id(id);
        container.style().set_property("width", "800px").unwrap();
        container.style().set_property("height", "600px").unwrap();
        gloo::utils::body().append_child(&container).unwrap();
        ChartHandle::new(id, "BTCUSDT", "1m", None).unwrap()
    }

    fn stop_loss_request() -> CommitRequest {
        CommitRequest { position_id: "p1".into(), side: PriceLineSide::StopLoss, new_price: 49_800.0, sequence: 1 }
    }

    #[wasm_bindgen_test]
    fn commit_error_reports_position_and_side() {
        let handle = mounted("commit-error-args");
        handle.on_commit_error(Function::new_with_args(
            "id, side, message",
            "globalThis.commitErrorArgs = [id, side, message];",
        ));
        settle_commit(&Rc::downgrade(&handle.state), &stop_loss_request(), Err(CommitError::Timeout));

        let args: Array = Reflect::get(&js_sys::global(), &JsValue::from_str("commitErrorArgs")).unwrap().unchecked_into();
        assert_eq!(args.get(0).as_string().as_deref(), Some("p1"));
        assert_eq!(args.get(1).as_string().as_deref(), Some("stopLoss"));
        assert_eq!(args.get(2).as_string(), Some(CommitError::Timeout.to_string()));
    }

    #[wasm_bindgen_test]
    fn throwing_commit_error_handler_is_contained() {
        let handle = mounted("commit-error-throws");
        handle.on_commit_error(Function::new_no_args("throw new Error('handler failed');"));
        settle_commit(&Rc::downgrade(&handle.state), &stop_loss_request(), Err(CommitError::Timeout));
        assert_eq!(handle.candle_count(), 0);
    }
}
