//! The chart's single owner of state.
//!
//! `ChartController` holds the candle series, viewport, indicator engine, drawing manager
//! and price lines. Input handlers mutate that state, mark the layers that need a repaint,
//! and return `ChartEffect`s for the binding layer to run (commits, clicks, history
//! fetches). Nothing here touches the browser.

use super::data_ready::DataReadySignal;
use super::history_loader::{HistoryLoader, HistoryPage, HistoryTicket};
use crate::domain::chart::{CanvasPoint, ChartLayout, ChartPoint, CoordinateSystem, Palette, Theme, Viewport};
use crate::domain::config::ChartConfig;
use crate::domain::drawing::{DrawingKind, DrawingManager, HitTolerance, InteractionState};
use crate::domain::errors::{CommitError, DrawingError, FeedError, IndicatorError};
use crate::domain::indicators::{
    DisplayType, IndicatorConfig, IndicatorEngine, IndicatorFrame, IndicatorParams, IndicatorResult, IndicatorType,
};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, CandleSeries, DataValidationService, Symbol, TickOutcome, TimeInterval};
use crate::domain::price_line::{CommitConfirmation, CommitRequest, PriceLine, PriceLineController};
use crate::infrastructure::rendering::{DirtyLayers, FrameInput, LayerId};
use crate::{log_debug, log_info, log_warn};
use futures::channel::oneshot;

/// Work the binding layer must carry out after an input
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEffect {
    /// A price line was dropped at a new price
    CommitPriceLine(CommitRequest),
    /// Press and release without dragging inside the price pane
    ChartClicked { price: f64, timestamp: f64 },
    /// Load the next page of older candles
    FetchHistory(HistoryTicket),
}

/// What the current press is doing
#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerMode {
    Idle,
    Panning { origin: CanvasPoint, last: CanvasPoint },
    PriceLine,
    Drawing,
}

pub struct ChartController {
    config: ChartConfig,
    symbol: Symbol,
    interval: TimeInterval,
    series: CandleSeries,
    validator: DataValidationService,
    viewport: Viewport,
    indicators: IndicatorEngine,
    indicator_frame: IndicatorFrame,
    drawings: DrawingManager,
    price_lines: PriceLineController,
    theme: Theme,
    palette: Palette,
    layout: ChartLayout,
    crosshair: Option<CanvasPoint>,
    drawing_preview: Option<ChartPoint>,
    pointer: PointerMode,
    dirty: DirtyLayers,
    history: HistoryLoader,
    data_ready: DataReadySignal,
}

impl ChartController {
    pub fn new(config: ChartConfig, symbol: Symbol, interval: TimeInterval, width: f64, height: f64) -> Self {
        log_info!(
            LogComponent::Application("ChartController"),
            "creating chart {} {} ({}x{})",
            symbol,
            interval,
            width,
            height
        );
        Self {
            symbol,
            interval,
            series: CandleSeries::new(),
            validator: DataValidationService::new(),
            viewport: Viewport::from_config(&config),
            indicators: IndicatorEngine::new(config.max_sub_panels),
            indicator_frame: IndicatorFrame::default(),
            drawings: DrawingManager::new(HitTolerance::from_config(&config)),
            price_lines: PriceLineController::from_config(&config),
            theme: config.theme,
            palette: config.theme.palette(),
            layout: ChartLayout::new(width, height, config.margins),
            crosshair: None,
            drawing_preview: None,
            pointer: PointerMode::Idle,
            dirty: DirtyLayers::all(),
            history: HistoryLoader::from_config(&config),
            data_ready: DataReadySignal::new(),
            config,
        }
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn indicators(&self) -> &IndicatorEngine {
        &self.indicators
    }

    pub fn indicator_frame(&self) -> &IndicatorFrame {
        &self.indicator_frame
    }

    pub fn drawings(&self) -> &DrawingManager {
        &self.drawings
    }

    pub fn price_lines(&self) -> &PriceLineController {
        &self.price_lines
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn layout(&self) -> ChartLayout {
        self.layout
    }

    pub fn history(&self) -> &HistoryLoader {
        &self.history
    }

    /// Transform for the current state, valid until the next mutation
    pub fn coordinate_system(&self) -> CoordinateSystem<'_> {
        self.viewport.transform(self.series.candles(), self.layout.price_pane(), self.interval.duration_ms() as f64)
    }

    /// Snapshot for the layer renderers
    pub fn frame(&self) -> FrameInput<'_> {
        FrameInput {
            cs: self.coordinate_system(),
            layout: self.layout,
            palette: &self.palette,
            theme: self.theme,
            intraday: self.interval.is_intraday(),
            config: &self.config,
            indicators: &self.indicator_frame,
            drawings: &self.drawings,
            drawing_preview: self.drawing_preview,
            price_lines: &self.price_lines,
            crosshair: self.crosshair,
        }
    }

    /// Layers changed since the last call
    pub fn take_dirty(&mut self) -> DirtyLayers {
        self.dirty.take()
    }

    fn invalidate(&mut self, layers: &[LayerId]) {
        self.dirty.merge(DirtyLayers::of(layers));
    }

    fn invalidate_all(&mut self) {
        self.dirty = DirtyLayers::all();
    }

    /// Resolves once the first non-empty batch for the current symbol has arrived
    pub fn data_ready(&mut self) -> oneshot::Receiver<()> {
        self.data_ready.subscribe()
    }

    // ---- data -------------------------------------------------------------------------

    /// Replace the series with a fresh batch. Invalid candles are dropped.
    pub fn set_candles(&mut self, candles: Vec<Candle>) -> Vec<ChartEffect> {
        let candles = self.validator.filter_valid(candles);
        self.series.set_candles(candles);
        log_debug!(LogComponent::Application("ChartController"), "series now {} candles", self.series.len());
        self.after_data_change();
        self.check_history().into_iter().collect()
    }

    /// Live update on the tail
    pub fn apply_tick(&mut self, candle: Candle) -> TickOutcome {
        if let Err(defect) = self.validator.check(&candle) {
            log_warn!(LogComponent::Application("ChartController"), "tick at {} dropped: {:?}", candle.time(), defect);
            return TickOutcome::Ignored;
        }
        let outcome = self.series.apply_tick(candle);
        if outcome != TickOutcome::Ignored {
            self.after_data_change();
        }
        outcome
    }

    fn after_data_change(&mut self) {
        self.refresh_indicators();
        if !self.series.is_empty() && self.data_ready.fire() {
            log_info!(LogComponent::Application("ChartController"), "data ready for {}", self.symbol);
        }
        self.invalidate_all();
    }

    /// Switch market: viewport, series, history state and readiness reset together
    pub fn set_symbol(&mut self, symbol: Symbol, interval: TimeInterval) {
        log_info!(LogComponent::Application("ChartController"), "switching to {} {}", symbol, interval);
        self.symbol = symbol;
        self.interval = interval;
        self.history.reset();
        self.series.clear();
        self.viewport.reset();
        self.data_ready.reset();
        self.pointer = PointerMode::Idle;
        self.crosshair = None;
        self.price_lines.cancel_drag();
        self.refresh_indicators();
        self.invalidate_all();
    }

    /// Apply a resolved history page
    pub fn on_history_page(
        &mut self,
        ticket: &HistoryTicket,
        outcome: Result<Vec<Candle>, FeedError>,
    ) -> Vec<ChartEffect> {
        let oldest = self.series.first().map(Candle::time);
        match self.history.resolve(ticket, outcome, oldest) {
            HistoryPage::Stale | HistoryPage::Exhausted => Vec::new(),
            HistoryPage::Candles(candles) => {
                let candles = self.validator.filter_valid(candles);
                let old_count = self.series.len();
                let added = self.series.prepend_history(candles);
                if added == 0 {
                    self.history.mark_exhausted();
                    return Vec::new();
                }
                self.viewport.adjust_for_prepend(old_count, added, self.layout.price_pane().width);
                log_debug!(LogComponent::Application("ChartController"), "prepended {} candles", added);
                self.after_data_change();
                self.check_history().into_iter().collect()
            }
        }
    }

    fn check_history(&mut self) -> Option<ChartEffect> {
        let first_visible = self.coordinate_system().visible.start;
        let oldest = self.series.first().map(Candle::time);
        self.history
            .maybe_request(&self.symbol, self.interval, first_visible, oldest)
            .map(ChartEffect::FetchHistory)
    }

    fn refresh_indicators(&mut self) {
        self.indicator_frame = self.indicators.update(&self.series);
        let panels = self.indicator_frame.panel_count();
        if panels != self.layout.sub_panels {
            self.layout = self.layout.with_sub_panels(panels, self.config.sub_panel_ratio);
            self.invalidate_all();
        } else {
            self.invalidate(&[LayerId::Indicators]);
        }
    }

    // ---- view -------------------------------------------------------------------------

    pub fn resize(&mut self, width: f64, height: f64) {
        self.layout = ChartLayout::new(width, height, self.config.margins)
            .with_sub_panels(self.layout.sub_panels, self.config.sub_panel_ratio);
        self.invalidate_all();
    }

    /// Repaint with another palette; data is untouched
    pub fn set_theme(&mut self, theme: Theme) {
        if theme != self.theme {
            self.theme = theme;
            self.palette = theme.palette();
            self.invalidate_all();
        }
    }

    pub fn zoom_at(&mut self, pixel_x: f64, delta: f64) -> Vec<ChartEffect> {
        if self.viewport.zoom_at(pixel_x, delta, self.layout.price_pane()) {
            self.invalidate_all();
        }
        self.check_history().into_iter().collect()
    }

    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) -> Vec<ChartEffect> {
        self.viewport.pan_by(delta_x, delta_y);
        self.invalidate_all();
        self.check_history().into_iter().collect()
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
        self.invalidate_all();
    }

    // ---- input ------------------------------------------------------------------------

    pub fn on_pointer_down(&mut self, pixel: CanvasPoint) -> Vec<ChartEffect> {
        if !self.layout.plot_area().contains(pixel) || self.series.is_empty() {
            return Vec::new();
        }
        let cs = self.viewport.transform(
            self.series.candles(),
            self.layout.price_pane(),
            self.interval.duration_ms() as f64,
        );

        if self.price_lines.on_pointer_down(pixel.y, &cs) {
            self.pointer = PointerMode::PriceLine;
            self.invalidate(&[LayerId::PriceLines]);
            return Vec::new();
        }

        let point = cs.to_chart_point(pixel);
        if self.drawings.state().interaction == InteractionState::Creating {
            match self.drawings.add_point(point) {
                Ok(Some(id)) => {
                    self.drawing_preview = None;
                    log_debug!(LogComponent::Application("ChartController"), "drawing {} placed", id);
                }
                Ok(None) => {}
                Err(err) => {
                    log_warn!(LogComponent::Application("ChartController"), "add point failed: {}", err);
                }
            }
            self.pointer = PointerMode::Idle;
            self.invalidate(&[LayerId::Drawings]);
            return Vec::new();
        }

        if let Some((_, anchor)) = self.drawings.hit_test_anchor(pixel, &cs) {
            if self.drawings.begin_resize(anchor).is_ok() {
                self.pointer = PointerMode::Drawing;
                self.invalidate(&[LayerId::Drawings]);
                return Vec::new();
            }
        }

        let hit = self.drawings.hit_test(pixel, &cs);
        let had_selection = self.drawings.state().selected_id.is_some();
        self.pointer = match hit {
            Some(id) => {
                let grabbed = self.drawings.select(Some(&id)).and_then(|_| self.drawings.begin_drag(point));
                self.invalidate(&[LayerId::Drawings]);
                match grabbed {
                    Ok(()) => PointerMode::Drawing,
                    // locked drawings are selectable but pan the chart
                    Err(_) => PointerMode::Panning { origin: pixel, last: pixel },
                }
            }
            None => {
                if had_selection {
                    let _ = self.drawings.select(None);
                    self.invalidate(&[LayerId::Drawings]);
                }
                PointerMode::Panning { origin: pixel, last: pixel }
            }
        };
        Vec::new()
    }

    pub fn on_pointer_move(&mut self, pixel: CanvasPoint) -> Vec<ChartEffect> {
        let crosshair = self.layout.plot_area().contains(pixel).then_some(pixel);
        if crosshair != self.crosshair {
            self.crosshair = crosshair;
            self.invalidate(&[LayerId::Crosshair]);
        }
        if self.series.is_empty() {
            return Vec::new();
        }

        match self.pointer {
            PointerMode::PriceLine => {
                let cs = self.viewport.transform(
                    self.series.candles(),
                    self.layout.price_pane(),
                    self.interval.duration_ms() as f64,
                );
                let y = pixel.y.clamp(cs.area.y, cs.area.bottom());
                if self.price_lines.on_pointer_move(y, &cs) {
                    self.invalidate(&[LayerId::PriceLines]);
                }
                Vec::new()
            }
            PointerMode::Drawing => {
                let point = self.coordinate_system().to_chart_point(pixel);
                if self.drawings.drag_to(point).is_ok() {
                    self.invalidate(&[LayerId::Drawings]);
                }
                Vec::new()
            }
            PointerMode::Panning { origin, last } => {
                self.pointer = PointerMode::Panning { origin, last: pixel };
                self.pan_by(pixel.x - last.x, pixel.y - last.y)
            }
            PointerMode::Idle => {
                self.update_hover(pixel);
                Vec::new()
            }
        }
    }

    fn update_hover(&mut self, pixel: CanvasPoint) {
        let cs = self.viewport.transform(
            self.series.candles(),
            self.layout.price_pane(),
            self.interval.duration_ms() as f64,
        );
        let mut layers = Vec::new();
        if self.price_lines.hover(Some(pixel.y), &cs) {
            layers.push(LayerId::PriceLines);
        }
        if self.drawings.update_hover(pixel, &cs) {
            layers.push(LayerId::Drawings);
        }
        if self.drawings.state().active_tool.is_some() {
            self.drawing_preview = Some(cs.to_chart_point(pixel));
            layers.push(LayerId::Drawings);
        }
        self.invalidate(&layers);
    }

    pub fn on_pointer_up(&mut self, pixel: CanvasPoint) -> Vec<ChartEffect> {
        let mode = std::mem::replace(&mut self.pointer, PointerMode::Idle);
        match mode {
            PointerMode::PriceLine => {
                self.invalidate(&[LayerId::PriceLines]);
                self.price_lines.on_pointer_up().map(ChartEffect::CommitPriceLine).into_iter().collect()
            }
            PointerMode::Drawing => {
                self.drawings.end_interaction();
                self.invalidate(&[LayerId::Drawings]);
                Vec::new()
            }
            PointerMode::Panning { origin, .. } => {
                let cs = self.coordinate_system();
                let is_click = origin.distance_to(pixel) <= self.config.click_slop_px && cs.area.contains(pixel);
                if !is_click {
                    return Vec::new();
                }
                let point = cs.to_chart_point(pixel);
                vec![ChartEffect::ChartClicked { price: point.price, timestamp: point.timestamp }]
            }
            PointerMode::Idle => Vec::new(),
        }
    }

    /// Pointer left the canvas: hide the crosshair, drop hover, abandon drags
    pub fn on_pointer_leave(&mut self) {
        self.crosshair = None;
        self.drawing_preview = None;
        let cs = self.viewport.transform(
            self.series.candles(),
            self.layout.price_pane(),
            self.interval.duration_ms() as f64,
        );
        self.price_lines.hover(None, &cs);
        self.price_lines.cancel_drag();
        self.drawings.clear_hover();
        if self.pointer == PointerMode::Drawing {
            self.drawings.cancel();
        }
        self.pointer = PointerMode::Idle;
        self.invalidate(&[LayerId::Crosshair, LayerId::Drawings, LayerId::PriceLines]);
    }

    /// Wheel over the chart: zoom around the pointer, proportional to the current zoom
    pub fn on_wheel(&mut self, pixel_x: f64, delta_y: f64) -> Vec<ChartEffect> {
        if !delta_y.is_finite() || delta_y == 0.0 {
            return Vec::new();
        }
        let delta = -delta_y * self.config.wheel_zoom_sensitivity * self.viewport.zoom;
        self.zoom_at(pixel_x, delta)
    }

    /// Keyboard shortcuts. Returns true when the key was consumed.
    pub fn on_key(&mut self, key: &str) -> bool {
        match key {
            "Escape" => {
                if self.price_lines.cancel_drag() {
                    self.invalidate(&[LayerId::PriceLines]);
                } else {
                    self.drawings.cancel();
                    self.drawing_preview = None;
                    self.invalidate(&[LayerId::Drawings]);
                }
                self.pointer = PointerMode::Idle;
                true
            }
            "Delete" | "Backspace" => {
                let Some(id) = self.drawings.state().selected_id.clone() else {
                    return false;
                };
                match self.drawings.delete(&id) {
                    Ok(_) => {
                        self.invalidate(&[LayerId::Drawings]);
                        true
                    }
                    Err(err) => {
                        log_warn!(LogComponent::Application("ChartController"), "delete refused: {}", err);
                        false
                    }
                }
            }
            _ => false,
        }
    }

    /// CSS cursor for the current hover/drag state
    pub fn cursor(&self) -> &'static str {
        let state = self.drawings.state();
        match self.pointer {
            PointerMode::PriceLine => "ns-resize",
            PointerMode::Drawing => "grabbing",
            PointerMode::Panning { .. } => "grab",
            PointerMode::Idle if state.active_tool.is_some() => "crosshair",
            PointerMode::Idle if self.price_lines.hovered().is_some() => "ns-resize",
            PointerMode::Idle if state.hovered_anchor.is_some() => "move",
            PointerMode::Idle if state.hovered_id.is_some() => "pointer",
            PointerMode::Idle => "crosshair",
        }
    }

    // ---- indicators -------------------------------------------------------------------

    pub fn add_indicator(&mut self, indicator_type: IndicatorType) -> String {
        let id = self.indicators.add(indicator_type);
        self.refresh_indicators();
        id
    }

    pub fn restore_indicator(&mut self, saved: IndicatorConfig) {
        self.indicators.restore(saved);
        self.refresh_indicators();
    }

    pub fn remove_indicator(&mut self, id: &str) -> Result<IndicatorConfig, IndicatorError> {
        let removed = self.indicators.remove(id)?;
        self.refresh_indicators();
        Ok(removed)
    }

    pub fn toggle_indicator(&mut self, id: &str, enabled: bool) -> Result<(), IndicatorError> {
        self.indicators.toggle(id, enabled)?;
        self.refresh_indicators();
        Ok(())
    }

    pub fn update_indicator_params(&mut self, id: &str, params: &IndicatorParams) -> Result<(), IndicatorError> {
        self.indicators.update_params(id, params)?;
        self.refresh_indicators();
        Ok(())
    }

    pub fn set_indicator_display(&mut self, id: &str, display_type: DisplayType) -> Result<(), IndicatorError> {
        self.indicators.set_display_type(id, display_type)?;
        self.refresh_indicators();
        Ok(())
    }

    /// Render an externally computed result for `id`
    pub fn set_indicator_result(&mut self, id: &str, result: IndicatorResult) -> Result<(), IndicatorError> {
        self.indicators.set_precomputed(id, result)?;
        self.refresh_indicators();
        Ok(())
    }

    pub fn clear_indicators(&mut self) {
        self.indicators.clear_all();
        self.refresh_indicators();
    }

    // ---- drawings ---------------------------------------------------------------------

    pub fn set_drawing_tool(&mut self, tool: Option<DrawingKind>) {
        self.drawings.set_active_tool(tool);
        self.drawing_preview = None;
        self.invalidate(&[LayerId::Drawings]);
    }

    /// Run a mutation on the drawing manager and schedule a drawings repaint
    pub fn edit_drawings<R>(&mut self, edit: impl FnOnce(&mut DrawingManager) -> R) -> R {
        let result = edit(&mut self.drawings);
        self.invalidate(&[LayerId::Drawings]);
        result
    }

    pub fn export_drawings(&self, timestamp: u64) -> Result<String, DrawingError> {
        self.drawings.export(timestamp).to_json()
    }

    /// Replace all drawings from an export document. Nothing changes on error.
    pub fn import_drawings(&mut self, json: &str) -> Result<usize, DrawingError> {
        let count = self.drawings.import(json)?;
        self.invalidate(&[LayerId::Drawings]);
        Ok(count)
    }

    // ---- price lines ------------------------------------------------------------------

    pub fn set_price_lines(&mut self, lines: Vec<PriceLine>) {
        self.price_lines.set_lines(lines);
        if !self.price_lines.is_dragging() && self.pointer == PointerMode::PriceLine {
            self.pointer = PointerMode::Idle;
        }
        self.invalidate(&[LayerId::PriceLines]);
    }

    pub fn confirm_commit(&mut self, request: &CommitRequest, confirmation: &CommitConfirmation) -> Result<(), CommitError> {
        self.price_lines.confirm(request, confirmation)?;
        self.invalidate(&[LayerId::PriceLines]);
        Ok(())
    }

    /// Roll a failed commit back. Returns the price the line now shows.
    pub fn reject_commit(&mut self, request: &CommitRequest, error: &CommitError) -> Result<f64, CommitError> {
        let price = self.price_lines.reject(request, error)?;
        self.invalidate(&[LayerId::PriceLines]);
        Ok(price)
    }
}
