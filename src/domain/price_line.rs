//! Draggable stop-loss / take-profit lines bound to externally owned positions.
//!
//! The confirmed price always comes from outside. A drag only moves a preview; releasing
//! far enough from the start produces a `CommitRequest`, and the line shows the requested
//! price optimistically until `confirm` or `reject` settles it. Every request carries a
//! per-controller sequence number, so overlapping commits on one line settle independently.

use crate::domain::chart::CoordinateSystem;
use crate::domain::config::ChartConfig;
use crate::domain::errors::CommitError;
use crate::domain::logging::LogComponent;
use crate::{log_debug, log_warn};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PriceLineSide {
    StopLoss,
    TakeProfit,
}

impl PriceLineSide {
    pub fn label(&self) -> &'static str {
        match self {
            Self::StopLoss => "SL",
            Self::TakeProfit => "TP",
        }
    }
}

/// `{price, positionId, side}` as supplied by the trading layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLine {
    pub price: f64,
    pub position_id: String,
    pub side: PriceLineSide,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceLineKey {
    pub position_id: String,
    pub side: PriceLineSide,
}

impl PriceLine {
    pub fn key(&self) -> PriceLineKey {
        PriceLineKey { position_id: self.position_id.clone(), side: self.side }
    }
}

/// Outgoing commit `(positionId, side, newPrice)`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub position_id: String,
    pub side: PriceLineSide,
    pub new_price: f64,
    pub sequence: u64,
}

impl CommitRequest {
    pub fn key(&self) -> PriceLineKey {
        PriceLineKey { position_id: self.position_id.clone(), side: self.side }
    }
}

/// Resolved value of a successful commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitConfirmation {
    pub confirmed_price: f64,
    #[serde(default)]
    pub order_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    price: f64,
    sequence: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct LineState {
    line: PriceLine,
    /// Latest requested price, shown until its own commit settles
    pending: Option<Pending>,
    /// Sequences sent out and not settled yet
    in_flight: Vec<u64>,
    /// Sequence of the confirmation behind `line.price`
    confirmed: u64,
}

impl LineState {
    fn new(line: PriceLine) -> Self {
        Self { line, pending: None, in_flight: Vec::new(), confirmed: 0 }
    }

    fn shown_price(&self) -> f64 {
        self.pending.map(|p| p.price).unwrap_or(self.line.price)
    }

    /// Drop `sequence` from the in-flight set. False when it was not outstanding.
    fn settle(&mut self, sequence: u64) -> bool {
        let Some(position) = self.in_flight.iter().position(|s| *s == sequence) else {
            return false;
        };
        self.in_flight.swap_remove(position);
        if self.pending.is_some_and(|p| p.sequence == sequence) {
            self.pending = None;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Drag {
    key: PriceLineKey,
    original: f64,
    preview: f64,
}

/// Render-side view of one line
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLineView<'a> {
    pub line: &'a PriceLine,
    pub display_price: f64,
    pub hovered: bool,
    pub dragging: bool,
    pub pending: bool,
}

#[derive(Debug, Clone)]
pub struct PriceLineController {
    lines: Vec<LineState>,
    hovered: Option<PriceLineKey>,
    drag: Option<Drag>,
    tolerance_px: f64,
    epsilon: f64,
    next_sequence: u64,
}

impl Default for PriceLineController {
    fn default() -> Self {
        Self::new(8.0, 0.01)
    }
}

impl PriceLineController {
    pub fn new(tolerance_px: f64, epsilon: f64) -> Self {
        Self { lines: Vec::new(), hovered: None, drag: None, tolerance_px, epsilon, next_sequence: 0 }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(config.price_line_tolerance_px, config.price_line_epsilon)
    }

    /// Replace the externally owned lines. Optimistic prices and outstanding commits
    /// survive for lines that still exist; a drag on a line that disappeared is dropped.
    pub fn set_lines(&mut self, lines: Vec<PriceLine>) {
        let previous = std::mem::take(&mut self.lines);
        let epsilon = self.epsilon;
        self.lines = lines
            .into_iter()
            .filter(|line| line.price.is_finite())
            .map(|line| match previous.iter().find(|state| state.line.key() == line.key()) {
                Some(state) => LineState {
                    pending: state.pending.filter(|pending| (pending.price - line.price).abs() > epsilon),
                    in_flight: state.in_flight.clone(),
                    confirmed: state.confirmed,
                    line,
                },
                None => LineState::new(line),
            })
            .collect();
        if self.drag.as_ref().is_some_and(|drag| self.find(&drag.key).is_none()) {
            self.drag = None;
        }
        if self.hovered.as_ref().is_some_and(|key| self.find(key).is_none()) {
            self.hovered = None;
        }
    }

    fn find(&self, key: &PriceLineKey) -> Option<&LineState> {
        self.lines.iter().find(|state| &state.line.key() == key)
    }

    fn find_mut(&mut self, key: &PriceLineKey) -> Option<&mut LineState> {
        self.lines.iter_mut().find(|state| &state.line.key() == key)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn hovered(&self) -> Option<&PriceLineKey> {
        self.hovered.as_ref()
    }

    pub fn views(&self) -> impl Iterator<Item = PriceLineView<'_>> {
        self.lines.iter().map(move |state| {
            let key = state.line.key();
            let drag = self.drag.as_ref().filter(|drag| drag.key == key);
            PriceLineView {
                line: &state.line,
                display_price: drag.map(|d| d.preview).unwrap_or_else(|| state.shown_price()),
                hovered: self.hovered.as_ref() == Some(&key),
                dragging: drag.is_some(),
                pending: state.pending.is_some(),
            }
        })
    }

    /// Price currently drawn for `key`
    pub fn display_price(&self, key: &PriceLineKey) -> Option<f64> {
        self.views().find(|view| &view.line.key() == key).map(|view| view.display_price)
    }

    /// Nearest line within tolerance of `y`
    pub fn line_at(&self, y: f64, cs: &CoordinateSystem<'_>) -> Option<PriceLineKey> {
        self.views()
            .map(|view| (view.line.key(), (cs.price_to_y(view.display_price) - y).abs()))
            .filter(|(_, distance)| *distance <= self.tolerance_px)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(key, _)| key)
    }

    /// Update hover. Returns true when the hovered line changed.
    pub fn hover(&mut self, y: Option<f64>, cs: &CoordinateSystem<'_>) -> bool {
        let hovered = y.and_then(|y| self.line_at(y, cs));
        let changed = hovered != self.hovered;
        self.hovered = hovered;
        changed
    }

    /// Start a drag when the press lands on a line. Returns true when captured.
    pub fn on_pointer_down(&mut self, y: f64, cs: &CoordinateSystem<'_>) -> bool {
        let Some(key) = self.line_at(y, cs) else {
            return false;
        };
        let Some(original) = self.find(&key).map(LineState::shown_price) else {
            return false;
        };
        log_debug!(LogComponent::Domain("PriceLine"), "drag start {} {} at {}", key.position_id, key.side, original);
        self.hovered = Some(key.clone());
        self.drag = Some(Drag { key, original, preview: original });
        true
    }

    /// Move the preview. Returns true when the price-line layer needs a repaint.
    pub fn on_pointer_move(&mut self, y: f64, cs: &CoordinateSystem<'_>) -> bool {
        match self.drag.as_mut() {
            Some(drag) => {
                let price = cs.y_to_price(y);
                if price.is_finite() && price != drag.preview {
                    drag.preview = price;
                    return true;
                }
                false
            }
            None => self.hover(Some(y), cs),
        }
    }

    /// Finish a drag. Yields a commit only when the line moved by more than epsilon.
    pub fn on_pointer_up(&mut self) -> Option<CommitRequest> {
        let drag = self.drag.take()?;
        if (drag.preview - drag.original).abs() <= self.epsilon {
            return None;
        }
        self.find(&drag.key)?;
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        let state = self.find_mut(&drag.key)?;
        state.pending = Some(Pending { price: drag.preview, sequence });
        state.in_flight.push(sequence);
        Some(CommitRequest {
            position_id: drag.key.position_id,
            side: drag.key.side,
            new_price: drag.preview,
            sequence,
        })
    }

    /// Abandon a drag in progress
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    fn outstanding(&mut self, request: &CommitRequest) -> Result<&mut LineState, CommitError> {
        let not_pending = || CommitError::NotPending(request.position_id.clone());
        let state = self.find_mut(&request.key()).ok_or_else(not_pending)?;
        if state.settle(request.sequence) { Ok(state) } else { Err(not_pending()) }
    }

    /// Settle a commit with the price the trading layer accepted. A later commit still in
    /// flight keeps its preview; the confirmed price only moves forward in sequence order.
    pub fn confirm(&mut self, request: &CommitRequest, confirmation: &CommitConfirmation) -> Result<(), CommitError> {
        let state = self.outstanding(request)?;
        if request.sequence > state.confirmed {
            state.confirmed = request.sequence;
            state.line.price = confirmation.confirmed_price;
        }
        Ok(())
    }

    /// Roll a failed commit back. Returns the price now shown: the last confirmed price,
    /// or the preview of a newer commit still in flight.
    pub fn reject(&mut self, request: &CommitRequest, error: &CommitError) -> Result<f64, CommitError> {
        let state = self.outstanding(request)?;
        let price = state.shown_price();
        log_warn!(
            LogComponent::Domain("PriceLine"),
            "{} {} commit #{} failed, showing {}: {}",
            request.position_id,
            request.side,
            request.sequence,
            price,
            error
        );
        Ok(price)
    }
}
