//! Backward pagination of historical candles.
//!
//! The loader never fetches by itself: it hands out `HistoryTicket`s, the binding layer runs
//! them against a `CandleFeed`, and the result comes back through `resolve`. A ticket that
//! outlived a symbol change or whose cursor no longer matches the series is dropped.

use crate::domain::config::ChartConfig;
use crate::domain::errors::FeedError;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, HistoryRequest, Symbol, TimeInterval};
use crate::{log_debug, log_warn};

/// One outstanding page request
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTicket {
    pub generation: u64,
    pub request: HistoryRequest,
}

/// What to do with a resolved page
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryPage {
    /// Older candles to prepend
    Candles(Vec<Candle>),
    /// No more history; stop asking
    Exhausted,
    /// The ticket no longer applies
    Stale,
}

#[derive(Debug, Clone)]
pub struct HistoryLoader {
    generation: u64,
    in_flight: Option<HistoryTicket>,
    exhausted: bool,
    threshold: usize,
    page_limit: u32,
}

impl Default for HistoryLoader {
    fn default() -> Self {
        Self::from_config(&ChartConfig::default())
    }
}

impl HistoryLoader {
    pub fn new(threshold: usize, page_limit: u32) -> Self {
        Self { generation: 0, in_flight: None, exhausted: false, threshold, page_limit }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(config.history_preload_threshold, config.history_page_limit)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn in_flight(&self) -> Option<&HistoryTicket> {
        self.in_flight.as_ref()
    }

    /// Symbol or interval changed: forget the in-flight page and start over
    pub fn reset(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.exhausted = false;
        log_debug!(LogComponent::Application("HistoryLoader"), "reset to generation {}", self.generation);
    }

    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    /// Issue a ticket when the first visible candle is within the preload threshold of the
    /// oldest one, nothing is in flight and history remains.
    pub fn maybe_request(
        &mut self,
        symbol: &Symbol,
        interval: TimeInterval,
        first_visible: usize,
        oldest_time: Option<u64>,
    ) -> Option<HistoryTicket> {
        if first_visible >= self.threshold || self.in_flight.is_some() || self.exhausted {
            return None;
        }
        let oldest = oldest_time?;
        let Some(cursor) = oldest.checked_sub(1) else {
            self.exhausted = true;
            return None;
        };
        let ticket = HistoryTicket {
            generation: self.generation,
            request: HistoryRequest {
                symbol: symbol.clone(),
                interval,
                end_time: Some(cursor),
                limit: self.page_limit,
            },
        };
        log_debug!(LogComponent::Application("HistoryLoader"), "requesting page before {}", cursor);
        self.in_flight = Some(ticket.clone());
        Some(ticket)
    }

    /// Settle a ticket. `oldest_time` is the series' current first candle.
    pub fn resolve(
        &mut self,
        ticket: &HistoryTicket,
        outcome: Result<Vec<Candle>, FeedError>,
        oldest_time: Option<u64>,
    ) -> HistoryPage {
        if ticket.generation != self.generation || self.in_flight.as_ref() != Some(ticket) {
            log_debug!(LogComponent::Application("HistoryLoader"), "discarding stale page (gen {})", ticket.generation);
            return HistoryPage::Stale;
        }
        self.in_flight = None;
        if oldest_time.and_then(|t| t.checked_sub(1)) != ticket.request.end_time {
            return HistoryPage::Stale;
        }
        match outcome {
            Ok(candles) if candles.is_empty() => {
                self.exhausted = true;
                HistoryPage::Exhausted
            }
            Ok(candles) => HistoryPage::Candles(candles),
            Err(err) => {
                log_warn!(LogComponent::Application("HistoryLoader"), "history fetch failed: {}", err);
                self.exhausted = true;
                HistoryPage::Exhausted
            }
        }
    }
}
