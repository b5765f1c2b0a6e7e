//! Chart orchestration above the domain: the controller that owns all chart state,
//! history pagination and the data-ready signal.

pub mod chart_controller;
pub mod data_ready;
pub mod history_loader;

pub use chart_controller::{ChartController, ChartEffect};
pub use data_ready::DataReadySignal;
pub use history_loader::{HistoryLoader, HistoryPage, HistoryTicket};
