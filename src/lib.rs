//! Layered canvas candlestick chart engine.
//!
//! The `domain` layer is pure and testable natively; `infrastructure` paints through the
//! `Surface` trait and fetches candles over HTTP; `application` owns chart state and routes
//! input; `presentation` binds it to the page when built for `wasm32`.

pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(target_arch = "wasm32")]
pub mod presentation;
pub mod time_utils;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Install the console logger, browser clock and panic hook
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn initialize() {
    console_error_panic_hook::set_once();

    let logger = if cfg!(debug_assertions) {
        infrastructure::services::ConsoleLogger::new_development()
    } else {
        infrastructure::services::ConsoleLogger::new_production()
    };
    domain::logging::init_logger(Box::new(logger));
    domain::logging::init_time_provider(Box::new(infrastructure::services::BrowserTimeProvider::new()));

    crate::log_info!(domain::logging::LogComponent::Presentation("Initialize"), "chart engine ready");
}
