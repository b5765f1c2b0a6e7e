//! Pure chart logic. Nothing here touches the browser, so every module runs under
//! native `cargo test`.

pub mod chart;
pub mod config;
pub mod drawing;
pub mod errors;
pub mod events;
pub mod indicators;
pub mod logging;
pub mod market_data;
pub mod price_line;
