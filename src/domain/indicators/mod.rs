//! Technical indicators: catalog and params, the math, tail-aligned results and the
//! engine that keeps rendered series in sync with the active configs.

pub mod calculations;
pub mod config;
pub mod engine;
pub mod result;

pub use config::*;
pub use engine::*;
pub use result::*;
