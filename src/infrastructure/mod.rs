//! Browser-facing adapters: canvas rendering, the REST candle feed and console services.

pub mod http;
pub mod rendering;
pub mod services;
