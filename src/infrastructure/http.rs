//! HTTP candle feed.

pub mod binance_rest_client;

pub use binance_rest_client::{BINANCE_API, BinanceRestClient, parse_klines};
