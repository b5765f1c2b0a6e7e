use crate::domain::errors::FeedError;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, CandleFeed, HistoryRequest, Symbol, TimeInterval};
use crate::{log_debug, log_info};
use futures::future::LocalBoxFuture;
use gloo_net::http::Request;

pub const BINANCE_API: &str = "https://api.binance.com/api/v3";

/// One kline row: open time, OHLCV as decimal strings, then fields the chart ignores
#[derive(Debug, serde::Deserialize)]
struct BinanceHistoricalKline(
    u64,
    String,
    String,
    String,
    String,
    String,
    serde::de::IgnoredAny,
    serde::de::IgnoredAny,
    serde::de::IgnoredAny,
    serde::de::IgnoredAny,
    serde::de::IgnoredAny,
    serde::de::IgnoredAny,
);

impl TryFrom<BinanceHistoricalKline> for Candle {
    type Error = FeedError;

    fn try_from(kline: BinanceHistoricalKline) -> Result<Self, FeedError> {
        let number = |field: &str, raw: &str| {
            raw.parse::<f64>().map_err(|_| FeedError::Parse(format!("invalid {field} `{raw}` at {}", kline.0)))
        };
        Ok(Candle::from_values(
            kline.0,
            number("open", &kline.1)?,
            number("high", &kline.2)?,
            number("low", &kline.3)?,
            number("close", &kline.4)?,
            number("volume", &kline.5)?,
        ))
    }
}

/// Decode a klines response body
pub fn parse_klines(body: &str) -> Result<Vec<Candle>, FeedError> {
    let klines: Vec<BinanceHistoricalKline> =
        serde_json::from_str(body).map_err(|e| FeedError::Parse(e.to_string()))?;
    klines.into_iter().map(Candle::try_from).collect()
}

/// REST candle feed paginating backward with `endTime`/`limit`
#[derive(Debug, Clone)]
pub struct BinanceRestClient {
    base_url: String,
}

impl Default for BinanceRestClient {
    fn default() -> Self {
        Self::new(BINANCE_API)
    }
}

impl BinanceRestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn url(&self, endpoint: &str, symbol: &Symbol, interval: TimeInterval, end_time: Option<u64>, limit: u32) -> String {
        let mut url = format!(
            "{}/{}?symbol={}&interval={}&limit={}",
            self.base_url,
            endpoint,
            symbol.value(),
            interval.to_binance_str(),
            limit
        );
        if let Some(end_time) = end_time {
            url.push_str(&format!("&endTime={end_time}"));
        }
        url
    }

    pub fn ui_klines_url(&self, request: &HistoryRequest) -> String {
        self.url("uiKlines", &request.symbol, request.interval, request.end_time, request.limit)
    }

    pub fn klines_url(&self, request: &HistoryRequest) -> String {
        self.url("klines", &request.symbol, request.interval, request.end_time, request.limit)
    }

    /// Fetch one page, trying `uiKlines` first and falling back to `klines`
    pub async fn fetch_page(&self, request: &HistoryRequest) -> Result<Vec<Candle>, FeedError> {
        match fetch_from_url(self.ui_klines_url(request)).await {
            Ok(candles) if !candles.is_empty() => Ok(candles),
            first => {
                if let Err(e) = &first {
                    log_debug!(LogComponent::Infrastructure("BinanceRestClient"), "uiKlines failed: {}", e);
                }
                fetch_from_url(self.klines_url(request)).await
            }
        }
    }
}

async fn fetch_from_url(url: String) -> Result<Vec<Candle>, FeedError> {
    log_debug!(LogComponent::Infrastructure("BinanceRestClient"), "GET {}", url);
    let response = Request::get(&url).send().await.map_err(|e| FeedError::Network(e.to_string()))?;
    if !response.ok() {
        return Err(FeedError::Http(response.status()));
    }
    let body = response.text().await.map_err(|e| FeedError::Network(e.to_string()))?;
    let candles = parse_klines(&body)?;
    log_info!(LogComponent::Infrastructure("BinanceRestClient"), "loaded {} candles", candles.len());
    Ok(candles)
}

impl CandleFeed for BinanceRestClient {
    fn fetch(&self, request: HistoryRequest) -> LocalBoxFuture<'static, Result<Vec<Candle>, FeedError>> {
        let client = self.clone();
        Box::pin(async move { client.fetch_page(&request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(end_time: Option<u64>) -> HistoryRequest {
        HistoryRequest {
            symbol: Symbol::from("btcusdt"),
            interval: TimeInterval::OneMinute,
            end_time,
            limit: 1000,
        }
    }

    #[test]
    fn ui_klines_url_carries_cursor() {
        let client = BinanceRestClient::default();
        assert_eq!(
            client.ui_klines_url(&request(Some(12345))),
            "https://api.binance.com/api/v3/uiKlines?symbol=BTCUSDT&interval=1m&limit=1000&endTime=12345"
        );
        assert_eq!(
            BinanceRestClient::new("http://localhost:8080/").klines_url(&request(None)),
            "http://localhost:8080/klines?symbol=BTCUSDT&interval=1m&limit=1000"
        );
    }

    #[test]
    fn parses_kline_rows() {
        let body = r#"[[1700000000000,"100.5","110.0","99.0","105.25","12.5",1700000059999,"0",10,"0","0","0"]]"#;
        let candles = parse_klines(body).unwrap();
        assert_eq!(candles, vec![Candle::from_values(1_700_000_000_000, 100.5, 110.0, 99.0, 105.25, 12.5)]);
    }

    #[test]
    fn malformed_rows_are_parse_errors() {
        let body = r#"[[1,"x","1","1","1","1",0,"0",0,"0","0","0"]]"#;
        assert!(matches!(parse_klines(body), Err(FeedError::Parse(msg)) if msg.contains("open")));
        assert!(matches!(parse_klines("{}"), Err(FeedError::Parse(_))));
    }
}
