use crate::domain::errors::FeedError;
use crate::domain::market_data::{Candle, Symbol, TimeInterval};
use futures::future::LocalBoxFuture;

/// One backward page request: candles strictly older than or at `end_time`
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub interval: TimeInterval,
    pub end_time: Option<u64>,
    pub limit: u32,
}

/// Source of historical candles.
///
/// Futures are `!Send`: the chart lives on the browser event loop.
pub trait CandleFeed {
    fn fetch(&self, request: HistoryRequest) -> LocalBoxFuture<'static, Result<Vec<Candle>, FeedError>>;
}

/// Feed over a fixed in-memory series, paginated like the exchange endpoint
#[derive(Debug, Clone, Default)]
pub struct StaticCandleFeed {
    candles: Vec<Candle>,
}

impl StaticCandleFeed {
    pub fn new(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self { candles }
    }
}

impl CandleFeed for StaticCandleFeed {
    fn fetch(&self, request: HistoryRequest) -> LocalBoxFuture<'static, Result<Vec<Candle>, FeedError>> {
        let end = request.end_time.unwrap_or(u64::MAX);
        let eligible: Vec<Candle> = self.candles.iter().filter(|c| c.time() <= end).cloned().collect();
        let skip = eligible.len().saturating_sub(request.limit as usize);
        let page = eligible[skip..].to_vec();
        Box::pin(async move { Ok(page) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn static_feed_pages_backward() {
        let candles = (1..=10).map(|t| Candle::from_values(t, 1.0, 1.0, 1.0, 1.0, 0.0)).collect();
        let feed = StaticCandleFeed::new(candles);
        let page = block_on(feed.fetch(HistoryRequest {
            symbol: Symbol::from("BTCUSDT"),
            interval: TimeInterval::OneMinute,
            end_time: Some(6),
            limit: 3,
        }))
        .unwrap();
        let times: Vec<u64> = page.iter().map(|c| c.time()).collect();
        assert_eq!(times, vec![4, 5, 6]);
    }
}
