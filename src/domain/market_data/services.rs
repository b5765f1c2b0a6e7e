use crate::domain::logging::{LogComponent, get_logger};
use crate::domain::market_data::Candle;

/// Why a candle was refused at ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleDefect {
    NonFinite,
    BrokenOhlc,
    NegativeVolume,
}

/// Domain service - candle validation at the ingest boundary
#[derive(Debug, Default, Clone, Copy)]
pub struct DataValidationService;

impl DataValidationService {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, candle: &Candle) -> Result<(), CandleDefect> {
        let values = [candle.open(), candle.high(), candle.low(), candle.close(), candle.volume()];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CandleDefect::NonFinite);
        }
        if candle.volume() < 0.0 {
            return Err(CandleDefect::NegativeVolume);
        }
        let ohlc_valid = candle.high() >= candle.low()
            && candle.high() >= candle.open()
            && candle.high() >= candle.close()
            && candle.low() <= candle.open()
            && candle.low() <= candle.close();
        if !ohlc_valid {
            return Err(CandleDefect::BrokenOhlc);
        }
        Ok(())
    }

    pub fn validate_candle(&self, candle: &Candle) -> bool {
        self.check(candle).is_ok()
    }

    /// Drop invalid candles, logging each one. Order of the survivors is preserved.
    pub fn filter_valid(&self, candles: Vec<Candle>) -> Vec<Candle> {
        let total = candles.len();
        let kept: Vec<Candle> = candles
            .into_iter()
            .filter(|candle| match self.check(candle) {
                Ok(()) => true,
                Err(defect) => {
                    get_logger().warn(
                        LogComponent::Domain("DataValidation"),
                        &format!("dropping candle at {}: {:?}", candle.time(), defect),
                    );
                    false
                }
            })
            .collect();
        if kept.len() != total {
            get_logger().warn(
                LogComponent::Domain("DataValidation"),
                &format!("kept {} of {} candles", kept.len(), total),
            );
        }
        kept
    }

    /// Indices where the distance to the previous candle exceeds `expected_ms`
    pub fn find_gaps(&self, candles: &[Candle], expected_ms: u64) -> Vec<usize> {
        candles
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1].time().saturating_sub(pair[0].time()) > expected_ms)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_candles_are_dropped() {
        let service = DataValidationService::new();
        let good = Candle::from_values(1, 10.0, 11.0, 9.0, 10.5, 1.0);
        let broken = Candle::from_values(2, 10.0, 9.0, 11.0, 10.5, 1.0);
        let nan = Candle::from_values(3, f64::NAN, 11.0, 9.0, 10.5, 1.0);
        assert_eq!(service.check(&broken), Err(CandleDefect::BrokenOhlc));
        assert_eq!(service.check(&nan), Err(CandleDefect::NonFinite));
        let kept = service.filter_valid(vec![good.clone(), broken, nan]);
        assert_eq!(kept, vec![good]);
    }

    #[test]
    fn gaps_are_reported_after_the_jump() {
        let service = DataValidationService::new();
        let candles: Vec<Candle> = [0u64, 60, 120, 300]
            .iter()
            .map(|t| Candle::from_values(*t, 1.0, 1.0, 1.0, 1.0, 0.0))
            .collect();
        assert_eq!(service.find_gaps(&candles, 60), vec![3]);
    }
}
