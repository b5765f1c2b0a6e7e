use super::value_objects::{OHLCV, Price, Timestamp, Volume};
use serde::{Deserialize, Serialize};

/// Domain entity - Candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CandleRecord", into = "CandleRecord")]
pub struct Candle {
    pub timestamp: Timestamp,
    pub ohlcv: OHLCV,
}

impl Candle {
    pub fn new(timestamp: Timestamp, ohlcv: OHLCV) -> Self {
        Self { timestamp, ohlcv }
    }

    /// Shorthand used by feeds and tests
    pub fn from_values(time: u64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self::new(
            Timestamp::new(time),
            OHLCV::new(Price::new(open), Price::new(high), Price::new(low), Price::new(close), Volume::new(volume)),
        )
    }

    /// Doji candles count as bullish
    pub fn is_bullish(&self) -> bool {
        self.ohlcv.close >= self.ohlcv.open
    }

    pub fn open(&self) -> f64 {
        self.ohlcv.open.value()
    }

    pub fn high(&self) -> f64 {
        self.ohlcv.high.value()
    }

    pub fn low(&self) -> f64 {
        self.ohlcv.low.value()
    }

    pub fn close(&self) -> f64 {
        self.ohlcv.close.value()
    }

    pub fn volume(&self) -> f64 {
        self.ohlcv.volume.value()
    }

    pub fn time(&self) -> u64 {
        self.timestamp.value()
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high() + self.low() + self.close()) / 3.0
    }
}

/// Flat wire shape `{time, open, high, low, close, volume}` used by feeds and the JS API
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CandleRecord {
    pub time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl From<CandleRecord> for Candle {
    fn from(r: CandleRecord) -> Self {
        Candle::from_values(r.time, r.open, r.high, r.low, r.close, r.volume)
    }
}

impl From<Candle> for CandleRecord {
    fn from(c: Candle) -> Self {
        CandleRecord {
            time: c.time(),
            open: c.open(),
            high: c.high(),
            low: c.low(),
            close: c.close(),
            volume: c.volume(),
        }
    }
}

/// What `apply_tick` did with a live candle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Updated,
    Appended,
    Ignored,
}

/// Domain entity - time-ordered candle series with unique timestamps.
///
/// Mutated only by a full replace, a history prepend, or a live tick on the tail.
/// `revision` increases on every mutation so cached indicator results can be invalidated.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    revision: u64,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content. Input is sorted and de-duplicated by time, later entries win.
    pub fn set_candles(&mut self, candles: Vec<Candle>) {
        self.candles = Self::normalize(candles);
        self.revision += 1;
    }

    /// Merge older candles in front of the series.
    ///
    /// Returns the number of candles that now precede the previous first candle.
    /// Entries at or after the current first timestamp are ignored so live data is never
    /// overwritten by a stale page.
    pub fn prepend_history(&mut self, older: Vec<Candle>) -> usize {
        let Some(first_time) = self.candles.first().map(|c| c.timestamp) else {
            self.set_candles(older);
            return self.candles.len();
        };
        let older: Vec<Candle> =
            Self::normalize(older).into_iter().filter(|c| c.timestamp < first_time).collect();
        let added = older.len();
        if added > 0 {
            let mut merged = older;
            merged.append(&mut self.candles);
            self.candles = merged;
            self.revision += 1;
        }
        added
    }

    /// Apply a live update: replace the tail when times match, append when newer.
    pub fn apply_tick(&mut self, candle: Candle) -> TickOutcome {
        let outcome = match self.candles.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => {
                *last = candle;
                TickOutcome::Updated
            }
            Some(last) if candle.timestamp < last.timestamp => TickOutcome::Ignored,
            _ => {
                self.candles.push(candle);
                TickOutcome::Appended
            }
        };
        if outcome != TickOutcome::Ignored {
            self.revision += 1;
        }
        outcome
    }

    pub fn clear(&mut self) {
        self.candles.clear();
        self.revision += 1;
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Low/high over `[start, end)`. `None` when the slice is empty.
    pub fn price_range(&self, start: usize, end: usize) -> Option<(f64, f64)> {
        let end = end.min(self.candles.len());
        if start >= end {
            return None;
        }
        self.candles[start..end].iter().fold(None, |acc, c| match acc {
            None => Some((c.low(), c.high())),
            Some((lo, hi)) => Some((lo.min(c.low()), hi.max(c.high()))),
        })
    }

    fn normalize(mut candles: Vec<Candle>) -> Vec<Candle> {
        // stable sort keeps input order among equal timestamps, so the last one wins below
        candles.sort_by_key(|c| c.timestamp);
        let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match out.last_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => out.push(candle),
            }
        }
        out
    }
}
