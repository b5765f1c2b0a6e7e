//! Indicator math over candle slices.
//!
//! Every function returns tail-aligned output: the last element belongs to the last input
//! candle and the warm-up prefix is omitted, so `input.len() - output.len()` is the index
//! of the first value. Inputs shorter than the warm-up yield `InsufficientData`.

use crate::domain::errors::IndicatorError;
use crate::domain::market_data::Candle;

pub type IndicatorValues = Vec<f64>;

fn require(available: usize, required: usize) -> Result<(), IndicatorError> {
    if available < required {
        return Err(IndicatorError::InsufficientData { required, available });
    }
    Ok(())
}

fn check_period(name: &str, period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidParam { name: name.to_string(), value: 0.0 });
    }
    Ok(())
}

/// Keep the last `len` values of each vector so they share the same tail
fn align_tail(values: &[f64], len: usize) -> Vec<f64> {
    values[values.len().saturating_sub(len)..].to_vec()
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(Candle::close).collect()
}

pub fn sma(values: &[f64], period: usize) -> Result<IndicatorValues, IndicatorError> {
    check_period("period", period)?;
    require(values.len(), period)?;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut sum: f64 = values[..period].iter().sum();
    out.push(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out.push(sum / period as f64);
    }
    Ok(out)
}

/// EMA seeded with the SMA of the first `period` values
pub fn ema(values: &[f64], period: usize) -> Result<IndicatorValues, IndicatorError> {
    check_period("period", period)?;
    require(values.len(), period)?;
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out.push(prev);
    for value in &values[period..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        out.push(prev);
    }
    Ok(out)
}

/// Linearly weighted moving average, newest value weighted `period`
pub fn wma(values: &[f64], period: usize) -> Result<IndicatorValues, IndicatorError> {
    check_period("period", period)?;
    require(values.len(), period)?;
    let denominator = (period * (period + 1)) as f64 / 2.0;
    Ok(values
        .windows(period)
        .map(|window| {
            window.iter().enumerate().map(|(i, v)| v * (i + 1) as f64).sum::<f64>() / denominator
        })
        .collect())
}

pub struct Bands {
    pub upper: IndicatorValues,
    pub middle: IndicatorValues,
    pub lower: IndicatorValues,
}

/// Bollinger bands with population standard deviation
pub fn bollinger(values: &[f64], period: usize, deviations: f64) -> Result<Bands, IndicatorError> {
    let middle = sma(values, period)?;
    let (upper, lower): (Vec<f64>, Vec<f64>) = values
        .windows(period)
        .zip(&middle)
        .map(|(window, mean)| {
            let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
            let width = deviations * variance.sqrt();
            (mean + width, mean - width)
        })
        .unzip();
    Ok(Bands { upper, middle, lower })
}

/// Cumulative volume-weighted typical price. Zero cumulative volume falls back to the typical price.
pub fn vwap(candles: &[Candle]) -> Result<IndicatorValues, IndicatorError> {
    require(candles.len(), 1)?;
    let mut pv = 0.0;
    let mut volume = 0.0;
    Ok(candles
        .iter()
        .map(|c| {
            pv += c.typical_price() * c.volume();
            volume += c.volume();
            if volume > 0.0 { pv / volume } else { c.typical_price() }
        })
        .collect())
}

/// Parabolic SAR starting at the second candle
pub fn parabolic_sar(candles: &[Candle], step: f64, max_step: f64) -> Result<IndicatorValues, IndicatorError> {
    require(candles.len(), 2)?;
    let mut rising = candles[1].close() >= candles[0].close();
    let mut sar = if rising { candles[0].low() } else { candles[0].high() };
    let mut extreme = if rising { candles[1].high() } else { candles[1].low() };
    let mut af = step;
    let mut out = Vec::with_capacity(candles.len() - 1);

    for i in 1..candles.len() {
        let c = &candles[i];
        let prev = &candles[i - 1];
        if i > 1 {
            sar += af * (extreme - sar);
        }
        if rising {
            sar = sar.min(prev.low());
            if i > 1 {
                sar = sar.min(candles[i - 2].low());
            }
            if c.low() < sar {
                rising = false;
                sar = extreme;
                extreme = c.low();
                af = step;
            } else if c.high() > extreme {
                extreme = c.high();
                af = (af + step).min(max_step);
            }
        } else {
            sar = sar.max(prev.high());
            if i > 1 {
                sar = sar.max(candles[i - 2].high());
            }
            if c.high() > sar {
                rising = true;
                sar = extreme;
                extreme = c.high();
                af = step;
            } else if c.low() < extreme {
                extreme = c.low();
                af = (af + step).min(max_step);
            }
        }
        out.push(sar);
    }
    Ok(out)
}

fn midpoint(candles: &[Candle]) -> f64 {
    let (lo, hi) = candles
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c.low()), hi.max(c.high())));
    (lo + hi) / 2.0
}

fn donchian_mid(candles: &[Candle], period: usize) -> Result<IndicatorValues, IndicatorError> {
    check_period("period", period)?;
    require(candles.len(), period)?;
    Ok(candles.windows(period).map(midpoint).collect())
}

pub struct Ichimoku {
    pub conversion: IndicatorValues,
    pub base: IndicatorValues,
    pub span_a: IndicatorValues,
    pub span_b: IndicatorValues,
}

/// Ichimoku cloud. Both spans are shifted forward by `displacement` and cut at the last
/// candle, so span values are plotted against the candles they were projected onto.
pub fn ichimoku(
    candles: &[Candle],
    conversion_period: usize,
    base_period: usize,
    span_b_period: usize,
    displacement: usize,
) -> Result<Ichimoku, IndicatorError> {
    let n = candles.len();
    require(n, base_period.max(span_b_period).max(conversion_period) + displacement)?;
    let conversion = donchian_mid(candles, conversion_period)?;
    let base = donchian_mid(candles, base_period)?;
    let raw_b = donchian_mid(candles, span_b_period)?;

    let len_a = base.len().min(conversion.len());
    let conv_tail = align_tail(&conversion, len_a);
    let base_tail = align_tail(&base, len_a);
    let raw_a: Vec<f64> = conv_tail.iter().zip(&base_tail).map(|(c, b)| (c + b) / 2.0).collect();

    // displaced forward: drop the newest `displacement` values, they land past the last candle
    let span_a = raw_a[..raw_a.len() - displacement].to_vec();
    let span_b = raw_b[..raw_b.len() - displacement].to_vec();
    Ok(Ichimoku { conversion, base, span_a, span_b })
}

/// Average true range with Wilder smoothing. The first value sits at index `period - 1`.
pub fn atr(candles: &[Candle], period: usize) -> Result<IndicatorValues, IndicatorError> {
    check_period("period", period)?;
    require(candles.len(), period)?;
    let tr = true_ranges(candles);
    let mut prev = tr[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(candles.len() - period + 1);
    out.push(prev);
    for value in &tr[period..] {
        prev = (prev * (period as f64 - 1.0) + value) / period as f64;
        out.push(prev);
    }
    Ok(out)
}

fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| match i {
            0 => c.high() - c.low(),
            _ => {
                let prev_close = candles[i - 1].close();
                (c.high() - c.low()).max((c.high() - prev_close).abs()).max((c.low() - prev_close).abs())
            }
        })
        .collect()
}

/// Keltner channels: EMA of closes +/- `multiplier` x ATR
pub fn keltner(
    candles: &[Candle],
    ema_period: usize,
    atr_period: usize,
    multiplier: f64,
) -> Result<Bands, IndicatorError> {
    let middle = ema(&closes(candles), ema_period)?;
    let range = atr(candles, atr_period)?;
    let len = middle.len().min(range.len());
    let middle = align_tail(&middle, len);
    let range = align_tail(&range, len);
    let upper = middle.iter().zip(&range).map(|(m, r)| m + multiplier * r).collect();
    let lower = middle.iter().zip(&range).map(|(m, r)| m - multiplier * r).collect();
    Ok(Bands { upper, middle, lower })
}

/// Relative strength index with Wilder smoothing, first value at index `period`
pub fn rsi(values: &[f64], period: usize) -> Result<IndicatorValues, IndicatorError> {
    check_period("period", period)?;
    require(values.len(), period + 1)?;
    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let mut gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;
    let p = period as f64;

    let mut out = Vec::with_capacity(values.len() - period);
    out.push(rsi_value(gain, loss));
    for change in &changes[period..] {
        gain = (gain * (p - 1.0) + change.max(0.0)) / p;
        loss = (loss * (p - 1.0) + (-change).max(0.0)) / p;
        out.push(rsi_value(gain, loss));
    }
    Ok(out)
}

fn rsi_value(gain: f64, loss: f64) -> f64 {
    match (gain == 0.0, loss == 0.0) {
        (true, true) => 50.0,
        (_, true) => 100.0,
        _ => 100.0 - 100.0 / (1.0 + gain / loss),
    }
}

pub struct Macd {
    pub macd: IndicatorValues,
    pub signal: IndicatorValues,
    pub histogram: IndicatorValues,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Result<Macd, IndicatorError> {
    check_period("fastPeriod", fast)?;
    check_period("slowPeriod", slow)?;
    check_period("signalPeriod", signal)?;
    require(values.len(), fast.max(slow) + signal - 1)?;
    let fast_line = ema(values, fast)?;
    let slow_line = ema(values, slow)?;
    let len = fast_line.len().min(slow_line.len());
    let macd: Vec<f64> = align_tail(&fast_line, len)
        .iter()
        .zip(align_tail(&slow_line, len))
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd, signal)?;
    let histogram = align_tail(&macd, signal_line.len())
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();
    Ok(Macd { macd, signal: signal_line, histogram })
}

pub struct Stochastic {
    pub k: IndicatorValues,
    pub d: IndicatorValues,
}

/// %K over `k_period`, %D as its SMA over `d_period`. A flat window reads 50.
pub fn stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> Result<Stochastic, IndicatorError> {
    check_period("kPeriod", k_period)?;
    check_period("dPeriod", d_period)?;
    require(candles.len(), k_period + d_period - 1)?;
    let k: Vec<f64> = candles
        .windows(k_period)
        .map(|window| {
            let (lo, hi) = window
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c.low()), hi.max(c.high())));
            let close = window[window.len() - 1].close();
            if hi == lo { 50.0 } else { 100.0 * (close - lo) / (hi - lo) }
        })
        .collect();
    let d = sma(&k, d_period)?;
    Ok(Stochastic { k, d })
}

/// Commodity channel index with the 0.015 constant. Zero mean deviation reads 0.
pub fn cci(candles: &[Candle], period: usize) -> Result<IndicatorValues, IndicatorError> {
    check_period("period", period)?;
    require(candles.len(), period)?;
    let typical: Vec<f64> = candles.iter().map(Candle::typical_price).collect();
    Ok(typical
        .windows(period)
        .map(|window| {
            let mean = window.iter().sum::<f64>() / period as f64;
            let deviation = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
            let current = window[period - 1];
            if deviation == 0.0 { 0.0 } else { (current - mean) / (0.015 * deviation) }
        })
        .collect())
}

/// Money flow index, first value at index `period`
pub fn mfi(candles: &[Candle], period: usize) -> Result<IndicatorValues, IndicatorError> {
    check_period("period", period)?;
    require(candles.len(), period + 1)?;
    let typical: Vec<f64> = candles.iter().map(Candle::typical_price).collect();
    // signed money flow of candle i relative to i - 1, for i >= 1
    let flows: Vec<(f64, f64)> = (1..candles.len())
        .map(|i| {
            let flow = typical[i] * candles[i].volume();
            if typical[i] > typical[i - 1] {
                (flow, 0.0)
            } else if typical[i] < typical[i - 1] {
                (0.0, flow)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();
    Ok(flows
        .windows(period)
        .map(|window| {
            let positive: f64 = window.iter().map(|f| f.0).sum();
            let negative: f64 = window.iter().map(|f| f.1).sum();
            match (positive == 0.0, negative == 0.0) {
                (true, true) => 50.0,
                (_, true) => 100.0,
                _ => 100.0 - 100.0 / (1.0 + positive / negative),
            }
        })
        .collect())
}

/// On-balance volume starting at zero
pub fn obv(candles: &[Candle]) -> Result<IndicatorValues, IndicatorError> {
    require(candles.len(), 1)?;
    let mut total = 0.0;
    let mut out = Vec::with_capacity(candles.len());
    out.push(total);
    for pair in candles.windows(2) {
        if pair[1].close() > pair[0].close() {
            total += pair[1].volume();
        } else if pair[1].close() < pair[0].close() {
            total -= pair[1].volume();
        }
        out.push(total);
    }
    Ok(out)
}

pub struct Adx {
    pub adx: IndicatorValues,
    pub plus_di: IndicatorValues,
    pub minus_di: IndicatorValues,
}

/// Average directional index with Wilder smoothing.
///
/// +DI/-DI start at index `period`, ADX at `2 * period - 1`.
pub fn adx(candles: &[Candle], period: usize) -> Result<Adx, IndicatorError> {
    check_period("period", period)?;
    require(candles.len(), 2 * period)?;
    let tr = true_ranges(candles);
    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    for pair in candles.windows(2) {
        let up = pair[1].high() - pair[0].high();
        let down = pair[0].low() - pair[1].low();
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }
    let tr = &tr[1..];
    let p = period as f64;

    let mut tr_s: f64 = tr[..period].iter().sum();
    let mut plus_s: f64 = plus_dm[..period].iter().sum();
    let mut minus_s: f64 = minus_dm[..period].iter().sum();
    let mut plus_di = Vec::with_capacity(tr.len() - period + 1);
    let mut minus_di = Vec::with_capacity(tr.len() - period + 1);
    let mut dx = Vec::with_capacity(tr.len() - period + 1);

    for i in (period - 1)..tr.len() {
        if i >= period {
            tr_s = tr_s - tr_s / p + tr[i];
            plus_s = plus_s - plus_s / p + plus_dm[i];
            minus_s = minus_s - minus_s / p + minus_dm[i];
        }
        let (pdi, mdi) = if tr_s == 0.0 { (0.0, 0.0) } else { (100.0 * plus_s / tr_s, 100.0 * minus_s / tr_s) };
        plus_di.push(pdi);
        minus_di.push(mdi);
        dx.push(if pdi + mdi == 0.0 { 0.0 } else { 100.0 * (pdi - mdi).abs() / (pdi + mdi) });
    }

    let mut value = dx[..period].iter().sum::<f64>() / p;
    let mut adx = Vec::with_capacity(dx.len() - period + 1);
    adx.push(value);
    for d in &dx[period..] {
        value = (value * (p - 1.0) + d) / p;
        adx.push(value);
    }
    Ok(Adx { adx, plus_di, minus_di })
}
