use super::calculations as calc;
use super::config::{DisplayType, IndicatorConfig, IndicatorParams, IndicatorType};
use super::result::{IndicatorResult, LineKind};
use crate::domain::errors::IndicatorError;
use crate::domain::logging::{LogComponent, get_logger};
use crate::domain::market_data::{Candle, CandleSeries};
use crate::log_debug;
use std::collections::{BTreeSet, HashMap};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Compute one indicator over the full candle array
pub fn compute(config: &IndicatorConfig, candles: &[Candle]) -> Result<IndicatorResult, IndicatorError> {
    let closes = || calc::closes(candles);
    let mut result = match config.indicator_type {
        IndicatorType::Sma => IndicatorResult::single("sma", calc::sma(&closes(), config.period("period")?)?),
        IndicatorType::Ema => IndicatorResult::single("ema", calc::ema(&closes(), config.period("period")?)?),
        IndicatorType::Wma => IndicatorResult::single("wma", calc::wma(&closes(), config.period("period")?)?),
        IndicatorType::BollingerBands => {
            let bands = calc::bollinger(&closes(), config.period("period")?, config.param("stdDev"))?;
            IndicatorResult::single("middle", bands.middle)
                .with_line("upper", bands.upper)
                .with_line("lower", bands.lower)
        }
        IndicatorType::Vwap => IndicatorResult::single("vwap", calc::vwap(candles)?),
        IndicatorType::ParabolicSar => IndicatorResult::single(
            "sar",
            calc::parabolic_sar(candles, config.param("step"), config.param("maxStep"))?,
        ),
        IndicatorType::Ichimoku => {
            let cloud = calc::ichimoku(
                candles,
                config.period("conversionPeriod")?,
                config.period("basePeriod")?,
                config.period("spanBPeriod")?,
                config.period("displacement")?,
            )?;
            IndicatorResult::single("conversion", cloud.conversion)
                .with_line("base", cloud.base)
                .with_line("spanA", cloud.span_a)
                .with_line("spanB", cloud.span_b)
        }
        IndicatorType::KeltnerChannels => {
            let bands = calc::keltner(
                candles,
                config.period("emaPeriod")?,
                config.period("atrPeriod")?,
                config.param("multiplier"),
            )?;
            IndicatorResult::single("middle", bands.middle)
                .with_line("upper", bands.upper)
                .with_line("lower", bands.lower)
        }
        IndicatorType::Rsi => IndicatorResult::single("rsi", calc::rsi(&closes(), config.period("period")?)?),
        IndicatorType::Macd => {
            let macd = calc::macd(
                &closes(),
                config.period("fastPeriod")?,
                config.period("slowPeriod")?,
                config.period("signalPeriod")?,
            )?;
            IndicatorResult::single("macd", macd.macd)
                .with_line("signal", macd.signal)
                .with_line("histogram", macd.histogram)
        }
        IndicatorType::Stochastic => {
            let stoch = calc::stochastic(candles, config.period("kPeriod")?, config.period("dPeriod")?)?;
            IndicatorResult::single("k", stoch.k).with_line("d", stoch.d)
        }
        IndicatorType::Atr => IndicatorResult::single("atr", calc::atr(candles, config.period("period")?)?),
        IndicatorType::Cci => IndicatorResult::single("cci", calc::cci(candles, config.period("period")?)?),
        IndicatorType::Mfi => IndicatorResult::single("mfi", calc::mfi(candles, config.period("period")?)?),
        IndicatorType::Obv => IndicatorResult::single("obv", calc::obv(candles)?),
        IndicatorType::Adx => {
            let adx = calc::adx(candles, config.period("period")?)?;
            IndicatorResult::single("adx", adx.adx)
                .with_line("plusDi", adx.plus_di)
                .with_line("minusDi", adx.minus_di)
        }
    };
    apply_line_styles(config.indicator_type, &mut result);
    Ok(result)
}

/// Per-component styling of multi-line indicators
pub fn apply_line_styles(indicator_type: IndicatorType, result: &mut IndicatorResult) {
    for line in result.lines_mut() {
        match (indicator_type, line.name.as_str()) {
            (IndicatorType::Macd, "histogram") => line.kind = LineKind::Histogram,
            (IndicatorType::ParabolicSar, _) => line.kind = LineKind::Dots,
            (IndicatorType::BollingerBands | IndicatorType::KeltnerChannels, "upper" | "lower") => line.dashed = true,
            (IndicatorType::Stochastic, "d") | (IndicatorType::Macd, "signal") => line.dashed = true,
            (IndicatorType::Ichimoku, "spanA" | "spanB") => line.dashed = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    indicator_type: IndicatorType,
    params: Vec<(String, u64)>,
    revision: u64,
    candle_count: usize,
}

impl CacheKey {
    fn new(config: &IndicatorConfig, series: &CandleSeries) -> Self {
        Self {
            indicator_type: config.indicator_type,
            params: config.params.iter().map(|(k, v)| (k.clone(), v.to_bits())).collect(),
            revision: series.revision(),
            candle_count: series.len(),
        }
    }
}

/// One indicator ready to draw
#[derive(Debug, Clone)]
pub struct ComputedIndicator {
    pub config: IndicatorConfig,
    pub result: IndicatorResult,
    /// Sub-panel slot for separate indicators
    pub panel: Option<usize>,
}

/// Output of one engine update
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    pub indicators: Vec<ComputedIndicator>,
    /// Ids whose series appeared since the previous update
    pub created: Vec<String>,
    /// Ids whose series vanished since the previous update and were disposed
    pub disposed: Vec<String>,
}

impl IndicatorFrame {
    pub fn overlays(&self) -> impl Iterator<Item = &ComputedIndicator> {
        self.indicators.iter().filter(|i| i.panel.is_none())
    }

    pub fn panel_count(&self) -> usize {
        self.indicators.iter().filter_map(|i| i.panel).max().map_or(0, |p| p + 1)
    }
}

/// Owns indicator configs, caches their results and tracks which series are rendered
#[derive(Debug, Default)]
pub struct IndicatorEngine {
    configs: Vec<IndicatorConfig>,
    precomputed: HashMap<String, IndicatorResult>,
    cache: HashMap<String, (CacheKey, IndicatorResult)>,
    rendered: BTreeSet<String>,
    next_id: u64,
    max_sub_panels: usize,
}

impl IndicatorEngine {
    pub fn new(max_sub_panels: usize) -> Self {
        Self { max_sub_panels, ..Default::default() }
    }

    /// Add an indicator with catalog defaults and return its id
    pub fn add(&mut self, indicator_type: IndicatorType) -> String {
        self.next_id += 1;
        let id = format!("{}-{}", indicator_type.slug(), self.next_id);
        self.configs.push(IndicatorConfig::new(id.clone(), indicator_type));
        log_debug!(LogComponent::Domain("IndicatorEngine"), "added {}", id);
        id
    }

    /// Insert a saved config, params merged over current defaults. Replaces a config with the same id.
    pub fn restore(&mut self, saved: IndicatorConfig) {
        let config = IndicatorConfig::restore(saved);
        self.cache.remove(&config.id);
        match self.configs.iter_mut().find(|c| c.id == config.id) {
            Some(existing) => *existing = config,
            None => self.configs.push(config),
        }
    }

    pub fn remove(&mut self, id: &str) -> Result<IndicatorConfig, IndicatorError> {
        let position = self.position(id)?;
        self.cache.remove(id);
        self.precomputed.remove(id);
        Ok(self.configs.remove(position))
    }

    pub fn toggle(&mut self, id: &str, enabled: bool) -> Result<(), IndicatorError> {
        let position = self.position(id)?;
        self.configs[position].enabled = enabled;
        Ok(())
    }

    pub fn update_params(&mut self, id: &str, params: &IndicatorParams) -> Result<(), IndicatorError> {
        let position = self.position(id)?;
        self.configs[position].update_params(params)?;
        self.cache.remove(id);
        Ok(())
    }

    pub fn set_display_type(&mut self, id: &str, display_type: DisplayType) -> Result<(), IndicatorError> {
        let position = self.position(id)?;
        self.configs[position].display_type = display_type;
        Ok(())
    }

    /// Use an externally computed result instead of computing this config
    pub fn set_precomputed(&mut self, id: &str, mut result: IndicatorResult) -> Result<(), IndicatorError> {
        let position = self.position(id)?;
        apply_line_styles(self.configs[position].indicator_type, &mut result);
        self.precomputed.insert(id.to_string(), result);
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.configs.clear();
        self.cache.clear();
        self.precomputed.clear();
    }

    pub fn configs(&self) -> &[IndicatorConfig] {
        &self.configs
    }

    pub fn get(&self, id: &str) -> Option<&IndicatorConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    pub fn rendered_ids(&self) -> Vec<String> {
        self.rendered.iter().cloned().collect()
    }

    /// Number of separate panels the next frame will need
    pub fn sub_panel_count(&self) -> usize {
        self.configs
            .iter()
            .filter(|c| c.enabled && c.display_type == DisplayType::Separate)
            .count()
            .min(self.max_sub_panels)
    }

    fn position(&self, id: &str) -> Result<usize, IndicatorError> {
        self.configs
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| IndicatorError::UnknownIndicator(id.to_string()))
    }

    /// Compute every enabled config against `series` and diff against the rendered set.
    ///
    /// A failing indicator is logged and left out of this frame; the others are unaffected.
    pub fn update(&mut self, series: &CandleSeries) -> IndicatorFrame {
        let candles = series.candles();
        let enabled: Vec<&IndicatorConfig> = self.configs.iter().filter(|c| c.enabled).collect();

        let misses: Vec<&IndicatorConfig> = enabled
            .iter()
            .copied()
            .filter(|c| !self.precomputed.contains_key(&c.id))
            .filter(|c| self.cache.get(&c.id).is_none_or(|(key, _)| *key != CacheKey::new(c, series)))
            .collect();

        #[cfg(feature = "parallel")]
        let fresh: Vec<(String, Result<IndicatorResult, IndicatorError>)> =
            misses.par_iter().map(|c| (c.id.clone(), compute(c, candles))).collect();
        #[cfg(not(feature = "parallel"))]
        let fresh: Vec<(String, Result<IndicatorResult, IndicatorError>)> =
            misses.iter().map(|c| (c.id.clone(), compute(c, candles))).collect();

        let mut failed = BTreeSet::new();
        let mut new_entries = Vec::new();
        for (id, outcome) in fresh {
            match outcome {
                Ok(result) => new_entries.push((id, result)),
                Err(err) => {
                    get_logger().warn(LogComponent::Domain("IndicatorEngine"), &format!("{id} skipped: {err}"));
                    failed.insert(id);
                }
            }
        }

        let mut indicators = Vec::new();
        let mut next_panel = 0;
        for config in &enabled {
            if failed.contains(&config.id) {
                continue;
            }
            let result = match self.precomputed.get(&config.id) {
                Some(result) => result.clone(),
                None => match new_entries.iter().find(|(id, _)| *id == config.id) {
                    Some((_, result)) => result.clone(),
                    None => match self.cache.get(&config.id) {
                        Some((_, result)) => result.clone(),
                        None => continue,
                    },
                },
            };
            let panel = match config.display_type {
                DisplayType::Overlay => None,
                DisplayType::Separate if next_panel < self.max_sub_panels => {
                    next_panel += 1;
                    Some(next_panel - 1)
                }
                DisplayType::Separate => {
                    get_logger().warn(
                        LogComponent::Domain("IndicatorEngine"),
                        &format!("{} hidden: all {} panels in use", config.id, self.max_sub_panels),
                    );
                    continue;
                }
            };
            indicators.push(ComputedIndicator { config: (*config).clone(), result, panel });
        }

        let keys: Vec<(String, CacheKey)> =
            misses.iter().map(|c| (c.id.clone(), CacheKey::new(c, series))).collect();
        for (id, result) in new_entries {
            if let Some((_, key)) = keys.iter().find(|(k, _)| *k == id) {
                self.cache.insert(id, (key.clone(), result));
            }
        }
        let known: BTreeSet<&str> = self.configs.iter().map(|c| c.id.as_str()).collect();
        self.cache.retain(|id, _| known.contains(id.as_str()));

        let active: BTreeSet<String> = indicators.iter().map(|i| i.config.id.clone()).collect();
        let disposed: Vec<String> = self.rendered.difference(&active).cloned().collect();
        let created: Vec<String> = active.difference(&self.rendered).cloned().collect();
        for id in &disposed {
            log_debug!(LogComponent::Domain("IndicatorEngine"), "disposed series {}", id);
        }
        self.rendered = active;

        IndicatorFrame { indicators, created, disposed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::logging::{Logger, MemoryLogger};

    fn series(n: usize) -> CandleSeries {
        let mut series = CandleSeries::new();
        series.set_candles(
            (1..=n)
                .map(|i| {
                    let close = i as f64;
                    Candle::from_values(i as u64 * 60_000, close, close + 1.0, close - 1.0, close, 5.0)
                })
                .collect(),
        );
        series
    }

    #[test]
    fn sma_twenty_on_ramp() {
        let data = series(100);
        let config = IndicatorConfig::new("sma", IndicatorType::Sma);
        let result = compute(&config, data.candles()).unwrap();
        assert_eq!(result.main.value_at(19, 100), Some(10.5));
        assert_eq!(result.main.value_at(18, 100), None);
    }

    #[test]
    fn add_then_remove_restores_rendered_set() {
        let data = series(60);
        let mut engine = IndicatorEngine::new(3);
        engine.add(IndicatorType::Ema);
        engine.update(&data);
        let before = engine.rendered_ids();

        let id = engine.add(IndicatorType::Rsi);
        let frame = engine.update(&data);
        assert_eq!(frame.created, vec![id.clone()]);

        engine.remove(&id).unwrap();
        let frame = engine.update(&data);
        assert_eq!(frame.disposed, vec![id]);
        assert_eq!(engine.rendered_ids(), before);
    }

    #[test]
    fn failing_indicator_does_not_block_others() {
        let data = series(10);
        let mut engine = IndicatorEngine::new(3);
        let sma = engine.add(IndicatorType::Sma);
        let obv = engine.add(IndicatorType::Obv);
        let frame = engine.update(&data);
        let ids: Vec<&str> = frame.indicators.iter().map(|i| i.config.id.as_str()).collect();
        assert_eq!(ids, vec![obv.as_str()]);
        assert!(!engine.rendered_ids().contains(&sma));
    }

    #[test]
    fn separate_indicators_take_panels_in_order() {
        let data = series(80);
        let mut engine = IndicatorEngine::new(2);
        engine.add(IndicatorType::Rsi);
        engine.add(IndicatorType::Sma);
        engine.add(IndicatorType::Macd);
        engine.add(IndicatorType::Atr);
        let frame = engine.update(&data);
        let panels: Vec<Option<usize>> = frame.indicators.iter().map(|i| i.panel).collect();
        assert_eq!(panels, vec![Some(0), None, Some(1)]);
        assert_eq!(frame.panel_count(), 2);
        assert_eq!(engine.sub_panel_count(), 2);
    }

    #[test]
    fn params_change_invalidates_cache() {
        let data = series(50);
        let mut engine = IndicatorEngine::new(3);
        let id = engine.add(IndicatorType::Sma);
        let first = engine.update(&data).indicators[0].result.main.values.len();
        let params: IndicatorParams = [("period".to_string(), 10.0)].into_iter().collect();
        engine.update_params(&id, &params).unwrap();
        let second = engine.update(&data).indicators[0].result.main.values.len();
        assert_eq!((first, second), (31, 41));
    }

    #[test]
    fn disabled_and_precomputed() {
        let data = series(30);
        let mut engine = IndicatorEngine::new(3);
        let id = engine.add(IndicatorType::Vwap);
        engine.set_precomputed(&id, IndicatorResult::single("main", vec![1.0, 2.0])).unwrap();
        let frame = engine.update(&data);
        assert_eq!(frame.indicators[0].result.main.values, vec![1.0, 2.0]);

        engine.toggle(&id, false).unwrap();
        assert!(engine.update(&data).indicators.is_empty());
        assert!(matches!(engine.toggle("nope", true), Err(IndicatorError::UnknownIndicator(_))));
    }

    #[test]
    fn failures_are_logged_through_the_logger_trait() {
        let logger = MemoryLogger::with_capacity(4);
        let config = IndicatorConfig::new("rsi", IndicatorType::Rsi);
        if let Err(err) = compute(&config, series(3).candles()) {
            logger.warn(LogComponent::Domain("IndicatorEngine"), &err.to_string());
        }
        assert_eq!(logger.entries()[0].message, "insufficient data: need 15 candles, have 3");
    }
}
