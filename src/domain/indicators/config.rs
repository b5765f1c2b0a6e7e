use crate::domain::chart::Color;
use crate::domain::errors::IndicatorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Named numeric parameters, ordered so equal maps hash and print identically
pub type IndicatorParams = BTreeMap<String, f64>;

/// Closed catalog of supported indicators
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorType {
    Sma,
    Ema,
    Wma,
    BollingerBands,
    Vwap,
    ParabolicSar,
    Ichimoku,
    KeltnerChannels,
    Rsi,
    Macd,
    Stochastic,
    Atr,
    Cci,
    Mfi,
    Obv,
    Adx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DisplayType {
    Overlay,
    Separate,
}

impl IndicatorType {
    pub fn default_params(&self) -> &'static [(&'static str, f64)] {
        match self {
            Self::Sma => &[("period", 20.0)],
            Self::Ema => &[("period", 20.0)],
            Self::Wma => &[("period", 20.0)],
            Self::BollingerBands => &[("period", 20.0), ("stdDev", 2.0)],
            Self::Vwap => &[],
            Self::ParabolicSar => &[("step", 0.02), ("maxStep", 0.2)],
            Self::Ichimoku => &[
                ("conversionPeriod", 9.0),
                ("basePeriod", 26.0),
                ("spanBPeriod", 52.0),
                ("displacement", 26.0),
            ],
            Self::KeltnerChannels => &[("emaPeriod", 20.0), ("atrPeriod", 10.0), ("multiplier", 2.0)],
            Self::Rsi => &[("period", 14.0)],
            Self::Macd => &[("fastPeriod", 12.0), ("slowPeriod", 26.0), ("signalPeriod", 9.0)],
            Self::Stochastic => &[("kPeriod", 14.0), ("dPeriod", 3.0)],
            Self::Atr => &[("period", 14.0)],
            Self::Cci => &[("period", 20.0)],
            Self::Mfi => &[("period", 14.0)],
            Self::Obv => &[],
            Self::Adx => &[("period", 14.0)],
        }
    }

    pub fn default_display(&self) -> DisplayType {
        match self {
            Self::Sma
            | Self::Ema
            | Self::Wma
            | Self::BollingerBands
            | Self::Vwap
            | Self::ParabolicSar
            | Self::Ichimoku
            | Self::KeltnerChannels => DisplayType::Overlay,
            Self::Rsi | Self::Macd | Self::Stochastic | Self::Atr | Self::Cci | Self::Mfi | Self::Obv | Self::Adx => {
                DisplayType::Separate
            }
        }
    }

    pub fn default_color(&self) -> Color {
        Color::from_hex(match self {
            Self::Sma => 0x2962ff,
            Self::Ema => 0xff6d00,
            Self::Wma => 0x00bcd4,
            Self::BollingerBands => 0x9c27b0,
            Self::Vwap => 0xe91e63,
            Self::ParabolicSar => 0xffeb3b,
            Self::Ichimoku => 0x2196f3,
            Self::KeltnerChannels => 0x4caf50,
            Self::Rsi => 0x7e57c2,
            Self::Macd => 0x2962ff,
            Self::Stochastic => 0x00897b,
            Self::Atr => 0xb71c1c,
            Self::Cci => 0x795548,
            Self::Mfi => 0x3f51b5,
            Self::Obv => 0x607d8b,
            Self::Adx => 0xff5722,
        })
    }

    /// Fixed horizontal guides drawn in the indicator's panel
    pub fn reference_lines(&self) -> &'static [f64] {
        match self {
            Self::Rsi => &[30.0, 50.0, 70.0],
            Self::Stochastic => &[20.0, 50.0, 80.0],
            Self::Mfi => &[20.0, 50.0, 80.0],
            Self::Cci => &[-100.0, 0.0, 100.0],
            Self::Adx => &[20.0, 25.0],
            Self::Macd => &[0.0],
            _ => &[],
        }
    }

    /// Oscillators bounded to [0, 100] keep that scale in their panel
    pub fn fixed_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Rsi | Self::Stochastic | Self::Mfi => Some((0.0, 100.0)),
            _ => None,
        }
    }

    /// Short lowercase prefix for generated ids
    pub fn slug(&self) -> String {
        self.as_ref().to_lowercase().replace('_', "-")
    }

    pub fn label(&self, params: &IndicatorParams) -> String {
        let values: Vec<String> = self
            .default_params()
            .iter()
            .filter_map(|(name, _)| params.get(*name))
            .map(|v| format_param(*v))
            .collect();
        if values.is_empty() { self.to_string() } else { format!("{} ({})", self, values.join(", ")) }
    }
}

fn format_param(value: f64) -> String {
    if value.fract() == 0.0 { format!("{}", value as i64) } else { format!("{value}") }
}

/// One indicator instance on the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub indicator_type: IndicatorType,
    pub enabled: bool,
    pub display_type: DisplayType,
    pub color: Color,
    pub line_width: f64,
    #[serde(default)]
    pub params: IndicatorParams,
}

impl IndicatorConfig {
    pub fn new(id: impl Into<String>, indicator_type: IndicatorType) -> Self {
        Self {
            id: id.into(),
            indicator_type,
            enabled: true,
            display_type: indicator_type.default_display(),
            color: indicator_type.default_color(),
            line_width: 1.5,
            params: defaults_for(indicator_type),
        }
    }

    /// Rebuild a saved config: current defaults first, then the saved values that are
    /// still known parameters of the type.
    pub fn restore(saved: IndicatorConfig) -> Self {
        let mut params = defaults_for(saved.indicator_type);
        for (name, value) in saved.params {
            if let Some(slot) = params.get_mut(&name) {
                *slot = value;
            }
        }
        Self { params, ..saved }
    }

    /// Merge `overrides` into the params. Rejected as a whole when any value is invalid.
    pub fn update_params(&mut self, overrides: &IndicatorParams) -> Result<(), IndicatorError> {
        let mut merged = defaults_for(self.indicator_type);
        merged.extend(self.params.iter().map(|(k, v)| (k.clone(), *v)));
        for (name, value) in overrides {
            if !merged.contains_key(name) {
                return Err(IndicatorError::InvalidParam { name: name.clone(), value: *value });
            }
            merged.insert(name.clone(), *value);
        }
        validate_params(&merged)?;
        self.params = merged;
        Ok(())
    }

    pub fn param(&self, name: &str) -> f64 {
        self.params.get(name).copied().unwrap_or_else(|| {
            self.indicator_type
                .default_params()
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v)
                .unwrap_or(f64::NAN)
        })
    }

    /// Integer window length, at least 1
    pub fn period(&self, name: &str) -> Result<usize, IndicatorError> {
        let value = self.param(name);
        if !value.is_finite() || value < 1.0 {
            return Err(IndicatorError::InvalidParam { name: name.to_string(), value });
        }
        Ok(value.round() as usize)
    }

    pub fn label(&self) -> String {
        self.indicator_type.label(&self.params)
    }
}

pub fn defaults_for(indicator_type: IndicatorType) -> IndicatorParams {
    indicator_type.default_params().iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn validate_params(params: &IndicatorParams) -> Result<(), IndicatorError> {
    match params.iter().find(|(_, v)| !v.is_finite() || **v <= 0.0) {
        Some((name, value)) => Err(IndicatorError::InvalidParam { name: name.clone(), value: *value }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_uses_catalog_defaults() {
        let config = IndicatorConfig::new("macd-1", IndicatorType::Macd);
        assert_eq!(config.display_type, DisplayType::Separate);
        assert_eq!(config.param("slowPeriod"), 26.0);
        assert_eq!(config.label(), "MACD (12, 26, 9)");
    }

    #[test]
    fn restore_merges_saved_over_current_defaults() {
        let saved: IndicatorConfig = serde_json::from_str(
            r##"{"id": "bb-1", "type": "BOLLINGER_BANDS", "enabled": true, "displayType": "overlay",
                "color": "#9c27b0", "lineWidth": 1, "params": {"period": 30, "legacy": 7}}"##,
        )
        .unwrap();
        let restored = IndicatorConfig::restore(saved);
        assert_eq!(restored.param("period"), 30.0);
        assert_eq!(restored.param("stdDev"), 2.0);
        assert!(!restored.params.contains_key("legacy"));
    }

    #[test]
    fn invalid_override_leaves_params_untouched() {
        let mut config = IndicatorConfig::new("rsi-1", IndicatorType::Rsi);
        let bad: IndicatorParams = [("period".to_string(), -3.0)].into_iter().collect();
        assert!(config.update_params(&bad).is_err());
        assert_eq!(config.param("period"), 14.0);

        let good: IndicatorParams = [("period".to_string(), 21.0)].into_iter().collect();
        config.update_params(&good).unwrap();
        assert_eq!(config.period("period").unwrap(), 21);
    }

    #[test]
    fn slugs_are_kebab_case() {
        assert_eq!(IndicatorType::BollingerBands.slug(), "bollinger-bands");
        assert_eq!(IndicatorType::Sma.to_string(), "SMA");
    }
}
