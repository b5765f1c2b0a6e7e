use crate::domain::chart::Theme;
use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Pixel margins around the plotting area. The right margin hosts the price axis,
/// the bottom margin the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self { top: 10.0, right: 70.0, bottom: 28.0, left: 10.0 }
    }
}

/// Tunables for the whole chart. Every field has a default, so partial JSON is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    /// Zoom change per wheel pixel, relative to the current zoom
    pub wheel_zoom_sensitivity: f64,
    pub margins: Margins,
    pub price_tick_spacing_px: f64,
    pub time_tick_spacing_px: f64,
    pub hit_tolerance_px: f64,
    pub anchor_radius_px: f64,
    pub text_hit_radius_px: f64,
    pub price_line_tolerance_px: f64,
    /// Smallest price move that counts as a price-line change
    pub price_line_epsilon: f64,
    /// Pointer travel under which a press/release pair is a click
    pub click_slop_px: f64,
    pub history_preload_threshold: usize,
    pub history_page_limit: u32,
    /// Height of one separate-indicator panel as a share of the plot height
    pub sub_panel_ratio: f64,
    pub max_sub_panels: usize,
    pub theme: Theme,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 50.0,
            default_zoom: 1.0,
            wheel_zoom_sensitivity: 0.0015,
            margins: Margins::default(),
            price_tick_spacing_px: 70.0,
            time_tick_spacing_px: 100.0,
            hit_tolerance_px: 5.0,
            anchor_radius_px: 6.0,
            text_hit_radius_px: 12.0,
            price_line_tolerance_px: 8.0,
            price_line_epsilon: 0.01,
            click_slop_px: 3.0,
            history_preload_threshold: 20,
            history_page_limit: 500,
            sub_panel_ratio: 0.22,
            max_sub_panels: 3,
            theme: Theme::Dark,
        }
    }
}

impl ChartConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zoom > 0.0 && self.min_zoom.is_finite()) {
            return Err(ConfigError::Invalid(format!("minZoom must be positive, got {}", self.min_zoom)));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "minZoom {} exceeds maxZoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.default_zoom < self.min_zoom || self.default_zoom > self.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "defaultZoom {} outside [{}, {}]",
                self.default_zoom, self.min_zoom, self.max_zoom
            )));
        }
        let tolerances = [
            ("hitTolerancePx", self.hit_tolerance_px),
            ("anchorRadiusPx", self.anchor_radius_px),
            ("textHitRadiusPx", self.text_hit_radius_px),
            ("priceLineTolerancePx", self.price_line_tolerance_px),
            ("priceTickSpacingPx", self.price_tick_spacing_px),
            ("timeTickSpacingPx", self.time_tick_spacing_px),
        ];
        for (name, value) in tolerances {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.price_line_epsilon < 0.0 {
            return Err(ConfigError::Invalid("priceLineEpsilon must not be negative".into()));
        }
        if !(0.0..0.5).contains(&self.sub_panel_ratio) {
            return Err(ConfigError::Invalid(format!(
                "subPanelRatio must be in [0, 0.5), got {}",
                self.sub_panel_ratio
            )));
        }
        Ok(())
    }
}
