use super::value_objects::Color;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Value Object - color scheme. Switching only repaints.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Resolved colors for every layer
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub grid: Color,
    pub axis_text: Color,
    pub axis_background: Color,
    pub bullish: Color,
    pub bearish: Color,
    pub last_price: Color,
    pub crosshair: Color,
    pub crosshair_label: Color,
    pub selection: Color,
    pub stop_loss: Color,
    pub take_profit: Color,
    pub reference_line: Color,
    pub placeholder_text: Color,
}

impl Theme {
    pub fn palette(&self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: Color::from_hex(0x131722),
                grid: Color::from_hex(0x2a2e39),
                axis_text: Color::from_hex(0xb2b5be),
                axis_background: Color::from_hex(0x131722),
                bullish: Color::from_hex(0x26a69a),
                bearish: Color::from_hex(0xef5350),
                last_price: Color::from_hex(0xf0b90b),
                crosshair: Color::from_hex(0x758696),
                crosshair_label: Color::from_hex(0x363a45),
                selection: Color::from_hex(0x2962ff),
                stop_loss: Color::from_hex(0xef5350),
                take_profit: Color::from_hex(0x26a69a),
                reference_line: Color::from_hex(0x787b86).with_alpha(0.6),
                placeholder_text: Color::from_hex(0x787b86),
            },
            Theme::Light => Palette {
                background: Color::WHITE,
                grid: Color::from_hex(0xe0e3eb),
                axis_text: Color::from_hex(0x131722),
                axis_background: Color::WHITE,
                bullish: Color::from_hex(0x089981),
                bearish: Color::from_hex(0xf23645),
                last_price: Color::from_hex(0xff9800),
                crosshair: Color::from_hex(0x9598a1),
                crosshair_label: Color::from_hex(0x131722),
                selection: Color::from_hex(0x2962ff),
                stop_loss: Color::from_hex(0xf23645),
                take_profit: Color::from_hex(0x089981),
                reference_line: Color::from_hex(0x9598a1).with_alpha(0.6),
                placeholder_text: Color::from_hex(0x787b86),
            },
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn theme_names_are_lowercase() {
        assert_eq!(Theme::from_str("light").unwrap(), Theme::Light);
        assert_eq!(Theme::Dark.to_string(), "dark");
        assert_eq!(serde_json::to_string(&Theme::Light).unwrap(), "\"light\"");
    }

    #[test]
    fn palettes_differ_in_background() {
        assert_ne!(Theme::Dark.palette().background, Theme::Light.palette().background);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }
}
