use serde::{Deserialize, Serialize};

/// Value Object - a point in chart space: epoch milliseconds and price
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: f64,
    pub price: f64,
}

impl ChartPoint {
    pub fn new(timestamp: f64, price: f64) -> Self {
        Self { timestamp, price }
    }

    pub fn is_finite(&self) -> bool {
        self.timestamp.is_finite() && self.price.is_finite()
    }

    pub fn translate(&self, delta_time: f64, delta_price: f64) -> Self {
        Self::new(self.timestamp + delta_time, self.price + delta_price)
    }
}

/// Value Object - a point in canvas pixels, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: CanvasPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Value Object - axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Normalised rectangle spanning two corners in any order
    pub fn from_corners(a: CanvasPoint, b: CanvasPoint) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, point: CanvasPoint) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn inflate(&self, by: f64) -> Self {
        Self::new(self.x - by, self.y - by, self.width + 2.0 * by, self.height + 2.0 * by)
    }
}

/// Value Object - candle index window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end: end.max(start) }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// Value Object - vertical value range, always `min < max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

impl PriceRange {
    /// Build a range, substituting a synthetic one around the midpoint when degenerate
    pub fn new(min: f64, max: f64) -> Self {
        if !min.is_finite() || !max.is_finite() {
            return Self::default();
        }
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        if hi - lo > f64::EPSILON * hi.abs().max(1.0) {
            return Self { min: lo, max: hi };
        }
        let mid = (lo + hi) / 2.0;
        let half = (mid.abs() * 0.005).max(0.5);
        Self { min: mid - half, max: mid + half }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Zoom-adaptive padding: `clamp(0.1 / sqrt(zoom), 0.02, 0.1)` of the span on each side
    pub fn padded(&self, zoom: f64) -> Self {
        let ratio = (0.1 / zoom.max(f64::MIN_POSITIVE).sqrt()).clamp(0.02, 0.1);
        let pad = self.span() * ratio;
        Self::new(self.min - pad, self.max + pad)
    }
}

/// Value Object - Color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self::rgb(((hex >> 16) & 0xFF) as u8, ((hex >> 8) & 0xFF) as u8, (hex & 0xFF) as u8)
    }

    pub fn with_alpha(&self, alpha: f32) -> Self {
        Self { a: alpha.clamp(0.0, 1.0), ..*self }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut digits = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
                Some(Self::rgb(digits.next()??, digits.next()??, digits.next()??))
            }
            6 => Some(Self::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            8 => Some(
                Self::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)
                    .with_alpha(channel(&hex[6..8])? as f32 / 255.0),
            ),
            _ => None,
        }
    }

    /// CSS color string for canvas fill/stroke styles
    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid color {value}"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        if color.a >= 1.0 {
            color.to_css()
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                color.r,
                color.g,
                color.b,
                (color.a * 255.0).round() as u8
            )
        }
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_range_gets_synthetic_span() {
        let flat = PriceRange::new(100.0, 100.0);
        assert!(flat.span() > 0.0);
        assert!(flat.contains(100.0));
        assert_eq!(PriceRange::new(f64::NAN, 3.0), PriceRange::default());
        assert_eq!(PriceRange::new(0.0, 0.0), PriceRange { min: -0.5, max: 0.5 });
    }

    #[test]
    fn padding_shrinks_with_zoom() {
        let range = PriceRange::new(100.0, 200.0);
        assert_eq!(range.padded(1.0), PriceRange::new(90.0, 210.0));
        assert_eq!(range.padded(100.0), PriceRange::new(98.0, 202.0));
    }

    #[test]
    fn colors_parse_and_print() {
        assert_eq!(Color::parse("#26a69a"), Some(Color::from_hex(0x26a69a)));
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("26a69a"), None);
        assert_eq!(Color::from_hex(0x2962ff).with_alpha(0.5).to_css(), "rgba(41, 98, 255, 0.5)");
        let json = serde_json::to_string(&Color::from_hex(0xef5350)).unwrap();
        assert_eq!(json, "\"#ef5350\"");
    }

    #[test]
    fn rect_from_corners_normalises() {
        let rect = Rect::from_corners(CanvasPoint::new(10.0, 40.0), CanvasPoint::new(2.0, 5.0));
        assert_eq!(rect, Rect::new(2.0, 5.0, 8.0, 35.0));
        assert!(rect.contains(CanvasPoint::new(10.0, 40.0)));
        assert!(!rect.contains(CanvasPoint::new(10.5, 40.0)));
    }
}
