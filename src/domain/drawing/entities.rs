use crate::domain::chart::{ChartPoint, Color};
use crate::domain::errors::DrawingError;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Closed set of drawing tools
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DrawingKind {
    TrendLine,
    HorizontalLine,
    VerticalLine,
    Rectangle,
    Fibonacci,
    Text,
    Arrow,
    Channel,
}

impl DrawingKind {
    /// Number of anchor points the tool needs
    pub fn point_count(&self) -> usize {
        match self {
            Self::HorizontalLine | Self::VerticalLine | Self::Text => 1,
            Self::TrendLine | Self::Rectangle | Self::Fibonacci | Self::Arrow => 2,
            Self::Channel => 3,
        }
    }

    pub fn default_style(&self) -> DrawingStyle {
        let base = DrawingStyle::default();
        match self {
            Self::Rectangle => DrawingStyle { fill: Some(base.color.with_alpha(0.15)), ..base },
            Self::Channel => DrawingStyle { fill: Some(Color::from_hex(0x26a69a).with_alpha(0.1)), ..base },
            Self::Fibonacci => DrawingStyle { color: Color::from_hex(0x787b86), ..base },
            Self::HorizontalLine | Self::VerticalLine => DrawingStyle { dashed: true, ..base },
            Self::Text => DrawingStyle { color: Color::from_hex(0xd1d4dc), ..base },
            Self::TrendLine | Self::Arrow => base,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawingStyle {
    pub color: Color,
    pub line_width: f64,
    pub dashed: bool,
    pub fill: Option<Color>,
    pub font_size: f64,
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self { color: Color::from_hex(0x2962ff), line_width: 2.0, dashed: false, fill: None, font_size: 14.0 }
    }
}

/// Geometry of a drawing. Point arrays make the cardinality part of the type.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawingShape {
    TrendLine { points: [ChartPoint; 2] },
    HorizontalLine { points: [ChartPoint; 1] },
    VerticalLine { points: [ChartPoint; 1] },
    Rectangle { points: [ChartPoint; 2] },
    Fibonacci { points: [ChartPoint; 2] },
    Text { points: [ChartPoint; 1], content: String },
    Arrow { points: [ChartPoint; 2] },
    /// Main line through the first two points, parallel line through the third
    Channel { points: [ChartPoint; 3] },
}

impl DrawingShape {
    pub fn from_points(kind: DrawingKind, points: &[ChartPoint], text: Option<String>) -> Result<Self, DrawingError> {
        let wrong = || DrawingError::WrongPointCount {
            kind: kind.to_string(),
            expected: kind.point_count(),
            actual: points.len(),
        };
        if points.len() != kind.point_count() {
            return Err(wrong());
        }
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(DrawingError::InvalidState(format!(
                "non-finite point ({}, {})",
                bad.timestamp, bad.price
            )));
        }
        let two = || -> Result<[ChartPoint; 2], DrawingError> { points.try_into().map_err(|_| wrong()) };
        let one = || -> Result<[ChartPoint; 1], DrawingError> { points.try_into().map_err(|_| wrong()) };
        Ok(match kind {
            DrawingKind::TrendLine => Self::TrendLine { points: two()? },
            DrawingKind::HorizontalLine => Self::HorizontalLine { points: one()? },
            DrawingKind::VerticalLine => Self::VerticalLine { points: one()? },
            DrawingKind::Rectangle => Self::Rectangle { points: two()? },
            DrawingKind::Fibonacci => Self::Fibonacci { points: two()? },
            DrawingKind::Text => Self::Text { points: one()?, content: text.unwrap_or_default() },
            DrawingKind::Arrow => Self::Arrow { points: two()? },
            DrawingKind::Channel => Self::Channel { points: points.try_into().map_err(|_| wrong())? },
        })
    }

    pub fn kind(&self) -> DrawingKind {
        match self {
            Self::TrendLine { .. } => DrawingKind::TrendLine,
            Self::HorizontalLine { .. } => DrawingKind::HorizontalLine,
            Self::VerticalLine { .. } => DrawingKind::VerticalLine,
            Self::Rectangle { .. } => DrawingKind::Rectangle,
            Self::Fibonacci { .. } => DrawingKind::Fibonacci,
            Self::Text { .. } => DrawingKind::Text,
            Self::Arrow { .. } => DrawingKind::Arrow,
            Self::Channel { .. } => DrawingKind::Channel,
        }
    }

    pub fn points(&self) -> &[ChartPoint] {
        match self {
            Self::TrendLine { points } | Self::Rectangle { points } | Self::Fibonacci { points } | Self::Arrow { points } => {
                &points[..]
            }
            Self::HorizontalLine { points } | Self::VerticalLine { points } | Self::Text { points, .. } => &points[..],
            Self::Channel { points } => &points[..],
        }
    }

    pub fn points_mut(&mut self) -> &mut [ChartPoint] {
        match self {
            Self::TrendLine { points } | Self::Rectangle { points } | Self::Fibonacci { points } | Self::Arrow { points } => {
                &mut points[..]
            }
            Self::HorizontalLine { points } | Self::VerticalLine { points } | Self::Text { points, .. } => &mut points[..],
            Self::Channel { points } => &mut points[..],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { content, .. } => Some(content.as_str()),
            _ => None,
        }
    }
}

/// Fibonacci retracement ratios
pub const FIB_LEVELS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Price of a retracement level: 0 at the second point, 1 at the first
pub fn fib_level_price(start: ChartPoint, end: ChartPoint, level: f64) -> f64 {
    end.price + (start.price - end.price) * level
}

/// Entity - a user annotation
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub id: String,
    pub shape: DrawingShape,
    pub style: DrawingStyle,
    pub locked: bool,
    pub visible: bool,
    pub z_index: usize,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Drawing {
    pub fn new(id: impl Into<String>, shape: DrawingShape, z_index: usize, now: u64) -> Self {
        let style = shape.kind().default_style();
        Self { id: id.into(), shape, style, locked: false, visible: true, z_index, created_at: now, updated_at: now }
    }

    pub fn kind(&self) -> DrawingKind {
        self.shape.kind()
    }

    pub fn points(&self) -> &[ChartPoint] {
        self.shape.points()
    }

    /// Shift every point by a chart-space delta
    pub fn translate(&mut self, delta_time: f64, delta_price: f64) {
        for point in self.shape.points_mut() {
            *point = point.translate(delta_time, delta_price);
        }
    }

    pub fn set_point(&mut self, anchor: usize, point: ChartPoint) -> Result<(), DrawingError> {
        let id = self.id.clone();
        let slot = self
            .shape
            .points_mut()
            .get_mut(anchor)
            .ok_or(DrawingError::AnchorOutOfRange { id, anchor })?;
        *slot = point;
        Ok(())
    }
}

/// Flat serialized form `{id, type, points, style, locked, visible, zIndex, createdAt, updatedAt, text?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DrawingKind,
    pub points: Vec<ChartPoint>,
    #[serde(default)]
    pub style: Option<DrawingStyle>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub z_index: usize,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn default_visible() -> bool {
    true
}

impl TryFrom<DrawingRecord> for Drawing {
    type Error = DrawingError;

    fn try_from(record: DrawingRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err(DrawingError::Import("drawing without id".into()));
        }
        let shape = DrawingShape::from_points(record.kind, &record.points, record.text)?;
        Ok(Drawing {
            id: record.id,
            style: record.style.unwrap_or_else(|| record.kind.default_style()),
            shape,
            locked: record.locked,
            visible: record.visible,
            z_index: record.z_index,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl From<&Drawing> for DrawingRecord {
    fn from(drawing: &Drawing) -> Self {
        DrawingRecord {
            id: drawing.id.clone(),
            kind: drawing.kind(),
            points: drawing.points().to_vec(),
            style: Some(drawing.style.clone()),
            locked: drawing.locked,
            visible: drawing.visible,
            z_index: drawing.z_index,
            created_at: drawing.created_at,
            updated_at: drawing.updated_at,
            text: drawing.shape.text().map(str::to_string),
        }
    }
}

impl Serialize for Drawing {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DrawingRecord::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Drawing {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = DrawingRecord::deserialize(deserializer)?;
        Drawing::try_from(record).map_err(serde::de::Error::custom)
    }
}
