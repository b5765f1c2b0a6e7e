use crate::domain::chart::VisibleRange;
use crate::domain::market_data::Candle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a line is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    #[default]
    Line,
    Histogram,
    Dots,
}

/// `{time, value}`; a `null` value is a warm-up gap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub time: u64,
    pub value: Option<f64>,
}

/// One named component of an indicator, tail-aligned to the candle series.
///
/// Value `k` belongs to candle `candle_count - values.len() + k`. `NaN` marks a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorLine {
    pub name: String,
    pub values: Vec<f64>,
    pub kind: LineKind,
    pub dashed: bool,
}

impl IndicatorLine {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self { name: name.into(), values, kind: LineKind::Line, dashed: false }
    }

    /// `(candle_index, value)` pairs for finite values that fall on existing candles
    pub fn aligned(&self, candle_count: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let offset = candle_count as isize - self.values.len() as isize;
        self.values.iter().enumerate().filter_map(move |(k, value)| {
            let index = offset + k as isize;
            (index >= 0 && (index as usize) < candle_count && value.is_finite()).then_some((index as usize, *value))
        })
    }

    pub fn value_at(&self, candle_index: usize, candle_count: usize) -> Option<f64> {
        self.aligned(candle_count).find(|(i, _)| *i == candle_index).map(|(_, v)| v)
    }

    pub fn points(&self, candles: &[Candle]) -> Vec<IndicatorPoint> {
        self.aligned(candles.len())
            .map(|(i, value)| IndicatorPoint { time: candles[i].time(), value: Some(value) })
            .collect()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.iter().rev().find(|v| v.is_finite()).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorResult {
    pub main: IndicatorLine,
    pub additional: Vec<IndicatorLine>,
}

impl IndicatorResult {
    pub fn single(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self { main: IndicatorLine::new(name, values), additional: Vec::new() }
    }

    pub fn with_line(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.additional.push(IndicatorLine::new(name, values));
        self
    }

    pub fn lines(&self) -> impl Iterator<Item = &IndicatorLine> {
        std::iter::once(&self.main).chain(self.additional.iter())
    }

    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut IndicatorLine> {
        std::iter::once(&mut self.main).chain(self.additional.iter_mut())
    }

    pub fn line(&self, name: &str) -> Option<&IndicatorLine> {
        self.lines().find(|line| line.name == name)
    }

    /// Min/max over every line inside the visible window
    pub fn value_range(&self, candle_count: usize, visible: VisibleRange) -> Option<(f64, f64)> {
        self.lines()
            .flat_map(|line| line.aligned(candle_count))
            .filter(|(i, _)| visible.contains(*i))
            .fold(None, |acc, (_, v)| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }

    pub fn to_wire(&self, candles: &[Candle]) -> IndicatorResultWire {
        IndicatorResultWire {
            main_line: self.main.points(candles),
            additional_lines: self.additional.iter().map(|l| (l.name.clone(), l.points(candles))).collect(),
        }
    }

    /// Accept a result computed elsewhere. Each point lands on the candle with the same
    /// time; candles without a finite point stay gaps, points matching no candle are dropped.
    pub fn from_wire(wire: IndicatorResultWire, candles: &[Candle]) -> Self {
        let place = |points: Vec<IndicatorPoint>| -> Vec<f64> {
            let mut values = vec![f64::NAN; candles.len()];
            for point in points {
                let Some(value) = point.value.filter(|v| v.is_finite()) else {
                    continue;
                };
                if let Ok(index) = candles.binary_search_by_key(&point.time, Candle::time) {
                    values[index] = value;
                }
            }
            values
        };
        Self {
            main: IndicatorLine::new("main", place(wire.main_line)),
            additional: wire
                .additional_lines
                .into_iter()
                .map(|(name, points)| IndicatorLine::new(name, place(points)))
                .collect(),
        }
    }
}

/// Exchange shape `{mainLine, additionalLines?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorResultWire {
    pub main_line: Vec<IndicatorPoint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_lines: BTreeMap<String, Vec<IndicatorPoint>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_skips_nan_and_offsets_to_tail() {
        let line = IndicatorLine::new("main", vec![1.0, f64::NAN, 3.0]);
        let pairs: Vec<(usize, f64)> = line.aligned(5).collect();
        assert_eq!(pairs, vec![(2, 1.0), (4, 3.0)]);
        assert_eq!(line.value_at(3, 5), None);
    }

    #[test]
    fn longer_line_than_series_drops_head() {
        let line = IndicatorLine::new("main", vec![1.0, 2.0, 3.0, 4.0]);
        let pairs: Vec<(usize, f64)> = line.aligned(2).collect();
        assert_eq!(pairs, vec![(0, 3.0), (1, 4.0)]);
    }

    #[test]
    fn wire_round_trip_filters_nan() {
        let candles: Vec<Candle> =
            (0..3).map(|t| Candle::from_values(t * 1000, 1.0, 1.0, 1.0, 1.0, 0.0)).collect();
        let result = IndicatorResult::single("sma", vec![f64::NAN, 5.0, 6.0]).with_line("upper", vec![7.0]);
        let wire = result.to_wire(&candles);
        assert_eq!(wire.main_line, vec![
            IndicatorPoint { time: 1000, value: Some(5.0) },
            IndicatorPoint { time: 2000, value: Some(6.0) }
        ]);
        assert_eq!(wire.additional_lines["upper"], vec![IndicatorPoint { time: 2000, value: Some(7.0) }]);
        let back = IndicatorResult::from_wire(wire, &candles);
        assert_eq!(back.main.aligned(3).collect::<Vec<_>>(), vec![(1, 5.0), (2, 6.0)]);
        assert_eq!(back.line("upper").unwrap().aligned(3).collect::<Vec<_>>(), vec![(2, 7.0)]);
    }

    fn minute_candles(count: u64) -> Vec<Candle> {
        (1..=count).map(|i| Candle::from_values(i * 60_000, 1.0, 1.0, 1.0, 1.0, 0.0)).collect()
    }

    #[test]
    fn null_warm_up_values_are_gaps() {
        let wire: IndicatorResultWire = serde_json::from_str(
            r#"{"mainLine": [{"time": 60000, "value": null}, {"time": 120000, "value": 4.5}]}"#,
        )
        .unwrap();
        let result = IndicatorResult::from_wire(wire, &minute_candles(3));
        assert_eq!(result.main.aligned(3).collect::<Vec<_>>(), vec![(1, 4.5)]);
    }

    #[test]
    fn points_land_on_candles_by_time() {
        // ends before the latest candle and skips one in the middle
        let wire = IndicatorResultWire {
            main_line: vec![
                IndicatorPoint { time: 60_000, value: Some(1.0) },
                IndicatorPoint { time: 180_000, value: Some(3.0) },
                IndicatorPoint { time: 90_000, value: Some(9.0) },
            ],
            additional_lines: BTreeMap::new(),
        };
        let result = IndicatorResult::from_wire(wire, &minute_candles(5));
        assert_eq!(result.main.aligned(5).collect::<Vec<_>>(), vec![(0, 1.0), (2, 3.0)]);
        assert_eq!(result.main.value_at(4, 5), None);
    }

    #[test]
    fn value_range_respects_window() {
        let result = IndicatorResult::single("rsi", vec![10.0, 90.0, 40.0, 60.0]);
        assert_eq!(result.value_range(4, VisibleRange::new(2, 4)), Some((40.0, 60.0)));
        assert_eq!(result.value_range(4, VisibleRange::new(4, 4)), None);
    }
}
