use super::entities::Drawing;
use super::manager::DrawingManager;
use crate::domain::errors::DrawingError;
use crate::domain::logging::LogComponent;
use crate::log_info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const EXPORT_VERSION: &str = "1.0";

/// Versioned drawing document `{version, drawings, timestamp}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingExport {
    pub version: String,
    pub drawings: Vec<Drawing>,
    pub timestamp: u64,
}

impl DrawingExport {
    pub fn to_json(&self) -> Result<String, DrawingError> {
        serde_json::to_string_pretty(self).map_err(|e| DrawingError::Import(e.to_string()))
    }

    /// Validate a document without touching any state.
    ///
    /// The shape is checked on the raw JSON first so that a non-array `drawings`
    /// gets a precise message rather than a generic type error.
    pub fn parse(json: &str) -> Result<Self, DrawingError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| DrawingError::Import(format!("invalid JSON: {e}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| DrawingError::Import("document must be an object".into()))?;
        if !object.get("drawings").is_some_and(serde_json::Value::is_array) {
            return Err(DrawingError::Import("`drawings` must be an array".into()));
        }
        if let Some(version) = object.get("version") {
            if !version.is_string() {
                return Err(DrawingError::Import("`version` must be a string".into()));
            }
        }

        let export = DrawingExport {
            version: object.get("version").and_then(|v| v.as_str()).unwrap_or(EXPORT_VERSION).to_string(),
            drawings: object["drawings"]
                .as_array()
                .into_iter()
                .flatten()
                .enumerate()
                .map(|(i, item)| {
                    serde_json::from_value::<Drawing>(item.clone())
                        .map_err(|e| DrawingError::Import(format!("drawing #{i}: {e}")))
                })
                .collect::<Result<_, _>>()?,
            timestamp: object.get("timestamp").and_then(|t| t.as_u64()).unwrap_or(0),
        };

        let mut seen = HashSet::new();
        if let Some(duplicate) = export.drawings.iter().find(|d| !seen.insert(d.id.as_str())) {
            return Err(DrawingError::Import(format!("duplicate id {}", duplicate.id)));
        }
        Ok(export)
    }
}

impl DrawingManager {
    pub fn export(&self, timestamp: u64) -> DrawingExport {
        DrawingExport { version: EXPORT_VERSION.to_string(), drawings: self.drawings().to_vec(), timestamp }
    }

    /// Replace the collection with the drawings of `json`. On any error the current
    /// collection is left untouched.
    pub fn import(&mut self, json: &str) -> Result<usize, DrawingError> {
        let export = DrawingExport::parse(json)?;
        let count = export.drawings.len();
        self.replace_all(export.drawings);
        log_info!(LogComponent::Domain("DrawingManager"), "imported {} drawings (v{})", count, export.version);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::ChartPoint;
    use crate::domain::drawing::entities::{DrawingKind, DrawingShape};

    fn manager_with_line() -> DrawingManager {
        let mut manager = DrawingManager::default();
        let shape = DrawingShape::from_points(DrawingKind::HorizontalLine, &[ChartPoint::new(1000.0, 50000.5)], None)
            .unwrap();
        let json = serde_json::json!({
            "version": "1.0",
            "drawings": [Drawing::new("horizontalLine-1", shape, 0, 7)],
            "timestamp": 1
        });
        manager.import(&json.to_string()).unwrap();
        manager
    }

    #[test]
    fn export_document_layout() {
        let manager = manager_with_line();
        insta::assert_snapshot!(manager.export(99).to_json().unwrap(), @r###"
        {
          "version": "1.0",
          "drawings": [
            {
              "id": "horizontalLine-1",
              "type": "horizontalLine",
              "points": [
                {
                  "timestamp": 1000.0,
                  "price": 50000.5
                }
              ],
              "style": {
                "color": "#2962ff",
                "lineWidth": 2.0,
                "dashed": true,
                "fill": null,
                "fontSize": 14.0
              },
              "locked": false,
              "visible": true,
              "zIndex": 0,
              "createdAt": 7,
              "updatedAt": 7
            }
          ],
          "timestamp": 99
        }
        "###);
    }

    #[test]
    fn export_then_import_restores_collection() {
        let source = manager_with_line();
        let json = source.export(5).to_json().unwrap();
        let mut target = DrawingManager::default();
        assert_eq!(target.import(&json).unwrap(), 1);
        assert_eq!(target.drawings(), source.drawings());
    }

    #[test]
    fn drawings_created_after_import_get_fresh_ids() {
        let mut manager = DrawingManager::default();
        manager.import(&manager_with_line().export(5).to_json().unwrap()).unwrap();

        manager.set_active_tool(Some(DrawingKind::HorizontalLine));
        let created = manager.add_point(ChartPoint::new(2000.0, 49000.0)).unwrap().unwrap();
        assert_eq!(created, "horizontalLine-2");
        let ids: Vec<&str> = manager.drawings().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["horizontalLine-1", "horizontalLine-2"]);

        let mut reloaded = DrawingManager::default();
        assert_eq!(reloaded.import(&manager.export(6).to_json().unwrap()).unwrap(), 2);
    }

    #[test]
    fn non_array_drawings_leaves_state_unchanged() {
        let mut manager = manager_with_line();
        let before = manager.drawings().to_vec();
        let err = manager.import(r#"{"version": "1.0", "drawings": {"id": "x"}, "timestamp": 0}"#).unwrap_err();
        assert_eq!(err, DrawingError::Import("`drawings` must be an array".into()));
        assert_eq!(manager.drawings(), &before[..]);
    }

    #[test]
    fn one_bad_drawing_rejects_whole_document() {
        let mut manager = manager_with_line();
        let json = r#"{"version": "1.0", "timestamp": 0, "drawings": [
            {"id": "a", "type": "trendLine", "points": [{"timestamp": 1, "price": 1}, {"timestamp": 2, "price": 2}]},
            {"id": "b", "type": "trendLine", "points": [{"timestamp": 1, "price": 1}]}
        ]}"#;
        assert!(matches!(manager.import(json), Err(DrawingError::Import(_))));
        assert_eq!(manager.drawings().len(), 1);
        assert_eq!(manager.drawings()[0].id, "horizontalLine-1");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"{"version": "1.0", "timestamp": 0, "drawings": [
            {"id": "a", "type": "verticalLine", "points": [{"timestamp": 1, "price": 1}]},
            {"id": "a", "type": "verticalLine", "points": [{"timestamp": 2, "price": 1}]}
        ]}"#;
        assert_eq!(DrawingExport::parse(json), Err(DrawingError::Import("duplicate id a".into())));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(DrawingExport::parse("not json").is_err());
        assert!(DrawingExport::parse("[]").is_err());
    }
}
