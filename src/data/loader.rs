use crate::config::{Severity, ThreatEntity};
use crate::engine::vector::Vector3;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Threat record as written by feeds: positions as arrays or objects,
/// timestamps as epoch millis or RFC 3339 text.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreatRecord {
    pub id: u64,
    pub position: RawPosition,
    pub severity: String,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPosition {
    Array([f64; 3]),
    Object { x: f64, y: f64, z: f64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl RawPosition {
    fn to_vector(&self) -> Vector3 {
        match *self {
            RawPosition::Array(v) => Vector3::from(v),
            RawPosition::Object { x, y, z } => Vector3::new(x, y, z),
        }
    }
}

impl RawTimestamp {
    /// Epoch millis, or `None` if the value cannot be interpreted.
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            RawTimestamp::Millis(ms) => Some(*ms),
            RawTimestamp::Fractional(f) if f.is_finite() => Some(f.round() as i64),
            RawTimestamp::Fractional(_) => None,
            RawTimestamp::Text(s) => {
                let s = s.trim();
                if let Ok(ms) = s.parse::<i64>() {
                    return Some(ms);
                }
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.timestamp_millis())
                    .ok()
            }
        }
    }
}

impl ThreatRecord {
    /// Convert to an entity. Unknown severities reject the record; bad
    /// timestamps are kept as `None` so the time filter can reject them later.
    pub fn into_entity(self) -> std::result::Result<ThreatEntity, String> {
        let severity: Severity = self.severity.parse()?;
        let timestamp_millis = self.timestamp.as_ref().and_then(RawTimestamp::to_millis);
        if timestamp_millis.is_none() {
            log::warn!("Threat {} has no usable timestamp ({:?})", self.id, self.timestamp);
        }
        Ok(ThreatEntity {
            id: self.id,
            position: self.position.to_vector(),
            severity,
            timestamp_millis,
            label: self.label,
        })
    }
}

/// Load threats from a JSON array or JSON Lines file.
pub fn load_threats(path: &Path) -> Result<Vec<ThreatEntity>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading threats from {}", path.display()))?;
    let entities = parse_threats(&content)
        .with_context(|| format!("parsing threats in {}", path.display()))?;
    log::info!("Loaded {} threats from {}", entities.len(), path.display());
    Ok(entities)
}

pub fn parse_threats(content: &str) -> Result<Vec<ThreatEntity>> {
    let records: Vec<ThreatRecord> = if content.trim_start().starts_with('[') {
        serde_json::from_str(content)?
    } else {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str::<ThreatRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping line {}: {}", n + 1, e);
                    None
                }
            })
            .collect()
    };

    let entities = records
        .into_iter()
        .filter_map(|record| {
            let id = record.id;
            match record.into_entity() {
                Ok(entity) => Some(entity),
                Err(e) => {
                    log::warn!("Skipping threat {}: {}", id, e);
                    None
                }
            }
        })
        .collect();
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let json = r#"[
            { "id": 1, "position": [0, 0, 0], "severity": "high", "timestamp": 1700000000000, "label": "ssh brute force" },
            { "id": 2, "position": { "x": 5, "y": 1, "z": -2 }, "severity": "CRITICAL", "timestamp": "2024-01-01T00:00:00Z" }
        ]"#;
        let entities = parse_threats(json).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].severity, Severity::High);
        assert_eq!(entities[0].timestamp_millis, Some(1_700_000_000_000));
        assert_eq!(entities[0].label, "ssh brute force");
        assert_eq!(entities[1].position, Vector3::new(5.0, 1.0, -2.0));
        assert_eq!(entities[1].timestamp_millis, Some(1_704_067_200_000));
        assert_eq!(entities[1].label, "");
    }

    #[test]
    fn test_parse_jsonl_skips_bad_lines() {
        let jsonl = concat!(
            "{\"id\": 1, \"position\": [1, 2, 3], \"severity\": \"low\", \"timestamp\": 10}\n",
            "this is not json\n",
            "\n",
            "{\"id\": 2, \"position\": [1, 2, 3], \"severity\": \"apocalyptic\", \"timestamp\": 10}\n",
            "{\"id\": 3, \"position\": [4, 5, 6], \"severity\": \"medium\", \"timestamp\": 12.6}\n",
        );
        let entities = parse_threats(jsonl).unwrap();
        let ids: Vec<u64> = entities.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(entities[1].timestamp_millis, Some(13));
    }

    #[test]
    fn test_unparseable_timestamp_kept_as_none() {
        let jsonl = concat!(
            "{\"id\": 1, \"position\": [0, 0, 0], \"severity\": \"low\", \"timestamp\": \"yesterday-ish\"}\n",
            "{\"id\": 2, \"position\": [0, 0, 0], \"severity\": \"low\"}\n",
        );
        let entities = parse_threats(jsonl).unwrap();
        assert_eq!(entities.len(), 2);
        assert!(entities.iter().all(|e| e.timestamp_millis.is_none()));
    }

    #[test]
    fn test_malformed_array_is_error() {
        assert!(parse_threats("[{\"id\": \"nope\"}]").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threats.jsonl");
        std::fs::write(
            &path,
            "{\"id\": 9, \"position\": [0, 0, 0], \"severity\": \"high\", \"timestamp\": \"1700000000000\"}\n",
        )
        .unwrap();
        let entities = load_threats(&path).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].timestamp_millis, Some(1_700_000_000_000));
        assert!(load_threats(&dir.path().join("missing.json")).is_err());
    }
}
