pub mod defaults;
pub mod store;

use crate::engine::vector::Vector3;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSettings {
    #[serde(default)]
    pub clustering: ClusteringSettings,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub heatmap: HeatmapSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringSettings {
    /// Linkage radius in world units.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Rebuild clusters during `tick` when the visible set drifts with time.
    #[serde(default = "default_true")]
    pub recluster_on_tick: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub default_window: TimeWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Progress added per 60 Hz reference tick.
    #[serde(default = "default_speed_per_tick")]
    pub speed_per_tick: f64,
    /// Arc apex height as a fraction of the source→target chord length.
    #[serde(default = "default_arc_height_factor")]
    pub arc_height_factor: f64,
    /// Wall-clock gaps above this are clamped before being turned into progress.
    #[serde(default = "default_max_frame_gap_ms")]
    pub max_frame_gap_ms: i64,
    #[serde(default = "default_true")]
    pub prune_inactive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapSettings {
    /// Grid cells per axis.
    #[serde(default = "default_resolution")]
    pub resolution: u32,
    /// Half-size of the X/Z square covered by the grid.
    #[serde(default = "default_world_extent")]
    pub world_extent: f64,
    /// Lower bound on Gaussian spread, in world units.
    #[serde(default = "default_min_sigma")]
    pub min_sigma: f64,
}

fn default_true() -> bool { true }
fn default_radius() -> f64 { 20.0 }
fn default_speed_per_tick() -> f64 { 0.005 }
fn default_arc_height_factor() -> f64 { 0.5 }
fn default_max_frame_gap_ms() -> i64 { 250 }
fn default_resolution() -> u32 { 256 }
fn default_world_extent() -> f64 { 100.0 }
fn default_min_sigma() -> f64 { 4.0 }

/// Threat severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS), ts(export))]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Mass contributed to the density field.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.0,
            Severity::High => 3.0,
            Severity::Critical => 4.0,
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" | "med" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" | "crit" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Sliding time window applied against entity timestamps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS), ts(export))]
pub enum TimeWindow {
    #[default]
    All,
    Week,
    Day,
    Hour,
}

impl TimeWindow {
    pub const HOUR_MS: i64 = 3_600_000;
    pub const DAY_MS: i64 = 86_400_000;
    pub const WEEK_MS: i64 = 604_800_000;

    /// Window length; `None` for the unbounded window.
    pub fn duration_millis(&self) -> Option<i64> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Week => Some(Self::WEEK_MS),
            TimeWindow::Day => Some(Self::DAY_MS),
            TimeWindow::Hour => Some(Self::HOUR_MS),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TimeWindow::All),
            "week" | "7d" => Ok(TimeWindow::Week),
            "day" | "24h" => Ok(TimeWindow::Day),
            "hour" | "1h" => Ok(TimeWindow::Hour),
            other => Err(format!("unknown time window '{}'", other)),
        }
    }
}

/// A single threat observation, as handed over by the data source.
/// Read-only for the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS), ts(export))]
pub struct ThreatEntity {
    pub id: u64,
    pub position: Vector3,
    pub severity: Severity,
    /// Epoch milliseconds. `None` when the source timestamp could not be parsed.
    pub timestamp_millis: Option<i64>,
    #[serde(default)]
    pub label: String,
}

impl ThreatEntity {
    pub fn new(
        id: u64,
        position: Vector3,
        severity: Severity,
        timestamp_millis: i64,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id,
            position,
            severity,
            timestamp_millis: Some(timestamp_millis),
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let json = r#"{ "clustering": { "radius": 35.0 } }"#;
        let settings: MapSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.clustering.radius, 35.0);
        assert!(settings.clustering.recluster_on_tick);
        assert_eq!(settings.filter.default_window, TimeWindow::All);
        assert_eq!(settings.animation.speed_per_tick, 0.005);
        assert_eq!(settings.heatmap.resolution, 256);
    }

    #[test]
    fn test_time_window_parsing() {
        assert_eq!("HOUR".parse::<TimeWindow>().unwrap(), TimeWindow::Hour);
        assert_eq!("24h".parse::<TimeWindow>().unwrap(), TimeWindow::Day);
        assert_eq!("7d".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert!("fortnight".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_time_window_serde_lowercase() {
        let json = serde_json::to_string(&TimeWindow::Week).unwrap();
        assert_eq!(json, "\"week\"");
        let back: TimeWindow = serde_json::from_str("\"hour\"").unwrap();
        assert_eq!(back, TimeWindow::Hour);
    }

    #[test]
    fn test_severity_order_and_weight() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::Critical.weight(), 4.0);
        assert_eq!("Crit".parse::<Severity>().unwrap(), Severity::Critical);
    }
}
