use crate::config::defaults::HeatmapStyle;
use crate::config::{store, MapSettings, TimeWindow};
use crate::engine::density::{ClusterWeight, DensityField};
use crate::engine::scene::{Clock, FrameUpdate, SystemClock, ThreatMapScene};
use crate::engine::threat_cluster::ClusterStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Host-owned state. The host constructs one and passes it to every command.
pub struct AppState {
    pub scene: Mutex<ThreatMapScene>,
    pub settings: Mutex<MapSettings>,
    pub settings_path: PathBuf,
}

impl AppState {
    pub fn new(settings: MapSettings, settings_path: PathBuf) -> Self {
        Self {
            scene: Mutex::new(ThreatMapScene::new(settings.clone())),
            settings: Mutex::new(settings),
            settings_path,
        }
    }

    /// State backed by the persisted settings file, or defaults if it is unreadable.
    pub fn from_disk() -> Self {
        let path = store::default_settings_path();
        let settings = store::load_settings(&path).unwrap_or_else(|e| {
            log::warn!("Failed to load settings, using defaults: {:#}", e);
            MapSettings::default()
        });
        Self::new(settings, path)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(MapSettings::default(), store::default_settings_path())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS), ts(export))]
pub struct VisibilitySummary {
    pub window: TimeWindow,
    pub visible: usize,
    pub total: usize,
    pub stats: ClusterStats,
}

fn summarize(scene: &ThreatMapScene) -> VisibilitySummary {
    VisibilitySummary {
        window: scene.time_window(),
        visible: scene.visible_count(),
        total: scene.entities().len(),
        stats: scene.stats(),
    }
}

pub fn load_threats(path: String, state: &AppState) -> Result<VisibilitySummary, String> {
    let entities = crate::data::loader::load_threats(std::path::Path::new(&path))
        .map_err(|e| format!("{:#}", e))?;
    let mut scene = state.scene.lock().map_err(|e| e.to_string())?;
    scene.load_entities(entities, SystemClock.now_millis());
    Ok(summarize(&scene))
}

pub fn set_time_window(window: TimeWindow, state: &AppState) -> Result<VisibilitySummary, String> {
    let mut scene = state.scene.lock().map_err(|e| e.to_string())?;
    scene.set_time_window(window);
    Ok(summarize(&scene))
}

pub fn request_cluster(radius: f64, state: &AppState) -> Result<ClusterStats, String> {
    if !radius.is_finite() {
        return Err(format!("Cluster radius must be finite, got {}", radius));
    }
    let mut scene = state.scene.lock().map_err(|e| e.to_string())?;
    Ok(scene.request_cluster(radius))
}

pub fn get_cluster_stats(state: &AppState) -> Result<ClusterStats, String> {
    let scene = state.scene.lock().map_err(|e| e.to_string())?;
    Ok(scene.stats())
}

pub fn get_cluster_weights(state: &AppState) -> Result<Vec<ClusterWeight>, String> {
    let scene = state.scene.lock().map_err(|e| e.to_string())?;
    Ok(scene.cluster_weights())
}

pub fn spawn_attack_vector(source_id: u64, target_id: u64, state: &AppState) -> Result<Uuid, String> {
    let mut scene = state.scene.lock().map_err(|e| e.to_string())?;
    scene.spawn_vector(source_id, target_id).map_err(|e| e.to_string())
}

pub fn clear_attack_vector(id: Uuid, state: &AppState) -> Result<(), String> {
    let mut scene = state.scene.lock().map_err(|e| e.to_string())?;
    scene.clear_vector(id).map_err(|e| e.to_string())
}

/// Frame callback for hosts that supply their own timestamp.
pub fn tick(now_millis: i64, state: &AppState) -> Result<FrameUpdate, String> {
    let mut scene = state.scene.lock().map_err(|e| e.to_string())?;
    Ok(scene.tick(now_millis))
}

pub fn tick_now(state: &AppState) -> Result<FrameUpdate, String> {
    tick(SystemClock.now_millis(), state)
}

pub fn export_heatmap(path: String, state: &AppState) -> Result<String, String> {
    let (weights, heatmap) = {
        let scene = state.scene.lock().map_err(|e| e.to_string())?;
        (scene.cluster_weights(), scene.settings().heatmap.clone())
    };
    let field = DensityField::from_weights(&weights, &heatmap);
    let out = PathBuf::from(&path);
    crate::export::heatmap::save_heatmap(&field, &HeatmapStyle::default(), &out)
        .map_err(|e| format!("{:#}", e))?;
    Ok(out.to_string_lossy().to_string())
}

pub fn get_settings(state: &AppState) -> Result<MapSettings, String> {
    let settings = state.settings.lock().map_err(|e| e.to_string())?;
    Ok(settings.clone())
}

pub fn save_settings(new_settings: MapSettings, state: &AppState) -> Result<(), String> {
    store::save_settings(&state.settings_path, &new_settings).map_err(|e| format!("{:#}", e))?;
    {
        let mut scene = state.scene.lock().map_err(|e| e.to_string())?;
        scene.apply_settings(new_settings.clone());
    }
    let mut settings = state.settings.lock().map_err(|e| e.to_string())?;
    *settings = new_settings;
    Ok(())
}
