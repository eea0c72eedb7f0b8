//! Explicit per-frame driver for the threat map.
//!
//! One `ThreatMapScene` owns the entity snapshot, the active time window, the
//! current cluster set and the attack vector animator. UI actions arrive as
//! commands (`set_time_window`, `request_cluster`, ...) and the host's frame
//! loop calls `tick` with the current time. Within a tick, visibility and
//! clusters are settled before any path advances.

use super::attack_path::PathAnimator;
use super::density::{self, ClusterWeight};
use super::temporal_filter;
use super::threat_cluster::{self, Cluster, ClusterStats};
use super::vector::Vector3;
use crate::config::{MapSettings, ThreatEntity, TimeWindow};
use crate::error::{Result, ThreatMapError};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use uuid::Uuid;

/// Reference frame length that `speed_per_tick` is expressed against (60 Hz).
pub const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;

/// Source of "now" in epoch milliseconds.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for deterministic playback.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self { now: Cell::new(start_millis) }
    }

    pub fn set(&self, millis: i64) {
        self.now.set(millis);
    }

    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.get()
    }
}

/// Marker position for one attack vector in the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS), ts(export))]
pub struct PathFrame {
    pub id: Uuid,
    pub position: Vector3,
    pub opacity: f64,
    pub progress: f64,
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS), ts(export))]
pub struct FrameUpdate {
    pub now_millis: i64,
    /// `(entity id, visible)` in load order.
    pub visibility: Vec<(u64, bool)>,
    /// True when the cluster set was rebuilt during this tick.
    pub clusters_rebuilt: bool,
    pub paths: Vec<PathFrame>,
    /// Paths removed this tick after being cleared.
    pub pruned_paths: usize,
}

pub struct ThreatMapScene {
    settings: MapSettings,
    entities: Vec<ThreatEntity>,
    window: TimeWindow,
    radius: f64,
    visibility: Vec<(u64, bool)>,
    clusters: Vec<Cluster>,
    animator: PathAnimator,
    now_millis: i64,
    last_tick_millis: Option<i64>,
    dirty: bool,
}

impl ThreatMapScene {
    pub fn new(settings: MapSettings) -> Self {
        let window = settings.filter.default_window;
        let radius = settings.clustering.radius;
        Self {
            settings,
            entities: Vec::new(),
            window,
            radius,
            visibility: Vec::new(),
            clusters: Vec::new(),
            animator: PathAnimator::new(),
            now_millis: 0,
            last_tick_millis: None,
            dirty: true,
        }
    }

    /// Replace the entity snapshot. Existing attack vectors are cleared since
    /// their endpoints may no longer exist.
    pub fn load_entities(&mut self, entities: Vec<ThreatEntity>, now_millis: i64) {
        log::info!("Loaded {} threat entities", entities.len());
        self.entities = entities;
        self.animator.clear_all();
        self.now_millis = now_millis;
        self.dirty = true;
        self.refresh();
    }

    pub fn set_time_window(&mut self, window: TimeWindow) {
        if window == self.window {
            return;
        }
        log::info!("Time window {:?} -> {:?}", self.window, window);
        self.window = window;
        self.dirty = true;
        self.refresh();
    }

    pub fn request_cluster(&mut self, radius: f64) -> ClusterStats {
        self.radius = radius;
        self.dirty = true;
        self.refresh();
        self.stats()
    }

    /// Start an attack vector animation between two loaded entities.
    pub fn spawn_vector(&mut self, source_id: u64, target_id: u64) -> Result<Uuid> {
        let source = self.find_entity(source_id)?.position;
        let target = self.find_entity(target_id)?.position;
        let anim = &self.settings.animation;
        let id = self.animator.create_vector_path(
            source_id,
            source,
            target_id,
            target,
            anim.arc_height_factor,
            anim.speed_per_tick,
        );
        log::debug!("Spawned attack vector {} ({} -> {})", id, source_id, target_id);
        Ok(id)
    }

    pub fn clear_vector(&mut self, id: Uuid) -> Result<()> {
        self.animator.clear(id)
    }

    /// Advance the scene to `now_millis`.
    pub fn tick(&mut self, now_millis: i64) -> FrameUpdate {
        let elapsed = match self.last_tick_millis {
            // A clock stepping backwards contributes no progress.
            Some(last) => now_millis.saturating_sub(last).clamp(0, self.settings.animation.max_frame_gap_ms.max(0)),
            None => 0,
        };
        self.last_tick_millis = Some(now_millis);
        self.now_millis = now_millis;

        // Visibility always follows the clock; only cluster rebuilds are gated.
        let visibility_changed = self.update_visibility();
        let clusters_rebuilt =
            if self.dirty || (visibility_changed && self.settings.clustering.recluster_on_tick) {
                self.rebuild_clusters();
                true
            } else {
                false
            };

        let ticks = elapsed as f64 / REFERENCE_FRAME_MS;
        let mut paths = Vec::new();
        for path in self.animator.paths_mut() {
            if !path.active {
                continue;
            }
            let delta = path.speed_per_tick * ticks;
            match super::attack_path::advance(path, delta) {
                Ok(position) => paths.push(PathFrame {
                    id: path.id,
                    position,
                    opacity: path.opacity(),
                    progress: path.progress_fraction,
                }),
                Err(e) => log::warn!("Skipping path {}: {}", path.id, e),
            }
        }

        let pruned_paths = if self.settings.animation.prune_inactive {
            self.animator.prune_inactive()
        } else {
            0
        };

        FrameUpdate {
            now_millis,
            visibility: self.visibility.clone(),
            clusters_rebuilt,
            paths,
            pruned_paths,
        }
    }

    pub fn tick_with(&mut self, clock: &dyn Clock) -> FrameUpdate {
        self.tick(clock.now_millis())
    }

    /// Recompute visibility over the full entity set and rebuild clusters if
    /// anything changed. Returns whether clusters were rebuilt.
    fn refresh(&mut self) -> bool {
        let visibility_changed = self.update_visibility();
        if !self.dirty && !visibility_changed {
            return false;
        }
        self.rebuild_clusters();
        true
    }

    /// Re-evaluate the time window against `now_millis`. Returns whether the
    /// mask changed.
    fn update_visibility(&mut self) -> bool {
        let visibility = temporal_filter::visibility_mask(&self.entities, self.window, self.now_millis);
        if visibility == self.visibility {
            return false;
        }
        self.visibility = visibility;
        true
    }

    fn rebuild_clusters(&mut self) {
        let visible = temporal_filter::masked_entities(&self.entities, &self.visibility);
        self.clusters = threat_cluster::cluster(&visible, self.radius);
        self.dirty = false;

        log::info!(
            "Rebuilt {} clusters from {}/{} visible entities (window {:?}, radius {})",
            self.clusters.len(),
            visible.len(),
            self.entities.len(),
            self.window,
            self.radius
        );
    }

    fn find_entity(&self, id: u64) -> Result<&ThreatEntity> {
        self.entities
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ThreatMapError::InvalidEntity {
                id,
                reason: "not loaded".to_string(),
            })
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn stats(&self) -> ClusterStats {
        threat_cluster::get_stats(&self.clusters)
    }

    pub fn cluster_weights(&self) -> Vec<ClusterWeight> {
        density::cluster_weights(&self.clusters)
    }

    pub fn entities(&self) -> &[ThreatEntity] {
        &self.entities
    }

    pub fn visibility(&self) -> &[(u64, bool)] {
        &self.visibility
    }

    pub fn visible_count(&self) -> usize {
        self.visibility.iter().filter(|(_, v)| *v).count()
    }

    pub fn time_window(&self) -> TimeWindow {
        self.window
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn animator(&self) -> &PathAnimator {
        &self.animator
    }

    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    /// Adopt new settings. The linkage radius and the active window are reset
    /// to the configured values and clusters are rebuilt.
    pub fn apply_settings(&mut self, settings: MapSettings) {
        self.radius = settings.clustering.radius;
        self.window = settings.filter.default_window;
        self.settings = settings;
        self.dirty = true;
        self.refresh();
    }
}
