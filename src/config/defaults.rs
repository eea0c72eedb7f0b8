use super::*;

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            clustering: ClusteringSettings::default(),
            filter: FilterSettings::default(),
            animation: AnimationSettings::default(),
            heatmap: HeatmapSettings::default(),
        }
    }
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            recluster_on_tick: true,
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            default_window: TimeWindow::All,
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            speed_per_tick: default_speed_per_tick(),
            arc_height_factor: default_arc_height_factor(),
            max_frame_gap_ms: default_max_frame_gap_ms(),
            prune_inactive: true,
        }
    }
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            world_extent: default_world_extent(),
            min_sigma: default_min_sigma(),
        }
    }
}

/// Palette used when rasterizing the density field.
pub struct HeatmapStyle {
    pub cold: [u8; 3],
    pub warm: [u8; 3],
    pub hot: [u8; 3],
    /// Alpha at full intensity.
    pub max_alpha: u8,
    /// Intensities below this are fully transparent.
    pub cutoff: f32,
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self {
            cold: [59, 130, 246],  // blue
            warm: [250, 204, 21],  // yellow
            hot: [239, 68, 68],    // red
            max_alpha: 200,
            cutoff: 0.02,
        }
    }
}
