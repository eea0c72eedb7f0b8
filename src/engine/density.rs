//! Density field over the X/Z ground plane.
//!
//! Clusters are reduced to normalized weights; the field spreads each weight
//! with a Gaussian falloff whose spread follows the cluster radius. Rows are
//! computed in parallel with rayon.

use super::threat_cluster::Cluster;
use super::vector::Vector3;
use crate::config::HeatmapSettings;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What the renderer receives per cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS), ts(export))]
pub struct ClusterWeight {
    pub centroid: Vector3,
    pub radius: f64,
    /// Severity mass relative to the heaviest cluster, in (0, 1].
    pub weight: f64,
    pub member_count: usize,
}

/// Severity-weighted cluster masses, normalized so the heaviest is 1.0.
pub fn cluster_weights(clusters: &[Cluster]) -> Vec<ClusterWeight> {
    let max_mass = clusters
        .iter()
        .map(|c| c.severity_weight())
        .fold(0.0_f64, f64::max);
    if max_mass <= 0.0 {
        return Vec::new();
    }

    clusters
        .iter()
        .filter(|c| c.centroid.is_finite())
        .map(|c| ClusterWeight {
            centroid: c.centroid,
            radius: c.radius,
            weight: c.severity_weight() / max_mass,
            member_count: c.len(),
        })
        .collect()
}

/// Row-major intensity grid in [0, 1].
#[derive(Debug, Clone)]
pub struct DensityField {
    pub cells: Vec<f32>,
    pub resolution: usize,
    /// Half-size of the covered square, centered on the origin.
    pub world_extent: f64,
}

impl DensityField {
    pub fn empty(resolution: usize, world_extent: f64) -> Self {
        Self {
            cells: vec![0.0; resolution * resolution],
            resolution,
            world_extent,
        }
    }

    pub fn from_weights(weights: &[ClusterWeight], settings: &HeatmapSettings) -> Self {
        let resolution = settings.resolution.max(1) as usize;
        let mut field = Self::empty(resolution, settings.world_extent);
        if weights.is_empty() {
            return field;
        }

        let cell_size = field.cell_size();
        let extent = field.world_extent;
        let min_sigma = settings.min_sigma.max(f64::EPSILON);

        field
            .cells
            .par_chunks_mut(resolution)
            .enumerate()
            .for_each(|(row, cells)| {
                let z = -extent + (row as f64 + 0.5) * cell_size;
                for (col, cell) in cells.iter_mut().enumerate() {
                    let x = -extent + (col as f64 + 0.5) * cell_size;
                    let mut acc = 0.0;
                    for w in weights {
                        let sigma = (w.radius * 0.5).max(min_sigma);
                        let dx = x - w.centroid.x;
                        let dz = z - w.centroid.z;
                        acc += w.weight * (-(dx * dx + dz * dz) / (2.0 * sigma * sigma)).exp();
                    }
                    *cell = acc as f32;
                }
            });

        field.normalize();
        field
    }

    pub fn cell_size(&self) -> f64 {
        (self.world_extent * 2.0) / self.resolution as f64
    }

    fn normalize(&mut self) {
        let peak = self.cells.iter().cloned().fold(0.0_f32, f32::max);
        if peak > 0.0 {
            for cell in &mut self.cells {
                *cell /= peak;
            }
        }
    }

    /// Intensity at a world position. Outside the covered square is 0.
    pub fn sample(&self, x: f64, z: f64) -> f32 {
        let cell = self.cell_size();
        let col = ((x + self.world_extent) / cell).floor();
        let row = ((z + self.world_extent) / cell).floor();
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return 0.0;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.resolution || row >= self.resolution {
            return 0.0;
        }
        self.cells[row * self.resolution + col]
    }

    pub fn peak(&self) -> f32 {
        self.cells.iter().cloned().fold(0.0_f32, f32::max)
    }
}
