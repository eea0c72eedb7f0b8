//! Seed-based spatial clustering of threat entities.
//!
//! Each not-yet-assigned entity (in input order) seeds a new cluster and
//! claims every remaining unassigned entity strictly closer than `radius` to
//! the seed. Membership is never transitive beyond the seed, and already
//! assigned entities are never revisited, so the result depends on input order.

use super::vector::{self, Vector3};
use crate::config::{Severity, ThreatEntity};
use serde::{Deserialize, Serialize};

/// A group of threats sharing a seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub centroid: Vector3,
    /// Seed first, then claimed entities in input order.
    pub members: Vec<ThreatEntity>,
    /// Linkage radius the cluster was built with.
    pub radius: f64,
}

impl Cluster {
    /// First member. Clusters built by `cluster` are never empty, but one
    /// deserialized from outside may be.
    pub fn seed(&self) -> Option<&ThreatEntity> {
        self.members.first()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    pub fn contains(&self, id: u64) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub fn peak_severity(&self) -> Severity {
        self.members
            .iter()
            .map(|m| m.severity)
            .max()
            .unwrap_or(Severity::Low)
    }

    /// Sum of member severity weights.
    pub fn severity_weight(&self) -> f64 {
        self.members.iter().map(|m| m.severity.weight()).sum()
    }
}

/// Cluster under construction. Centroid is only computed on finalize.
struct ClusterBuilder {
    seed_position: Vector3,
    members: Vec<ThreatEntity>,
}

impl ClusterBuilder {
    fn new(seed: &ThreatEntity) -> Self {
        Self {
            seed_position: seed.position,
            members: vec![seed.clone()],
        }
    }

    fn claims(&self, candidate: &ThreatEntity, radius: f64) -> bool {
        self.seed_position.distance_to(&candidate.position) < radius
    }

    fn finalize(self, radius: f64) -> Cluster {
        let centroid = vector::mean(self.members.iter().map(|m| m.position));
        Cluster {
            centroid,
            members: self.members,
            radius,
        }
    }
}

/// Partition `entities` into seed-based clusters.
///
/// Output order follows first-seen seeds. `radius <= 0` (or NaN) yields one
/// singleton per entity. Duplicate ids are kept as distinct entities.
pub fn cluster(entities: &[ThreatEntity], radius: f64) -> Vec<Cluster> {
    let mut clusters = Vec::new();
    if entities.is_empty() {
        return clusters;
    }

    let mut assigned = vec![false; entities.len()];

    for i in 0..entities.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut builder = ClusterBuilder::new(&entities[i]);

        for j in (i + 1)..entities.len() {
            if assigned[j] {
                continue;
            }
            if builder.claims(&entities[j], radius) {
                assigned[j] = true;
                builder.members.push(entities[j].clone());
            }
        }

        clusters.push(builder.finalize(radius));
    }

    log::debug!(
        "Clustered {} entities into {} clusters (radius {})",
        entities.len(),
        clusters.len(),
        radius
    );
    clusters
}

/// Summary over a cluster set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS), ts(export))]
pub struct ClusterStats {
    pub total_clusters: usize,
    pub average_members_per_cluster: f64,
    pub largest_cluster_size: usize,
    pub singleton_count: usize,
}

/// Statistics for `clusters`. An empty set reports an average of 0.
pub fn get_stats(clusters: &[Cluster]) -> ClusterStats {
    let total_members: usize = clusters.iter().map(|c| c.len()).sum();
    let average = if clusters.is_empty() {
        0.0
    } else {
        total_members as f64 / clusters.len() as f64
    };

    ClusterStats {
        total_clusters: clusters.len(),
        average_members_per_cluster: average,
        largest_cluster_size: clusters.iter().map(|c| c.len()).max().unwrap_or(0),
        singleton_count: clusters.iter().filter(|c| c.is_singleton()).count(),
    }
}

/// Find the cluster holding the entity with the given id.
pub fn cluster_for_entity(clusters: &[Cluster], id: u64) -> Option<&Cluster> {
    clusters.iter().find(|c| c.contains(id))
}
