pub mod commands;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod export;

pub use config::{MapSettings, Severity, ThreatEntity, TimeWindow};
pub use engine::attack_path::{AnimatedPath, PathAnimator};
pub use engine::scene::{Clock, FrameUpdate, ManualClock, SystemClock, ThreatMapScene};
pub use engine::threat_cluster::{cluster, get_stats, Cluster, ClusterStats};
pub use engine::vector::Vector3;
pub use error::ThreatMapError;
