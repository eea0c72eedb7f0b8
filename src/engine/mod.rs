pub mod attack_path;
pub mod density;
pub mod scene;
pub mod temporal_filter;
pub mod threat_cluster;
pub mod vector;
