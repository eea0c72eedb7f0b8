use uuid::Uuid;

/// Errors raised by the threat map engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThreatMapError {
    #[error("Invalid entity {id}: {reason}")]
    InvalidEntity { id: u64, reason: String },

    #[error("Path {0} is inactive")]
    InactivePath(Uuid),

    #[error("Path {0} not found")]
    UnknownPath(Uuid),

    #[error("Progress delta must be finite, got {0}")]
    InvalidDelta(f64),
}

pub type Result<T> = std::result::Result<T, ThreatMapError>;
