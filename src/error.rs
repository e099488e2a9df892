//! Error types for table operations

use thiserror::Error;

use crate::sim::{EngineKind, PuckId, SpringId, WallId};

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors reported to collaborators.
///
/// Degenerate geometry never surfaces here: zero-length springs and
/// zero closing speeds are handled where they occur.
#[derive(Debug, Error)]
pub enum TableError {
    /// No puck with this id exists.
    #[error("unknown puck {0}")]
    UnknownPuck(PuckId),

    /// No spring with this id exists.
    #[error("unknown spring {0}")]
    UnknownSpring(SpringId),

    /// No wall with this id exists.
    #[error("unknown wall {0}")]
    UnknownWall(WallId),

    /// Radius must be positive and finite.
    #[error("invalid radius {0}: must be positive and finite")]
    InvalidRadius(f64),

    /// Density must be positive and finite.
    #[error("invalid density {0}: must be positive and finite")]
    InvalidDensity(f64),

    /// Radius and density were accepted but their mass under- or overflows.
    #[error("invalid mass {0}: radius and density give no usable mass")]
    InvalidMass(f64),

    /// Timestep must be non-negative and finite.
    #[error("invalid timestep {0}: must be non-negative and finite")]
    InvalidTimestep(f64),

    /// Spring parameters out of range.
    #[error("invalid spring: {0}")]
    InvalidSpring(String),

    /// Configuration values out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The active engine cannot run backward.
    #[error("engine {0:?} does not support time reversal")]
    TimeReversalUnsupported(EngineKind),

    /// The requested engine was not compiled in.
    #[error("engine {0:?} is not available in this build")]
    EngineUnavailable(EngineKind),

    /// Configuration (de)serialization failed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Reading or writing a config file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TableError::UnknownPuck(PuckId(7));
        assert_eq!(err.to_string(), "unknown puck #7");

        let err = TableError::InvalidRadius(-1.0);
        assert!(err.to_string().contains("-1"));

        let err = TableError::InvalidMass(0.0);
        assert!(err.to_string().starts_with("invalid mass 0"));
    }
}
