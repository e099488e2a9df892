//! Air Table - a 2D collision physics core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pucks, springs, fences, collision engines)
//! - `config`: Serializable table configuration and presets
//! - `error`: Typed failures reported to collaborators

pub mod config;
pub mod error;
pub mod sim;

pub use config::{TableConfig, TablePreset};
pub use error::{Result, TableError};
pub use sim::{EngineKind, PuckDesc, PuckId, SpringDesc, SpringEnd, SpringId, Table};

use glam::DVec2;

/// Physical constants shared by every engine
pub mod consts {
    /// Default timestep (60 Hz)
    pub const DEFAULT_DT: f64 = 1.0 / 60.0;
    /// Largest measured frame time accepted in variable-timestep mode
    pub const DEFAULT_MAX_DT: f64 = 0.1;

    /// Per-axis acceleration limit (m/s²) applied after force aggregation
    pub const ACCEL_LIMIT: f64 = 1000.0;

    /// Magnitude of the downward gravity vector when gravity is on (m/s²)
    pub const GRAVITY: f64 = 9.8;

    /// Restitution applied to non-fixed pucks while gravity is on
    pub const RESTITUTION_CEILING: f64 = 0.7;
    /// Restitution of the fence itself
    pub const TABLE_RESTITUTION: f64 = 1.0;
    /// Surface friction applied to non-fixed pucks while gravity is on
    pub const GRAVITY_FRICTION: f64 = 0.2;

    /// Multiple of the touching distance that counts as "tangled"
    pub const TANGLE_FACTOR: f64 = 1.1;

    /// Default table extents (meters)
    pub const TABLE_WIDTH: f64 = 10.0;
    pub const TABLE_HEIGHT: f64 = 7.5;
}

/// Mass of a disc of the given density and radius
#[inline]
pub fn disc_mass(density: f64, radius: f64) -> f64 {
    density * std::f64::consts::PI * radius * radius
}

/// Downward gravity vector for the on/off toggle
#[inline]
pub fn gravity_vector(on: bool, magnitude: f64) -> DVec2 {
    if on {
        DVec2::new(0.0, -magnitude)
    } else {
        DVec2::ZERO
    }
}

/// Clamp each axis to [-limit, limit]
#[inline]
pub fn clamp_axes(v: DVec2, limit: f64) -> DVec2 {
    DVec2::new(v.x.clamp(-limit, limit), v.y.clamp(-limit, limit))
}
