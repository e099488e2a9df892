//! Table configuration and presets
//!
//! Loaded from JSON; every field has a default so partial files work.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Result, TableError};
use crate::sim::{Bounds, EngineKind};

/// Preset table setups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TablePreset {
    /// Frictionless, elastic, no gravity
    #[default]
    Classic,
    /// Gravity on with the restitution ceiling
    Gravity,
    /// Exact engine, elastic, no gravity: can run backward
    Reversible,
}

impl TablePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            TablePreset::Classic => "Classic",
            TablePreset::Gravity => "Gravity",
            TablePreset::Reversible => "Reversible",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "classic" => Some(TablePreset::Classic),
            "gravity" => Some(TablePreset::Gravity),
            "reversible" | "exact" => Some(TablePreset::Reversible),
            _ => None,
        }
    }
}

/// Table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    // === Geometry ===
    pub bounds: Bounds,

    // === Gravity and materials ===
    /// Gravity magnitude when on (m/s², pointing down)
    pub gravity: f64,
    pub gravity_on: bool,
    /// Restitution given to non-fixed pucks while gravity is on
    pub restitution_ceiling: f64,
    /// Restitution of the fence
    pub table_restitution: f64,
    /// Friction given to non-fixed pucks while gravity is on
    pub gravity_friction: f64,

    // === Timestep ===
    pub fixed_timestep: bool,
    pub dt: f64,
    /// Cap on measured frame time in variable-timestep mode
    pub max_dt: f64,

    // === Collisions ===
    pub engine: EngineKind,
    pub wall_correction: bool,
    pub puck_correction: bool,
    /// Multiple of the touching distance that marks pucks as tangled
    pub tangle_factor: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::from_size(TABLE_WIDTH, TABLE_HEIGHT),

            gravity: GRAVITY,
            gravity_on: false,
            restitution_ceiling: RESTITUTION_CEILING,
            table_restitution: TABLE_RESTITUTION,
            gravity_friction: GRAVITY_FRICTION,

            fixed_timestep: true,
            dt: DEFAULT_DT,
            max_dt: DEFAULT_MAX_DT,

            engine: EngineKind::Approximate,
            wall_correction: true,
            puck_correction: true,
            tangle_factor: TANGLE_FACTOR,
        }
    }
}

impl TableConfig {
    /// Config from a preset (applies preset defaults)
    pub fn from_preset(preset: TablePreset) -> Self {
        let mut config = Self::default();
        config.apply_preset(preset);
        config
    }

    pub fn apply_preset(&mut self, preset: TablePreset) {
        match preset {
            TablePreset::Classic => {
                self.gravity_on = false;
                self.engine = EngineKind::Approximate;
            }
            TablePreset::Gravity => {
                self.gravity_on = true;
                self.engine = EngineKind::Approximate;
            }
            TablePreset::Reversible => {
                self.gravity_on = false;
                self.engine = EngineKind::Exact;
                self.table_restitution = 1.0;
            }
        }
    }

    /// (restitution, friction) a non-fixed puck takes with gravity on or off
    pub fn material_defaults(&self, gravity_on: bool) -> (f64, f64) {
        if gravity_on {
            (self.restitution_ceiling, self.gravity_friction)
        } else {
            (1.0, 0.0)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(TableError::InvalidConfig(msg.to_string()));
        if !self.bounds.is_valid() {
            return bad("bounds must have right > left and top > bottom");
        }
        if !(self.dt.is_finite() && self.dt >= 0.0) {
            return Err(TableError::InvalidTimestep(self.dt));
        }
        if !(self.max_dt.is_finite() && self.max_dt > 0.0) {
            return bad("max_dt must be positive");
        }
        if !self.gravity.is_finite() {
            return bad("gravity must be finite");
        }
        for (name, v) in [
            ("restitution_ceiling", self.restitution_ceiling),
            ("table_restitution", self.table_restitution),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(TableError::InvalidConfig(format!("{name} must be within [0, 1]")));
            }
        }
        if !(self.tangle_factor.is_finite() && self.tangle_factor >= 1.0) {
            return bad("tangle_factor must be >= 1");
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded table config from {}", path.display());
        Ok(config)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json_string()?)?;
        log::info!("Table config saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(TableConfig::default().validate().is_ok());
        for preset in [TablePreset::Classic, TablePreset::Gravity, TablePreset::Reversible] {
            assert!(TableConfig::from_preset(preset).validate().is_ok());
            assert_eq!(TablePreset::from_str(preset.as_str()), Some(preset));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TableConfig::from_json_str(r#"{ "gravity_on": true, "engine": "Exact" }"#).unwrap();
        assert!(config.gravity_on);
        assert_eq!(config.engine, EngineKind::Exact);
        assert_eq!(config.dt, DEFAULT_DT);
        assert_eq!(config.material_defaults(config.gravity_on).0, RESTITUTION_CEILING);
    }

    #[test]
    fn test_material_defaults_follow_gravity() {
        let config = TableConfig::default();
        assert_eq!(config.material_defaults(false), (1.0, 0.0));
        assert_eq!(
            config.material_defaults(true),
            (config.restitution_ceiling, config.gravity_friction)
        );
    }

    #[test]
    fn test_json_round_trip() {
        let config = TableConfig::from_preset(TablePreset::Reversible);
        let back = TableConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(back.engine, EngineKind::Exact);
        assert_eq!(back.bounds, config.bounds);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            TableConfig::from_json_str(r#"{ "dt": -0.1 }"#),
            Err(TableError::InvalidTimestep(_))
        ));
        assert!(TableConfig::from_json_str(r#"{ "restitution_ceiling": 1.5 }"#).is_err());
        assert!(matches!(
            TableConfig::from_json_str("{ not json"),
            Err(TableError::Config(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("air_table_config_{}.json", std::process::id()));
        let config = TableConfig::from_preset(TablePreset::Gravity);
        config.save(&path).unwrap();
        let loaded = TableConfig::load(&path).unwrap();
        assert!(loaded.gravity_on);
        let _ = std::fs::remove_file(&path);
    }
}
