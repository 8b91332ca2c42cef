//! World settings, loadable from TOML.
//!
//! Every field has a default, so a config file only needs the values it overrides:
//!
//! ```toml
//! gravity = [0.0, 20.0]
//! pixels_per_meter = 32.0
//! ```

use std::path::Path;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_GRAVITY_MPS2, DEFAULT_PIXELS_PER_METER, DEFAULT_POSITION_ITERATIONS,
    DEFAULT_TIME_STEP, DEFAULT_VELOCITY_ITERATIONS,
};
use crate::error::{PhysicsError, PhysicsResult};
use crate::units::UnitScale;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Physics units (m/s²), scene orientation (Y-down: positive Y falls).
    pub gravity: [f32; 2],
    /// Seconds advanced per `update()`.
    pub time_step: f32,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub pixels_per_meter: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY_MPS2,
            time_step: DEFAULT_TIME_STEP,
            velocity_iterations: DEFAULT_VELOCITY_ITERATIONS,
            position_iterations: DEFAULT_POSITION_ITERATIONS,
            pixels_per_meter: DEFAULT_PIXELS_PER_METER,
        }
    }
}

impl WorldConfig {
    pub fn from_toml_str(source: &str) -> PhysicsResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| PhysicsError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> PhysicsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> PhysicsResult<String> {
        toml::to_string(self).map_err(|e| PhysicsError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        if self.velocity_iterations == 0 || self.position_iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "solver iterations must be at least 1".to_owned(),
            ));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(PhysicsError::InvalidConfig(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn gravity_vector(&self) -> Vector2<f32> {
        Vector2::new(self.gravity[0], self.gravity[1])
    }

    #[inline]
    pub fn scale(&self) -> UnitScale {
        UnitScale::new(self.pixels_per_meter)
    }
}
