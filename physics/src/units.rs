//! Scene-space ↔ physics-space conversion.
//!
//! Scene space is what the application sees (pixels, degrees). Physics space is what the
//! engine sees (meters, radians). Every value crossing the boundary goes through a
//! [`UnitScale`]: positions, sizes, radii, velocities and forces are divided by
//! `pixels_per_meter` on the way in and multiplied on the way out.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PIXELS_PER_METER;

/// Distance scale between scene units and physics meters.
///
/// A zero or non-finite factor would make the conversion lossy (division by zero, NaN),
/// so such factors behave as the identity: `to_scene(to_physics(x)) == x` holds for
/// every factor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitScale {
    pixels_per_meter: f32,
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::new(DEFAULT_PIXELS_PER_METER)
    }
}

impl UnitScale {
    pub const fn new(pixels_per_meter: f32) -> Self {
        Self { pixels_per_meter }
    }

    /// The configured factor, as given (may be zero).
    #[inline]
    pub fn pixels_per_meter(&self) -> f32 {
        self.pixels_per_meter
    }

    /// The factor actually applied: identity when the configured one is unusable.
    #[inline]
    fn factor(&self) -> f32 {
        if self.pixels_per_meter == 0.0 || !self.pixels_per_meter.is_finite() {
            1.0
        } else {
            self.pixels_per_meter
        }
    }

    #[inline]
    pub fn to_physics(&self, scene: f32) -> f32 {
        scene / self.factor()
    }

    #[inline]
    pub fn to_scene(&self, physics: f32) -> f32 {
        physics * self.factor()
    }

    #[inline]
    pub fn vector_to_physics(&self, scene: Vector2<f32>) -> Vector2<f32> {
        scene / self.factor()
    }

    #[inline]
    pub fn vector_to_scene(&self, physics: Vector2<f32>) -> Vector2<f32> {
        physics * self.factor()
    }
}

/// Scene angles are degrees; the engine uses radians.
#[inline]
pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees.to_radians()
}

#[inline]
pub fn radians_to_degrees(radians: f32) -> f32 {
    radians.to_degrees()
}
