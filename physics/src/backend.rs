//! Boundary between the collider layer and a rigid-body engine.
//!
//! Everything here is in physics space (meters, radians). The collider layer only talks to
//! the engine through [`PhysicsBackend`], so the simulator can be swapped without touching
//! triangulation, the collider state machine or the collision ledger.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::filter::CollisionFilter;

/// Identity of a body created by a backend.
///
/// Ids are never reused: a body rebuilt from the same collider gets a fresh id, so stale
/// contact bookkeeping can never be confused with the new body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub u64);

/// How the engine moves a body.
///
/// Static bodies never move and have zero density; dynamic bodies respond to forces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyType {
    Static,
    #[default]
    Dynamic,
}

/// Initial pose and type of a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDef {
    pub translation: Vector2<f32>,
    /// Radians.
    pub rotation: f32,
    pub body_type: BodyType,
}

/// Convex geometry of one shape, in the body's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeGeometry {
    Ball {
        center: Vector2<f32>,
        radius: f32,
    },
    /// Axis-aligned in the body frame.
    Cuboid {
        center: Vector2<f32>,
        half_extents: Vector2<f32>,
    },
    /// Counter-clockwise.
    Triangle([Vector2<f32>; 3]),
}

/// One convex piece attached to a body (a fixture).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeDef {
    pub geometry: ShapeGeometry,
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    pub is_sensor: bool,
    pub filter: CollisionFilter,
}

/// Parameters of a single simulation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepParams {
    pub gravity: Vector2<f32>,
    pub time_step: f32,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
}

/// World pose of a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub translation: Vector2<f32>,
    /// Radians.
    pub rotation: f32,
}

/// Receives contact notifications while a backend steps.
///
/// Body pairs are unordered: a backend may report `(a, b)` on begin and `(b, a)` on end.
/// Points are world-space contact points of the current manifold.
pub trait ContactListener {
    /// Two bodies started touching (one notification per touching shape pair).
    fn begin_contact(&mut self, a: BodyId, b: BodyId, points: &[Vector2<f32>]);

    /// Contact is about to be solved this step.
    fn pre_solve(&mut self, a: BodyId, b: BodyId, points: &[Vector2<f32>]);

    /// Contact was solved this step and is still touching.
    fn post_solve(&mut self, a: BodyId, b: BodyId, points: &[Vector2<f32>]);

    /// A shape pair stopped touching.
    fn end_contact(&mut self, a: BodyId, b: BodyId);
}

/// A rigid-body simulator as seen by the collider layer.
///
/// Bodies are exclusively owned by whoever created them; accessors on an unknown id return
/// `None` and mutators on an unknown id do nothing.
pub trait PhysicsBackend {
    /// Create a body with all `shapes` attached; mass and inertia come from the shapes.
    fn create_body(&mut self, def: &BodyDef, shapes: &[ShapeDef]) -> BodyId;

    fn destroy_body(&mut self, body: BodyId);

    /// Advance the simulation, reporting contact changes to `listener`.
    fn step(&mut self, params: &StepParams, listener: &mut dyn ContactListener);

    fn pose(&self, body: BodyId) -> Option<Pose>;

    fn set_translation(&mut self, body: BodyId, translation: Vector2<f32>);

    fn set_rotation(&mut self, body: BodyId, rotation: f32);

    fn linear_velocity(&self, body: BodyId) -> Option<Vector2<f32>>;

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vector2<f32>);

    /// Radians per second.
    fn angular_velocity(&self, body: BodyId) -> Option<f32>;

    fn set_angular_velocity(&mut self, body: BodyId, velocity: f32);

    /// Force at a world-space point, applied over the next step.
    fn apply_force(&mut self, body: BodyId, force: Vector2<f32>, point: Vector2<f32>);

    /// Instantaneous impulse at a world-space point.
    fn apply_impulse(&mut self, body: BodyId, impulse: Vector2<f32>, point: Vector2<f32>);
}
