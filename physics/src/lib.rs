//! Scene colliders bound to rigid bodies.
//!
//! Applications describe colliders in scene units (circle, rectangle, triangle or arbitrary
//! polygon), register them with a [`World`] and call [`World::update`] once per frame. The world
//! keeps each collider's body in step with its description, advances the simulation, mirrors
//! body poses back, and answers "are these two touching, and where?".
//!
//! Layout
//! - [`triangulate`]: polygon → triangles for engines that only accept convex pieces.
//! - [`shape`] / [`collider`]: collider descriptions and the per-collider rebuild state machine.
//! - [`ledger`]: touching pairs and their contact points across steps.
//! - [`world`]: registry and stepping.
//! - [`backend`] / [`rapier_backend`]: the engine boundary and its rapier2d implementation.

pub mod backend;
pub mod collider;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod rapier_backend;
pub mod shape;
pub mod triangulate;
pub mod units;
pub mod world;

#[cfg(test)]
mod testing;

// Re-export the engine so downstream crates can reach rapier types without depending on
// `rapier2d` directly.
pub use rapier2d;

pub use backend::{BodyId, BodyType, ContactListener, PhysicsBackend};
pub use collider::{Collider, ColliderId, ColliderMut, ColliderRef, TransformSink};
pub use config::WorldConfig;
pub use error::{PhysicsError, PhysicsResult};
pub use filter::{CollisionFilter, CollisionLayer, LayerMask};
pub use ledger::{BodyPair, CollisionEvent, CollisionLedger};
pub use rapier_backend::RapierBackend;
pub use shape::{ColliderDescriptor, ColliderShape, ShapeKind};
pub use triangulate::{Triangle, TriangulationError, triangulate};
pub use units::UnitScale;
pub use world::World;
