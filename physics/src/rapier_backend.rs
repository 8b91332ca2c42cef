/*!
[`PhysicsBackend`] on top of rapier2d.

Bodies
- One rapier rigid body per [`BodyId`]; the id lives in the body's `user_data` so collider
  handles reported by the narrow phase resolve back to it.
- Each [`ShapeDef`] becomes one rapier collider attached to the body. The packed
  [`CollisionFilter`] rides in the collider's `user_data` and is enforced by [`FilterHooks`].

Contacts
Rapier exposes the contact graph as state, not as begin/end callbacks. After every step the
graph is compared with the set of collider pairs that touched after the previous step:
- pair touching now but not before → `begin_contact`
- pair touching now and before      → `pre_solve` + `post_solve` with the fresh points
- pair touching before but not now  → `end_contact`

A pair "touches" when any of its manifolds carries solver contacts; the reported points are
those solver contacts' world-space positions. Sensor overlaps come from the intersection graph
and carry no points.
*/

use std::collections::HashMap;

use nalgebra::{Isometry2, Point2, UnitComplex, Vector2};
use rapier2d::prelude::*;

use crate::backend::{
    BodyDef, BodyId, BodyType, ContactListener, PhysicsBackend, Pose, ShapeDef, ShapeGeometry,
    StepParams,
};
use crate::filter::CollisionFilter;

/// Box2D-style pair filtering from the packed filter in each collider's `user_data`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterHooks;

impl FilterHooks {
    fn allows(context: &PairFilterContext) -> bool {
        let (Some(c1), Some(c2)) = (
            context.colliders.get(context.collider1),
            context.colliders.get(context.collider2),
        ) else {
            return false;
        };
        CollisionFilter::unpack(c1.user_data).should_collide(&CollisionFilter::unpack(c2.user_data))
    }
}

impl PhysicsHooks for FilterHooks {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        Self::allows(context).then_some(SolverFlags::COMPUTE_IMPULSES)
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        Self::allows(context)
    }
}

type ColliderPair = (ColliderHandle, ColliderHandle);

pub struct RapierBackend {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    hooks: FilterHooks,

    handles: HashMap<BodyId, RigidBodyHandle>,
    next_body: u64,
    /// Collider pairs touching after the previous step.
    touching: HashMap<ColliderPair, (BodyId, BodyId)>,
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierBackend {
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            hooks: FilterHooks,
            handles: HashMap::new(),
            next_body: 0,
            touching: HashMap::new(),
        }
    }

    /// Live bodies.
    pub fn body_count(&self) -> usize {
        self.handles.len()
    }

    /// Rapier colliders attached to `body` (one per shape).
    pub fn shape_count(&self, body: BodyId) -> usize {
        self.rigid_body(body).map_or(0, |rb| rb.colliders().len())
    }

    pub fn rigid_body(&self, body: BodyId) -> Option<&RigidBody> {
        self.handles.get(&body).and_then(|h| self.bodies.get(*h))
    }

    fn rigid_body_mut(&mut self, body: BodyId) -> Option<&mut RigidBody> {
        let handle = *self.handles.get(&body)?;
        self.bodies.get_mut(handle)
    }

    fn body_of_collider(&self, collider: ColliderHandle) -> Option<BodyId> {
        let parent = self.colliders.get(collider)?.parent()?;
        let rb = self.bodies.get(parent)?;
        Some(BodyId(rb.user_data as u64))
    }

    fn build_collider(shape: &ShapeDef) -> Collider {
        let builder = match shape.geometry {
            ShapeGeometry::Ball { center, radius } => {
                ColliderBuilder::ball(radius).translation(center)
            }
            ShapeGeometry::Cuboid {
                center,
                half_extents,
            } => ColliderBuilder::cuboid(half_extents.x, half_extents.y).translation(center),
            ShapeGeometry::Triangle([a, b, c]) => {
                ColliderBuilder::triangle(Point2::from(a), Point2::from(b), Point2::from(c))
            }
        };
        builder
            .density(shape.density)
            .restitution(shape.restitution)
            .friction(shape.friction)
            .sensor(shape.is_sensor)
            .user_data(shape.filter.pack())
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS | ActiveHooks::FILTER_INTERSECTION_PAIR)
            .build()
    }

    fn apply_step_params(&mut self, params: &StepParams) {
        self.integration_parameters.dt = params.time_step;
        self.integration_parameters.num_solver_iterations =
            params.velocity_iterations.max(1) as usize;
        self.integration_parameters.num_internal_stabilization_iterations =
            params.position_iterations as usize;
    }

    /// Touching collider pairs with their bodies and world-space contact points.
    fn collect_touching(&self) -> Vec<(ColliderPair, (BodyId, BodyId), Vec<Vector2<f32>>)> {
        let mut out = Vec::new();

        for pair in self.narrow_phase.contact_pairs() {
            let points: Vec<Vector2<f32>> = pair
                .manifolds
                .iter()
                .flat_map(|m| m.data.solver_contacts.iter().map(|c| c.point.coords))
                .collect();
            if points.is_empty() {
                continue;
            }
            if let (Some(a), Some(b)) = (
                self.body_of_collider(pair.collider1),
                self.body_of_collider(pair.collider2),
            ) {
                out.push(((pair.collider1, pair.collider2), (a, b), points));
            }
        }

        for (c1, c2, intersecting) in self.narrow_phase.intersection_pairs() {
            if !intersecting {
                continue;
            }
            if let (Some(a), Some(b)) = (self.body_of_collider(c1), self.body_of_collider(c2)) {
                out.push(((c1, c2), (a, b), Vec::new()));
            }
        }

        out
    }
}

impl PhysicsBackend for RapierBackend {
    fn create_body(&mut self, def: &BodyDef, shapes: &[ShapeDef]) -> BodyId {
        self.next_body += 1;
        let id = BodyId(self.next_body);

        let body_type = match def.body_type {
            BodyType::Static => RigidBodyType::Fixed,
            BodyType::Dynamic => RigidBodyType::Dynamic,
        };
        let rb = RigidBodyBuilder::new(body_type)
            .pose(Isometry2::new(def.translation, def.rotation))
            .user_data(id.0 as u128)
            .build();
        let handle = self.bodies.insert(rb);

        for shape in shapes {
            self.colliders
                .insert_with_parent(Self::build_collider(shape), handle, &mut self.bodies);
        }
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.recompute_mass_properties_from_colliders(&self.colliders);
        }

        self.handles.insert(id, handle);
        id
    }

    fn destroy_body(&mut self, body: BodyId) {
        let Some(handle) = self.handles.remove(&body) else {
            return;
        };
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.touching.retain(|_, (a, b)| *a != body && *b != body);
    }

    fn step(&mut self, params: &StepParams, listener: &mut dyn ContactListener) {
        self.apply_step_params(params);

        self.pipeline.step(
            &params.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &self.hooks,
            &(),
        );

        let now = self.collect_touching();
        let mut previous = std::mem::take(&mut self.touching);

        for (key, (a, b), points) in &now {
            if previous.remove(key).is_some() {
                listener.pre_solve(*a, *b, points);
                listener.post_solve(*a, *b, points);
            } else {
                listener.begin_contact(*a, *b, points);
            }
        }
        for (a, b) in previous.into_values() {
            listener.end_contact(a, b);
        }

        self.touching = now
            .into_iter()
            .map(|(key, bodies, _)| (key, bodies))
            .collect();
    }

    fn pose(&self, body: BodyId) -> Option<Pose> {
        self.rigid_body(body).map(|rb| Pose {
            translation: *rb.translation(),
            rotation: rb.rotation().angle(),
        })
    }

    fn set_translation(&mut self, body: BodyId, translation: Vector2<f32>) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_translation(translation, true);
        }
    }

    fn set_rotation(&mut self, body: BodyId, rotation: f32) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_rotation(UnitComplex::new(rotation), true);
        }
    }

    fn linear_velocity(&self, body: BodyId) -> Option<Vector2<f32>> {
        self.rigid_body(body).map(|rb| *rb.linvel())
    }

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vector2<f32>) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_linvel(velocity, true);
        }
    }

    fn angular_velocity(&self, body: BodyId) -> Option<f32> {
        self.rigid_body(body).map(|rb| rb.angvel())
    }

    fn set_angular_velocity(&mut self, body: BodyId, velocity: f32) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_angvel(velocity, true);
        }
    }

    fn apply_force(&mut self, body: BodyId, force: Vector2<f32>, point: Vector2<f32>) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.add_force_at_point(force, Point2::from(point), true);
        }
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vector2<f32>, point: Vector2<f32>) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.apply_impulse_at_point(impulse, Point2::from(point), true);
        }
    }
}
