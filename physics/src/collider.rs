/*!
Per-collider body state machine.

```text
            set_active(true) / rebuild
 Detached ─────────────────────────────► Active
    ▲  ▲                                  │  ▲
    │  └──────── set_active(false) ───────┘  │ World::update (rebuild)
    │                                        │
    └──── rebuild with nothing to build   Dirty ◄── structural write
```

- Structural writes (shape, material, sensor, center, filter, body type) never touch the
  engine; they only mark the collider dirty. `World::update` rebuilds each dirty collider
  once before stepping, however many writes happened since the last step.
- Position and angle writes go straight to a live body. Without a body they mark the
  collider dirty, so the next step builds one at the new pose.
- Detached colliders answer velocity reads with zero and ignore velocity/force writes.

Values crossing this API are scene units (pixels, degrees); conversion to the engine's meters
and radians happens here.
*/

use std::fmt;
use std::ops::Deref;

use nalgebra::Vector2;

use crate::backend::{BodyDef, BodyId, BodyType, PhysicsBackend};
use crate::error::{PhysicsError, PhysicsResult};
use crate::filter::{CollisionFilter, LayerMask};
use crate::ledger::CollisionLedger;
use crate::shape::{ColliderDescriptor, ColliderShape, ShapeKind};
use crate::units::{UnitScale, degrees_to_radians, radians_to_degrees};

/// Registry key of a collider inside a `World`. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColliderId(pub(crate) u64);

impl ColliderId {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ColliderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collider#{}", self.0)
    }
}

/// Receives a collider's pose after every step (scene units, degrees).
///
/// This is the hook through which a scene node follows its body. Any
/// `FnMut(Vector2<f32>, f32)` closure is a sink.
pub trait TransformSink {
    fn set_transform(&mut self, position: Vector2<f32>, angle_degrees: f32);
}

impl<F> TransformSink for F
where
    F: FnMut(Vector2<f32>, f32),
{
    fn set_transform(&mut self, position: Vector2<f32>, angle_degrees: f32) {
        self(position, angle_degrees)
    }
}

pub struct Collider {
    id: ColliderId,
    desc: ColliderDescriptor,
    body: Option<BodyId>,
    dirty: bool,
    sync_to_transform: bool,
    sink: Option<Box<dyn TransformSink>>,
}

impl fmt::Debug for Collider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collider")
            .field("id", &self.id)
            .field("kind", &self.desc.kind())
            .field("body", &self.body)
            .field("dirty", &self.dirty)
            .field("sync_to_transform", &self.sync_to_transform)
            .field("has_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl Collider {
    pub(crate) fn new(id: ColliderId, desc: ColliderDescriptor) -> Self {
        Self {
            id,
            desc,
            body: None,
            dirty: false,
            sync_to_transform: true,
            sink: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ColliderId {
        self.id
    }

    #[inline]
    pub fn descriptor(&self) -> &ColliderDescriptor {
        &self.desc
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.desc.kind()
    }

    #[inline]
    pub fn shape(&self) -> &ColliderShape {
        &self.desc.shape
    }

    /// Scene position; mirrors the body after each step.
    #[inline]
    pub fn position(&self) -> Vector2<f32> {
        self.desc.position
    }

    /// Degrees; mirrors the body after each step.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.desc.angle
    }

    #[inline]
    pub fn center_position(&self) -> Vector2<f32> {
        self.desc.center
    }

    /// Zero for static colliders, whatever was stored.
    #[inline]
    pub fn density(&self) -> f32 {
        self.desc.effective_density()
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.desc.restitution
    }

    #[inline]
    pub fn friction(&self) -> f32 {
        self.desc.friction
    }

    #[inline]
    pub fn is_sensor(&self) -> bool {
        self.desc.is_sensor
    }

    #[inline]
    pub fn filter(&self) -> CollisionFilter {
        self.desc.filter
    }

    #[inline]
    pub fn group_index(&self) -> i16 {
        self.desc.filter.group_index
    }

    #[inline]
    pub fn category_bits(&self) -> u16 {
        self.desc.filter.category.bits
    }

    #[inline]
    pub fn mask_bits(&self) -> u16 {
        self.desc.filter.mask.bits
    }

    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.desc.body_type
    }

    pub fn radius(&self) -> Option<f32> {
        match self.desc.shape {
            ColliderShape::Circle { radius } => Some(radius),
            _ => None,
        }
    }

    pub fn size(&self) -> Option<Vector2<f32>> {
        match self.desc.shape {
            ColliderShape::Rectangle { size } => Some(size),
            _ => None,
        }
    }

    pub fn triangle_points(&self) -> Option<[Vector2<f32>; 3]> {
        match self.desc.shape {
            ColliderShape::Triangle { points } => Some(points),
            _ => None,
        }
    }

    pub fn vertices(&self) -> Option<&[Vector2<f32>]> {
        match &self.desc.shape {
            ColliderShape::Polygon { vertices } => Some(vertices),
            _ => None,
        }
    }

    /// True while a body exists.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.body.is_some()
    }

    /// True when a rebuild is pending for the next step.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn body(&self) -> Option<BodyId> {
        self.body
    }

    #[inline]
    pub fn sync_to_transform(&self) -> bool {
        self.sync_to_transform
    }

    #[inline]
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Destroy the body (if any) and forget its contacts.
    pub(crate) fn release_body<B: PhysicsBackend>(
        &mut self,
        backend: &mut B,
        ledger: &mut CollisionLedger,
    ) {
        if let Some(body) = self.body.take() {
            backend.destroy_body(body);
            ledger.forget_body(body);
        }
    }

    /// Replace the body with one built from the current description. Clears the dirty flag.
    pub(crate) fn rebuild<B: PhysicsBackend>(
        &mut self,
        backend: &mut B,
        ledger: &mut CollisionLedger,
        scale: UnitScale,
    ) {
        self.release_body(backend, ledger);
        self.dirty = false;

        let shapes = match self.desc.shape_defs(scale) {
            Ok(shapes) => shapes,
            Err(err) => {
                log::warn!("{} left without a body: {err}", self.id);
                return;
            }
        };
        if shapes.is_empty() {
            log::debug!("{} has nothing to build ({:?})", self.id, self.kind());
            return;
        }

        let def = BodyDef {
            translation: scale.vector_to_physics(self.desc.position),
            rotation: degrees_to_radians(self.desc.angle),
            body_type: self.desc.body_type,
        };
        let body = backend.create_body(&def, &shapes);
        log::debug!(
            "{} rebuilt as {body:?} ({:?}, {} shape(s))",
            self.id,
            self.kind(),
            shapes.len()
        );
        self.body = Some(body);
    }

    /// Pull the body pose into the cached position/angle and feed the sink.
    pub(crate) fn sync_from_body<B: PhysicsBackend>(&mut self, backend: &B, scale: UnitScale) {
        let Some(pose) = self.body.and_then(|body| backend.pose(body)) else {
            return;
        };
        self.desc.position = scale.vector_to_scene(pose.translation);
        self.desc.angle = radians_to_degrees(pose.rotation);

        if self.sync_to_transform {
            if let Some(sink) = self.sink.as_mut() {
                sink.set_transform(self.desc.position, self.desc.angle);
            }
        }
    }

    fn velocity_from<B: PhysicsBackend>(&self, backend: &B, scale: UnitScale) -> Vector2<f32> {
        self.body
            .and_then(|body| backend.linear_velocity(body))
            .map(|v| scale.vector_to_scene(v))
            .unwrap_or_else(Vector2::zeros)
    }

    fn angular_velocity_from<B: PhysicsBackend>(&self, backend: &B) -> f32 {
        self.body
            .and_then(|body| backend.angular_velocity(body))
            .map(radians_to_degrees)
            .unwrap_or(0.0)
    }
}

fn mismatch(operation: &'static str, expected: ShapeKind, actual: ShapeKind) -> PhysicsError {
    PhysicsError::ShapeMismatch {
        operation,
        expected,
        actual,
    }
}

/// Shared view of a collider that can also read its body.
pub struct ColliderRef<'w, B: PhysicsBackend> {
    collider: &'w Collider,
    backend: &'w B,
    scale: UnitScale,
}

impl<'w, B: PhysicsBackend> ColliderRef<'w, B> {
    pub(crate) fn new(collider: &'w Collider, backend: &'w B, scale: UnitScale) -> Self {
        Self {
            collider,
            backend,
            scale,
        }
    }

    /// Scene units per second; zero while detached.
    pub fn velocity(&self) -> Vector2<f32> {
        self.collider.velocity_from(self.backend, self.scale)
    }

    /// Degrees per second; zero while detached.
    pub fn angular_velocity(&self) -> f32 {
        self.collider.angular_velocity_from(self.backend)
    }
}

impl<B: PhysicsBackend> Deref for ColliderRef<'_, B> {
    type Target = Collider;

    fn deref(&self) -> &Collider {
        self.collider
    }
}

/// Mutable access to one collider, borrowing what its body lives in.
pub struct ColliderMut<'w, B: PhysicsBackend> {
    collider: &'w mut Collider,
    backend: &'w mut B,
    ledger: &'w mut CollisionLedger,
    scale: UnitScale,
}

impl<B: PhysicsBackend> Deref for ColliderMut<'_, B> {
    type Target = Collider;

    fn deref(&self) -> &Collider {
        &*self.collider
    }
}

impl<'w, B: PhysicsBackend> ColliderMut<'w, B> {
    pub(crate) fn new(
        collider: &'w mut Collider,
        backend: &'w mut B,
        ledger: &'w mut CollisionLedger,
        scale: UnitScale,
    ) -> Self {
        Self {
            collider,
            backend,
            ledger,
            scale,
        }
    }

    // ---- pose ------------------------------------------------------------------------------

    /// Moves the live body directly; without a body, marks the collider dirty.
    pub fn set_position(&mut self, position: Vector2<f32>) {
        self.collider.desc.position = position;
        match self.collider.body {
            Some(body) => self
                .backend
                .set_translation(body, self.scale.vector_to_physics(position)),
            None => self.collider.mark_dirty(),
        }
    }

    /// Degrees. Rotates the live body directly; without a body, marks the collider dirty.
    pub fn set_angle(&mut self, degrees: f32) {
        self.collider.desc.angle = degrees;
        match self.collider.body {
            Some(body) => self.backend.set_rotation(body, degrees_to_radians(degrees)),
            None => self.collider.mark_dirty(),
        }
    }

    // ---- structural (each marks the collider dirty) -------------------------------------

    pub fn set_center_position(&mut self, center: Vector2<f32>) {
        self.collider.desc.center = center;
        self.collider.mark_dirty();
    }

    pub fn set_density(&mut self, density: f32) {
        self.collider.desc.density = density;
        self.collider.mark_dirty();
    }

    pub fn set_restitution(&mut self, restitution: f32) {
        self.collider.desc.restitution = restitution;
        self.collider.mark_dirty();
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.collider.desc.friction = friction;
        self.collider.mark_dirty();
    }

    pub fn set_sensor(&mut self, is_sensor: bool) {
        self.collider.desc.is_sensor = is_sensor;
        self.collider.mark_dirty();
    }

    pub fn set_group_index(&mut self, group_index: i16) {
        self.collider.desc.filter.group_index = group_index;
        self.collider.mark_dirty();
    }

    pub fn set_category_bits(&mut self, bits: u16) {
        self.collider.desc.filter.category = LayerMask::new(bits);
        self.collider.mark_dirty();
    }

    pub fn set_mask_bits(&mut self, bits: u16) {
        self.collider.desc.filter.mask = LayerMask::new(bits);
        self.collider.mark_dirty();
    }

    pub fn set_filter(&mut self, filter: CollisionFilter) {
        self.collider.desc.filter = filter;
        self.collider.mark_dirty();
    }

    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.collider.desc.body_type = body_type;
        self.collider.mark_dirty();
    }

    /// Replace the shape, possibly with one of another kind.
    pub fn set_shape(&mut self, shape: ColliderShape) {
        self.collider.desc.shape = shape;
        self.collider.mark_dirty();
    }

    pub fn set_radius(&mut self, radius: f32) -> PhysicsResult<()> {
        match &mut self.collider.desc.shape {
            ColliderShape::Circle { radius: r } => *r = radius,
            other => return Err(mismatch("set_radius", ShapeKind::Circle, other.kind())),
        }
        self.collider.mark_dirty();
        Ok(())
    }

    pub fn set_size(&mut self, size: Vector2<f32>) -> PhysicsResult<()> {
        match &mut self.collider.desc.shape {
            ColliderShape::Rectangle { size: s } => *s = size,
            other => return Err(mismatch("set_size", ShapeKind::Rectangle, other.kind())),
        }
        self.collider.mark_dirty();
        Ok(())
    }

    /// `index` is 0, 1 or 2.
    pub fn set_triangle_point(&mut self, index: usize, point: Vector2<f32>) -> PhysicsResult<()> {
        match &mut self.collider.desc.shape {
            ColliderShape::Triangle { points } => {
                let slot = points
                    .get_mut(index)
                    .ok_or(PhysicsError::TrianglePointIndex(index))?;
                *slot = point;
            }
            other => {
                return Err(mismatch(
                    "set_triangle_point",
                    ShapeKind::Triangle,
                    other.kind(),
                ));
            }
        }
        self.collider.mark_dirty();
        Ok(())
    }

    /// Append a vertex. An exact duplicate of an existing vertex is ignored.
    pub fn add_vertex(&mut self, vertex: Vector2<f32>) -> PhysicsResult<()> {
        match &mut self.collider.desc.shape {
            ColliderShape::Polygon { vertices } => {
                if vertices.contains(&vertex) {
                    return Ok(());
                }
                vertices.push(vertex);
            }
            other => return Err(mismatch("add_vertex", ShapeKind::Polygon, other.kind())),
        }
        self.collider.mark_dirty();
        Ok(())
    }

    pub fn clear_vertices(&mut self) -> PhysicsResult<()> {
        match &mut self.collider.desc.shape {
            ColliderShape::Polygon { vertices } => vertices.clear(),
            other => return Err(mismatch("clear_vertices", ShapeKind::Polygon, other.kind())),
        }
        self.collider.mark_dirty();
        Ok(())
    }

    // ---- dynamics --------------------------------------------------------------------------

    /// Scene units per second; zero while detached.
    pub fn velocity(&self) -> Vector2<f32> {
        self.collider.velocity_from(&*self.backend, self.scale)
    }

    /// Ignored while detached.
    pub fn set_velocity(&mut self, velocity: Vector2<f32>) {
        if let Some(body) = self.collider.body {
            self.backend
                .set_linear_velocity(body, self.scale.vector_to_physics(velocity));
        }
    }

    /// Degrees per second; zero while detached.
    pub fn angular_velocity(&self) -> f32 {
        self.collider.angular_velocity_from(&*self.backend)
    }

    /// Degrees per second. Ignored while detached.
    pub fn set_angular_velocity(&mut self, degrees_per_second: f32) {
        if let Some(body) = self.collider.body {
            self.backend
                .set_angular_velocity(body, degrees_to_radians(degrees_per_second));
        }
    }

    /// Force applied over the next step at `position + local_point`. Ignored while detached.
    pub fn apply_force(&mut self, force: Vector2<f32>, local_point: Vector2<f32>) {
        if let Some(body) = self.collider.body {
            let point = self.collider.desc.position + local_point;
            self.backend.apply_force(
                body,
                self.scale.vector_to_physics(force),
                self.scale.vector_to_physics(point),
            );
        }
    }

    /// Impulse at `position + local_point`. Ignored while detached.
    pub fn apply_impulse(&mut self, impulse: Vector2<f32>, local_point: Vector2<f32>) {
        if let Some(body) = self.collider.body {
            let point = self.collider.desc.position + local_point;
            self.backend.apply_impulse(
                body,
                self.scale.vector_to_physics(impulse),
                self.scale.vector_to_physics(point),
            );
        }
    }

    // ---- lifecycle -------------------------------------------------------------------------

    /// `false` destroys the body and drops any pending rebuild; `true` on a detached collider
    /// builds a body immediately.
    pub fn set_active(&mut self, active: bool) {
        if active {
            if !self.collider.is_active() {
                self.collider
                    .rebuild(&mut *self.backend, &mut *self.ledger, self.scale);
            }
        } else {
            self.collider.release_body(&mut *self.backend, &mut *self.ledger);
            self.collider.dirty = false;
        }
    }

    pub fn set_sync_to_transform(&mut self, sync: bool) {
        self.collider.sync_to_transform = sync;
    }

    pub fn set_transform_sink(&mut self, sink: impl TransformSink + 'static) {
        self.collider.sink = Some(Box::new(sink));
    }

    pub fn clear_transform_sink(&mut self) {
        self.collider.sink = None;
    }
}
