/*!
Collider registry and per-frame stepping.

`World::update` is the only place that advances time:

1. every dirty collider is rebuilt (once, however many writes it received),
2. the backend steps with the collision ledger as its contact listener,
3. every collider mirrors its body pose, and opted-in transform sinks are notified.

Registration and removal need `&mut World`, so they can never interleave with a step.
Colliders are kept in id order, which makes rebuild and sync order deterministic.
*/

use std::collections::BTreeMap;

use nalgebra::Vector2;

use crate::backend::{BodyId, PhysicsBackend, StepParams};
use crate::collider::{Collider, ColliderId, ColliderMut, ColliderRef};
use crate::config::WorldConfig;
use crate::error::{PhysicsError, PhysicsResult};
use crate::ledger::{CollisionEvent, CollisionLedger};
use crate::rapier_backend::RapierBackend;
use crate::shape::ColliderDescriptor;
use crate::units::UnitScale;

pub struct World<B: PhysicsBackend = RapierBackend> {
    backend: B,
    ledger: CollisionLedger,
    colliders: BTreeMap<ColliderId, Collider>,
    next_id: u64,
    config: WorldConfig,
}

impl World<RapierBackend> {
    /// Rapier-backed world with default settings.
    pub fn new() -> Self {
        Self::build(RapierBackend::new(), WorldConfig::default())
    }

    pub fn from_config(config: WorldConfig) -> PhysicsResult<Self> {
        Self::with_backend(RapierBackend::new(), config)
    }
}

impl Default for World<RapierBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: PhysicsBackend> World<B> {
    pub fn with_backend(backend: B, config: WorldConfig) -> PhysicsResult<Self> {
        config.validate()?;
        Ok(Self::build(backend, config))
    }

    fn build(backend: B, config: WorldConfig) -> Self {
        log::info!(
            "physics world: gravity {:?} m/s², dt {:.4}s, iterations {}/{}, {} px/m",
            config.gravity,
            config.time_step,
            config.velocity_iterations,
            config.position_iterations,
            config.pixels_per_meter
        );
        Self {
            backend,
            ledger: CollisionLedger::new(),
            colliders: BTreeMap::new(),
            next_id: 0,
            config,
        }
    }

    // ---- settings --------------------------------------------------------------------------

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn scale(&self) -> UnitScale {
        self.config.scale()
    }

    /// Physics units (m/s²).
    #[inline]
    pub fn gravity(&self) -> Vector2<f32> {
        self.config.gravity_vector()
    }

    pub fn set_gravity(&mut self, gravity: Vector2<f32>) -> PhysicsResult<()> {
        self.reconfigure(|c| c.gravity = [gravity.x, gravity.y])
    }

    pub fn set_time_step(&mut self, seconds: f32) -> PhysicsResult<()> {
        self.reconfigure(|c| c.time_step = seconds)
    }

    pub fn set_velocity_iterations(&mut self, iterations: u32) -> PhysicsResult<()> {
        self.reconfigure(|c| c.velocity_iterations = iterations)
    }

    pub fn set_position_iterations(&mut self, iterations: u32) -> PhysicsResult<()> {
        self.reconfigure(|c| c.position_iterations = iterations)
    }

    /// Change the scene/physics scale. Every collider is rebuilt on the next step.
    pub fn set_pixels_per_meter(&mut self, pixels_per_meter: f32) {
        self.config.pixels_per_meter = pixels_per_meter;
        for collider in self.colliders.values_mut() {
            collider.mark_dirty();
        }
    }

    fn reconfigure(&mut self, edit: impl FnOnce(&mut WorldConfig)) -> PhysicsResult<()> {
        let mut next = self.config;
        edit(&mut next);
        next.validate()?;
        self.config = next;
        Ok(())
    }

    // ---- registry --------------------------------------------------------------------------

    /// Register a collider and build its body right away.
    pub fn add_collider(&mut self, descriptor: ColliderDescriptor) -> ColliderId {
        self.next_id += 1;
        let id = ColliderId(self.next_id);
        let mut collider = Collider::new(id, descriptor);
        collider.rebuild(&mut self.backend, &mut self.ledger, self.config.scale());
        self.colliders.insert(id, collider);
        id
    }

    /// Unregister a collider, destroying its body and its contact records.
    pub fn remove_collider(&mut self, id: ColliderId) -> PhysicsResult<()> {
        let mut collider = self
            .colliders
            .remove(&id)
            .ok_or(PhysicsError::UnknownCollider(id.raw()))?;
        collider.release_body(&mut self.backend, &mut self.ledger);
        log::debug!("{id} removed");
        Ok(())
    }

    pub fn contains(&self, id: ColliderId) -> bool {
        self.colliders.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Colliders in id order.
    pub fn colliders(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.values()
    }

    pub fn collider(&self, id: ColliderId) -> Option<ColliderRef<'_, B>> {
        let scale = self.config.scale();
        self.colliders
            .get(&id)
            .map(|c| ColliderRef::new(c, &self.backend, scale))
    }

    pub fn collider_mut(&mut self, id: ColliderId) -> Option<ColliderMut<'_, B>> {
        let scale = self.config.scale();
        self.colliders
            .get_mut(&id)
            .map(|c| ColliderMut::new(c, &mut self.backend, &mut self.ledger, scale))
    }

    /// Which collider owns `body`, if it is still alive.
    pub fn collider_of(&self, body: BodyId) -> Option<ColliderId> {
        self.colliders
            .values()
            .find(|c| c.body() == Some(body))
            .map(Collider::id)
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ---- stepping --------------------------------------------------------------------------

    pub fn update(&mut self) {
        let scale = self.config.scale();

        let mut rebuilt = 0usize;
        for collider in self.colliders.values_mut() {
            if collider.is_dirty() {
                collider.rebuild(&mut self.backend, &mut self.ledger, scale);
                rebuilt += 1;
            }
        }

        let params = StepParams {
            gravity: self.config.gravity_vector(),
            time_step: self.config.time_step,
            velocity_iterations: self.config.velocity_iterations,
            position_iterations: self.config.position_iterations,
        };
        self.backend.step(&params, &mut self.ledger);

        for collider in self.colliders.values_mut() {
            collider.sync_from_body(&self.backend, scale);
        }

        log::trace!(
            "step: {} collider(s), {rebuilt} rebuilt, {} touching pair(s)",
            self.colliders.len(),
            self.ledger.len()
        );
    }

    // ---- collision queries -----------------------------------------------------------------

    fn bodies_of(&self, a: ColliderId, b: ColliderId) -> Option<(BodyId, BodyId)> {
        let body_a = self.colliders.get(&a)?.body()?;
        let body_b = self.colliders.get(&b)?.body()?;
        Some((body_a, body_b))
    }

    /// True while the two colliders touch. False when either is unknown or detached.
    pub fn is_collided_with(&self, a: ColliderId, b: ColliderId) -> bool {
        self.bodies_of(a, b)
            .is_some_and(|(body_a, body_b)| self.ledger.contains(body_a, body_b))
    }

    /// Contact points in scene units, `None` when the colliders do not touch.
    pub fn contact_points(&self, a: ColliderId, b: ColliderId) -> Option<Vec<Vector2<f32>>> {
        let (body_a, body_b) = self.bodies_of(a, b)?;
        let scale = self.config.scale();
        self.ledger
            .query(body_a, body_b)
            .map(|points| points.iter().map(|p| scale.vector_to_scene(*p)).collect())
    }

    #[inline]
    pub fn ledger(&self) -> &CollisionLedger {
        &self.ledger
    }

    /// Pair enter/exit events since the last drain.
    ///
    /// `Stopped` events may name bodies that were destroyed; [`World::collider_of`] returns
    /// `None` for those.
    pub fn drain_collision_events(&mut self) -> Vec<CollisionEvent> {
        self.ledger.drain_events()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::BodyType;
    use crate::ledger::BodyPair;
    use crate::shape::ColliderShape;
    use crate::testing::{Scripted, ScriptedBackend};

    fn v(x: f32, y: f32) -> Vector2<f32> {
        Vector2::new(x, y)
    }

    fn world() -> World<ScriptedBackend> {
        World::with_backend(ScriptedBackend::new(), WorldConfig::default()).unwrap()
    }

    fn body(world: &World<ScriptedBackend>, id: ColliderId) -> BodyId {
        world.collider(id).and_then(|c| c.body()).unwrap()
    }

    #[test]
    fn writes_between_steps_coalesce_into_one_rebuild() {
        let mut w = world();
        let id = w.add_collider(ColliderDescriptor::rectangle(v(10.0, 10.0)));
        assert_eq!(w.backend().created, 1);

        {
            let mut c = w.collider_mut(id).unwrap();
            c.set_density(2.0);
            c.set_friction(0.5);
            c.set_restitution(0.0);
            c.set_size(v(20.0, 5.0)).unwrap();
            c.set_mask_bits(0x00FF);
        }
        w.update();
        assert_eq!(w.backend().created, 2);
        assert_eq!(w.backend().destroyed, 1);
        assert!(!w.collider(id).unwrap().is_dirty());

        // Nothing pending: the next step rebuilds nothing.
        w.update();
        assert_eq!(w.backend().created, 2);

        let shapes = &w.backend().body(body(&w, id)).unwrap().shapes;
        assert_eq!(shapes[0].friction, 0.5);
        assert_eq!(shapes[0].filter.mask.bits, 0x00FF);
    }

    #[test]
    fn pose_writes_do_not_trigger_rebuilds() {
        let mut w = world();
        let id = w.add_collider(ColliderDescriptor::circle(10.0));
        for i in 0..10 {
            let mut c = w.collider_mut(id).unwrap();
            c.set_position(v(i as f32, 0.0));
            c.set_angle(i as f32 * 10.0);
            drop(c);
            w.update();
        }
        assert_eq!(w.backend().created, 1);
        assert_eq!(w.backend().destroyed, 0);
        let c = w.collider(id).unwrap();
        assert!((c.position() - v(9.0, 0.0)).norm() < 1.0e-4);
        assert!((c.angle() - 90.0).abs() < 1.0e-3);
    }

    #[test]
    fn step_receives_configured_parameters() {
        let mut w = world();
        w.set_time_step(0.01).unwrap();
        w.set_velocity_iterations(4).unwrap();
        w.set_position_iterations(2).unwrap();
        w.set_gravity(v(0.0, -1.0)).unwrap();
        w.update();

        let params = w.backend().steps[0];
        assert!((params.time_step - 0.01).abs() < 1.0e-9);
        assert_eq!(params.velocity_iterations, 4);
        assert_eq!(params.position_iterations, 2);
        assert_eq!(params.gravity, v(0.0, -1.0));
    }

    #[test]
    fn invalid_settings_are_rejected_and_kept() {
        let mut w = world();
        assert!(w.set_time_step(0.0).is_err());
        assert!(w.set_velocity_iterations(0).is_err());
        assert!(w.set_gravity(v(f32::NAN, 0.0)).is_err());
        assert_eq!(*w.config(), WorldConfig::default());

        let bad = WorldConfig {
            time_step: -1.0,
            ..WorldConfig::default()
        };
        assert!(World::with_backend(ScriptedBackend::new(), bad).is_err());
    }

    #[test]
    fn contact_lifecycle_through_the_world() {
        let mut w = world();
        let a = w.add_collider(ColliderDescriptor::circle(10.0));
        let b = w.add_collider(ColliderDescriptor::circle(10.0));
        let c = w.add_collider(ColliderDescriptor::circle(10.0));
        let (ba, bb) = (body(&w, a), body(&w, b));

        assert!(!w.is_collided_with(a, b));

        w.backend.script(Scripted::Begin(ba, bb, vec![v(1.0, 2.0)]));
        w.update();
        assert!(w.is_collided_with(a, b));
        assert!(w.is_collided_with(b, a));
        assert!(!w.is_collided_with(a, c));
        let points = w.contact_points(b, a).unwrap();
        assert_eq!(points.len(), 1);
        assert!((points[0] - v(100.0, 200.0)).norm() < 1.0e-3);

        w.backend
            .script(Scripted::Persist(bb, ba, vec![v(1.0, 1.0), v(2.0, 1.0)]));
        w.update();
        assert_eq!(w.contact_points(a, b).map(|p| p.len()), Some(2));

        w.backend.script(Scripted::End(ba, bb));
        w.update();
        assert!(!w.is_collided_with(a, b));
        assert!(w.contact_points(a, b).is_none());

        let pair = BodyPair::new(ba, bb);
        assert_eq!(
            w.drain_collision_events(),
            vec![CollisionEvent::Started(pair), CollisionEvent::Stopped(pair)]
        );
        assert_eq!(w.collider_of(ba), Some(a));
    }

    #[test]
    fn queries_on_detached_or_unknown_colliders_are_false() {
        let mut w = world();
        let a = w.add_collider(ColliderDescriptor::circle(10.0));
        let b = w.add_collider(ColliderDescriptor::circle(10.0));
        let (ba, bb) = (body(&w, a), body(&w, b));
        w.backend.script(Scripted::Begin(ba, bb, vec![]));
        w.update();
        assert!(w.is_collided_with(a, b));

        w.collider_mut(a).unwrap().set_active(false);
        assert!(!w.is_collided_with(a, b));
        assert!(w.contact_points(a, b).is_none());
        assert!(w.ledger().is_empty(), "detaching drops the body's records");

        let ghost = ColliderId(999);
        assert!(!w.is_collided_with(ghost, b));
        assert!(w.contact_points(b, ghost).is_none());
        assert!(w.collider_mut(ghost).is_none());
    }

    #[test]
    fn rebuilt_body_does_not_inherit_contacts() {
        let mut w = world();
        let a = w.add_collider(ColliderDescriptor::circle(10.0));
        let b = w.add_collider(ColliderDescriptor::circle(10.0));
        let (ba, bb) = (body(&w, a), body(&w, b));
        w.backend.script(Scripted::Begin(ba, bb, vec![]));
        w.update();

        w.collider_mut(a).unwrap().set_radius(20.0).unwrap();
        w.update();
        assert_ne!(body(&w, a), ba);
        assert!(!w.is_collided_with(a, b));

        // A stale end for the old body is ignored.
        w.backend.script(Scripted::End(ba, bb));
        w.update();
        assert!(w.ledger().is_empty());
    }

    #[test]
    fn sinks_follow_bodies_after_each_step() {
        let mut w = world();
        let id = w.add_collider(ColliderDescriptor::rectangle(v(50.0, 50.0)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        w.collider_mut(id)
            .unwrap()
            .set_transform_sink(move |p: Vector2<f32>, a: f32| sink.borrow_mut().push((p, a)));

        let b = body(&w, id);
        w.backend.teleport(b, v(4.0, 3.0), std::f32::consts::PI);
        w.update();
        {
            let seen = seen.borrow();
            assert_eq!(seen.len(), 1);
            assert!((seen[0].0 - v(400.0, 300.0)).norm() < 1.0e-3);
            assert!((seen[0].1 - 180.0).abs() < 1.0e-3);
        }

        w.collider_mut(id).unwrap().set_sync_to_transform(false);
        w.update();
        assert_eq!(seen.borrow().len(), 1);
        // The collider itself still mirrors the body.
        assert!((w.collider(id).unwrap().position() - v(400.0, 300.0)).norm() < 1.0e-3);
    }

    #[test]
    fn remove_collider_destroys_body_and_records() {
        let mut w = world();
        let a = w.add_collider(ColliderDescriptor::circle(10.0));
        let b = w.add_collider(ColliderDescriptor::circle(10.0));
        let (ba, bb) = (body(&w, a), body(&w, b));
        w.backend.script(Scripted::Begin(ba, bb, vec![]));
        w.update();
        w.drain_collision_events();

        w.remove_collider(a).unwrap();
        assert!(!w.contains(a));
        assert_eq!(w.len(), 1);
        assert_eq!(w.backend().destroyed, 1);
        assert!(w.ledger().is_empty());
        assert_eq!(
            w.drain_collision_events(),
            vec![CollisionEvent::Stopped(BodyPair::new(ba, bb))]
        );
        assert_eq!(w.collider_of(ba), None);

        assert!(matches!(
            w.remove_collider(a),
            Err(PhysicsError::UnknownCollider(_))
        ));
    }

    #[test]
    fn rescaling_rebuilds_everything() {
        let mut w = world();
        let a = w.add_collider(ColliderDescriptor::circle(50.0).with_position(v(100.0, 0.0)));
        let b = w.add_collider(ColliderDescriptor::triangle());
        w.set_pixels_per_meter(50.0);
        assert!(w.collider(a).unwrap().is_dirty());
        assert!(w.collider(b).unwrap().is_dirty());

        w.update();
        assert_eq!(w.backend().created, 4);
        let raw = w.backend().body(body(&w, a)).unwrap();
        assert!((raw.def.translation - v(2.0, 0.0)).norm() < 1.0e-6);
        match raw.shapes[0].geometry {
            crate::backend::ShapeGeometry::Ball { radius, .. } => {
                assert!((radius - 1.0).abs() < 1.0e-6)
            }
            ref other => panic!("expected ball, got {other:?}"),
        }
    }

    #[test]
    fn polygon_grows_into_a_body() {
        let mut w = world();
        let id = w.add_collider(ColliderDescriptor::polygon(Vec::new()));
        assert!(!w.collider(id).unwrap().is_active());

        {
            let mut c = w.collider_mut(id).unwrap();
            for p in [v(0.0, 0.0), v(100.0, 0.0), v(100.0, 100.0), v(0.0, 100.0)] {
                c.add_vertex(p).unwrap();
            }
        }
        w.update();
        assert_eq!(w.backend().created, 1, "four vertex writes, one body");
        assert_eq!(
            w.backend().body(body(&w, id)).unwrap().shapes.len(),
            2,
            "square splits into two triangles"
        );
    }

    #[test]
    fn dirty_detached_collider_is_rebuilt_on_step() {
        let mut w = world();
        let id = w.add_collider(ColliderDescriptor::circle(10.0));
        w.collider_mut(id).unwrap().set_active(false);
        w.update();
        assert!(!w.collider(id).unwrap().is_active(), "stays detached while clean");

        w.collider_mut(id)
            .unwrap()
            .set_body_type(BodyType::Static);
        w.update();
        assert!(w.collider(id).unwrap().is_active());
        assert_eq!(w.collider(id).unwrap().density(), 0.0);
    }

    #[test]
    fn kind_can_change_at_runtime() {
        let mut w = world();
        let id = w.add_collider(ColliderDescriptor::circle(10.0));
        w.collider_mut(id)
            .unwrap()
            .set_shape(ColliderShape::Rectangle { size: v(4.0, 2.0) });
        w.update();
        let c = w.collider(id).unwrap();
        assert_eq!(c.size(), Some(v(4.0, 2.0)));
        assert_eq!(c.radius(), None);
        assert!(c.is_active());
    }

    #[test]
    fn ids_are_monotonic_and_iterated_in_order() {
        let mut w = world();
        let a = w.add_collider(ColliderDescriptor::circle(1.0));
        let b = w.add_collider(ColliderDescriptor::circle(1.0));
        w.remove_collider(a).unwrap();
        let c = w.add_collider(ColliderDescriptor::circle(1.0));
        assert!(a < b && b < c);
        let order: Vec<_> = w.colliders().map(Collider::id).collect();
        assert_eq!(order, vec![b, c]);
    }
}
