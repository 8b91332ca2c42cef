//! Scripted backend for state-machine tests.
//!
//! Bodies are plain records; nothing moves unless a test says so. Contact callbacks are
//! queued with [`ScriptedBackend::script`] and delivered on the next `step`.

use std::collections::HashMap;

use nalgebra::Vector2;

use crate::backend::{
    BodyDef, BodyId, ContactListener, PhysicsBackend, Pose, ShapeDef, StepParams,
};

#[derive(Clone, Debug)]
pub(crate) struct ScriptedBody {
    pub def: BodyDef,
    pub shapes: Vec<ShapeDef>,
    pub pose: Pose,
    pub linvel: Vector2<f32>,
    pub angvel: f32,
    pub forces: Vec<(Vector2<f32>, Vector2<f32>)>,
    pub impulses: Vec<(Vector2<f32>, Vector2<f32>)>,
}

#[derive(Clone, Debug)]
pub(crate) enum Scripted {
    Begin(BodyId, BodyId, Vec<Vector2<f32>>),
    Persist(BodyId, BodyId, Vec<Vector2<f32>>),
    End(BodyId, BodyId),
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    next_id: u64,
    pub bodies: HashMap<BodyId, ScriptedBody>,
    pub created: usize,
    pub destroyed: usize,
    pub steps: Vec<StepParams>,
    script: Vec<Scripted>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback for the next step.
    pub fn script(&mut self, event: Scripted) {
        self.script.push(event);
    }

    /// Move a body as if the engine had integrated it.
    pub fn teleport(&mut self, body: BodyId, translation: Vector2<f32>, rotation: f32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pose = Pose {
                translation,
                rotation,
            };
        }
    }

    pub fn body(&self, body: BodyId) -> Option<&ScriptedBody> {
        self.bodies.get(&body)
    }
}

impl PhysicsBackend for ScriptedBackend {
    fn create_body(&mut self, def: &BodyDef, shapes: &[ShapeDef]) -> BodyId {
        self.next_id += 1;
        self.created += 1;
        let id = BodyId(self.next_id);
        self.bodies.insert(
            id,
            ScriptedBody {
                def: *def,
                shapes: shapes.to_vec(),
                pose: Pose {
                    translation: def.translation,
                    rotation: def.rotation,
                },
                linvel: Vector2::zeros(),
                angvel: 0.0,
                forces: Vec::new(),
                impulses: Vec::new(),
            },
        );
        id
    }

    fn destroy_body(&mut self, body: BodyId) {
        if self.bodies.remove(&body).is_some() {
            self.destroyed += 1;
        }
    }

    fn step(&mut self, params: &StepParams, listener: &mut dyn ContactListener) {
        self.steps.push(*params);
        for event in self.script.drain(..) {
            match event {
                Scripted::Begin(a, b, points) => listener.begin_contact(a, b, &points),
                Scripted::Persist(a, b, points) => {
                    listener.pre_solve(a, b, &points);
                    listener.post_solve(a, b, &points);
                }
                Scripted::End(a, b) => listener.end_contact(a, b),
            }
        }
    }

    fn pose(&self, body: BodyId) -> Option<Pose> {
        self.bodies.get(&body).map(|b| b.pose)
    }

    fn set_translation(&mut self, body: BodyId, translation: Vector2<f32>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pose.translation = translation;
        }
    }

    fn set_rotation(&mut self, body: BodyId, rotation: f32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pose.rotation = rotation;
        }
    }

    fn linear_velocity(&self, body: BodyId) -> Option<Vector2<f32>> {
        self.bodies.get(&body).map(|b| b.linvel)
    }

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vector2<f32>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.linvel = velocity;
        }
    }

    fn angular_velocity(&self, body: BodyId) -> Option<f32> {
        self.bodies.get(&body).map(|b| b.angvel)
    }

    fn set_angular_velocity(&mut self, body: BodyId, velocity: f32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.angvel = velocity;
        }
    }

    fn apply_force(&mut self, body: BodyId, force: Vector2<f32>, point: Vector2<f32>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.forces.push((force, point));
        }
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vector2<f32>, point: Vector2<f32>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.impulses.push((impulse, point));
        }
    }
}
