//! Headless sandbox: a static floor, a tilted box, and a new box plus triangle every half
//! second, all falling onto the floor.
//!
//! Usage: `sandbox [world.toml] [frames]`. Set `RUST_LOG=debug` (or `trace`) to watch rebuilds
//! and contacts.

use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};
use nalgebra::Vector2;
use physics::{
    BodyType, CollisionEvent, CollisionFilter, ColliderDescriptor, ColliderId, LayerMask, World,
    WorldConfig, define_collision_layers,
};

define_collision_layers!(Layer, u16, {
    Ground,
    Debris,
});

const DEFAULT_FRAMES: usize = 600;
const SPAWN_EVERY: usize = 30;

/// Stand-in for a scene node that follows its collider.
#[derive(Debug, Default)]
struct Node {
    position: Vector2<f32>,
    angle: f32,
}

fn follow(node: &Rc<RefCell<Node>>) -> impl FnMut(Vector2<f32>, f32) + 'static {
    let node = Rc::clone(node);
    move |position, angle| {
        let mut node = node.borrow_mut();
        node.position = position;
        node.angle = angle;
    }
}

fn debris_filter() -> CollisionFilter {
    CollisionFilter {
        group_index: 0,
        category: LayerMask::empty().with(Layer::Debris),
        mask: LayerMask::from_layers(&[Layer::Ground, Layer::Debris]),
    }
}

fn spawn_box(world: &mut World, nodes: &mut Vec<(ColliderId, Rc<RefCell<Node>>)>, restitution: f32) {
    let size = Vector2::new(50.0, 50.0);
    let id = world.add_collider(
        ColliderDescriptor::rectangle(size)
            .with_position(Vector2::new(400.0, 80.0))
            .with_center(size / 2.0)
            .with_angle(40.0)
            .with_restitution(restitution)
            .with_filter(debris_filter()),
    );
    let node = Rc::new(RefCell::new(Node::default()));
    if let Some(mut collider) = world.collider_mut(id) {
        collider.set_transform_sink(follow(&node));
    }
    nodes.push((id, node));
}

fn spawn_triangle(world: &mut World, nodes: &mut Vec<(ColliderId, Rc<RefCell<Node>>)>) {
    let id = world.add_collider(
        ColliderDescriptor::polygon(Vec::new())
            .with_position(Vector2::new(300.0, 80.0))
            .with_angle(40.0)
            .with_restitution(0.0)
            .with_filter(debris_filter()),
    );
    let node = Rc::new(RefCell::new(Node::default()));
    if let Some(mut collider) = world.collider_mut(id) {
        for vertex in [
            Vector2::new(50.0, 50.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(100.0, 50.0),
        ] {
            if let Err(err) = collider.add_vertex(vertex) {
                warn!("{id}: {err}");
            }
        }
        collider.set_transform_sink(follow(&node));
    }
    nodes.push((id, node));
}

fn load_config(path: Option<&String>) -> WorldConfig {
    let Some(path) = path else {
        return WorldConfig::default();
    };
    match WorldConfig::load(path) {
        Ok(config) => config,
        Err(err) => {
            warn!("using default world config, {path}: {err}");
            WorldConfig::default()
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first());
    let frames = args
        .get(1)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_FRAMES);

    let mut world = match World::from_config(config) {
        Ok(world) => world,
        Err(err) => {
            warn!("{err}; falling back to defaults");
            World::new()
        }
    };

    let floor = world.add_collider(
        ColliderDescriptor::rectangle(Vector2::new(800.0, 50.0))
            .with_position(Vector2::new(0.0, 550.0))
            .with_body_type(BodyType::Static)
            .with_restitution(0.2)
            .with_filter(CollisionFilter {
                group_index: 0,
                category: LayerMask::empty().with(Layer::Ground),
                mask: LayerMask::all(),
            }),
    );

    let mut nodes = Vec::new();
    spawn_box(&mut world, &mut nodes, 0.2);

    for frame in 0..frames {
        if frame % SPAWN_EVERY == 0 {
            spawn_box(&mut world, &mut nodes, 1.0);
            spawn_triangle(&mut world, &mut nodes);
        }

        world.update();

        for event in world.drain_collision_events() {
            let (a, b) = match event {
                CollisionEvent::Started(pair) | CollisionEvent::Stopped(pair) => pair.bodies(),
            };
            let started = matches!(event, CollisionEvent::Started(_));
            let name = |body| {
                world
                    .collider_of(body)
                    .map_or_else(|| "gone".to_owned(), |id| id.to_string())
            };
            log::debug!(
                "frame {frame}: {} {} <-> {}",
                if started { "touch" } else { "part" },
                name(a),
                name(b)
            );
        }

        if frame % 60 == 0 {
            let resting = nodes
                .iter()
                .filter(|(id, _)| world.is_collided_with(*id, floor))
                .count();
            info!(
                "frame {frame}: {} colliders, {resting} on the floor, {} touching pairs",
                world.len(),
                world.ledger().len()
            );
        }
    }

    for (id, node) in &nodes {
        let node = node.borrow();
        let velocity = world
            .collider(*id)
            .map(|c| c.velocity())
            .unwrap_or_else(Vector2::zeros);
        info!(
            "{id}: at ({:.1}, {:.1}) angle {:.1}°, velocity ({:.1}, {:.1})",
            node.position.x, node.position.y, node.angle, velocity.x, velocity.y
        );
    }
}
