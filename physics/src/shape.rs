/*!
Scene-level collider descriptions and their translation into engine shapes.

A [`ColliderDescriptor`] is everything a collider needs to (re)build its body: the shape kind
with its geometry plus the material, filter and pose shared by every kind. Everything here is
in scene units (pixels, degrees); [`ColliderDescriptor::shape_defs`] converts to physics units.

Geometry, with `c` the rotation-center offset:
- Circle: ball of `radius`, centred at `-c`.
- Rectangle: box of `size`, its top-left corner at `-c` (so its centre is `size/2 - c`).
- Triangle: the three points minus `c`, wound counter-clockwise.
- Polygon: the vertices minus `c`, split into triangles.
*/

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::backend::{BodyType, ShapeDef, ShapeGeometry};
use crate::constants::{
    DEFAULT_DENSITY, DEFAULT_FRICTION, DEFAULT_RESTITUTION, DEFAULT_TRIANGLE_POINTS,
};
use crate::filter::CollisionFilter;
use crate::triangulate::{Triangle, TriangulationError, triangulate};
use crate::units::UnitScale;

/// Discriminant of [`ColliderShape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Rectangle,
    Triangle,
    Polygon,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Circle { radius: f32 },
    Rectangle { size: Vector2<f32> },
    Triangle { points: [Vector2<f32>; 3] },
    /// Simple polygon outline; fewer than three vertices means "no body".
    Polygon { vertices: Vec<Vector2<f32>> },
}

impl ColliderShape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Rectangle { .. } => ShapeKind::Rectangle,
            Self::Triangle { .. } => ShapeKind::Triangle,
            Self::Polygon { .. } => ShapeKind::Polygon,
        }
    }

    pub fn default_triangle_points() -> [Vector2<f32>; 3] {
        DEFAULT_TRIANGLE_POINTS.map(|[x, y]| Vector2::new(x, y))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColliderDescriptor {
    pub shape: ColliderShape,
    /// Scene units.
    pub position: Vector2<f32>,
    /// Degrees.
    pub angle: f32,
    /// Stored density; see [`ColliderDescriptor::effective_density`].
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    pub is_sensor: bool,
    /// Rotation-center offset, scene units. Geometry is shifted by `-center`.
    pub center: Vector2<f32>,
    pub filter: CollisionFilter,
    pub body_type: BodyType,
}

impl ColliderDescriptor {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            position: Vector2::zeros(),
            angle: 0.0,
            density: DEFAULT_DENSITY,
            restitution: DEFAULT_RESTITUTION,
            friction: DEFAULT_FRICTION,
            is_sensor: false,
            center: Vector2::zeros(),
            filter: CollisionFilter::default(),
            body_type: BodyType::Dynamic,
        }
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(ColliderShape::Circle { radius })
    }

    pub fn rectangle(size: Vector2<f32>) -> Self {
        Self::new(ColliderShape::Rectangle { size })
    }

    /// Triangle with the default points `(0,-1), (1,0), (0,1)`.
    pub fn triangle() -> Self {
        Self::new(ColliderShape::Triangle {
            points: ColliderShape::default_triangle_points(),
        })
    }

    pub fn triangle_with(points: [Vector2<f32>; 3]) -> Self {
        Self::new(ColliderShape::Triangle { points })
    }

    /// Polygon from an outline. Exact duplicates are dropped, as with `add_vertex`.
    pub fn polygon(vertices: impl IntoIterator<Item = Vector2<f32>>) -> Self {
        let mut unique: Vec<Vector2<f32>> = Vec::new();
        for v in vertices {
            if !unique.contains(&v) {
                unique.push(v);
            }
        }
        Self::new(ColliderShape::Polygon { vertices: unique })
    }

    pub fn with_position(mut self, position: Vector2<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_angle(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }

    pub fn with_center(mut self, center: Vector2<f32>) -> Self {
        self.center = center;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// Density handed to the engine: static bodies are always massless.
    #[inline]
    pub fn effective_density(&self) -> f32 {
        match self.body_type {
            BodyType::Static => 0.0,
            BodyType::Dynamic => self.density,
        }
    }

    /// Engine shapes for the current description, in physics units.
    ///
    /// Polygons yield one shape per triangle (none below three vertices); every other kind
    /// yields exactly one.
    pub fn shape_defs(&self, scale: UnitScale) -> Result<Vec<ShapeDef>, TriangulationError> {
        let to_physics = |v: Vector2<f32>| scale.vector_to_physics(v);
        let geometries = match &self.shape {
            ColliderShape::Circle { radius } => vec![ShapeGeometry::Ball {
                center: to_physics(-self.center),
                radius: scale.to_physics(*radius).abs(),
            }],
            ColliderShape::Rectangle { size } => {
                let half = size * 0.5;
                vec![ShapeGeometry::Cuboid {
                    center: to_physics(half - self.center),
                    half_extents: to_physics(half).abs(),
                }]
            }
            ColliderShape::Triangle { points } => {
                let [a, b, c] = (*points).map(|p| to_physics(p - self.center));
                vec![ShapeGeometry::Triangle(Triangle::new(a, b, c).normalized().0)]
            }
            ColliderShape::Polygon { vertices } => {
                let local: Vec<Vector2<f32>> =
                    vertices.iter().map(|v| to_physics(v - self.center)).collect();
                triangulate(&local)?
                    .into_iter()
                    .map(|t| ShapeGeometry::Triangle(t.0))
                    .collect()
            }
        };

        Ok(geometries
            .into_iter()
            .map(|geometry| ShapeDef {
                geometry,
                density: self.effective_density(),
                restitution: self.restitution,
                friction: self.friction,
                is_sensor: self.is_sensor,
                filter: self.filter,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vector2<f32> {
        Vector2::new(x, y)
    }

    fn close(a: Vector2<f32>, b: Vector2<f32>) -> bool {
        (a - b).norm() < 1.0e-5
    }

    #[test]
    fn defaults_follow_the_scene_node() {
        let d = ColliderDescriptor::circle(5.0);
        assert_eq!(d.density, 1.0);
        assert!((d.restitution - 0.3).abs() < 1.0e-6);
        assert_eq!(d.friction, 0.0);
        assert_eq!(d.angle, 0.0);
        assert_eq!(d.filter.group_index, 0);
        assert_eq!(d.filter.category.bits, 0x0001);
        assert_eq!(d.filter.mask.bits, 0xFFFF);
        assert_eq!(d.body_type, BodyType::Dynamic);

        let t = ColliderDescriptor::triangle();
        assert_eq!(
            t.shape,
            ColliderShape::Triangle {
                points: [v(0.0, -1.0), v(1.0, 0.0), v(0.0, 1.0)]
            }
        );
    }

    #[test]
    fn static_bodies_are_massless() {
        let d = ColliderDescriptor::circle(1.0)
            .with_density(4.0)
            .with_body_type(BodyType::Static);
        assert_eq!(d.effective_density(), 0.0);
        assert_eq!(d.density, 4.0);

        let defs = d.shape_defs(UnitScale::default()).unwrap();
        assert_eq!(defs[0].density, 0.0);
    }

    #[test]
    fn circle_is_offset_by_center() {
        let d = ColliderDescriptor::circle(50.0).with_center(v(10.0, -20.0));
        let defs = d.shape_defs(UnitScale::new(100.0)).unwrap();
        assert_eq!(defs.len(), 1);
        match defs[0].geometry {
            ShapeGeometry::Ball { center, radius } => {
                assert!(close(center, v(-0.1, 0.2)));
                assert!((radius - 0.5).abs() < 1.0e-6);
            }
            other => panic!("expected ball, got {other:?}"),
        }
    }

    #[test]
    fn rectangle_corner_sits_at_minus_center() {
        let d = ColliderDescriptor::rectangle(v(50.0, 20.0)).with_center(v(25.0, 10.0));
        let defs = d.shape_defs(UnitScale::new(100.0)).unwrap();
        match defs[0].geometry {
            ShapeGeometry::Cuboid {
                center,
                half_extents,
            } => {
                // Centred on the rotation center.
                assert!(close(center, v(0.0, 0.0)));
                assert!(close(half_extents, v(0.25, 0.1)));
            }
            other => panic!("expected cuboid, got {other:?}"),
        }

        let corner = ColliderDescriptor::rectangle(v(50.0, 20.0));
        match corner.shape_defs(UnitScale::new(100.0)).unwrap()[0].geometry {
            ShapeGeometry::Cuboid { center, .. } => assert!(close(center, v(0.25, 0.1))),
            other => panic!("expected cuboid, got {other:?}"),
        }
    }

    #[test]
    fn triangle_is_shifted_and_wound_ccw() {
        // Clockwise input (y-up frame).
        let d = ColliderDescriptor::triangle_with([v(0.0, 0.0), v(0.0, 10.0), v(10.0, 0.0)])
            .with_center(v(1.0, 1.0));
        let defs = d.shape_defs(UnitScale::new(1.0)).unwrap();
        match defs[0].geometry {
            ShapeGeometry::Triangle(points) => {
                assert_eq!(points[0], v(-1.0, -1.0));
                assert!(Triangle(points).signed_area() > 0.0);
                assert_eq!(points[1], v(9.0, -1.0));
                assert_eq!(points[2], v(-1.0, 9.0));
            }
            other => panic!("expected triangle, got {other:?}"),
        }
    }

    #[test]
    fn polygon_yields_one_shape_per_triangle() {
        let hexagon: Vec<_> = (0..6)
            .map(|i| {
                let a = std::f32::consts::TAU * i as f32 / 6.0;
                v(100.0 * a.cos(), 100.0 * a.sin())
            })
            .collect();
        let d = ColliderDescriptor::polygon(hexagon)
            .with_friction(0.5)
            .with_sensor(true);
        let defs = d.shape_defs(UnitScale::default()).unwrap();
        assert_eq!(defs.len(), 4);
        assert!(defs.iter().all(|s| s.is_sensor && s.friction == 0.5));

        let area: f32 = defs
            .iter()
            .map(|s| match s.geometry {
                ShapeGeometry::Triangle(p) => Triangle(p).area(),
                _ => 0.0,
            })
            .sum();
        // Regular hexagon of circumradius 1m.
        let expected = 1.5 * 3.0_f32.sqrt();
        assert!((area - expected).abs() < 1.0e-4, "{area} vs {expected}");
    }

    #[test]
    fn polygon_drops_duplicates_and_small_outlines_yield_nothing() {
        let d = ColliderDescriptor::polygon([v(0.0, 0.0), v(1.0, 0.0), v(0.0, 0.0)]);
        match &d.shape {
            ColliderShape::Polygon { vertices } => assert_eq!(vertices.len(), 2),
            other => panic!("expected polygon, got {other:?}"),
        }
        assert!(d.shape_defs(UnitScale::default()).unwrap().is_empty());
    }

    #[test]
    fn filter_and_material_reach_every_shape() {
        let filter = CollisionFilter {
            group_index: -1,
            ..CollisionFilter::default()
        };
        let d = ColliderDescriptor::rectangle(v(10.0, 10.0))
            .with_filter(filter)
            .with_restitution(0.9);
        let defs = d.shape_defs(UnitScale::default()).unwrap();
        assert_eq!(defs[0].filter, filter);
        assert_eq!(defs[0].restitution, 0.9);
        assert!(!defs[0].is_sensor);
    }
}
