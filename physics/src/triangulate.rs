/*!
Polygon → triangle decomposition.

The engine only accepts convex shapes, so polygon colliders are split into triangles by ear
clipping. The ear search starts from the vertex farthest from the local origin (always a
convex vertex), which gives a deterministic candidate order:

1. Three vertices left: emit them and stop.
2. Root = farthest remaining vertex; its two ring neighbours complete the candidate.
3. Record the candidate's orientation sign once.
4. A candidate is an ear when no other remaining vertex lies strictly inside it.
5. Otherwise shift root and neighbours one position along the ring until the orientation
   matches the recorded sign again, and re-test.
6. Emit the ear, drop its root, repeat.

Notes
- Input is assumed simple (non-self-intersecting). Collinear or self-intersecting input has
  no defined output; the only thing guaranteed is termination (see [`TriangulationError`]).
- The search is quadratic (or worse) in the vertex count. Collider outlines are small.
*/

use nalgebra::Vector2;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TriangulationError {
    /// Every position of the remaining ring was tried and none is an ear.
    ///
    /// A simple polygon always has an ear, so this means the outline is self-intersecting
    /// or degenerate.
    #[error("no ear found among the {remaining} remaining vertices")]
    NoEar { remaining: usize },
}

/// One convex piece.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle(pub [Vector2<f32>; 3]);

impl Triangle {
    pub fn new(a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>) -> Self {
        Self([a, b, c])
    }

    #[inline]
    pub fn vertices(&self) -> &[Vector2<f32>; 3] {
        &self.0
    }

    /// Positive when counter-clockwise in a Y-up frame.
    pub fn signed_area(&self) -> f32 {
        let [a, b, c] = self.0;
        cross(b - a, c - a) * 0.5
    }

    pub fn area(&self) -> f32 {
        self.signed_area().abs()
    }

    /// Strict containment: points on an edge or a vertex are outside.
    pub fn contains_strict(&self, p: Vector2<f32>) -> bool {
        let [a, b, c] = self.0;
        let c1 = cross(b - a, p - b);
        let c2 = cross(c - b, p - c);
        let c3 = cross(a - c, p - a);

        (c1 > 0.0 && c2 > 0.0 && c3 > 0.0) || (c1 < 0.0 && c2 < 0.0 && c3 < 0.0)
    }

    /// Reorder the last two vertices so the triangle winds counter-clockwise.
    ///
    /// The order is decided by the signed angle from `b - a` to `c - a`: if `c` is not
    /// reached by turning counter-clockwise from `b`, the two are swapped. The first vertex
    /// never moves.
    pub fn normalized(self) -> Self {
        let [a, b, c] = self.0;
        if cross(b - a, c - a) < 0.0 {
            Self([a, c, b])
        } else {
            self
        }
    }
}

/// 2D cross product (z component of the 3D one).
#[inline]
pub(crate) fn cross(u: Vector2<f32>, v: Vector2<f32>) -> f32 {
    u.x * v.y - u.y * v.x
}

/// Absolute area of a polygon outline (shoelace formula).
pub fn polygon_area(points: &[Vector2<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f32 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| cross(*p, *q))
        .sum();
    (twice * 0.5).abs()
}

/// Split a simple polygon into winding-normalized triangles.
///
/// `points` are relative to the collider's rotation center. Fewer than three points yield an
/// empty list. For an `n`-gon the result holds `n - 2` triangles.
pub fn triangulate(points: &[Vector2<f32>]) -> Result<Vec<Triangle>, TriangulationError> {
    if points.len() < 3 {
        return Ok(Vec::new());
    }

    let mut ring: Vec<Vector2<f32>> = points.to_vec();
    let mut out = Vec::with_capacity(ring.len() - 2);

    while ring.len() > 3 {
        let root = find_ear(&ring).ok_or(TriangulationError::NoEar {
            remaining: ring.len(),
        })?;
        out.push(ear_at(&ring, root).normalized());
        ring.remove(root);
    }
    out.push(Triangle::new(ring[0], ring[1], ring[2]).normalized());

    Ok(out)
}

/// Candidate triangle rooted at `root`: (root, following vertex, preceding vertex).
#[inline]
fn ear_at(ring: &[Vector2<f32>], root: usize) -> Triangle {
    let n = ring.len();
    Triangle::new(ring[root], ring[(root + 1) % n], ring[(root + n - 1) % n])
}

#[inline]
fn orientation(t: &Triangle) -> i8 {
    let [a, b, c] = t.0;
    let z = cross(b - a, c - a);
    if z > 0.0 {
        1
    } else if z < 0.0 {
        -1
    } else {
        0
    }
}

/// Index of the root of a clippable ear, or `None` when the whole ring was searched.
fn find_ear(ring: &[Vector2<f32>]) -> Option<usize> {
    let n = ring.len();

    // Farthest from the local origin; the first one wins ties.
    let mut root = 0;
    for (i, p) in ring.iter().enumerate() {
        if p.norm_squared() > ring[root].norm_squared() {
            root = i;
        }
    }

    let sign = orientation(&ear_at(ring, root));

    // Each root position is tried at most once.
    let mut tried = 0;
    loop {
        let candidate = ear_at(ring, root);
        let blocked = ring.iter().enumerate().any(|(i, &p)| {
            i != root
                && i != (root + 1) % n
                && i != (root + n - 1) % n
                && candidate.contains_strict(p)
        });
        if !blocked {
            return Some(root);
        }

        loop {
            root = (root + 1) % n;
            tried += 1;
            if tried >= n {
                return None;
            }
            if orientation(&ear_at(ring, root)) == sign {
                break;
            }
        }
    }
}
