use thiserror::Error;

use crate::shape::ShapeKind;

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("unknown collider {0}")]
    UnknownCollider(u64),

    /// A kind-specific setter was called on a collider of another kind.
    #[error("{operation} needs a {expected:?} collider, this one is {actual:?}")]
    ShapeMismatch {
        operation: &'static str,
        expected: ShapeKind,
        actual: ShapeKind,
    },

    #[error("triangle point index {0} out of range (0..3)")]
    TrianglePointIndex(usize),

    #[error("invalid world config: {0}")]
    InvalidConfig(String),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(String),
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
