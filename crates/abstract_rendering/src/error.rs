//! Error types for the rendering core

use thiserror::Error;

use crate::geometry::Rect;

/// Errors raised while indexing, aggregating or transferring.
///
/// None of these are retried by the core; callers decide whether to rebuild their
/// inputs, show a placeholder, or abort.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A value's runtime kind does not fit the component consuming it.
    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    /// A glyph intersected an inner node but none of its children.
    #[error("Did not add glyph bounded {glyph} to node with concern {concern}")]
    TopologyViolation { glyph: Rect, concern: Rect },

    #[error("Glyph bounded {glyph} lies outside the index concern region {concern}")]
    OutsideConcern { glyph: Rect, concern: Rect },

    #[error("Illegal contour state: {0}")]
    IllegalContourState(String),

    #[error("View transform is not invertible (determinant {0})")]
    NonInvertibleTransform(f64),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Cell ({x}, {y}) is outside the aggregate region")]
    OutOfBounds { x: i32, y: i32 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
