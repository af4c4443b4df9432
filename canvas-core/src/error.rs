//! Error types for canvas operations.

use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Element not found in scene.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A patch named unknown fields, fields foreign to the element variant,
    /// or targeted an element that no longer exists.
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    /// Regeneration needs a bound element and an upstream file reference.
    #[error("Missing regeneration context: {0}")]
    MissingContext(String),

    /// A regeneration request is already in flight for the overlay.
    #[error("Regeneration already in progress for element {0}")]
    RegenerationBusy(String),

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
