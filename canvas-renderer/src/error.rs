//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Rasterizing or encoding the snapshot failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Resource loading failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),
}
