//! Session error types.

use canvas_core::{CanvasError, RegenerationOutcome};
use canvas_renderer::RenderError;
use thiserror::Error;

/// Errors that can occur when talking to the regeneration service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service base URL provided is invalid.
    #[error("invalid regeneration service URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("regeneration request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The body could not be understood.
    #[error("malformed regeneration response: {0}")]
    MalformedResponse(String),
    /// The service answered and reported a failure.
    #[error("{0}")]
    Application(String),
}

impl GatewayError {
    /// Classify into the outcome the canvas state understands.
    #[must_use]
    pub fn into_outcome(self) -> RegenerationOutcome {
        match self {
            Self::Application(message) => RegenerationOutcome::ApplicationError(message),
            other => RegenerationOutcome::TransportError(other.to_string()),
        }
    }
}

/// Errors surfaced by the session runtime.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session task has shut down.
    #[error("canvas session has shut down")]
    Closed,
    /// The canvas rejected the operation.
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    /// The regeneration gateway could not be set up.
    #[error(transparent)]
    Regeneration(#[from] GatewayError),
    /// Snapshot export failed.
    #[error(transparent)]
    Export(#[from] RenderError),
}
