//! # Canvas Renderer
//!
//! Snapshot export for the canvas.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐    ┌─────────────┐    ┌──────────────┐    ┌────────────┐
//! │  Scene   │───▶│ SVG (z-asc) │───▶│ usvg / resvg │───▶│ PNG / JPEG │
//! └──────────┘    └─────────────┘    └──────────────┘    └────────────┘
//!                   images inlined as base64 data URIs
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod image;

pub use error::{RenderError, RenderResult};
pub use export::{ExportArtifact, ExportConfig, ExportFormat, SceneExporter};

/// Renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
