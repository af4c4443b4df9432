//! # Canvas Session
//!
//! The runtime around [`canvas_core::CanvasState`]: one task owns the state
//! and processes commands one at a time, while regeneration requests, hover
//! timers, and snapshot rasterization run beside it and report back.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p canvas-session -- --feed results.json --file-id abc123 --out ./exports
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `SessionConfig` - Canvas geometry, service endpoint, export settings
//! - `HttpGateway` - `reqwest` client for the regeneration service
//! - `CanvasSession` / `SessionHandle` - the event loop and its mailbox

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod gateway;
pub mod runtime;

pub use error::{GatewayError, SessionError};
pub use gateway::{HttpGateway, RegenerationRequest, RegenerationService};
pub use runtime::{CanvasSession, SessionHandle};

use std::path::PathBuf;
use std::time::Duration;

use canvas_core::{HoverConfig, Viewport};
use canvas_renderer::{ExportConfig, ExportFormat};
use clap::Parser;

/// Default regeneration service base URL.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Command-line arguments for canvas-session.
#[derive(Debug, Clone, Parser)]
#[command(name = "canvas-session")]
#[command(about = "Headless canvas session: reconcile a feed, regenerate, export")]
#[command(version)]
pub struct CliArgs {
    /// Regeneration service base URL
    #[arg(long, env = "CANVAS_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    pub service_url: String,

    /// Upstream file/session reference sent with regeneration requests
    #[arg(long, env = "CANVAS_FILE_ID")]
    pub file_id: Option<String>,

    /// Canvas width in pixels
    #[arg(long, default_value = "1200")]
    pub canvas_width: f32,

    /// Canvas height in pixels
    #[arg(long, default_value = "800")]
    pub canvas_height: f32,

    /// Viewport width in pixels
    #[arg(long, default_value = "1440")]
    pub viewport_width: f32,

    /// Viewport height in pixels
    #[arg(long, default_value = "900")]
    pub viewport_height: f32,

    /// Directory image paths resolve against when exporting
    #[arg(long)]
    pub asset_root: Option<PathBuf>,

    /// JSON file with inbound feed descriptors
    #[arg(long)]
    pub feed: Option<PathBuf>,

    /// Directory the export artifact is written to
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Export format (png, jpeg, svg)
    #[arg(long, default_value = "png")]
    pub format: ExportFormat,

    /// Regenerate the first image that carries a recipe, using this recipe
    #[arg(long)]
    pub regenerate_with: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "60")]
    pub timeout_secs: u64,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Regeneration service base URL.
    pub service_url: String,
    /// Upstream file/session reference.
    pub file_id: Option<String>,
    /// Canvas width in pixels.
    pub canvas_width: f32,
    /// Canvas height in pixels.
    pub canvas_height: f32,
    /// Where the canvas sits in the viewport.
    pub viewport: Viewport,
    /// Hover timing and overlay geometry.
    pub hover: HoverConfig,
    /// Snapshot rendering settings.
    pub export: ExportConfig,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Create a new session configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            file_id: None,
            canvas_width: 1200.0,
            canvas_height: 800.0,
            viewport: Viewport::new(1440.0, 900.0),
            hover: HoverConfig::default(),
            export: ExportConfig::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<CliArgs> for SessionConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            service_url: args.service_url,
            file_id: args.file_id,
            canvas_width: args.canvas_width,
            canvas_height: args.canvas_height,
            viewport: Viewport::new(args.viewport_width, args.viewport_height),
            hover: HoverConfig::default(),
            export: ExportConfig {
                asset_root: args.asset_root,
                ..ExportConfig::default()
            },
            timeout: Duration::from_secs(args.timeout_secs),
        }
    }
}
