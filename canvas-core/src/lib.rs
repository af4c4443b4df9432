//! # Canvas Core
//!
//! Core logic for an interactive freeform canvas of generated images and
//! editable text blocks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 CanvasState                 │
//! ├─────────────────────────────────────────────┤
//! │  Scene           │  InteractionController   │
//! │  - Elements      │  - Drag / resize         │
//! │  - Z-order       │  - Text editing          │
//! │  - Removed set   │  - Pointer capture       │
//! ├─────────────────────────────────────────────┤
//! │  HoverCoordinator│  Feed reconciliation     │
//! │  - Overlay       │  - Dedup / suppression   │
//! │  - Close timers  │  - Messages              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything here is synchronous and free of I/O. Timers and network calls
//! are driven by the host.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod element;
pub mod error;
pub mod event;
pub mod feed;
pub mod hover;
pub mod interaction;
pub mod patch;
pub mod scene;
pub mod state;
pub mod zorder;

pub use element::{
    Corner, Element, ElementId, ElementKind, FontStyle, FontWeight, ImageContent, TextContent,
    Transform,
};
pub use error::{CanvasError, CanvasResult};
pub use event::{HoverEvent, InputEvent, KeyModifiers, PointerEvent, PointerPhase, PointerTarget};
pub use feed::{FeedItem, FeedReport};
pub use hover::{
    CloseTimer, HoverConfig, HoverCoordinator, HoverPreview, PointerLocation, TimerToken,
    Viewport, Visibility,
};
pub use interaction::{InteractionController, InteractionMode, PointerCapture};
pub use patch::ElementPatch;
pub use scene::{RemovedImageSet, Scene};
pub use state::{
    CanvasState, CanvasStatus, Notice, NoticeLevel, RegenerationOutcome, RegenerationTicket,
    TextStyleChange,
};

/// Canvas core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
