//! Input events for canvas interaction.

use serde::{Deserialize, Serialize};

use crate::element::Corner;
use crate::ElementId;

/// What the pointer event was dispatched on.
///
/// Background means the canvas surface itself, never an event bubbled up
/// from a child element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PointerTarget {
    /// The bare canvas surface.
    Background,
    /// The body of an element.
    Element(ElementId),
    /// A resize handle of an element.
    Handle(ElementId, Corner),
}

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed.
    Down,
    /// Pointer moved.
    Move,
    /// Button released.
    Up,
    /// Pointer left the canvas; treated as a release.
    Leave,
}

/// A pointer (mouse/pen/touch) event in canvas-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// X position in canvas coordinates.
    pub x: f32,
    /// Y position in canvas coordinates.
    pub y: f32,
    /// What the event was dispatched on.
    pub target: PointerTarget,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub const fn new(phase: PointerPhase, x: f32, y: f32, target: PointerTarget) -> Self {
        Self {
            phase,
            x,
            y,
            target,
        }
    }

    /// Pointer pressed on `target`.
    #[must_use]
    pub const fn down(x: f32, y: f32, target: PointerTarget) -> Self {
        Self::new(PointerPhase::Down, x, y, target)
    }

    /// Pointer moved; moves during a gesture are observed globally, so the
    /// target is irrelevant.
    #[must_use]
    pub const fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Move, x, y, PointerTarget::Background)
    }

    /// Pointer released anywhere.
    #[must_use]
    pub const fn up(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Up, x, y, PointerTarget::Background)
    }
}

/// Pointer crossing element or overlay boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hover", content = "data", rename_all = "snake_case")]
pub enum HoverEvent {
    /// Pointer entered an element.
    EnterElement(ElementId),
    /// Pointer left an element.
    LeaveElement(ElementId),
    /// Pointer entered the recipe overlay.
    EnterOverlay,
    /// Pointer left the recipe overlay.
    LeaveOverlay,
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    pub shift: bool,
    /// Control key pressed.
    pub ctrl: bool,
    /// Alt/Option key pressed.
    pub alt: bool,
    /// Meta/Command key pressed.
    pub meta: bool,
}

impl KeyModifiers {
    /// Whether any modifier is held.
    #[must_use]
    pub const fn any(self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// All input events the canvas can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Pointer press, move, release or leave.
    Pointer(PointerEvent),

    /// Double-click / double-activate.
    DoubleClick {
        /// X coordinate.
        x: f32,
        /// Y coordinate.
        y: f32,
        /// What was double-clicked.
        target: PointerTarget,
    },

    /// Keyboard event (key down).
    Key {
        /// Key name, e.g. `Enter` or `Escape`.
        key: String,
        /// Active modifier keys.
        modifiers: KeyModifiers,
    },

    /// The text editor's buffer now reads `text`.
    TextInput {
        /// Whole draft content.
        text: String,
    },

    /// The text editor lost focus.
    Blur,

    /// Hover boundary crossing.
    Hover(HoverEvent),
}

impl InputEvent {
    /// Key press without modifiers.
    #[must_use]
    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers: KeyModifiers::default(),
        }
    }
}
