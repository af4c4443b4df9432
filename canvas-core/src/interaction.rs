//! Pointer-driven interaction state machine.
//!
//! One selection, one active gesture:
//!
//! ```text
//!            down(body)            up / leave
//!   Idle ─────────────────▶ Dragging ─────────▶ Idle
//!   Idle ─────────────────▶ Resizing ─────────▶ Idle
//!            down(handle)
//!   Idle ─────────────────▶ TextEditing ──────▶ Idle
//!         double-click(text)     Enter / blur (commit), Escape (cancel)
//! ```
//!
//! A background press resets to `Idle` with no selection from any state.
//! Moves are recomputed from the gesture-start snapshot, never accumulated.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::element::{Corner, ElementKind, TEXT_PLACEHOLDER};
use crate::event::{KeyModifiers, PointerEvent, PointerPhase, PointerTarget};
use crate::{ElementId, ElementPatch, Scene};

/// Global pointer-move/up observation, held for exactly as long as a drag
/// or resize gesture lives.
///
/// The guard lives inside the gesture state, so every path that leaves the
/// gesture (release, leave, background reset, element removal) drops it.
#[derive(Debug)]
pub struct PointerCapture {
    active: Arc<AtomicUsize>,
}

impl PointerCapture {
    fn acquire(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("Pointer capture acquired");
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for PointerCapture {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("Pointer capture released");
    }
}

/// The single active gesture.
#[derive(Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    Dragging {
        id: ElementId,
        /// Pointer position minus element origin at press time.
        offset: (f32, f32),
        _capture: PointerCapture,
    },
    Resizing {
        id: ElementId,
        corner: Corner,
        start_pointer: (f32, f32),
        start_size: (f32, f32),
        _capture: PointerCapture,
    },
    TextEditing {
        id: ElementId,
        draft: String,
        original: String,
    },
}

/// Observable interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// No gesture.
    Idle,
    /// Moving an element.
    Dragging,
    /// Resizing an element from a corner.
    Resizing,
    /// Editing a text element's content.
    TextEditing,
}

/// Selection plus the active gesture.
#[derive(Debug, Default)]
pub struct InteractionController {
    gesture: Gesture,
    selected: Option<ElementId>,
    captures: Arc<AtomicUsize>,
}

impl InteractionController {
    /// Create an idle controller with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected element, if any.
    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    /// Whether `id` is the selected element.
    #[must_use]
    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selected == Some(id)
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> InteractionMode {
        match self.gesture {
            Gesture::Idle => InteractionMode::Idle,
            Gesture::Dragging { .. } => InteractionMode::Dragging,
            Gesture::Resizing { .. } => InteractionMode::Resizing,
            Gesture::TextEditing { .. } => InteractionMode::TextEditing,
        }
    }

    /// Whether a drag or resize is in progress.
    #[must_use]
    pub fn is_gesture_active(&self) -> bool {
        matches!(
            self.gesture,
            Gesture::Dragging { .. } | Gesture::Resizing { .. }
        )
    }

    /// Whether global pointer observation is currently held.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.captures.load(Ordering::SeqCst) > 0
    }

    /// The element in text-edit mode, if any.
    #[must_use]
    pub fn editing(&self) -> Option<ElementId> {
        match self.gesture {
            Gesture::TextEditing { id, .. } => Some(id),
            _ => None,
        }
    }

    /// The local draft buffer of the text being edited.
    #[must_use]
    pub fn draft(&self) -> Option<&str> {
        match &self.gesture {
            Gesture::TextEditing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Route a pointer event.
    pub fn handle_pointer(&mut self, scene: &mut Scene, event: &PointerEvent) {
        match event.phase {
            PointerPhase::Down => self.pointer_down(scene, event.x, event.y, event.target),
            PointerPhase::Move => self.pointer_move(scene, event.x, event.y),
            PointerPhase::Up | PointerPhase::Leave => self.pointer_release(scene, event.x, event.y),
        }
    }

    /// Pointer pressed on `target`.
    pub fn pointer_down(&mut self, scene: &mut Scene, x: f32, y: f32, target: PointerTarget) {
        match target {
            PointerTarget::Background => self.reset(scene),
            PointerTarget::Element(id) => {
                if !matches!(self.gesture, Gesture::Idle) {
                    tracing::debug!("Ignoring press on {id} while {:?}", self.mode());
                    return;
                }
                let Some(element) = scene.get_element(id) else {
                    tracing::warn!("Press on removed element {id}");
                    return;
                };
                let offset = (x - element.transform.x, y - element.transform.y);
                self.selected = Some(id);
                scene.bring_to_front(id);
                self.gesture = Gesture::Dragging {
                    id,
                    offset,
                    _capture: PointerCapture::acquire(&self.captures),
                };
                tracing::debug!("Drag started on {id}");
            }
            PointerTarget::Handle(id, corner) => {
                if !matches!(self.gesture, Gesture::Idle) || !self.is_selected(id) {
                    tracing::debug!("Ignoring handle press on {id}");
                    return;
                }
                let Some(element) = scene.get_element(id) else {
                    tracing::warn!("Handle press on removed element {id}");
                    return;
                };
                let tf = element.transform;
                self.gesture = Gesture::Resizing {
                    id,
                    corner,
                    start_pointer: (x, y),
                    start_size: (tf.width, tf.height),
                    _capture: PointerCapture::acquire(&self.captures),
                };
                tracing::debug!("Resize started on {id} from {corner:?}");
            }
        }
    }

    /// Pointer moved. Only meaningful during a gesture.
    pub fn pointer_move(&mut self, scene: &mut Scene, x: f32, y: f32) {
        match self.gesture {
            Gesture::Dragging { id, offset, .. } => {
                Self::drag_to(scene, id, x - offset.0, y - offset.1);
            }
            Gesture::Resizing {
                id,
                corner,
                start_pointer,
                start_size,
                ..
            } => {
                let width = start_size.0 + corner.width_sign() * (x - start_pointer.0);
                let height = start_size.1 + corner.height_sign() * (y - start_pointer.1);
                if let Err(e) = scene.update(id, &ElementPatch::size(width, height)) {
                    tracing::warn!("Resize of {id} dropped: {e}");
                    self.gesture = Gesture::Idle;
                }
            }
            Gesture::Idle | Gesture::TextEditing { .. } => {}
        }
    }

    /// Pointer released or left the canvas: ends a drag or resize.
    pub fn pointer_release(&mut self, scene: &mut Scene, x: f32, y: f32) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Dragging { id, offset, .. } => {
                Self::drag_to(scene, id, x - offset.0, y - offset.1);
                tracing::debug!("Drag ended on {id}");
            }
            Gesture::Resizing { id, .. } => {
                tracing::debug!("Resize ended on {id}");
            }
            other => self.gesture = other,
        }
    }

    /// Move an element. The scene keeps it fully inside the canvas.
    fn drag_to(scene: &mut Scene, id: ElementId, x: f32, y: f32) {
        if let Err(e) = scene.update(id, &ElementPatch::position(x, y)) {
            tracing::warn!("Drag of {id} dropped: {e}");
        }
    }

    /// Double-click: text elements enter edit mode, images are selected.
    pub fn double_click(&mut self, scene: &mut Scene, target: PointerTarget) {
        let PointerTarget::Element(id) = target else {
            return;
        };
        if !matches!(self.gesture, Gesture::Idle) {
            return;
        }
        let Some(element) = scene.get_element(id) else {
            tracing::warn!("Double-click on removed element {id}");
            return;
        };
        self.selected = Some(id);
        if let ElementKind::Text(text) = &element.kind {
            self.gesture = Gesture::TextEditing {
                id,
                draft: text.content.clone(),
                original: text.content.clone(),
            };
            tracing::debug!("Text editing started on {id}");
        }
    }

    /// Replace the draft buffer while editing.
    pub fn text_input(&mut self, text: &str) {
        if let Gesture::TextEditing { draft, .. } = &mut self.gesture {
            text.clone_into(draft);
        }
    }

    /// Key press. Enter without modifiers commits an edit, Escape cancels it.
    pub fn key(&mut self, scene: &mut Scene, key: &str, modifiers: KeyModifiers) {
        if !matches!(self.gesture, Gesture::TextEditing { .. }) {
            return;
        }
        match key {
            "Enter" if !modifiers.shift => self.commit_text(scene),
            "Escape" => self.cancel_text(scene),
            _ => {}
        }
    }

    /// The text editor lost focus: commit.
    pub fn blur(&mut self, scene: &mut Scene) {
        self.commit_text(scene);
    }

    /// Store the draft into the element, or the placeholder if it is empty.
    pub fn commit_text(&mut self, scene: &mut Scene) {
        if !matches!(self.gesture, Gesture::TextEditing { .. }) {
            return;
        }
        let Gesture::TextEditing { id, draft, .. } = std::mem::take(&mut self.gesture) else {
            return;
        };
        let content = if draft.is_empty() {
            TEXT_PLACEHOLDER.to_string()
        } else {
            draft
        };
        if let Err(e) = scene.update(id, &ElementPatch::content(content)) {
            tracing::warn!("Text commit on {id} dropped: {e}");
        }
        tracing::debug!("Text editing committed on {id}");
    }

    /// Discard the draft and restore the pre-edit content.
    pub fn cancel_text(&mut self, scene: &mut Scene) {
        if !matches!(self.gesture, Gesture::TextEditing { .. }) {
            return;
        }
        let Gesture::TextEditing { id, original, .. } = std::mem::take(&mut self.gesture) else {
            return;
        };
        if let Err(e) = scene.update(id, &ElementPatch::content(original)) {
            tracing::warn!("Text restore on {id} dropped: {e}");
        }
        tracing::debug!("Text editing cancelled on {id}");
    }

    /// Select an element without starting a gesture.
    pub fn select(&mut self, scene: &Scene, id: ElementId) {
        if scene.contains(id) && matches!(self.gesture, Gesture::Idle) {
            self.selected = Some(id);
        }
    }

    /// Back to `Idle` with nothing selected. A pending text edit is committed.
    pub fn reset(&mut self, scene: &mut Scene) {
        self.commit_text(scene);
        self.gesture = Gesture::Idle;
        self.selected = None;
    }

    /// Drop every reference to an element that has been removed.
    pub fn forget(&mut self, id: ElementId) {
        if self.selected == Some(id) {
            self.selected = None;
        }
        let involved = match &self.gesture {
            Gesture::Dragging { id: gid, .. }
            | Gesture::Resizing { id: gid, .. }
            | Gesture::TextEditing { id: gid, .. } => *gid == id,
            Gesture::Idle => false,
        };
        if involved {
            self.gesture = Gesture::Idle;
        }
    }
}
