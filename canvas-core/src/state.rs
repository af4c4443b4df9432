//! Canvas state management.
//!
//! [`CanvasState`] owns the scene and every controller that mutates it. Hosts
//! feed it one event at a time; nothing here blocks or performs I/O. The
//! regeneration round trip is split into [`CanvasState::begin_regeneration`]
//! and [`CanvasState::complete_regeneration`] so the network call can happen
//! between them.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::event::{HoverEvent, InputEvent, PointerEvent, PointerPhase, PointerTarget};
use crate::feed::{FeedItem, FeedReport};
use crate::hover::{CloseTimer, HoverCoordinator, HoverPreview, TimerToken, Viewport};
use crate::interaction::{InteractionController, InteractionMode};
use crate::{CanvasError, CanvasResult, ElementId, ElementPatch, Scene};

/// Smallest font size the text controls accept, in points.
pub const MIN_FONT_SIZE_PT: f32 = 8.0;
/// Largest font size the text controls accept, in points.
pub const MAX_FONT_SIZE_PT: f32 = 72.0;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Confirmation of a completed action.
    Info,
    /// Something the user asked for failed.
    Error,
}

/// A message the host should show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Display text.
    pub message: String,
}

/// A change requested from the text style controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "control", content = "value", rename_all = "snake_case")]
pub enum TextStyleChange {
    /// Set the font family.
    FontFamily(String),
    /// Set the font size in points; clamped to the supported range.
    FontSize(f32),
    /// Set the text color.
    Color(String),
    /// Flip between normal and bold.
    ToggleBold,
    /// Flip between normal and italic.
    ToggleItalic,
}

/// Toolbar summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasStatus {
    /// Live elements.
    pub element_count: usize,
    /// The selected element.
    pub selected: Option<ElementId>,
    /// Size of the removed-image set.
    pub removed_images: usize,
    /// Active interaction mode.
    pub mode: InteractionMode,
    /// Whether the recipe overlay is showing.
    pub overlay_visible: bool,
}

/// Everything the gateway needs to submit one regeneration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationTicket {
    /// The image being regenerated.
    pub element_id: ElementId,
    /// Upstream file/session reference.
    pub file_id: String,
    /// The submitted recipe.
    pub recipe: String,
    seq: u64,
}

/// How a regeneration round trip ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerationOutcome {
    /// The service produced a new image.
    Success {
        /// Location of the new image.
        image_path: String,
    },
    /// The service answered but reported a failure.
    ApplicationError(String),
    /// The request never got a usable answer.
    TransportError(String),
}

/// The complete canvas state.
#[derive(Debug)]
pub struct CanvasState {
    scene: Scene,
    controller: InteractionController,
    hover: HoverCoordinator,
    viewport: Viewport,
    file_id: Option<String>,
    last_feed: Vec<FeedItem>,
    messages: Vec<String>,
    notices: Vec<Notice>,
    regen_seq: u64,
}

impl CanvasState {
    /// Create a new canvas state with the given canvas size.
    ///
    /// The viewport defaults to the canvas size.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_hover(width, height, HoverCoordinator::new())
    }

    /// Create a state with a preconfigured hover coordinator.
    #[must_use]
    pub fn with_hover(width: f32, height: f32, hover: HoverCoordinator) -> Self {
        Self {
            scene: Scene::new(width, height),
            controller: InteractionController::new(),
            hover,
            viewport: Viewport::new(width, height),
            file_id: None,
            last_feed: Vec::new(),
            messages: Vec::new(),
            notices: Vec::new(),
            regen_seq: 0,
        }
    }

    /// The element model.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The interaction controller.
    #[must_use]
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// The hover-preview coordinator.
    #[must_use]
    pub fn hover(&self) -> &HoverCoordinator {
        &self.hover
    }

    /// The open recipe overlay, if any.
    #[must_use]
    pub fn preview(&self) -> Option<&HoverPreview> {
        self.hover.preview()
    }

    /// Set where the canvas sits in the visible viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Set or clear the upstream file/session reference.
    pub fn set_file_id(&mut self, file_id: Option<String>) {
        self.file_id = file_id.filter(|f| !f.trim().is_empty());
    }

    /// The upstream file/session reference.
    #[must_use]
    pub fn file_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }

    /// Process an input event. Returns a close timer the host must schedule.
    pub fn process_event(&mut self, event: &InputEvent) -> Option<CloseTimer> {
        match event {
            InputEvent::Pointer(pointer) => {
                self.controller.handle_pointer(&mut self.scene, pointer);
                None
            }
            InputEvent::DoubleClick { target, .. } => {
                self.controller.double_click(&mut self.scene, *target);
                None
            }
            InputEvent::Key { key, modifiers } => {
                self.controller.key(&mut self.scene, key, *modifiers);
                None
            }
            InputEvent::TextInput { text } => {
                self.controller.text_input(text);
                None
            }
            InputEvent::Blur => {
                self.controller.blur(&mut self.scene);
                None
            }
            InputEvent::Hover(hover) => self.process_hover(*hover),
        }
    }

    fn process_hover(&mut self, event: HoverEvent) -> Option<CloseTimer> {
        match event {
            HoverEvent::EnterElement(id) => {
                if let Some(element) = self.scene.get_element(id) {
                    let gesture_active = self.controller.is_gesture_active();
                    self.hover
                        .enter_element(element, gesture_active, &self.viewport);
                }
                None
            }
            HoverEvent::LeaveElement(id) => self.hover.leave_element(id),
            HoverEvent::EnterOverlay => {
                self.hover.enter_overlay();
                None
            }
            HoverEvent::LeaveOverlay => self.hover.leave_overlay(),
        }
    }

    /// Route a pointer event at canvas coordinates, resolving its target by
    /// hit testing.
    pub fn pointer(&mut self, phase: PointerPhase, x: f32, y: f32) {
        let target = self.target_at(x, y);
        self.controller
            .handle_pointer(&mut self.scene, &PointerEvent::new(phase, x, y, target));
    }

    /// What a pointer at canvas coordinates lands on.
    #[must_use]
    pub fn target_at(&self, x: f32, y: f32) -> PointerTarget {
        self.scene.target_at(x, y, self.controller.selected())
    }

    /// A scheduled hover timer elapsed. Returns `true` if the overlay closed.
    pub fn timer_fired(&mut self, token: TimerToken) -> bool {
        self.hover.timer_fired(token)
    }

    /// Replace the overlay's draft recipe.
    pub fn set_draft(&mut self, draft: &str) {
        self.hover.set_draft(draft);
    }

    /// Close the recipe overlay.
    pub fn close_overlay(&mut self) {
        self.hover.close();
    }

    /// Reconcile the current inbound feed.
    ///
    /// `items` is the whole feed as known now. It is remembered so that
    /// [`CanvasState::restore_images`] can replay it, and its messages replace
    /// the previous ones.
    pub fn apply_feed(&mut self, items: Vec<FeedItem>) -> FeedReport {
        let report = self.scene.apply_feed(&items);
        self.messages.clone_from(&report.messages);
        self.last_feed = items;
        report
    }

    /// Messages received through the feed, in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Add a placeholder text element.
    pub fn insert_text(&mut self) -> ElementId {
        self.scene.insert_text()
    }

    /// Insert an image directly, bypassing the feed.
    pub fn insert_image(
        &mut self,
        source_ref: impl Into<String>,
        recipe: Option<String>,
        query: Option<String>,
    ) -> ElementId {
        self.scene.insert_image(source_ref, recipe, query)
    }

    /// Apply a partial update to an element.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidPatch`] for a missing element or
    /// unsuitable fields.
    pub fn update(&mut self, id: ElementId, patch: &ElementPatch) -> CanvasResult<()> {
        self.scene.update(id, patch)
    }

    /// Apply a JSON patch object to an element.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidPatch`] if the patch is rejected.
    pub fn update_json(&mut self, id: ElementId, value: &serde_json::Value) -> CanvasResult<()> {
        self.scene.update_json(id, value)
    }

    /// Select an element.
    pub fn select(&mut self, id: ElementId) {
        self.controller.select(&self.scene, id);
    }

    /// Raise an element above all others.
    pub fn bring_to_front(&mut self, id: ElementId) -> Option<i32> {
        self.scene.bring_to_front(id)
    }

    /// Lower an element below all others.
    pub fn send_to_back(&mut self, id: ElementId) -> Option<i32> {
        self.scene.send_to_back(id)
    }

    /// Remove an element and drop every reference to it.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ElementNotFound`] if the element is gone.
    pub fn remove(&mut self, id: ElementId) -> CanvasResult<()> {
        self.scene.remove(id)?;
        self.controller.forget(id);
        self.hover.forget(id);
        Ok(())
    }

    /// Remove the selected element. No-op without a selection.
    pub fn remove_selected(&mut self) -> Option<ElementId> {
        let id = self.controller.selected()?;
        match self.remove(id) {
            Ok(()) => Some(id),
            Err(e) => {
                tracing::warn!("Remove of selected element failed: {e}");
                self.controller.forget(id);
                None
            }
        }
    }

    /// Forget removed images and replay the last feed.
    pub fn restore_images(&mut self) -> FeedReport {
        let cleared = self.scene.restore_removed_images();
        let report = self.scene.apply_feed(
            self.last_feed
                .iter()
                .filter(|item| matches!(item, FeedItem::Image { .. })),
        );
        if cleared > 0 {
            self.notify(
                NoticeLevel::Info,
                format!("Restored {} image(s)", report.inserted.len()),
            );
        }
        report
    }

    /// Apply a style change to the selected text element.
    ///
    /// Returns `false` when nothing is selected or the selection is not text.
    pub fn update_selected_text(&mut self, change: &TextStyleChange) -> bool {
        let Some(id) = self.controller.selected() else {
            return false;
        };
        let Some(text) = self.scene.get_element(id).and_then(crate::Element::as_text) else {
            return false;
        };
        let patch = match change {
            TextStyleChange::FontFamily(family) => ElementPatch {
                font_family: Some(family.clone()),
                ..ElementPatch::default()
            },
            TextStyleChange::FontSize(size) => ElementPatch {
                font_size_pt: Some(size.clamp(MIN_FONT_SIZE_PT, MAX_FONT_SIZE_PT)),
                ..ElementPatch::default()
            },
            TextStyleChange::Color(color) => ElementPatch {
                color: Some(color.clone()),
                ..ElementPatch::default()
            },
            TextStyleChange::ToggleBold => ElementPatch {
                font_weight: Some(text.font_weight.toggled()),
                ..ElementPatch::default()
            },
            TextStyleChange::ToggleItalic => ElementPatch {
                font_style: Some(text.font_style.toggled()),
                ..ElementPatch::default()
            },
        };
        match self.scene.update(id, &patch) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Text style change on {id} dropped: {e}");
                false
            }
        }
    }

    /// Toolbar summary.
    #[must_use]
    pub fn status(&self) -> CanvasStatus {
        CanvasStatus {
            element_count: self.scene.element_count(),
            selected: self.controller.selected(),
            removed_images: self.scene.removed_images().len(),
            mode: self.controller.mode(),
            overlay_visible: self.hover.is_visible(),
        }
    }

    /// Start a regeneration for the bound overlay element.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::MissingContext`] without an upstream file
    /// reference, a bound element, or a non-blank recipe, and
    /// [`CanvasError::RegenerationBusy`] while one is already in flight.
    pub fn begin_regeneration(&mut self, draft: &str) -> CanvasResult<RegenerationTicket> {
        let file_id = self
            .file_id
            .clone()
            .ok_or_else(|| CanvasError::MissingContext("no upstream file reference".into()))?;
        if draft.trim().is_empty() {
            return Err(CanvasError::MissingContext("recipe is empty".into()));
        }
        let seq = self.regen_seq + 1;
        let element_id = self.hover.begin_busy(draft, seq)?;
        self.regen_seq = seq;
        tracing::debug!("Regeneration {seq} started for {element_id}");
        Ok(RegenerationTicket {
            element_id,
            file_id,
            recipe: draft.to_string(),
            seq: self.regen_seq,
        })
    }

    /// Apply the result of a regeneration round trip.
    ///
    /// Returns the overlay close timer to schedule, if any.
    pub fn complete_regeneration(
        &mut self,
        ticket: &RegenerationTicket,
        outcome: RegenerationOutcome,
    ) -> Option<CloseTimer> {
        let id = ticket.element_id;
        let success = match outcome {
            RegenerationOutcome::Success { image_path } => {
                if self.scene.contains(id) {
                    let patch = ElementPatch {
                        source_ref: Some(cache_busted(&image_path, ticket.seq)),
                        recipe: Some(ticket.recipe.clone()),
                        ..ElementPatch::default()
                    };
                    match self.scene.update(id, &patch) {
                        Ok(()) => self.notify(NoticeLevel::Info, "Image regenerated"),
                        Err(e) => tracing::warn!("Regenerated image for {id} not applied: {e}"),
                    }
                } else {
                    tracing::debug!("Regeneration result for removed element {id} dropped");
                }
                true
            }
            RegenerationOutcome::ApplicationError(message) => {
                self.notify(NoticeLevel::Error, format!("Error: {message}"));
                false
            }
            RegenerationOutcome::TransportError(message) => {
                self.notify(
                    NoticeLevel::Error,
                    format!("Network error: could not reach the regeneration service ({message})"),
                );
                false
            }
        };

        self.hover.settle(ticket.seq, success)
    }

    /// Hide the overlay for an export. Returns `true` if it was visible.
    pub fn suspend_overlay(&mut self) -> bool {
        self.hover.suspend()
    }

    /// Show the overlay again after an export.
    pub fn resume_overlay(&mut self) {
        self.hover.resume();
    }

    /// Queue a user-facing notice.
    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info => tracing::info!("{message}"),
            NoticeLevel::Error => tracing::warn!("{message}"),
        }
        self.notices.push(Notice { level, message });
    }

    /// Take all pending notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

/// Append a suffix that makes the reference unique for this regeneration.
fn cache_busted(path: &str, seq: u64) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}v={millis}-{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{FontStyle, FontWeight};
    use crate::Element;

    fn state_with_recipe_image() -> (CanvasState, ElementId) {
        let mut state = CanvasState::new(1200.0, 800.0);
        state.set_viewport(Viewport::new(1440.0, 900.0));
        state.set_file_id(Some("file-42".into()));
        let report = state.apply_feed(vec![FeedItem::Image {
            image_path: "/out/1.png".into(),
            code: Some("plot.scatter(x,y)".into()),
            query: None,
        }]);
        (state, report.inserted[0])
    }

    fn open_overlay(state: &mut CanvasState, id: ElementId) {
        state.process_event(&InputEvent::Hover(HoverEvent::EnterElement(id)));
        state.process_event(&InputEvent::Hover(HoverEvent::EnterOverlay));
    }

    #[test]
    fn test_regeneration_success_updates_element() {
        let (mut state, id) = state_with_recipe_image();
        open_overlay(&mut state, id);

        let ticket = state.begin_regeneration("plot.line(x,y)").expect("ticket");
        assert_eq!(ticket.file_id, "file-42");
        assert!(state.preview().expect("open").busy);

        let timer = state
            .complete_regeneration(
                &ticket,
                RegenerationOutcome::Success {
                    image_path: "/out/1.png".into(),
                },
            )
            .expect("confirmation close");
        let image = state
            .scene()
            .get_element(id)
            .and_then(Element::as_image)
            .expect("image");
        assert_ne!(image.source_ref, "/out/1.png");
        assert!(image.source_ref.starts_with("/out/1.png?v="));
        assert_eq!(image.recipe.as_deref(), Some("plot.line(x,y)"));
        assert_eq!(image.origin, "/out/1.png");

        assert!(state.timer_fired(timer.token));
        assert!(state.preview().is_none());
    }

    #[test]
    fn test_repeated_regeneration_yields_distinct_refs() {
        let (mut state, id) = state_with_recipe_image();
        let mut seen = Vec::new();
        for _ in 0..3 {
            open_overlay(&mut state, id);
            let ticket = state.begin_regeneration("code").expect("ticket");
            state.complete_regeneration(
                &ticket,
                RegenerationOutcome::Success {
                    image_path: "/out/same.png".into(),
                },
            );
            let source = state
                .scene()
                .get_element(id)
                .and_then(Element::as_image)
                .expect("image")
                .source_ref
                .clone();
            assert!(!seen.contains(&source));
            seen.push(source);
        }
    }

    #[test]
    fn test_missing_context() {
        let (mut state, id) = state_with_recipe_image();
        assert!(matches!(
            state.begin_regeneration("code"),
            Err(CanvasError::MissingContext(_))
        ));

        open_overlay(&mut state, id);
        state.set_file_id(None);
        assert!(matches!(
            state.begin_regeneration("code"),
            Err(CanvasError::MissingContext(_))
        ));
        assert!(!state.preview().expect("open").busy);
    }

    #[test]
    fn test_application_and_transport_errors_keep_state() {
        let (mut state, id) = state_with_recipe_image();
        open_overlay(&mut state, id);
        let before = state.scene().get_element(id).expect("element").clone();

        let ticket = state.begin_regeneration("bad(").expect("ticket");
        assert!(state
            .complete_regeneration(
                &ticket,
                RegenerationOutcome::ApplicationError("SyntaxError".into())
            )
            .is_none());
        let ticket = state.begin_regeneration("bad(").expect("retry allowed");
        state.complete_regeneration(
            &ticket,
            RegenerationOutcome::TransportError("connection refused".into()),
        );

        assert_eq!(state.scene().get_element(id), Some(&before));
        assert!(state.hover().is_visible());
        let notices = state.drain_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Error));
        assert_ne!(notices[0].message, notices[1].message);
        assert!(notices[0].message.contains("SyntaxError"));
        assert!(notices[1].message.starts_with("Network error"));
    }

    #[test]
    fn test_result_for_removed_element_is_dropped() {
        let (mut state, id) = state_with_recipe_image();
        open_overlay(&mut state, id);
        let ticket = state.begin_regeneration("code").expect("ticket");

        state.remove(id).expect("remove");
        assert!(state.preview().is_none());
        let timer = state.complete_regeneration(
            &ticket,
            RegenerationOutcome::Success {
                image_path: "/out/9.png".into(),
            },
        );
        assert!(timer.is_none());
        assert!(state.scene().is_empty());
    }

    #[test]
    fn test_late_result_leaves_reopened_overlay_open() {
        let (mut state, id) = state_with_recipe_image();
        open_overlay(&mut state, id);
        let ticket = state.begin_regeneration("plot.line(x,y)").expect("ticket");

        state.close_overlay();
        open_overlay(&mut state, id);
        assert!(!state.preview().expect("reopened").busy);

        let timer = state.complete_regeneration(
            &ticket,
            RegenerationOutcome::Success {
                image_path: "/out/2.png".into(),
            },
        );
        assert!(timer.is_none());
        assert!(state.hover().is_visible());
        assert!(!state.hover().has_pending_close());

        let image = state
            .scene()
            .get_element(id)
            .and_then(Element::as_image)
            .expect("image");
        assert!(image.source_ref.starts_with("/out/2.png?v="));
    }

    #[test]
    fn test_remove_selected_and_restore() {
        let (mut state, id) = state_with_recipe_image();
        assert!(state.remove_selected().is_none());

        state.select(id);
        assert_eq!(state.remove_selected(), Some(id));
        assert_eq!(state.status().selected, None);
        assert_eq!(state.status().removed_images, 1);

        let report = state.restore_images();
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(state.status().element_count, 1);
        assert_eq!(state.status().removed_images, 0);
    }

    #[test]
    fn test_text_style_controls() {
        let mut state = CanvasState::new(800.0, 600.0);
        let id = state.insert_text();
        assert!(!state.update_selected_text(&TextStyleChange::ToggleBold));

        state.select(id);
        assert!(state.update_selected_text(&TextStyleChange::ToggleBold));
        assert!(state.update_selected_text(&TextStyleChange::ToggleItalic));
        assert!(state.update_selected_text(&TextStyleChange::FontSize(200.0)));
        assert!(state.update_selected_text(&TextStyleChange::Color("#ff0000".into())));
        assert!(state.update_selected_text(&TextStyleChange::FontFamily("Georgia".into())));

        let text = state
            .scene()
            .get_element(id)
            .and_then(Element::as_text)
            .expect("text");
        assert_eq!(text.font_weight, FontWeight::Bold);
        assert_eq!(text.font_style, FontStyle::Italic);
        assert!((text.font_size_pt - MAX_FONT_SIZE_PT).abs() < f32::EPSILON);
        assert_eq!(text.color, "#ff0000");
        assert_eq!(text.font_family, "Georgia");

        assert!(state.update_selected_text(&TextStyleChange::FontSize(1.0)));
        let text = state
            .scene()
            .get_element(id)
            .and_then(Element::as_text)
            .expect("text");
        assert!((text.font_size_pt - MIN_FONT_SIZE_PT).abs() < f32::EPSILON);
    }

    #[test]
    fn test_text_controls_ignore_images() {
        let (mut state, id) = state_with_recipe_image();
        state.select(id);
        assert!(!state.update_selected_text(&TextStyleChange::ToggleBold));
    }

    #[test]
    fn test_feed_messages_replace() {
        let mut state = CanvasState::new(800.0, 600.0);
        state.apply_feed(vec![FeedItem::Message {
            message: "first".into(),
        }]);
        state.apply_feed(vec![
            FeedItem::Message {
                message: "first".into(),
            },
            FeedItem::Message {
                message: "second".into(),
            },
        ]);
        assert_eq!(state.messages(), ["first", "second"]);
    }

    #[test]
    fn test_pointer_hit_testing() {
        let (mut state, id) = state_with_recipe_image();
        state.pointer(PointerPhase::Down, 100.0, 100.0);
        assert_eq!(state.status().mode, InteractionMode::Dragging);
        assert_eq!(state.status().selected, Some(id));
        state.pointer(PointerPhase::Up, 100.0, 100.0);

        state.pointer(PointerPhase::Down, 1100.0, 700.0);
        assert_eq!(state.status().selected, None);
    }

    #[test]
    fn test_overlay_not_opened_during_drag() {
        let (mut state, id) = state_with_recipe_image();
        state.pointer(PointerPhase::Down, 100.0, 100.0);
        state.process_event(&InputEvent::Hover(HoverEvent::EnterElement(id)));
        assert!(state.preview().is_none());
    }

    #[test]
    fn test_cache_busted_separator() {
        assert!(cache_busted("/out/a.png", 1).starts_with("/out/a.png?v="));
        assert!(cache_busted("/out/a.png?x=1", 2).starts_with("/out/a.png?x=1&v="));
        assert!(cache_busted("/out/a.png", 7).ends_with("-7"));
    }
}
