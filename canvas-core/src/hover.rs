//! # Hover Preview
//!
//! Debounced show/hide of the floating recipe overlay for image elements.
//!
//! Naive hover-in/hover-out toggling flickers while the pointer crosses the
//! gap between an image and its overlay, so leaving either one only *arms* a
//! close timer:
//!
//! ```text
//! enter image ──▶ open ── leave image ──▶ close in 300ms ─┐
//!                  ▲                                      │ enter overlay
//!                  └──────── cancel pending close ◀───────┘
//! leave overlay ──▶ close in 500ms (deferred while a regeneration is in flight)
//! ```
//!
//! The coordinator never sleeps. Arming a timer returns a [`CloseTimer`] the
//! host schedules; when it elapses the host calls
//! [`HoverCoordinator::timer_fired`] with the token. Any newer hover
//! transition invalidates older tokens.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::element::{Element, Transform};
use crate::{CanvasError, CanvasResult, ElementId};

/// Configuration for hover preview timing and overlay geometry.
#[derive(Debug, Clone)]
pub struct HoverConfig {
    /// Delay before closing after the pointer leaves the image.
    pub leave_element_delay: Duration,
    /// Delay before closing after the pointer leaves the overlay.
    pub leave_overlay_delay: Duration,
    /// Delay before closing after a successful regeneration.
    pub confirm_close_delay: Duration,
    /// Overlay width in pixels.
    pub overlay_width: f32,
    /// Overlay height in pixels.
    pub overlay_height: f32,
    /// Horizontal gap between element and overlay.
    pub gap: f32,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            leave_element_delay: Duration::from_millis(300),
            leave_overlay_delay: Duration::from_millis(500),
            confirm_close_delay: Duration::from_millis(1500),
            overlay_width: 520.0,
            overlay_height: 420.0,
            gap: 12.0,
        }
    }
}

/// Where the canvas sits inside the visible viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Viewport width in pixels.
    pub width: f32,
    /// Viewport height in pixels.
    pub height: f32,
    /// Canvas origin X in viewport coordinates.
    pub canvas_x: f32,
    /// Canvas origin Y in viewport coordinates.
    pub canvas_y: f32,
}

impl Viewport {
    /// A viewport whose origin coincides with the canvas origin.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            canvas_x: 0.0,
            canvas_y: 0.0,
        }
    }
}

/// Identifies one armed close timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken(u64);

/// A close timer the host must schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseTimer {
    /// Token to hand back when the delay has elapsed.
    pub token: TimerToken,
    /// How long to wait.
    pub delay: Duration,
}

/// The live overlay record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverPreview {
    /// Image element the overlay is bound to.
    pub target: ElementId,
    /// Top-left of the overlay in viewport coordinates.
    pub position: (f32, f32),
    /// Editable copy of the element's recipe.
    pub draft: String,
    /// A regeneration request is in flight.
    pub busy: bool,
}

/// Where the pointer is relative to the bound element and its overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerLocation {
    /// Over the image that opened the overlay.
    Trigger,
    /// Over the overlay itself.
    Overlay,
    /// Over neither.
    Away,
}

/// Whether an open overlay is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Drawn normally.
    Visible,
    /// Temporarily hidden while the canvas is exported.
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Pointer left the element or overlay; re-entering cancels.
    PointerLeft,
    /// Regeneration succeeded; closes even with the pointer on the overlay.
    Confirmed,
}

#[derive(Debug, Clone)]
struct OpenOverlay {
    preview: HoverPreview,
    location: PointerLocation,
    visibility: Visibility,
    pending_close: Option<(TimerToken, CloseReason)>,
    /// Sequence number of the regeneration this overlay is waiting on.
    in_flight: Option<u64>,
}

impl OpenOverlay {
    fn cancel_pointer_close(&mut self) {
        if matches!(self.pending_close, Some((_, CloseReason::PointerLeft))) {
            self.pending_close = None;
        }
    }

    fn confirmed_close_pending(&self) -> bool {
        matches!(self.pending_close, Some((_, CloseReason::Confirmed)))
    }
}

#[derive(Debug, Clone, Default)]
enum OverlayState {
    #[default]
    Hidden,
    Open(OpenOverlay),
}

/// Debounced overlay show/hide logic. At most one overlay is open.
#[derive(Debug, Default)]
pub struct HoverCoordinator {
    state: OverlayState,
    config: HoverConfig,
    next_token: u64,
}

impl HoverCoordinator {
    /// Create a coordinator with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HoverConfig::default())
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(config: HoverConfig) -> Self {
        Self {
            state: OverlayState::Hidden,
            config,
            next_token: 0,
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &HoverConfig {
        &self.config
    }

    /// The open overlay, visible or suspended.
    #[must_use]
    pub fn preview(&self) -> Option<&HoverPreview> {
        match &self.state {
            OverlayState::Open(open) => Some(&open.preview),
            OverlayState::Hidden => None,
        }
    }

    /// Whether an overlay is open and drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(&self.state, OverlayState::Open(open) if open.visibility == Visibility::Visible)
    }

    /// Whether a regeneration is in flight for the open overlay.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.preview().is_some_and(|p| p.busy)
    }

    /// Pointer location relative to the open overlay's element.
    #[must_use]
    pub fn pointer_location(&self) -> Option<PointerLocation> {
        match &self.state {
            OverlayState::Open(open) => Some(open.location),
            OverlayState::Hidden => None,
        }
    }

    /// Whether a close timer is armed.
    #[must_use]
    pub fn has_pending_close(&self) -> bool {
        matches!(&self.state, OverlayState::Open(open) if open.pending_close.is_some())
    }

    /// Pointer entered an element.
    ///
    /// Opens (or rebinds) the overlay for images with a non-empty recipe,
    /// unless a gesture is active or a regeneration pins the current overlay.
    /// Returns `true` if an overlay was opened.
    pub fn enter_element(
        &mut self,
        element: &Element,
        gesture_active: bool,
        viewport: &Viewport,
    ) -> bool {
        if let OverlayState::Open(open) = &mut self.state {
            if open.preview.target == element.id {
                open.cancel_pointer_close();
                open.location = PointerLocation::Trigger;
                return false;
            }
            if open.preview.busy {
                tracing::debug!("Overlay pinned by in-flight regeneration, not rebinding");
                return false;
            }
        }
        if gesture_active {
            return false;
        }
        let Some(recipe) = element
            .as_image()
            .filter(|image| image.has_recipe())
            .and_then(|image| image.recipe.clone())
        else {
            return false;
        };

        let position = self.anchor(&element.transform, viewport);
        self.state = OverlayState::Open(OpenOverlay {
            preview: HoverPreview {
                target: element.id,
                position,
                draft: recipe,
                busy: false,
            },
            location: PointerLocation::Trigger,
            visibility: Visibility::Visible,
            pending_close: None,
            in_flight: None,
        });
        tracing::debug!("Recipe overlay opened for {} at {position:?}", element.id);
        true
    }

    /// Overlay anchor: right of the element, flipped left when it would
    /// overflow the viewport, bottom edge kept inside the viewport.
    fn anchor(&self, tf: &Transform, viewport: &Viewport) -> (f32, f32) {
        let left = viewport.canvas_x + tf.x;
        let top = viewport.canvas_y + tf.y;
        let (width, height, gap) = (
            self.config.overlay_width,
            self.config.overlay_height,
            self.config.gap,
        );

        let mut x = left + tf.width + gap;
        if x + width > viewport.width {
            x = (left - gap - width).max(0.0);
        }
        let y = top.min(viewport.height - height).max(0.0);
        (x, y)
    }

    fn arm(&mut self, delay: Duration, reason: CloseReason) -> Option<CloseTimer> {
        let OverlayState::Open(open) = &mut self.state else {
            return None;
        };
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        open.pending_close = Some((token, reason));
        Some(CloseTimer { token, delay })
    }

    /// Pointer left an element. Arms the short close timer if it was the
    /// overlay's trigger.
    pub fn leave_element(&mut self, id: ElementId) -> Option<CloseTimer> {
        let OverlayState::Open(open) = &mut self.state else {
            return None;
        };
        if open.preview.target != id || open.location != PointerLocation::Trigger {
            return None;
        }
        open.location = PointerLocation::Away;
        if open.confirmed_close_pending() {
            return None;
        }
        let delay = self.config.leave_element_delay;
        self.arm(delay, CloseReason::PointerLeft)
    }

    /// Pointer entered the overlay: cancels any pending close.
    pub fn enter_overlay(&mut self) {
        if let OverlayState::Open(open) = &mut self.state {
            open.cancel_pointer_close();
            open.location = PointerLocation::Overlay;
        }
    }

    /// Pointer left the overlay. Arms the long close timer, unless a
    /// regeneration is in flight, in which case closing waits for it.
    pub fn leave_overlay(&mut self) -> Option<CloseTimer> {
        let OverlayState::Open(open) = &mut self.state else {
            return None;
        };
        open.location = PointerLocation::Away;
        if open.preview.busy {
            open.pending_close = None;
            return None;
        }
        if open.confirmed_close_pending() {
            return None;
        }
        let delay = self.config.leave_overlay_delay;
        self.arm(delay, CloseReason::PointerLeft)
    }

    /// A scheduled close timer elapsed. Returns `true` if the overlay closed.
    pub fn timer_fired(&mut self, token: TimerToken) -> bool {
        let OverlayState::Open(open) = &mut self.state else {
            return false;
        };
        let reason = match open.pending_close {
            Some((current, reason)) if current == token => reason,
            _ => {
                tracing::trace!("Stale hover timer {token:?} ignored");
                return false;
            }
        };
        open.pending_close = None;
        if open.preview.busy
            || (reason == CloseReason::PointerLeft && open.location == PointerLocation::Overlay)
        {
            return false;
        }
        self.close();
        true
    }

    /// Replace the overlay's draft recipe.
    pub fn set_draft(&mut self, draft: &str) {
        if let OverlayState::Open(open) = &mut self.state {
            draft.clone_into(&mut open.preview.draft);
        }
    }

    /// Mark regeneration `request` as started for the bound element.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::MissingContext`] if no element is bound, or
    /// [`CanvasError::RegenerationBusy`] if one is already in flight.
    pub fn begin_busy(&mut self, draft: &str, request: u64) -> CanvasResult<ElementId> {
        let OverlayState::Open(open) = &mut self.state else {
            return Err(CanvasError::MissingContext(
                "no element is bound to the recipe overlay".to_string(),
            ));
        };
        if open.preview.busy {
            return Err(CanvasError::RegenerationBusy(open.preview.target.to_string()));
        }
        open.preview.busy = true;
        open.in_flight = Some(request);
        open.pending_close = None;
        draft.clone_into(&mut open.preview.draft);
        Ok(open.preview.target)
    }

    /// Regeneration `request` settled. Success arms the confirmation close; a
    /// failure keeps the overlay for retry, closing only if the pointer
    /// already left.
    ///
    /// An overlay that is not waiting on `request` (closed and reopened in
    /// the meantime) is left alone.
    pub fn settle(&mut self, request: u64, success: bool) -> Option<CloseTimer> {
        let OverlayState::Open(open) = &mut self.state else {
            return None;
        };
        if open.in_flight != Some(request) {
            tracing::debug!("Regeneration {request} settled for a different overlay");
            return None;
        }
        open.in_flight = None;
        open.preview.busy = false;
        let (delay, reason) = if success {
            (self.config.confirm_close_delay, CloseReason::Confirmed)
        } else if open.location == PointerLocation::Away {
            (self.config.leave_overlay_delay, CloseReason::PointerLeft)
        } else {
            return None;
        };
        self.arm(delay, reason)
    }

    /// Close and unbind the overlay.
    pub fn close(&mut self) {
        if let OverlayState::Open(open) = std::mem::take(&mut self.state) {
            tracing::debug!("Recipe overlay closed for {}", open.preview.target);
        }
    }

    /// The bound element was removed.
    pub fn forget(&mut self, id: ElementId) {
        if self.preview().is_some_and(|p| p.target == id) {
            self.close();
        }
    }

    /// Hide a visible overlay without unbinding it. Returns `true` if it was visible.
    pub fn suspend(&mut self) -> bool {
        match &mut self.state {
            OverlayState::Open(open) if open.visibility == Visibility::Visible => {
                open.visibility = Visibility::Suspended;
                true
            }
            _ => false,
        }
    }

    /// Show a suspended overlay again.
    pub fn resume(&mut self) {
        if let OverlayState::Open(open) = &mut self.state {
            open.visibility = Visibility::Visible;
        }
    }
}
