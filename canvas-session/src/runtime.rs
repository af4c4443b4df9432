//! The session event loop.
//!
//! A single task owns the [`CanvasState`]. Commands arrive through a
//! [`SessionHandle`] and are applied one at a time, so every mutation is
//! serialized. Work that takes time runs beside the loop and reports back on
//! an internal channel:
//!
//! ```text
//! SessionHandle ──Command──▶ ┌──────────────┐ ◀──TimerFired──── sleep(delay)
//!                            │ CanvasSession│
//!                            │  (owns state)│ ◀──Settled─────── service.regenerate()
//!                            └──────────────┘
//! ```
//!
//! Internal messages are drained before new commands so a timer that has
//! already elapsed is never overtaken by a later command.

use std::sync::Arc;

use canvas_core::{
    CanvasState, CanvasStatus, CloseTimer, FeedItem, FeedReport, HoverCoordinator, InputEvent,
    Notice, NoticeLevel, RegenerationOutcome, RegenerationTicket, Scene, TimerToken,
};
use canvas_renderer::{ExportArtifact, ExportFormat, RenderError, SceneExporter};
use tokio::sync::{mpsc, oneshot};

use crate::error::SessionError;
use crate::gateway::{RegenerationRequest, RegenerationService};
use crate::SessionConfig;

/// Capacity of the command mailbox.
const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Input(InputEvent),
    Feed {
        items: Vec<FeedItem>,
        reply: oneshot::Sender<FeedReport>,
    },
    Regenerate {
        draft: String,
        reply: Reply<RegenerationOutcome>,
    },
    Export {
        format: ExportFormat,
        reply: Reply<ExportArtifact>,
    },
    Inspect(Box<dyn FnOnce(&mut CanvasState) + Send>),
}

enum Internal {
    TimerFired(TimerToken),
    RegenerationSettled {
        ticket: RegenerationTicket,
        outcome: RegenerationOutcome,
        reply: Reply<RegenerationOutcome>,
    },
}

/// Owns the canvas state and processes commands.
pub struct CanvasSession {
    state: CanvasState,
    service: Arc<dyn RegenerationService>,
    exporter: SceneExporter,
    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl CanvasSession {
    /// Build a session and the handle that drives it. Call
    /// [`CanvasSession::run`] to start processing.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        service: Arc<dyn RegenerationService>,
    ) -> (Self, SessionHandle) {
        let mut state = CanvasState::with_hover(
            config.canvas_width,
            config.canvas_height,
            HoverCoordinator::with_config(config.hover),
        );
        state.set_viewport(config.viewport);
        state.set_file_id(config.file_id);

        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let session = Self {
            state,
            service,
            exporter: SceneExporter::new(config.export),
            commands,
            internal_tx,
            internal_rx,
        };
        (session, SessionHandle { tx })
    }

    /// Run until every [`SessionHandle`] has been dropped.
    pub async fn run(mut self) {
        tracing::debug!("Canvas session started");
        loop {
            tokio::select! {
                biased;

                Some(internal) = self.internal_rx.recv() => self.handle_internal(internal),

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }
        tracing::debug!("Canvas session stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Input(event) => {
                let timer = self.state.process_event(&event);
                self.schedule(timer);
            }
            Command::Feed { items, reply } => {
                let _ = reply.send(self.state.apply_feed(items));
            }
            Command::Regenerate { draft, reply } => self.start_regeneration(&draft, reply),
            Command::Export { format, reply } => {
                let result = self.export(format).await;
                let _ = reply.send(result);
            }
            Command::Inspect(f) => f(&mut self.state),
        }
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::TimerFired(token) => {
                if self.state.timer_fired(token) {
                    tracing::debug!("Recipe overlay closed by timer");
                }
            }
            Internal::RegenerationSettled {
                ticket,
                outcome,
                reply,
            } => {
                let timer = self.state.complete_regeneration(&ticket, outcome.clone());
                self.schedule(timer);
                let _ = reply.send(Ok(outcome));
            }
        }
    }

    fn schedule(&self, timer: Option<CloseTimer>) {
        let Some(timer) = timer else {
            return;
        };
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timer.delay).await;
            let _ = tx.send(Internal::TimerFired(timer.token));
        });
    }

    fn start_regeneration(&mut self, draft: &str, reply: Reply<RegenerationOutcome>) {
        let ticket = match self.state.begin_regeneration(draft) {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::debug!("Regeneration not started: {e}");
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        let service = Arc::clone(&self.service);
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let request = RegenerationRequest::from(&ticket);
            let outcome = match service.regenerate(&request).await {
                Ok(image_path) => RegenerationOutcome::Success { image_path },
                Err(e) => {
                    tracing::warn!("Regeneration for {} failed: {e}", ticket.element_id);
                    e.into_outcome()
                }
            };
            let _ = tx.send(Internal::RegenerationSettled {
                ticket,
                outcome,
                reply,
            });
        });
    }

    async fn export(&mut self, format: ExportFormat) -> Result<ExportArtifact, SessionError> {
        let was_visible = self.state.suspend_overlay();
        let scene = self.state.scene().clone();
        let exporter = self.exporter.clone();

        let result = tokio::task::spawn_blocking(move || exporter.export(&scene, format))
            .await
            .unwrap_or_else(|e| Err(RenderError::Export(e.to_string())));

        if was_visible {
            self.state.resume_overlay();
        }

        match result {
            Ok(artifact) => {
                self.state
                    .notify(NoticeLevel::Info, format!("Exported {}", artifact.file_name));
                Ok(artifact)
            }
            Err(e) => {
                self.state
                    .notify(NoticeLevel::Error, format!("Export failed: {e}"));
                Err(e.into())
            }
        }
    }
}

/// Cloneable mailbox for a running [`CanvasSession`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Start a session on the current runtime and return its handle.
    #[must_use]
    pub fn spawn(config: SessionConfig, service: Arc<dyn RegenerationService>) -> Self {
        let (session, handle) = CanvasSession::new(config, service);
        tokio::spawn(session.run());
        handle
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.tx.send(command).await.map_err(|_| SessionError::Closed)
    }

    /// Deliver an input event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn send_input(&self, event: InputEvent) -> Result<(), SessionError> {
        self.send(Command::Input(event)).await
    }

    /// Reconcile the current inbound feed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn apply_feed(&self, items: Vec<FeedItem>) -> Result<FeedReport, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Feed { items, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Regenerate the image bound to the recipe overlay from `draft`.
    ///
    /// Resolves once the service has answered and the canvas has been
    /// updated. Service failures are reported as an outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Canvas`] if no regeneration could be started
    /// (no file reference, no bound element, blank recipe, or one already in
    /// flight), and [`SessionError::Closed`] if the session has stopped.
    pub async fn regenerate(
        &self,
        draft: impl Into<String>,
    ) -> Result<RegenerationOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Regenerate {
            draft: draft.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Render a snapshot of the canvas with the overlay hidden.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Export`] if rendering fails, and
    /// [`SessionError::Closed`] if the session has stopped.
    pub async fn export(&self, format: ExportFormat) -> Result<ExportArtifact, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Export { format, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Run `f` against the state inside the session task.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn inspect<R, F>(&self, f: F) -> Result<R, SessionError>
    where
        R: Send + 'static,
        F: FnOnce(&mut CanvasState) -> R + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Inspect(Box::new(move |state| {
            let _ = reply.send(f(state));
        })))
        .await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Toolbar summary.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn status(&self) -> Result<CanvasStatus, SessionError> {
        self.inspect(|state| state.status()).await
    }

    /// Take all pending notices.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn drain_notices(&self) -> Result<Vec<Notice>, SessionError> {
        self.inspect(CanvasState::drain_notices).await
    }

    /// A copy of the element model.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn snapshot(&self) -> Result<Scene, SessionError> {
        self.inspect(|state| state.scene().clone()).await
    }
}
