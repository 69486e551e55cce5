//! AI ghost writer
//!
//! Streams a completion into the document at the caret. Each session pulls
//! chunks from the backend on a tokio task and forwards them as
//! [`GhostEvent`]s over a channel; the owning surface turns events into
//! transactions, so the stream's writes go through the same dispatch path as
//! user edits and nothing else touches the document.
//!
//! The writer keeps two offsets per session: `start` (where the session
//! began, biased left) and `cursor` (where the next chunk goes, biased right
//! so an insertion at the cursor moves it forward). Both are re-derived
//! through every dispatched change set.
//!
//! Only one session is active at a time. Starting another cancels the
//! active session's token first. A cancelled session stops taking chunks but
//! stays retiring until its `Finished` event arrives, which places the caret
//! after its text and starts the fade like any other ending.

mod backend;

pub use backend::{
    build_prompt, CompletionBackend, CompletionStream, Prompt, CURSOR_MARKER, SYSTEM_PROMPT,
};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::decorations::{Decoration, MarkStyle};
use crate::error::{Error, Result};
use crate::state::{Bias, ChangeSet, Document, Selection, Transaction};
use crate::widgets::{InlineWidget, WidgetKind};

// ─────────────────────────────────────────────────────────────────────────────
// Sessions & Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// Handle returned to the caller of `continue`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Ask the session to stop. Text already inserted is kept.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// How a stream ended. Cancellation is not an error.
#[derive(Debug)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    Failed(Error),
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOutcome::Completed => write!(f, "completed"),
            StreamOutcome::Cancelled => write!(f, "cancelled"),
            StreamOutcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Messages from a session's stream task.
#[derive(Debug)]
pub enum GhostEvent {
    /// A chunk to insert at the session cursor
    Chunk { session: SessionId, text: String },
    /// The stream ended
    Finished {
        session: SessionId,
        outcome: StreamOutcome,
    },
    /// The fade delay after the stream ended has passed
    Faded { session: SessionId },
}

#[derive(Debug)]
struct GhostSession {
    id: SessionId,
    cancel: CancellationToken,
    start: usize,
    cursor: usize,
}

/// New-text marking left behind by a finished session, waiting to fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FadingMark {
    session: SessionId,
    from: usize,
    to: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Ghost Writer
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning for the ghost writer.
#[derive(Debug, Clone)]
pub struct GhostConfig {
    /// Delay between the end of a stream and the removal of its marking
    pub fade: Duration,
    pub context_before: usize,
    pub context_after: usize,
    /// Label of the thinking indicator
    pub thinking_label: String,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            fade: Duration::from_millis(1500),
            context_before: 2000,
            context_after: 500,
            thinking_label: "AI is thinking…".to_string(),
        }
    }
}

/// The ghost-writer slot of one editor instance.
pub struct GhostWriter {
    config: GhostConfig,
    next_id: u64,
    active: Option<GhostSession>,
    retiring: Vec<GhostSession>,
    fading: Vec<FadingMark>,
    tx: mpsc::UnboundedSender<GhostEvent>,
    rx: mpsc::UnboundedReceiver<GhostEvent>,
}

impl GhostWriter {
    pub fn new(config: GhostConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            next_id: 0,
            active: None,
            retiring: Vec::new(),
            fading: Vec::new(),
            tx,
            rx,
        }
    }

    pub fn config(&self) -> &GhostConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GhostConfig) {
        self.config = config;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The active session's `(start, cursor)`.
    pub fn active_range(&self) -> Option<(usize, usize)> {
        self.active.as_ref().map(|s| (s.start, s.cursor))
    }

    /// Start a session at `pos`, cancelling any active one.
    ///
    /// Fails without touching anything when no backend is configured or no
    /// tokio runtime is available to drive the stream.
    pub fn start(
        &mut self,
        doc: &Document,
        pos: usize,
        backend: Option<Arc<dyn CompletionBackend>>,
    ) -> Result<SessionHandle> {
        let backend = backend.ok_or(Error::NoStreamHandler)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Application(format!("No async runtime for completion: {}", e)))?;

        self.cancel_active();

        let id = SessionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let cancel = CancellationToken::new();
        let pos = pos.min(doc.len());

        let prompt = build_prompt(doc, pos, self.config.context_before, self.config.context_after);
        let stream = backend.stream_completion(&prompt.system, &prompt.user, cancel.clone());

        info!("Ghost writer session {} started at {}", id.0, pos);
        runtime.spawn(pump(id, stream, cancel.clone(), self.tx.clone(), self.config.fade));

        self.active = Some(GhostSession {
            id,
            cancel: cancel.clone(),
            start: pos,
            cursor: pos,
        });
        Ok(SessionHandle { id, cancel })
    }

    /// Cancel the active session and move it to the retiring list.
    ///
    /// Its indicator goes away at once. The marking over the text it wrote
    /// stays until its `Finished` event moves the caret and starts the fade.
    pub fn cancel_active(&mut self) {
        if let Some(session) = self.active.take() {
            debug!("Ghost writer session {} cancelled, retiring", session.id.0);
            session.cancel.cancel();
            self.retiring.push(session);
        }
    }

    /// Take the session `id` out of the active slot or the retiring list.
    fn take_session(&mut self, id: SessionId) -> Option<GhostSession> {
        if self.active.as_ref().is_some_and(|s| s.id == id) {
            return self.active.take();
        }
        let idx = self.retiring.iter().position(|s| s.id == id)?;
        Some(self.retiring.remove(idx))
    }

    /// Events that have already arrived.
    pub fn poll_events(&mut self) -> Vec<GhostEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event.
    pub async fn next_event(&mut self) -> Option<GhostEvent> {
        self.rx.recv().await
    }

    /// Turn an event into the transaction the surface should dispatch.
    ///
    /// Chunks of sessions that are no longer active produce nothing; a
    /// retiring session still gets its `Finished` cleanup.
    pub fn apply_event(&mut self, event: GhostEvent, doc: &Document) -> Option<Transaction> {
        match event {
            GhostEvent::Chunk { session, text } => {
                let active = self.active.as_ref().filter(|s| s.id == session)?;
                if active.cancel.is_cancelled() || text.is_empty() {
                    return None;
                }
                let at = active.cursor.min(doc.len());
                match ChangeSet::insert(doc.len(), at, text) {
                    Ok(changes) => Some(Transaction::new().with_changes(changes).scroll_into_view()),
                    Err(e) => {
                        error!("Dropping ghost writer chunk at {}: {}", at, e);
                        None
                    }
                }
            }
            GhostEvent::Finished { session, outcome } => {
                let active = self.take_session(session)?;
                match &outcome {
                    StreamOutcome::Completed => {
                        info!("Ghost writer session {} completed", session.0)
                    }
                    StreamOutcome::Cancelled => {
                        debug!("Ghost writer session {} cancelled", session.0)
                    }
                    StreamOutcome::Failed(e) => {
                        error!("Ghost writer session {} failed: {}", session.0, e)
                    }
                }
                if active.start < active.cursor {
                    self.fading.push(FadingMark {
                        session,
                        from: active.start,
                        to: active.cursor,
                    });
                }
                let caret = active.cursor.min(doc.len());
                Some(
                    Transaction::new()
                        .with_selection(Selection::cursor(caret))
                        .scroll_into_view(),
                )
            }
            GhostEvent::Faded { session } => {
                self.fading.retain(|mark| mark.session != session);
                None
            }
        }
    }

    /// Re-derive every stored offset through a dispatched change set.
    pub fn map_through(&mut self, changes: &ChangeSet) {
        if let Some(session) = &mut self.active {
            session.start = changes.map_pos(session.start, Bias::Left);
            session.cursor = changes.map_pos(session.cursor, Bias::Right).max(session.start);
        }
        // retiring sessions take no more chunks, so their cursor stays put
        for session in &mut self.retiring {
            session.start = changes.map_pos(session.start, Bias::Left);
            session.cursor = changes.map_pos(session.cursor, Bias::Left).max(session.start);
        }
        self.fading = self
            .fading
            .iter()
            .filter_map(|mark| {
                changes
                    .map_range(mark.from, mark.to)
                    .map(|(from, to)| FadingMark { from, to, ..*mark })
            })
            .collect();
    }

    /// Thinking indicator and new-text marking.
    pub fn decorations(&self) -> Vec<Decoration> {
        let mut out = Vec::new();
        if let Some(session) = &self.active {
            let widget = InlineWidget::new(
                WidgetKind::Thinking,
                self.config.thinking_label.clone(),
                "",
                session.start,
            );
            out.push(Decoration::replace(session.start, session.start, widget));
            if session.start < session.cursor {
                out.push(Decoration::mark(session.start, session.cursor, MarkStyle::NewText));
            }
        }
        out.extend(
            self.retiring
                .iter()
                .filter(|s| s.start < s.cursor)
                .map(|s| Decoration::mark(s.start, s.cursor, MarkStyle::NewText)),
        );
        out.extend(
            self.fading
                .iter()
                .map(|mark| Decoration::mark(mark.from, mark.to, MarkStyle::NewText)),
        );
        out
    }
}

impl Drop for GhostWriter {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

/// Pull chunks until the stream ends or the token fires, then report the
/// outcome and, after the fade delay, the fade.
async fn pump(
    id: SessionId,
    mut stream: CompletionStream,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<GhostEvent>,
    fade: Duration,
) {
    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break StreamOutcome::Cancelled,
            next = stream.next() => match next {
                Some(Ok(text)) => {
                    if cancel.is_cancelled() {
                        break StreamOutcome::Cancelled;
                    }
                    if tx.send(GhostEvent::Chunk { session: id, text }).is_err() {
                        break StreamOutcome::Cancelled;
                    }
                }
                Some(Err(e)) => break StreamOutcome::Failed(e),
                None => break StreamOutcome::Completed,
            },
        }
    };
    drop(stream);

    if tx.send(GhostEvent::Finished { session: id, outcome }).is_err() {
        return;
    }
    tokio::time::sleep(fade).await;
    let _ = tx.send(GhostEvent::Faded { session: id });
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
