//! Map session: the async event loop around [`ViewportSync`].
//!
//! DESIGN
//! ======
//! One spawned task owns the `ViewportSync` and is the only writer of the
//! layer store. It multiplexes four event sources with `tokio::select!`:
//!
//! - commands from [`SessionHandle`]s (pan/zoom, refresh, mark/unmark);
//! - completions of spawned fetch tasks, tagged with their generation;
//! - the debounce deadline;
//! - the advisory expiry deadline.
//!
//! Fetches run in their own tasks so a slow response never blocks input;
//! ordering is enforced by generation, not by awaiting. After each event
//! the loop publishes a [`SessionStatus`] on a watch channel, waking
//! subscribers only when something visible changed.
//!
//! ERROR HANDLING
//! ==============
//! Fetch errors and timeouts are folded into the sync core as advisories.
//! Handle methods fail only with [`SessionClosed`] once the loop has
//! exited.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::advisory::AdvisoryKind;
use super::feature::{FeatureCollection, FeatureId};
use super::fetcher::FeatureFetcher;
use super::layer_store::{LayerKey, StoreState};
use super::style::Tone;
use super::sync::{FetchOutcome, SyncAction, ViewportSync};
use super::viewport::{Bounds, Viewport};
use crate::config::MapConfig;
use crate::net::error::ApiError;

const COMMAND_QUEUE_CAPACITY: usize = 64;
const FETCH_QUEUE_CAPACITY: usize = 16;

// =============================================================================
// PUBLIC TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("map session is no longer running")]
pub struct SessionClosed;

/// Observable state of a session, republished after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: StoreState,
    pub layers: usize,
    pub predisposed: usize,
    pub loading: bool,
    pub generation: u64,
    pub last_loaded: Option<usize>,
    pub zoom: u8,
    pub bounds: Bounds,
    pub advisory: Option<AdvisoryKind>,
    pub advisory_message: Option<String>,
}

impl SessionStatus {
    fn from_sync(sync: &ViewportSync) -> Self {
        let store = sync.store();
        let advisory = sync.advisory().map(|a| a.kind.clone());
        Self {
            state: store.state(),
            layers: store.len(),
            predisposed: store.predisposed().len(),
            loading: sync.is_loading(),
            generation: sync.generation(),
            last_loaded: sync.last_loaded(),
            zoom: sync.viewport().zoom,
            bounds: sync.viewport().bounds,
            advisory_message: advisory.as_ref().map(AdvisoryKind::message),
            advisory,
        }
    }
}

/// One rendered layer as seen from outside the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSummary {
    pub key: LayerKey,
    pub tone: Tone,
}

/// Receiver of predisposed-status changes made outside the map, such as a
/// saved or deleted record.
#[async_trait]
pub trait PredisposedSink: Send + Sync {
    async fn mark_predisposed(&self, id: FeatureId);
    async fn unmark_predisposed(&self, id: FeatureId);
}

enum SessionCommand {
    ViewportChanged(Viewport),
    Refresh,
    Mark(FeatureId, oneshot::Sender<usize>),
    Unmark(FeatureId, oneshot::Sender<usize>),
    Layers(oneshot::Sender<Vec<LayerSummary>>),
    Shutdown,
}

struct FetchDone {
    generation: u64,
    result: Result<FeatureCollection, ApiError>,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// Report a pan/zoom tick; the fetch follows after the debounce delay.
    ///
    /// # Errors
    ///
    /// [`SessionClosed`] if the session task has exited.
    pub async fn viewport_changed(&self, viewport: Viewport) -> Result<(), SessionClosed> {
        self.send(SessionCommand::ViewportChanged(viewport)).await
    }

    /// Sync the current viewport immediately, cancelling any pending debounce.
    ///
    /// # Errors
    ///
    /// [`SessionClosed`] if the session task has exited.
    pub async fn refresh(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Refresh).await
    }

    /// Mark a building predisposed. Returns the number of layers restyled.
    ///
    /// # Errors
    ///
    /// [`SessionClosed`] if the session task has exited.
    pub async fn mark(&self, id: FeatureId) -> Result<usize, SessionClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Mark(id, tx)).await?;
        rx.await.map_err(|_| SessionClosed)
    }

    /// Unmark a building. Returns the number of layers restyled.
    ///
    /// # Errors
    ///
    /// [`SessionClosed`] if the session task has exited.
    pub async fn unmark(&self, id: FeatureId) -> Result<usize, SessionClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Unmark(id, tx)).await?;
        rx.await.map_err(|_| SessionClosed)
    }

    /// Current layers, ordered by key.
    ///
    /// # Errors
    ///
    /// [`SessionClosed`] if the session task has exited.
    pub async fn layers(&self) -> Result<Vec<LayerSummary>, SessionClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Layers(tx)).await?;
        rx.await.map_err(|_| SessionClosed)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Watch channel that changes whenever the published status does.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Ask the loop to exit. In-flight fetches are abandoned.
    ///
    /// # Errors
    ///
    /// [`SessionClosed`] if the session task has already exited.
    pub async fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }
}

#[async_trait]
impl PredisposedSink for SessionHandle {
    async fn mark_predisposed(&self, id: FeatureId) {
        if let Err(e) = self.mark(id.clone()).await {
            warn!(%id, error = %e, "predisposed mark not applied");
        }
    }

    async fn unmark_predisposed(&self, id: FeatureId) {
        if let Err(e) = self.unmark(id.clone()).await {
            warn!(%id, error = %e, "predisposed unmark not applied");
        }
    }
}

// =============================================================================
// LOOP
// =============================================================================

/// Start a session on `initial` and sync it immediately.
#[must_use]
pub fn spawn_session(
    fetcher: Arc<dyn FeatureFetcher>,
    config: &MapConfig,
    initial: Viewport,
) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let (done_tx, done_rx) = mpsc::channel(FETCH_QUEUE_CAPACITY);
    let sync = ViewportSync::new(config, initial);
    let (status_tx, status_rx) = watch::channel(SessionStatus::from_sync(&sync));

    info!(
        min_zoom_to_load = config.min_zoom_to_load,
        debounce_ms = u64::try_from(config.debounce.as_millis()).unwrap_or(u64::MAX),
        feature_cap = config.feature_cap,
        "map session started"
    );

    let session = MapSession { sync, fetcher, fetch_timeout: config.fetch_timeout, done_tx, status_tx };
    let join = tokio::spawn(session.run(command_rx, done_rx));
    (SessionHandle { commands: command_tx, status: status_rx }, join)
}

struct MapSession {
    sync: ViewportSync,
    fetcher: Arc<dyn FeatureFetcher>,
    fetch_timeout: Duration,
    done_tx: mpsc::Sender<FetchDone>,
    status_tx: watch::Sender<SessionStatus>,
}

impl MapSession {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>, mut done: mpsc::Receiver<FetchDone>) {
        self.dispatch(Instant::now());
        self.publish();

        loop {
            let debounce = self.sync.debounce_deadline();
            let expiry = self.sync.next_advisory_expiry();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(fetched) = done.recv() => {
                    let outcome = self.sync.complete(fetched.generation, fetched.result, Instant::now());
                    debug!(generation = fetched.generation, ?outcome, "fetch completed");
                    if outcome == FetchOutcome::Stale {
                        continue;
                    }
                }
                () = sleep_until(debounce) => {
                    let now = Instant::now();
                    if self.sync.take_due(now) {
                        self.dispatch(now);
                    }
                }
                () = sleep_until(expiry) => {
                    self.sync.dismiss_expired_advisory(Instant::now());
                }
            }
            self.publish();
        }
        info!(generation = self.sync.generation(), "map session stopped");
    }

    fn handle(&mut self, command: SessionCommand) {
        let now = Instant::now();
        match command {
            SessionCommand::ViewportChanged(viewport) => {
                debug!(zoom = viewport.zoom, "viewport changed; debouncing");
                self.sync.on_viewport_changed(viewport, now);
            }
            SessionCommand::Refresh => self.dispatch(now),
            SessionCommand::Mark(id, reply) => {
                let restyled = self.sync.mark_predisposed(&id);
                let _ = reply.send(restyled);
            }
            SessionCommand::Unmark(id, reply) => {
                let restyled = self.sync.unmark_predisposed(&id);
                let _ = reply.send(restyled);
            }
            SessionCommand::Layers(reply) => {
                let mut layers: Vec<LayerSummary> = self
                    .sync
                    .store()
                    .layers()
                    .map(|h| LayerSummary { key: h.key().clone(), tone: h.style().tone })
                    .collect();
                layers.sort_by(|a, b| a.key.cmp(&b.key));
                let _ = reply.send(layers);
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn dispatch(&mut self, now: Instant) {
        let SyncAction::Fetch(ticket) = self.sync.sync(now) else {
            return;
        };

        let fetcher = Arc::clone(&self.fetcher);
        let done_tx = self.done_tx.clone();
        let timeout = self.fetch_timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, fetcher.fetch_features_in_bounds(&ticket.query)).await {
                Ok(result) => result,
                Err(_) => Err(ApiError::Timeout { secs: timeout.as_secs() }),
            };
            if done_tx.send(FetchDone { generation: ticket.generation, result }).await.is_err() {
                debug!(generation = ticket.generation, "session gone before fetch completed");
            }
        });
    }

    fn publish(&self) {
        let next = SessionStatus::from_sync(&self.sync);
        self.status_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
