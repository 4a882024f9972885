//! Viewport-driven data sync.
//!
//! DESIGN
//! ======
//! `ViewportSync` is the event-free core of the map loader: it holds the
//! current viewport, the debounce deadline, the layer store, and the
//! advisory board, and it decides what a pan/zoom tick, a timer expiry,
//! or a fetch completion does to them. It never awaits; the session loop
//! owns the clock and the network and feeds results back in.
//!
//! ORDERING
//! ========
//! Every dispatched fetch gets the next value of a monotonically
//! increasing generation. Only a response carrying the latest generation
//! is applied; anything older is a superseded request and is dropped. A
//! zoom-gated sync also advances the generation, so a fetch that was in
//! flight when the user zoomed out cannot repopulate the map.
//!
//! ERROR HANDLING
//! ==============
//! Fetch failures never clear rendered layers. They surface an advisory
//! and wait for the next viewport change or manual refresh; there is no
//! automatic retry.

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::advisory::{Advisory, AdvisoryBoard, AdvisoryKind};
use super::feature::{Feature, FeatureCollection, FeatureId, FeatureKind};
use super::fetcher::{BboxQuery, GeometryKind};
use super::layer_store::LayerStore;
use super::viewport::Viewport;
use crate::config::MapConfig;
use crate::net::error::ApiError;

/// A fetch the caller must perform and report back via [`ViewportSync::complete`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: BboxQuery,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncAction {
    /// Zoom below threshold: map cleared, advisory shown, nothing to fetch.
    Gated,
    Fetch(FetchTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { layers: usize, predisposed: usize, skipped: usize, truncated: bool },
    /// A newer request was dispatched after this one; result dropped.
    Stale,
    Failed,
}

pub struct ViewportSync {
    min_zoom_to_load: u8,
    feature_cap: usize,
    debounce: Duration,
    advisory_duration: Duration,
    truncation_advisory_duration: Duration,
    viewport: Viewport,
    debounce_deadline: Option<Instant>,
    generation: u64,
    in_flight: Option<u64>,
    last_loaded: Option<usize>,
    store: LayerStore,
    advisories: AdvisoryBoard,
}

impl ViewportSync {
    #[must_use]
    pub fn new(config: &MapConfig, viewport: Viewport) -> Self {
        Self {
            min_zoom_to_load: config.min_zoom_to_load,
            feature_cap: config.feature_cap,
            debounce: config.debounce,
            advisory_duration: config.advisory_duration,
            truncation_advisory_duration: config.truncation_advisory_duration,
            viewport,
            debounce_deadline: None,
            generation: 0,
            in_flight: None,
            last_loaded: None,
            store: LayerStore::new(),
            advisories: AdvisoryBoard::new(),
        }
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    #[must_use]
    pub fn advisory(&self) -> Option<&Advisory> {
        self.advisories.current()
    }

    /// Latest dispatched (or invalidated) fetch generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Feature count of the last applied response.
    #[must_use]
    pub fn last_loaded(&self) -> Option<usize> {
        self.last_loaded
    }

    // =========================================================================
    // DEBOUNCE
    // =========================================================================

    /// Record a pan/zoom tick and (re)start the debounce window. Any sync
    /// still pending from an earlier tick is superseded, not queued.
    pub fn on_viewport_changed(&mut self, viewport: Viewport, now: Instant) {
        self.viewport = viewport;
        self.debounce_deadline = Some(now + self.debounce);
    }

    #[must_use]
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce_deadline
    }

    /// Consume the pending debounce if it has expired.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.debounce_deadline.is_some_and(|deadline| deadline <= now) {
            self.debounce_deadline = None;
            return true;
        }
        false
    }

    // =========================================================================
    // SYNC
    // =========================================================================

    /// Decide what the current viewport needs. Cancels any pending debounce.
    pub fn sync(&mut self, now: Instant) -> SyncAction {
        self.debounce_deadline = None;
        self.generation += 1;
        let zoom = self.viewport.zoom;

        if zoom < self.min_zoom_to_load {
            self.in_flight = None;
            self.store.clear();
            self.advisories.show(
                AdvisoryKind::ZoomTooLow { zoom, min_zoom: self.min_zoom_to_load },
                now,
                self.advisory_duration,
            );
            debug!(zoom, min_zoom = self.min_zoom_to_load, generation = self.generation, "zoom below threshold; map cleared");
            return SyncAction::Gated;
        }

        self.advisories.dismiss();
        self.in_flight = Some(self.generation);
        let query = BboxQuery { bounds: self.viewport.bounds, zoom, geometry: GeometryKind::Both };
        debug!(generation = self.generation, zoom, bounds = ?query.bounds, "dispatching bbox fetch");
        SyncAction::Fetch(FetchTicket { generation: self.generation, query })
    }

    /// Apply the result of the fetch dispatched as `generation`.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<FeatureCollection, ApiError>,
        now: Instant,
    ) -> FetchOutcome {
        if generation != self.generation {
            warn!(generation, latest = self.generation, "discarding stale bbox response");
            return FetchOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(collection) => self.apply(generation, collection, now),
            Err(e) => {
                warn!(generation, error = %e, "bbox fetch failed; keeping previous layers");
                self.advisories.show(AdvisoryKind::FetchFailed { message: e.to_string() }, now, self.advisory_duration);
                FetchOutcome::Failed
            }
        }
    }

    fn apply(&mut self, generation: u64, collection: FeatureCollection, now: Instant) -> FetchOutcome {
        let returned = collection.features.len();
        let mut features = Vec::with_capacity(returned);
        let mut skipped = 0_usize;
        for wire in collection.features {
            match Feature::try_from(wire) {
                Ok(feature) => features.push(feature),
                Err(reason) => {
                    skipped += 1;
                    debug!(?reason, "skipping feature");
                }
            }
        }
        if skipped > 0 {
            warn!(generation, skipped, "features without identifier or geometry were skipped");
        }

        let predisposed: HashSet<FeatureId> = features
            .iter()
            .filter(|f| matches!(f.kind, FeatureKind::Polygon { predisposed: true }))
            .map(|f| f.id.clone())
            .collect();
        let predisposed_count = predisposed.len();

        self.store.replace_all(features, predisposed);
        self.last_loaded = Some(returned);

        let truncated = self.feature_cap > 0 && returned >= self.feature_cap;
        if truncated {
            self.advisories.show(
                AdvisoryKind::Truncated { cap: self.feature_cap },
                now,
                self.truncation_advisory_duration,
            );
        }

        info!(generation, returned, layers = self.store.len(), predisposed = predisposed_count, truncated, "map layers rebuilt");
        FetchOutcome::Applied { layers: self.store.len(), predisposed: predisposed_count, skipped, truncated }
    }

    // =========================================================================
    // PREDISPOSED EDITS
    // =========================================================================

    pub fn mark_predisposed(&mut self, id: &FeatureId) -> usize {
        self.store.mark_predisposed(id)
    }

    pub fn unmark_predisposed(&mut self, id: &FeatureId) -> usize {
        self.store.unmark_predisposed(id)
    }

    // =========================================================================
    // ADVISORIES
    // =========================================================================

    #[must_use]
    pub fn next_advisory_expiry(&self) -> Option<Instant> {
        self.advisories.next_expiry()
    }

    pub fn dismiss_expired_advisory(&mut self, now: Instant) -> bool {
        self.advisories.dismiss_expired(now)
    }
}
