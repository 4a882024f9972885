//! Transient, auto-dismissing map advisories.
//!
//! At most one advisory is visible; showing a new one replaces the old one
//! and restarts the dismissal clock. Expiry is a deadline checked by the
//! session loop, so the board itself owns no timers.

#[cfg(test)]
#[path = "advisory_test.rs"]
mod tests;

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvisoryKind {
    /// The map is zoomed out past the load threshold.
    ZoomTooLow { zoom: u8, min_zoom: u8 },
    /// The response hit the server's row cap; some buildings are missing.
    Truncated { cap: usize },
    /// The fetch failed; the previous layers are still shown.
    FetchFailed { message: String },
}

impl AdvisoryKind {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::ZoomTooLow { zoom, min_zoom } => {
                format!("zoom too low (current: {zoom}); zoom in to at least {min_zoom} to show buildings")
            }
            Self::Truncated { cap } => {
                format!("maximum number of features loaded ({cap}); some buildings may be missing, zoom in further")
            }
            Self::FetchFailed { message } => format!("map data not loaded: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct AdvisoryBoard {
    current: Option<Advisory>,
}

impl AdvisoryBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, kind: AdvisoryKind, now: Instant, duration: Duration) {
        self.current = Some(Advisory { kind, expires_at: now + duration });
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Drop the advisory if its deadline has passed. Returns true when
    /// something was dismissed.
    pub fn dismiss_expired(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|a| a.expires_at <= now) {
            self.current = None;
            return true;
        }
        false
    }

    #[must_use]
    pub fn current(&self) -> Option<&Advisory> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn next_expiry(&self) -> Option<Instant> {
        self.current.as_ref().map(|a| a.expires_at)
    }
}
