//! Map session configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default so a bare environment produces a
//! working session against a local API. Unparsable values fall back to
//! the default rather than failing startup; structurally invalid
//! combinations (bad URL scheme, inverted zoom range) are errors.

use std::time::Duration;

use crate::map::viewport::LatLng;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_MIN_ZOOM_TO_LOAD: u8 = 14;
pub const DEFAULT_MAX_ZOOM: u8 = 19;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_FEATURE_CAP: usize = 3000;
pub const DEFAULT_ADVISORY_MS: u64 = 7000;
pub const DEFAULT_TRUNCATION_ADVISORY_MS: u64 = 10_000;
pub const DEFAULT_CENTER_LAT: f64 = 42.3498;
pub const DEFAULT_CENTER_LON: f64 = 13.3995;
pub const DEFAULT_ZOOM: u8 = 14;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API base URL `{0}` (expected http:// or https://)")]
    InvalidBaseUrl(String),
    #[error("min zoom to load ({min}) exceeds max zoom ({max})")]
    ZoomRange { min: u8, max: u8 },
}

// =============================================================================
// CONFIG
// =============================================================================

/// Timing and threshold knobs for a map session and its HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub api_base_url: String,
    /// Below this zoom the session clears the map instead of fetching.
    pub min_zoom_to_load: u8,
    pub max_zoom: u8,
    pub debounce: Duration,
    pub fetch_timeout: Duration,
    pub connect_timeout: Duration,
    /// Server-side row limit; a response this large is reported as truncated.
    pub feature_cap: usize,
    pub advisory_duration: Duration,
    pub truncation_advisory_duration: Duration,
    pub default_center: LatLng,
    pub default_zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            min_zoom_to_load: DEFAULT_MIN_ZOOM_TO_LOAD,
            max_zoom: DEFAULT_MAX_ZOOM,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            feature_cap: DEFAULT_FEATURE_CAP,
            advisory_duration: Duration::from_millis(DEFAULT_ADVISORY_MS),
            truncation_advisory_duration: Duration::from_millis(DEFAULT_TRUNCATION_ADVISORY_MS),
            default_center: LatLng::new(DEFAULT_CENTER_LAT, DEFAULT_CENTER_LON),
            default_zoom: DEFAULT_ZOOM,
        }
    }
}

impl MapConfig {
    /// Build typed map config from environment variables.
    ///
    /// Optional:
    /// - `FIBRAMAP_API_BASE_URL`: default `http://127.0.0.1:8000`
    /// - `FIBRAMAP_MIN_ZOOM_TO_LOAD`: default 14
    /// - `FIBRAMAP_MAX_ZOOM`: default 19
    /// - `FIBRAMAP_DEBOUNCE_MS`: default 300
    /// - `FIBRAMAP_FETCH_TIMEOUT_SECS`: default 15
    /// - `FIBRAMAP_CONNECT_TIMEOUT_SECS`: default 5
    /// - `FIBRAMAP_FEATURE_CAP`: default 3000
    /// - `FIBRAMAP_ADVISORY_MS`: default 7000
    /// - `FIBRAMAP_TRUNCATION_ADVISORY_MS`: default 10000
    /// - `FIBRAMAP_DEFAULT_LAT`, `FIBRAMAP_DEFAULT_LON`, `FIBRAMAP_DEFAULT_ZOOM`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the base URL is not http(s) or the zoom
    /// range is inverted.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = std::env::var("FIBRAMAP_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned());

        let config = Self {
            api_base_url,
            min_zoom_to_load: env_parse("FIBRAMAP_MIN_ZOOM_TO_LOAD", DEFAULT_MIN_ZOOM_TO_LOAD),
            max_zoom: env_parse("FIBRAMAP_MAX_ZOOM", DEFAULT_MAX_ZOOM),
            debounce: Duration::from_millis(env_parse("FIBRAMAP_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)),
            fetch_timeout: Duration::from_secs(env_parse("FIBRAMAP_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)),
            connect_timeout: Duration::from_secs(env_parse(
                "FIBRAMAP_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            feature_cap: env_parse("FIBRAMAP_FEATURE_CAP", DEFAULT_FEATURE_CAP),
            advisory_duration: Duration::from_millis(env_parse("FIBRAMAP_ADVISORY_MS", DEFAULT_ADVISORY_MS)),
            truncation_advisory_duration: Duration::from_millis(env_parse(
                "FIBRAMAP_TRUNCATION_ADVISORY_MS",
                DEFAULT_TRUNCATION_ADVISORY_MS,
            )),
            default_center: LatLng::new(
                env_parse("FIBRAMAP_DEFAULT_LAT", DEFAULT_CENTER_LAT),
                env_parse("FIBRAMAP_DEFAULT_LON", DEFAULT_CENTER_LON),
            ),
            default_zoom: env_parse("FIBRAMAP_DEFAULT_ZOOM", DEFAULT_ZOOM),
        };
        config.validated()
    }

    /// Replace the API base URL, normalizing the trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] for non-http(s) URLs.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        base_url.clone_into(&mut self.api_base_url);
        self.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.api_base_url));
        }
        self.api_base_url = trimmed.to_owned();
        if self.min_zoom_to_load > self.max_zoom {
            return Err(ConfigError::ZoomRange { min: self.min_zoom_to_load, max: self.max_zoom });
        }
        Ok(self)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
