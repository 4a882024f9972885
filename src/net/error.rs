//! Errors produced by the REST client.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, reset).
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// No response within the configured fetch timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Build a `Status` error from a response body, preferring the API's
    /// `detail` field over a generic message.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::Status { status, message: status_message(status, body) }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() { Self::Decode(e.to_string()) } else { Self::Transport(e.to_string()) }
    }
}

/// Human-readable message for an error response.
///
/// A JSON body with a string `detail` yields that string; any other
/// `detail` is rendered as compact JSON; everything else falls back to
/// `HTTP error <status>`.
#[must_use]
pub fn status_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|mut v| v.get_mut("detail").map(Value::take));

    match detail {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Null | Value::String(_)) | None => format!("HTTP error {status}"),
        Some(other) => other.to_string(),
    }
}
