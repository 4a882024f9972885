//! REST client layer: typed records, errors, and the reqwest-backed client.

pub mod api;
pub mod error;
pub mod types;

pub use api::{ApiClient, RecordsApi};
pub use error::ApiError;
