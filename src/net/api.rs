//! HTTP client for the building-readiness REST API.
//!
//! DESIGN
//! ======
//! Thin reqwest wrapper, one method per endpoint. Every response goes
//! through [`ApiClient::decode`], which maps non-2xx statuses to
//! [`ApiError::Status`] (message taken from the API's `detail` field) and
//! treats 204 or an empty body as "no content". The client implements
//! both collaborator traits the rest of the crate depends on:
//! [`FeatureFetcher`] for the map session and [`RecordsApi`] for the CRUD
//! flows, so either can be swapped for a mock in tests.

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::types::{MessageResponse, Predisposizione, PredisposizioneCreate, Tfo, TfoCreate};
use crate::config::MapConfig;
use crate::map::feature::FeatureCollection;
use crate::map::fetcher::{BboxQuery, FeatureFetcher};

// =============================================================================
// RECORDS TRAIT
// =============================================================================

/// CRUD surface for predisposizioni and TFO records.
#[async_trait]
pub trait RecordsApi: Send + Sync {
    async fn list_predisposizioni(&self) -> Result<Vec<Predisposizione>, ApiError>;

    async fn create_predisposizione(&self, payload: &PredisposizioneCreate) -> Result<Predisposizione, ApiError>;

    /// Deletes the record and resets its TFOs server-side.
    async fn delete_predisposizione(&self, id: i64) -> Result<MessageResponse, ApiError>;

    async fn list_tfos(&self, building_id: i64) -> Result<Vec<Tfo>, ApiError>;

    async fn create_tfo(&self, payload: &TfoCreate) -> Result<Tfo, ApiError>;

    async fn update_tfo(&self, id: i64, payload: &TfoCreate) -> Result<Tfo, ApiError>;

    async fn delete_tfo(&self, id: i64) -> Result<MessageResponse, ApiError>;
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl ApiClient {
    /// Build a client with the configured request and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] for a non-http(s) base URL and
    /// [`ApiError::HttpClientBuild`] if the TLS backend fails to initialize.
    pub fn new(config: &MapConfig) -> Result<Self, ApiError> {
        let base_url = config.api_base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(config.api_base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.to_owned(), timeout_secs: config.fetch_timeout.as_secs() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /`: liveness probe.
    ///
    /// # Errors
    ///
    /// Any transport or status failure.
    pub async fn health(&self) -> Result<MessageResponse, ApiError> {
        let response = self.send(self.request(Method::GET, "/")).await?;
        Ok(Self::decode(response).await?.unwrap_or_default())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{path}", self.base_url))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        request.send().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() { ApiError::Timeout { secs: self.timeout_secs } } else { ApiError::from(e) }
    }

    /// Decode a JSON body; `None` for 204 or an empty body.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<Option<T>, ApiError> {
        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &text));
        }
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text).map(Some).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn expect_body<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        Self::decode(response).await?.ok_or_else(|| ApiError::Decode("empty response body".to_owned()))
    }
}

#[async_trait]
impl FeatureFetcher for ApiClient {
    async fn fetch_features_in_bounds(&self, query: &BboxQuery) -> Result<FeatureCollection, ApiError> {
        debug!(zoom = query.zoom, bounds = ?query.bounds, "GET /geojson/bbox");
        let request = self.request(Method::GET, "/geojson/bbox").query(&query.to_query_pairs());
        self.expect_body(request).await
    }
}

#[async_trait]
impl RecordsApi for ApiClient {
    async fn list_predisposizioni(&self) -> Result<Vec<Predisposizione>, ApiError> {
        self.expect_body(self.request(Method::GET, "/predisposizioni")).await
    }

    async fn create_predisposizione(&self, payload: &PredisposizioneCreate) -> Result<Predisposizione, ApiError> {
        self.expect_body(self.request(Method::POST, "/predisposizioni").json(payload)).await
    }

    async fn delete_predisposizione(&self, id: i64) -> Result<MessageResponse, ApiError> {
        let response = self.send(self.request(Method::DELETE, &format!("/predisposizioni/{id}"))).await?;
        Ok(Self::decode(response).await?.unwrap_or_default())
    }

    async fn list_tfos(&self, building_id: i64) -> Result<Vec<Tfo>, ApiError> {
        self.expect_body(self.request(Method::GET, &format!("/tfos/predisposizioni/{building_id}/tfos")))
            .await
    }

    async fn create_tfo(&self, payload: &TfoCreate) -> Result<Tfo, ApiError> {
        self.expect_body(self.request(Method::POST, "/tfos").json(payload)).await
    }

    async fn update_tfo(&self, id: i64, payload: &TfoCreate) -> Result<Tfo, ApiError> {
        self.expect_body(self.request(Method::PUT, &format!("/tfos/{id}")).json(payload)).await
    }

    async fn delete_tfo(&self, id: i64) -> Result<MessageResponse, ApiError> {
        let response = self.send(self.request(Method::DELETE, &format!("/tfos/{id}"))).await?;
        Ok(Self::decode(response).await?.unwrap_or_default())
    }
}
