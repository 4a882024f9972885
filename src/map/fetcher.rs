//! Bounding-box fetch collaborator.

use async_trait::async_trait;
use serde::Serialize;

use super::feature::FeatureCollection;
use super::viewport::Bounds;
use crate::net::error::ApiError;

/// Which geometries the endpoint should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// Footprint polygons and their centroids.
    Both,
}

impl GeometryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Both => "both",
        }
    }
}

/// Query parameters of one bounding-box fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BboxQuery {
    pub bounds: Bounds,
    pub zoom: u8,
    pub geometry: GeometryKind,
}

impl BboxQuery {
    /// Query-string pairs in the order the endpoint documents them.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("west", self.bounds.west.to_string()),
            ("south", self.bounds.south.to_string()),
            ("east", self.bounds.east.to_string()),
            ("north", self.bounds.north.to_string()),
            ("zoom", self.zoom.to_string()),
            ("geometry_type", self.geometry.as_str().to_owned()),
        ]
    }
}

/// Source of features for a viewport. Enables mocking in tests.
#[async_trait]
pub trait FeatureFetcher: Send + Sync {
    /// Fetch every feature intersecting `query.bounds`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-2xx status, or an
    /// undecodable body.
    async fn fetch_features_in_bounds(&self, query: &BboxQuery) -> Result<FeatureCollection, ApiError>;
}
