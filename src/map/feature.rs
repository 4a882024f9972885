//! GeoJSON features returned by the bounding-box endpoint.
//!
//! DESIGN
//! ======
//! The wire format is a plain `FeatureCollection` whose properties carry
//! the building row (`id`, `objectid`, `edifc_uso`, `predisposto_fibra`,
//! ...) for polygons, or `is_centroid` / `parent_id` for centroid points.
//! Identifiers arrive as numbers or strings under either `id` or the
//! fallback `objectid`; [`resolve_feature_id`] is the single place that
//! turns them into a canonical [`FeatureId`]. Nothing downstream looks at
//! the raw identifier fields.

#[cfg(test)]
#[path = "feature_test.rs"]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Properties = Map<String, Value>;
pub type Position = Vec<f64>;

// =============================================================================
// IDENTIFIER
// =============================================================================

/// Canonical string identifier of a building feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    /// Normalize a raw identifier; blank strings are not identifiers.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() { None } else { Some(Self(trimmed.to_owned())) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl From<i64> for FeatureId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the canonical identifier from feature properties: primary `id`
/// first, then the fallback `objectid`.
#[must_use]
pub fn resolve_feature_id(properties: &Properties) -> Option<FeatureId> {
    properties
        .get("id")
        .and_then(FeatureId::from_value)
        .or_else(|| properties.get("objectid").and_then(FeatureId::from_value))
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<WireFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFeature {
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Properties,
}

// =============================================================================
// NORMALIZED FEATURE
// =============================================================================

/// Distinguishes building footprints from their centroid markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    /// Footprint polygon; `predisposed` is the server's flag at fetch time.
    Polygon { predisposed: bool },
    /// Centroid point; styling follows the parent building.
    Centroid { parent_id: Option<FeatureId> },
}

/// A server feature with its identifier resolved and its role decided.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub kind: FeatureKind,
    pub geometry: Geometry,
    pub properties: Properties,
}

impl Feature {
    #[must_use]
    pub fn is_centroid(&self) -> bool {
        matches!(self.kind, FeatureKind::Centroid { .. })
    }

    /// The building whose predisposed status styles this feature.
    #[must_use]
    pub fn styling_id(&self) -> Option<&FeatureId> {
        match &self.kind {
            FeatureKind::Polygon { .. } => Some(&self.id),
            FeatureKind::Centroid { parent_id } => parent_id.as_ref(),
        }
    }
}

/// Why a wire feature could not be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    MissingGeometry,
    MissingId,
}

impl TryFrom<WireFeature> for Feature {
    type Error = Rejected;

    fn try_from(wire: WireFeature) -> Result<Self, Self::Error> {
        let geometry = wire.geometry.ok_or(Rejected::MissingGeometry)?;
        let props = wire.properties;
        let is_centroid = props.get("is_centroid").and_then(Value::as_bool).unwrap_or(false);

        let (id, kind) = if is_centroid {
            let parent_id = props.get("parent_id").and_then(FeatureId::from_value);
            let id = resolve_feature_id(&props).or_else(|| parent_id.clone()).ok_or(Rejected::MissingId)?;
            (id, FeatureKind::Centroid { parent_id })
        } else {
            let id = resolve_feature_id(&props).ok_or(Rejected::MissingId)?;
            let predisposed = props.get("predisposto_fibra").and_then(Value::as_bool).unwrap_or(false);
            (id, FeatureKind::Polygon { predisposed })
        };

        Ok(Self { id, kind, geometry, properties: props })
    }
}
