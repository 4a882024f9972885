//! Layer index and predisposed-set for the currently loaded viewport.
//!
//! DESIGN
//! ======
//! `LayerStore` owns every renderable [`LayerHandle`], keyed by feature
//! identifier and role (footprint or centroid), plus the set of building
//! identifiers considered fiber-ready. Two write paths touch the set:
//!
//! - `replace_all`: authoritative, installed after every successful fetch;
//! - `mark_predisposed` / `unmark_predisposed`: provisional edits from CRUD
//!   flows, applied in place to any loaded layer and overwritten by the
//!   next fetch.
//!
//! A secondary index maps each building identifier to the layers it
//! styles, so a mark touches a footprint and its centroid together.

#[cfg(test)]
#[path = "layer_store_test.rs"]
mod tests;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::feature::{Feature, FeatureId, FeatureKind, Geometry, Properties};
use super::style::{LayerStyle, Tone, centroid_style, polygon_style};

// =============================================================================
// KEYS AND HANDLES
// =============================================================================

/// Index key: a building footprint and its centroid are separate layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LayerKey {
    Polygon(FeatureId),
    Centroid(FeatureId),
}

impl LayerKey {
    fn for_feature(feature: &Feature) -> Self {
        match feature.kind {
            FeatureKind::Polygon { .. } => Self::Polygon(feature.id.clone()),
            FeatureKind::Centroid { .. } => Self::Centroid(feature.id.clone()),
        }
    }

    fn style(&self, tone: Tone) -> LayerStyle {
        match self {
            Self::Polygon(_) => polygon_style(tone),
            Self::Centroid(_) => centroid_style(tone),
        }
    }
}

/// Opaque identity of one rendered layer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LayerId(Uuid);

/// A renderable layer. Lives only until the next `replace_all` or `clear`.
#[derive(Debug, Clone)]
pub struct LayerHandle {
    id: LayerId,
    key: LayerKey,
    styling_id: Option<FeatureId>,
    geometry: Geometry,
    properties: Properties,
    style: LayerStyle,
}

impl LayerHandle {
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> &LayerKey {
        &self.key
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    #[must_use]
    pub fn style(&self) -> &LayerStyle {
        &self.style
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    Empty,
    Populated,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct LayerStore {
    layers: HashMap<LayerKey, LayerHandle>,
    /// Building identifier -> layers styled by it.
    by_building: HashMap<FeatureId, Vec<LayerKey>>,
    predisposed: HashSet<FeatureId>,
}

impl LayerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> StoreState {
        if self.layers.is_empty() { StoreState::Empty } else { StoreState::Populated }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &LayerKey) -> Option<&LayerHandle> {
        self.layers.get(key)
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerHandle> {
        self.layers.values()
    }

    #[must_use]
    pub fn is_predisposed(&self, id: &FeatureId) -> bool {
        self.predisposed.contains(id)
    }

    #[must_use]
    pub fn predisposed(&self) -> &HashSet<FeatureId> {
        &self.predisposed
    }

    /// Atomically swap in a new viewport's layers and predisposed set.
    pub fn replace_all(&mut self, features: Vec<Feature>, predisposed: HashSet<FeatureId>) {
        self.layers.clear();
        self.by_building.clear();
        self.predisposed = predisposed;

        for feature in features {
            let key = LayerKey::for_feature(&feature);
            let styling_id = feature.styling_id().cloned();
            let tone = Tone::from_predisposed(styling_id.as_ref().is_some_and(|id| self.predisposed.contains(id)));
            let handle = LayerHandle {
                id: LayerId(Uuid::new_v4()),
                style: key.style(tone),
                key: key.clone(),
                styling_id: styling_id.clone(),
                geometry: feature.geometry,
                properties: feature.properties,
            };

            if let Some(previous) = self.layers.insert(key.clone(), handle) {
                warn!(key = ?key, "duplicate feature identifier in one response; keeping the last");
                if previous.styling_id == styling_id {
                    continue;
                }
                if let Some(old_id) = previous.styling_id {
                    if let Some(keys) = self.by_building.get_mut(&old_id) {
                        keys.retain(|k| k != &key);
                    }
                }
            }
            if let Some(id) = styling_id {
                self.by_building.entry(id).or_default().push(key);
            }
        }
    }

    /// Add `id` to the predisposed set and recolor its loaded layers.
    ///
    /// Returns the number of layers restyled; zero means the building is
    /// not in the current viewport and only the set changed.
    pub fn mark_predisposed(&mut self, id: &FeatureId) -> usize {
        self.predisposed.insert(id.clone());
        self.restyle(id, Tone::Predisposed)
    }

    /// Remove `id` from the predisposed set and recolor its loaded layers.
    pub fn unmark_predisposed(&mut self, id: &FeatureId) -> usize {
        self.predisposed.remove(id);
        self.restyle(id, Tone::Default)
    }

    /// Drop all layers and the predisposed set.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.by_building.clear();
        self.predisposed.clear();
    }

    fn restyle(&mut self, id: &FeatureId, tone: Tone) -> usize {
        let Some(keys) = self.by_building.get(id) else {
            warn!(%id, ?tone, "no rendered layer for building; may be outside the current viewport");
            return 0;
        };

        let mut restyled = 0_usize;
        for key in keys {
            if let Some(handle) = self.layers.get_mut(key) {
                handle.style = key.style(tone);
                restyled += 1;
            }
        }
        debug!(%id, ?tone, restyled, "restyled building layers");
        restyled
    }
}
