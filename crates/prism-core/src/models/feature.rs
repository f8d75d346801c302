//! Feature records and the tagged index key.

use serde::{Deserialize, Serialize};

use super::geometry::{Geometry, Properties};

/// The two feature collections held by the store.
///
/// Both collections share one spatial index; entries are told apart by the
/// collection discriminant carried in [`FeatureKey`], not by a reserved
/// numeric id range, so the collections can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// Rivers, streams, canals, drains and similar linear water features.
    Waterway,
    /// Flood-relevant layers: buildings, transportation, land use, inundation.
    FloodLayer,
}

impl Collection {
    /// Stable lowercase label, used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Waterway => "waterway",
            Collection::FloodLayer => "flood_layer",
        }
    }
}

/// Tagged spatial index key: collection discriminant plus store row id.
///
/// The row id is the 1-based id assigned by the feature store, so the
/// index-to-store mapping is the identity and a key can never be
/// misattributed to the other collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureKey {
    pub collection: Collection,
    pub row_id: i64,
}

impl FeatureKey {
    pub fn new(collection: Collection, row_id: i64) -> Self {
        Self { collection, row_id }
    }
}

/// A feature as supplied to ingestion, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingFeature {
    pub geometry: Geometry,
    pub properties: Properties,
}

impl IncomingFeature {
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self { geometry, properties }
    }
}

/// A feature as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFeature {
    pub row_id: i64,
    pub collection: Collection,
    pub feature_type: String,
    pub properties: Properties,
    pub geometry: Geometry,
}
