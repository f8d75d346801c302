//! Two-phase proximity queries: bbox prefilter, then exact distance.
//!
//! Phase one asks the shared R-tree for every envelope overlapping a
//! square search box around the query point; phase two fetches the
//! candidate rows and keeps only those whose exact degree-space distance
//! fits the radius. The prefilter is a conservative superset, never a
//! final answer. Result ordering follows index iteration order and is
//! unspecified.

use prism_core::models::{BoundingBox, Collection, GeoPoint, Properties, StoredFeature};
use prism_core::Result;
use prism_geo::{buffer_degrees, degrees_to_meters, planar_degree_distance};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::index::SpatialIndex;
use crate::ports::FeatureStore;

/// A waterway feature within the query radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterwayMatch {
    /// Waterway type, e.g. "river" or "stream".
    #[serde(rename = "type")]
    pub feature_type: String,
    /// The feature's `name` property, or "unnamed".
    pub name: String,
    pub distance_meters: f64,
    pub properties: Properties,
}

/// One flood-layer feature within the query radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloodDetail {
    /// The feature's `type` property, falling back to its layer type.
    #[serde(rename = "type")]
    pub feature_type: String,
    pub distance_meters: f64,
    pub properties: Properties,
}

/// Flood-layer features within the query radius, grouped by layer type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FloodAggregate {
    pub per_type_counts: BTreeMap<String, usize>,
    pub details: BTreeMap<String, Vec<FloodDetail>>,
}

/// Read path over the feature store and the shared spatial index.
pub struct ProximityQueryEngine<'a, S> {
    store: &'a S,
    index: &'a SpatialIndex,
}

impl<'a, S: FeatureStore> ProximityQueryEngine<'a, S> {
    pub fn new(store: &'a S, index: &'a SpatialIndex) -> Self {
        Self { store, index }
    }

    /// Waterway features within `radius_meters` of the point, with their
    /// distances. An empty candidate set yields an empty vec, not an error.
    pub async fn find_nearby(
        &self,
        point: &GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<WaterwayMatch>> {
        let mut matches = Vec::new();
        for (feature, distance_deg) in
            self.candidates(Collection::Waterway, point, radius_meters).await?
        {
            let name = feature
                .properties
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("unnamed")
                .to_string();
            matches.push(WaterwayMatch {
                feature_type: feature.feature_type,
                name,
                distance_meters: degrees_to_meters(distance_deg),
                properties: feature.properties,
            });
        }
        Ok(matches)
    }

    /// Flood-layer features within `radius_meters`, grouped and counted by
    /// layer type.
    pub async fn aggregate_nearby(
        &self,
        point: &GeoPoint,
        radius_meters: f64,
    ) -> Result<FloodAggregate> {
        let mut aggregate = FloodAggregate::default();
        for (feature, distance_deg) in
            self.candidates(Collection::FloodLayer, point, radius_meters).await?
        {
            let layer_type = feature.feature_type;
            let detail_type = feature
                .properties
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or(&layer_type)
                .to_string();

            let detail = FloodDetail {
                feature_type: detail_type,
                distance_meters: degrees_to_meters(distance_deg),
                properties: feature.properties,
            };

            let count = {
                let bucket = aggregate.details.entry(layer_type.clone()).or_default();
                bucket.push(detail);
                bucket.len()
            };
            aggregate.per_type_counts.insert(layer_type, count);
        }
        Ok(aggregate)
    }

    /// Shared two-phase filter: bbox candidates, collection filter, exact
    /// distance. Orphaned index entries (no matching row) are skipped.
    async fn candidates(
        &self,
        collection: Collection,
        point: &GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<(StoredFeature, f64)>> {
        let buffer = buffer_degrees(radius_meters);
        let search_box = BoundingBox::around(point, buffer);

        let mut kept = Vec::new();
        for key in self.index.intersects(&search_box) {
            // The index is shared; keep only the target collection.
            if key.collection != collection {
                continue;
            }

            let Some(feature) = self.store.fetch(collection, key.row_id).await? else {
                continue;
            };

            let distance_deg = planar_degree_distance(&feature.geometry, point);
            if distance_deg <= buffer {
                kept.push((feature, distance_deg));
            }
        }
        Ok(kept)
    }
}
