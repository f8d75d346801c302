//! Batch ingestion: classify, store, index.
//!
//! Features are processed synchronously in input order. All store rows of a
//! batch commit as one transaction; index entries are registered afterward
//! under the returned row ids. A failure between the two writes leaves rows
//! that no proximity query can reach until
//! [`SpatialIndex::rebuild_from_store`](crate::SpatialIndex::rebuild_from_store)
//! repairs the index.

use prism_core::models::{Collection, FeatureKey, IncomingFeature, Properties};
use prism_core::{PrismError, Result};
use prism_geo::bounding_box;

use crate::index::{IndexEntry, SpatialIndex};
use crate::ports::{FeatureRow, FeatureStore};

/// Ordered substring patterns mapping a flood layer's `sourceFile` property
/// to its layer type. First match wins; the order is part of the contract.
const FLOOD_LAYER_PATTERNS: [(&str, &str); 4] = [
    ("P01_REF_Buildings", "buildings"),
    ("P01_REF_Transportation", "transportation"),
    ("P02_LULC", "landuse"),
    ("P03_MOD_Inundation", "inundation"),
];

const DEFAULT_TYPE: &str = "other";

/// Classify a feature into its type string for the given collection.
pub fn classify(collection: Collection, properties: &Properties) -> String {
    match collection {
        Collection::Waterway => properties
            .get("waterway")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_TYPE)
            .to_string(),
        Collection::FloodLayer => {
            let source_file =
                properties.get("sourceFile").and_then(|v| v.as_str()).unwrap_or_default();
            FLOOD_LAYER_PATTERNS
                .iter()
                .find(|(pattern, _)| source_file.contains(pattern))
                .map(|(_, layer_type)| layer_type.to_string())
                .unwrap_or_else(|| DEFAULT_TYPE.to_string())
        }
    }
}

/// Writes feature batches into the store and the shared spatial index.
pub struct IngestionPipeline<'a, S> {
    store: &'a S,
    index: &'a SpatialIndex,
}

impl<'a, S: FeatureStore> IngestionPipeline<'a, S> {
    pub fn new(store: &'a S, index: &'a SpatialIndex) -> Self {
        Self { store, index }
    }

    /// Ingest a waterway feature collection.
    pub async fn store_waterway_data(&self, features: Vec<IncomingFeature>) -> Result<Vec<i64>> {
        self.ingest(Collection::Waterway, features).await
    }

    /// Ingest a flood-layer feature collection.
    pub async fn store_flood_layer_data(&self, features: Vec<IncomingFeature>) -> Result<Vec<i64>> {
        self.ingest(Collection::FloodLayer, features).await
    }

    async fn ingest(
        &self,
        collection: Collection,
        features: Vec<IncomingFeature>,
    ) -> Result<Vec<i64>> {
        // Classify and compute every envelope up front so a malformed
        // geometry aborts the batch before anything is written.
        let mut rows = Vec::with_capacity(features.len());
        let mut boxes = Vec::with_capacity(features.len());
        for (idx, feature) in features.into_iter().enumerate() {
            let bbox = bounding_box(&feature.geometry).ok_or_else(|| {
                PrismError::MalformedGeometry {
                    index: idx,
                    reason: "geometry has no finite extent".to_string(),
                }
            })?;
            boxes.push(bbox);
            rows.push(FeatureRow {
                feature_type: classify(collection, &feature.properties),
                properties: feature.properties,
                geometry: feature.geometry,
            });
        }

        let row_ids = self.store.insert_batch(collection, &rows).await?;

        let entries = row_ids
            .iter()
            .zip(boxes)
            .map(|(row_id, bbox)| IndexEntry::new(FeatureKey::new(collection, *row_id), bbox))
            .collect();
        self.index.insert_batch(entries)?;

        tracing::info!(
            collection = collection.as_str(),
            count = row_ids.len(),
            "ingested feature batch"
        );
        Ok(row_ids)
    }
}
