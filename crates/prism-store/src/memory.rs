//! In-memory feature store for development and testing.
//!
//! Uses `RwLock::unwrap()` intentionally. Lock poisoning only occurs when
//! another thread panicked while holding the lock, which is an
//! unrecoverable state. For durable workloads, use the SQLite backend.

use async_trait::async_trait;
use prism_core::models::{Collection, StoredFeature};
use prism_core::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ports::{FeatureRow, FeatureStore};

/// In-memory implementation of [`FeatureStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFeatureStore {
    rows: Arc<RwLock<HashMap<Collection, Vec<StoredFeature>>>>,
}

impl MemoryFeatureStore {
    /// Create a new in-memory feature store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeatureStore for MemoryFeatureStore {
    async fn initialize(&self) -> Result<()> {
        let mut rows = self.rows.write().unwrap();
        rows.entry(Collection::Waterway).or_default();
        rows.entry(Collection::FloodLayer).or_default();
        Ok(())
    }

    async fn insert_batch(&self, collection: Collection, batch: &[FeatureRow]) -> Result<Vec<i64>> {
        let mut rows = self.rows.write().unwrap();
        let stored = rows.entry(collection).or_default();

        let mut row_ids = Vec::with_capacity(batch.len());
        for row in batch {
            // Sequential 1-based ids, matching the SQLite rowid contract.
            let row_id = stored.len() as i64 + 1;
            stored.push(StoredFeature {
                row_id,
                collection,
                feature_type: row.feature_type.clone(),
                properties: row.properties.clone(),
                geometry: row.geometry.clone(),
            });
            row_ids.push(row_id);
        }

        Ok(row_ids)
    }

    async fn fetch(&self, collection: Collection, row_id: i64) -> Result<Option<StoredFeature>> {
        if row_id < 1 {
            return Ok(None);
        }

        let rows = self.rows.read().unwrap();
        let stored = rows.get(&collection).map(Vec::as_slice).unwrap_or(&[]);
        Ok(stored.get(row_id as usize - 1).cloned())
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        let rows = self.rows.read().unwrap();
        Ok(rows.get(&collection).map(Vec::len).unwrap_or(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::models::Geometry;

    fn row(feature_type: &str) -> FeatureRow {
        FeatureRow {
            feature_type: feature_type.to_string(),
            properties: Default::default(),
            geometry: Geometry::point(25.0, 45.0),
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential_per_collection() {
        let store = MemoryFeatureStore::new();
        store.initialize().await.unwrap();

        let waterway_ids = store
            .insert_batch(Collection::Waterway, &[row("river"), row("stream")])
            .await
            .unwrap();
        let flood_ids =
            store.insert_batch(Collection::FloodLayer, &[row("buildings")]).await.unwrap();

        assert_eq!(waterway_ids, vec![1, 2]);
        assert_eq!(flood_ids, vec![1]);
    }

    #[tokio::test]
    async fn test_fetch_absent_is_none() {
        let store = MemoryFeatureStore::new();
        store.initialize().await.unwrap();

        assert!(store.fetch(Collection::Waterway, 99).await.unwrap().is_none());
        assert!(store.fetch(Collection::Waterway, 0).await.unwrap().is_none());
        assert!(store.fetch(Collection::Waterway, -3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryFeatureStore::new();
        store.initialize().await.unwrap();

        let mut properties = prism_core::models::Properties::new();
        properties.insert("name".into(), "Dambovita".into());
        let geometry = Geometry::line_string(vec![[25.0, 45.0], [25.1, 45.1]]);

        let ids = store
            .insert_batch(
                Collection::Waterway,
                &[FeatureRow {
                    feature_type: "river".to_string(),
                    properties: properties.clone(),
                    geometry: geometry.clone(),
                }],
            )
            .await
            .unwrap();

        let fetched = store.fetch(Collection::Waterway, ids[0]).await.unwrap().unwrap();
        assert_eq!(fetched.properties, properties);
        assert_eq!(fetched.geometry, geometry);
        assert_eq!(fetched.feature_type, "river");
    }
}
