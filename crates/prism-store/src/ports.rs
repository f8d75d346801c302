use async_trait::async_trait;
use prism_core::models::{Collection, Geometry, Properties, StoredFeature};
use prism_core::Result;

/// A classified feature ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub feature_type: String,
    pub properties: Properties,
    pub geometry: Geometry,
}

/// Port for durable feature row storage, partitioned into two collections.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Create both collection tables if absent. Idempotent: safe to call
    /// repeatedly, never duplicates schema.
    async fn initialize(&self) -> Result<()>;

    /// Insert a batch of rows into one collection as a single durable unit.
    ///
    /// Returns the assigned row ids, sequential and 1-based per collection.
    /// If the commit fails, no rows from the batch are visible.
    async fn insert_batch(&self, collection: Collection, rows: &[FeatureRow]) -> Result<Vec<i64>>;

    /// Fetch a feature by row id. Absent rows are `Ok(None)`, never an error.
    async fn fetch(&self, collection: Collection, row_id: i64) -> Result<Option<StoredFeature>>;

    /// Number of rows stored in a collection.
    async fn count(&self, collection: Collection) -> Result<u64>;
}
