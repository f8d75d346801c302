//! Prism Store - Feature storage, spatial index, ingestion, and queries
//!
//! The write path runs ingestion into a durable feature store and a shared
//! disk-backed R-tree; the read path prefilters candidates through the
//! R-tree and applies exact distance filtering against stored geometry.

pub mod index;
pub mod ingest;
pub mod memory;
pub mod ports;
pub mod query;
pub mod sqlite;

pub use index::{IndexEntry, SpatialIndex};
pub use ingest::IngestionPipeline;
pub use memory::MemoryFeatureStore;
pub use ports::{FeatureRow, FeatureStore};
pub use query::{FloodAggregate, FloodDetail, ProximityQueryEngine, WaterwayMatch};
pub use sqlite::SqliteFeatureStore;
