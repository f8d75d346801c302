//! SQLite adapter for the feature store.
//!
//! Every operation opens its own connection and releases it on every exit
//! path, including failure. There is no pooling and no multi-writer
//! coordination at this layer; ingestion batches require exclusive access
//! for their duration.

use async_trait::async_trait;
use prism_core::config::LayeredConfig;
use prism_core::models::{Collection, Geometry, Properties, StoredFeature};
use prism_core::{PrismError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Row};
use std::path::Path;

use crate::ports::{FeatureRow, FeatureStore};

fn table(collection: Collection) -> &'static str {
    match collection {
        Collection::Waterway => "waterways",
        Collection::FloodLayer => "flooding_layers",
    }
}

fn type_column(collection: Collection) -> &'static str {
    match collection {
        Collection::Waterway => "waterway_type",
        Collection::FloodLayer => "layer_type",
    }
}

fn storage_err(e: sqlx::Error) -> PrismError {
    PrismError::Storage(e.to_string())
}

/// Feature store backed by a single SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteFeatureStore {
    options: SqliteConnectOptions,
}

impl SqliteFeatureStore {
    /// Open a store at the given database path, creating the file if absent.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Self {
        let options = SqliteConnectOptions::new().filename(db_path.as_ref()).create_if_missing(true);
        Self { options }
    }

    /// Open a store at the configured database path.
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self::open(&config.db_path.value)
    }

    /// Scoped connection for one call; dropped on every exit path.
    async fn connect(&self) -> Result<SqliteConnection> {
        SqliteConnection::connect_with(&self.options).await.map_err(storage_err)
    }
}

#[async_trait]
impl FeatureStore for SqliteFeatureStore {
    async fn initialize(&self) -> Result<()> {
        let mut conn = self.connect().await?;

        for collection in [Collection::Waterway, Collection::FloodLayer] {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY,
                    {type_col} TEXT,
                    properties TEXT,
                    geometry TEXT
                )",
                table = table(collection),
                type_col = type_column(collection),
            );
            sqlx::query(&ddl).execute(&mut conn).await.map_err(storage_err)?;

            let idx = format!(
                "CREATE INDEX IF NOT EXISTS idx_{type_col} ON {table}({type_col})",
                table = table(collection),
                type_col = type_column(collection),
            );
            sqlx::query(&idx).execute(&mut conn).await.map_err(storage_err)?;
        }

        Ok(())
    }

    async fn insert_batch(&self, collection: Collection, rows: &[FeatureRow]) -> Result<Vec<i64>> {
        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await.map_err(storage_err)?;

        let sql = format!(
            "INSERT INTO {table} ({type_col}, properties, geometry) VALUES (?1, ?2, ?3)",
            table = table(collection),
            type_col = type_column(collection),
        );

        let mut row_ids = Vec::with_capacity(rows.len());
        for row in rows {
            let properties = serde_json::to_string(&row.properties)
                .map_err(|e| PrismError::Serialization(e.to_string()))?;
            let geometry = serde_json::to_string(&row.geometry)
                .map_err(|e| PrismError::Serialization(e.to_string()))?;

            let result = sqlx::query(&sql)
                .bind(&row.feature_type)
                .bind(properties)
                .bind(geometry)
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;

            row_ids.push(result.last_insert_rowid());
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(row_ids)
    }

    async fn fetch(&self, collection: Collection, row_id: i64) -> Result<Option<StoredFeature>> {
        let mut conn = self.connect().await?;

        let sql = format!(
            "SELECT {type_col} AS feature_type, properties, geometry FROM {table} WHERE id = ?1",
            table = table(collection),
            type_col = type_column(collection),
        );

        let row = sqlx::query(&sql)
            .bind(row_id)
            .fetch_optional(&mut conn)
            .await
            .map_err(storage_err)?;

        match row {
            Some(row) => {
                let feature_type: String = row.get("feature_type");
                let properties_text: String = row.get("properties");
                let geometry_text: String = row.get("geometry");

                let properties: Properties = serde_json::from_str(&properties_text)
                    .map_err(|e| PrismError::Serialization(e.to_string()))?;
                let geometry: Geometry = serde_json::from_str(&geometry_text)
                    .map_err(|e| PrismError::Serialization(e.to_string()))?;

                Ok(Some(StoredFeature { row_id, collection, feature_type, properties, geometry }))
            }
            None => Ok(None),
        }
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        let mut conn = self.connect().await?;

        let sql = format!("SELECT COUNT(*) FROM {}", table(collection));
        let count: i64 =
            sqlx::query_scalar(&sql).fetch_one(&mut conn).await.map_err(storage_err)?;

        Ok(count as u64)
    }
}
