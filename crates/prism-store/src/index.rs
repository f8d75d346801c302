//! Disk-backed R-tree shared by both feature collections.
//!
//! The on-disk state is a file pair at a fixed relative path inside the
//! index directory: `rtree.snapshot` (compacted JSON array) and `rtree.log`
//! (JSON lines appended per ingestion batch). Opening the index loads the
//! snapshot and replays the log; [`SpatialIndex::checkpoint`] folds the log
//! into a fresh snapshot with an atomic rename.
//!
//! Every mutation happens inside an exclusive write-lock scope; queries
//! take a shared read lock. `RwLock::unwrap()` is used intentionally, as in
//! the in-memory store: lock poisoning means another thread panicked while
//! holding the lock, which is unrecoverable here.
//!
//! Bounding-box intersection is a conservative prefilter: it is necessary
//! but not sufficient for true geometric proximity, so callers must always
//! apply an exact distance check to the candidates it returns.

use prism_core::config::LayeredConfig;
use prism_core::models::{BoundingBox, Collection, FeatureKey};
use prism_core::{PrismError, Result};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use prism_geo::bounding_box;

use crate::ports::FeatureStore;

const SNAPSHOT_FILE: &str = "rtree.snapshot";
const LOG_FILE: &str = "rtree.log";

/// One indexed envelope: tagged feature key plus the bounding box of the
/// feature's geometry at insertion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub key: FeatureKey,
    pub bbox: BoundingBox,
}

impl IndexEntry {
    pub fn new(key: FeatureKey, bbox: BoundingBox) -> Self {
        Self { key, bbox }
    }
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min_lon, self.bbox.min_lat],
            [self.bbox.max_lon, self.bbox.max_lat],
        )
    }
}

/// Disk-backed spatial index over feature bounding boxes.
pub struct SpatialIndex {
    dir: PathBuf,
    tree: RwLock<RTree<IndexEntry>>,
}

impl SpatialIndex {
    /// Open (or create) the index rooted at `dir`.
    ///
    /// Loads the snapshot if present, then replays the log. A torn final
    /// log line from an interrupted append is skipped with a warning; the
    /// entries it described are recoverable via [`Self::rebuild_from_store`].
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut entries: Vec<IndexEntry> = Vec::new();

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        if snapshot_path.exists() {
            let file = File::open(&snapshot_path)?;
            entries = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| PrismError::Index(format!("corrupt snapshot: {}", e)))?;
        }

        let snapshot_len = entries.len();
        let log_path = dir.join(LOG_FILE);
        if log_path.exists() {
            for line in BufReader::new(File::open(&log_path)?).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<IndexEntry>(&line) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        tracing::warn!("skipping unparseable index log line: {}", e);
                    }
                }
            }
        }

        // A crash between the checkpoint rename and the log truncation
        // leaves already-snapshotted entries in the log. Keys are unique
        // per feature, so replayed duplicates are dropped here.
        let mut seen = HashSet::new();
        entries.retain(|entry| seen.insert(entry.key));

        tracing::debug!(
            snapshot_entries = snapshot_len,
            total_entries = entries.len(),
            "opened spatial index"
        );

        Ok(Self { dir, tree: RwLock::new(RTree::bulk_load(entries)) })
    }

    /// Open the index rooted at the configured index directory.
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        Self::open(&config.index_dir.value)
    }

    /// Insert a batch of entries, durably logging them before they become
    /// visible to queries.
    pub fn insert_batch(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut log = OpenOptions::new().create(true).append(true).open(self.log_path())?;
        for entry in &entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| PrismError::Serialization(e.to_string()))?;
            writeln!(log, "{}", line)?;
        }
        log.sync_all()?;

        let mut tree = self.tree.write().unwrap();
        for entry in entries {
            tree.insert(entry);
        }

        Ok(())
    }

    /// Keys of every stored entry whose bounding box overlaps the query box.
    ///
    /// A conservative superset over both collections; callers filter by
    /// collection and must apply an exact geometric check afterward.
    pub fn intersects(&self, bbox: &BoundingBox) -> Vec<FeatureKey> {
        let envelope =
            AABB::from_corners([bbox.min_lon, bbox.min_lat], [bbox.max_lon, bbox.max_lat]);

        let tree = self.tree.read().unwrap();
        tree.locate_in_envelope_intersecting(&envelope).map(|entry| entry.key).collect()
    }

    /// Fold the log into a fresh snapshot and truncate it.
    ///
    /// The snapshot is written to a temporary file and renamed into place.
    /// A crash before the rename leaves the previous pair intact; a crash
    /// between the rename and the log removal leaves the new snapshot plus
    /// a stale log, which [`Self::open`] deduplicates on replay.
    pub fn checkpoint(&self) -> Result<()> {
        // Exclusive scope: no appends may interleave with the fold.
        let tree = self.tree.write().unwrap();
        let entries: Vec<&IndexEntry> = tree.iter().collect();

        let tmp_path = self.dir.join(format!("{}.tmp", SNAPSHOT_FILE));
        let mut tmp = File::create(&tmp_path)?;
        serde_json::to_writer(&mut tmp, &entries)
            .map_err(|e| PrismError::Serialization(e.to_string()))?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, self.dir.join(SNAPSHOT_FILE))?;

        let log_path = self.log_path();
        if log_path.exists() {
            fs::remove_file(&log_path)?;
        }

        tracing::debug!(entries = entries.len(), "checkpointed spatial index");
        Ok(())
    }

    /// Discard the on-disk pair and re-register every stored row.
    ///
    /// This is the convergence path for partial ingestion failures: rows
    /// committed to the store but missing from the index become reachable
    /// again, and orphaned index entries disappear.
    pub async fn rebuild_from_store<P, S>(dir: P, store: &S) -> Result<Self>
    where
        P: AsRef<Path>,
        S: FeatureStore + ?Sized,
    {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        for name in [SNAPSHOT_FILE, LOG_FILE] {
            let path = dir.join(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }

        let index = Self::open(&dir)?;
        for collection in [Collection::Waterway, Collection::FloodLayer] {
            let total = store.count(collection).await?;
            let mut entries = Vec::new();
            for row_id in 1..=total as i64 {
                let Some(feature) = store.fetch(collection, row_id).await? else {
                    continue;
                };
                // Rows whose geometry has no extent stay unreachable by
                // proximity queries, same as at ingestion time.
                if let Some(bbox) = bounding_box(&feature.geometry) {
                    entries.push(IndexEntry::new(FeatureKey::new(collection, row_id), bbox));
                }
            }
            tracing::info!(
                collection = collection.as_str(),
                entries = entries.len(),
                "rebuilt index entries from store"
            );
            index.insert_batch(entries)?;
        }

        index.checkpoint()?;
        Ok(index)
    }

    /// Total number of entries across both collections.
    pub fn len(&self) -> usize {
        self.tree.read().unwrap().size()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn entry(collection: Collection, row_id: i64, bbox: BoundingBox) -> IndexEntry {
        IndexEntry::new(FeatureKey::new(collection, row_id), bbox)
    }

    fn unit_box(lon: f64, lat: f64) -> BoundingBox {
        BoundingBox::new(lon, lat, lon + 1.0, lat + 1.0)
    }

    #[test]
    fn test_open_empty() {
        let dir = TempDir::new().unwrap();
        let index = SpatialIndex::open(dir.path()).unwrap();
        assert!(index.is_empty());
        assert!(index.intersects(&BoundingBox::new(-180.0, -90.0, 180.0, 90.0)).is_empty());
    }

    #[test]
    fn test_intersects_returns_overlapping_keys() {
        let dir = TempDir::new().unwrap();
        let index = SpatialIndex::open(dir.path()).unwrap();

        index
            .insert_batch(vec![
                entry(Collection::Waterway, 1, unit_box(0.0, 0.0)),
                entry(Collection::Waterway, 2, unit_box(5.0, 5.0)),
                entry(Collection::FloodLayer, 1, unit_box(0.5, 0.5)),
            ])
            .unwrap();

        let keys = index.intersects(&BoundingBox::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&FeatureKey::new(Collection::Waterway, 1)));
        assert!(keys.contains(&FeatureKey::new(Collection::FloodLayer, 1)));
        assert!(!keys.contains(&FeatureKey::new(Collection::Waterway, 2)));
    }

    #[test]
    fn test_collections_stay_disjoint_at_large_ids() {
        // With a shared numeric id space partitioned at a fixed offset,
        // waterway ids past the reserved range would collide with flood
        // layer ids. Tagged keys keep the collections distinguishable no
        // matter how many rows either collection holds.
        let dir = TempDir::new().unwrap();
        let index = SpatialIndex::open(dir.path()).unwrap();

        let bbox = unit_box(25.0, 45.0);
        index
            .insert_batch(vec![
                entry(Collection::Waterway, 1_000_001, bbox),
                entry(Collection::FloodLayer, 1, bbox),
            ])
            .unwrap();

        let keys = index.intersects(&bbox);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&FeatureKey::new(Collection::Waterway, 1_000_001)));
        assert!(keys.contains(&FeatureKey::new(Collection::FloodLayer, 1)));
    }

    #[test]
    fn test_entries_survive_reopen_via_log() {
        let dir = TempDir::new().unwrap();
        {
            let index = SpatialIndex::open(dir.path()).unwrap();
            index.insert_batch(vec![entry(Collection::Waterway, 1, unit_box(0.0, 0.0))]).unwrap();
        }

        let reopened = SpatialIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        let keys = reopened.intersects(&unit_box(0.0, 0.0));
        assert_eq!(keys, vec![FeatureKey::new(Collection::Waterway, 1)]);
    }

    #[test]
    fn test_checkpoint_folds_log_into_snapshot() {
        let dir = TempDir::new().unwrap();
        {
            let index = SpatialIndex::open(dir.path()).unwrap();
            index
                .insert_batch(vec![
                    entry(Collection::Waterway, 1, unit_box(0.0, 0.0)),
                    entry(Collection::FloodLayer, 1, unit_box(3.0, 3.0)),
                ])
                .unwrap();
            index.checkpoint().unwrap();
        }

        assert!(dir.path().join(SNAPSHOT_FILE).exists());
        assert!(!dir.path().join(LOG_FILE).exists());

        let reopened = SpatialIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn test_stale_log_after_checkpoint_is_not_replayed_twice() {
        // Crash window between the snapshot rename and the log removal:
        // the log still holds entries the snapshot already contains.
        let dir = TempDir::new().unwrap();
        let entry = entry(Collection::Waterway, 1, unit_box(0.0, 0.0));
        {
            let index = SpatialIndex::open(dir.path()).unwrap();
            index.insert_batch(vec![entry.clone()]).unwrap();
            index.checkpoint().unwrap();
        }

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.path().join(LOG_FILE))
            .unwrap();
        writeln!(log, "{}", serde_json::to_string(&entry).unwrap()).unwrap();
        drop(log);

        let reopened = SpatialIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(
            reopened.intersects(&unit_box(0.0, 0.0)),
            vec![FeatureKey::new(Collection::Waterway, 1)]
        );
    }

    #[test]
    fn test_torn_log_line_is_skipped() {
        let dir = TempDir::new().unwrap();
        {
            let index = SpatialIndex::open(dir.path()).unwrap();
            index.insert_batch(vec![entry(Collection::Waterway, 1, unit_box(0.0, 0.0))]).unwrap();
        }

        // Simulate a crash mid-append: a truncated trailing line.
        let mut log = OpenOptions::new().append(true).open(dir.path().join(LOG_FILE)).unwrap();
        write!(log, "{{\"key\":{{\"collection\"").unwrap();
        drop(log);

        let reopened = SpatialIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    proptest! {
        /// Prefilter superset property: any entry whose bbox overlaps the
        /// query box must appear in the candidate set (no false negatives).
        #[test]
        fn prop_no_false_negatives(
            boxes in prop::collection::vec(
                (-170.0..170.0f64, -80.0..80.0f64, 0.0..5.0f64, 0.0..5.0f64),
                1..24,
            ),
            query in (-170.0..170.0f64, -80.0..80.0f64, 0.0..10.0f64, 0.0..10.0f64),
        ) {
            let dir = TempDir::new().unwrap();
            let index = SpatialIndex::open(dir.path()).unwrap();

            let entries: Vec<IndexEntry> = boxes
                .iter()
                .enumerate()
                .map(|(i, (lon, lat, w, h))| entry(
                    Collection::Waterway,
                    i as i64 + 1,
                    BoundingBox::new(*lon, *lat, lon + w, lat + h),
                ))
                .collect();
            index.insert_batch(entries.clone()).unwrap();

            let query_box = BoundingBox::new(query.0, query.1, query.0 + query.2, query.1 + query.3);
            let keys = index.intersects(&query_box);

            for entry in &entries {
                if entry.bbox.intersects(&query_box) {
                    prop_assert!(keys.contains(&entry.key));
                }
            }
        }
    }
}
