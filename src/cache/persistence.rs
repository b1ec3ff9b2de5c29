//! On-disk snapshots of a category's entries
//!
//! Each category owns one file holding a versioned JSON document with every
//! entry. Saves replace the file whole: the document is written to a sibling
//! temp file and then renamed over the old one, so a crash mid-save leaves
//! either the previous snapshot or the new one, never a truncated file.
//!
//! `SnapshotFile` does no locking of its own. Its owner runs one save at a
//! time per file, see `TypedCache::save`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::policy::Category;
use crate::error::CacheError;

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotOut<'a, V> {
    version: u32,
    category: Category,
    saved_at_millis: i64,
    entries: Vec<&'a CacheEntry<V>>,
}

/// Entries stay as raw JSON until the header checks out, so one malformed
/// entry only costs that entry.
#[derive(Deserialize)]
struct SnapshotIn {
    version: u32,
    category: Category,
    #[allow(dead_code)]
    saved_at_millis: i64,
    entries: Vec<serde_json::Value>,
}

/// Result of reading a snapshot file
#[derive(Debug)]
pub struct LoadedSnapshot<V> {
    pub entries: Vec<CacheEntry<V>>,
    /// Entries present in the file that could not be parsed
    pub skipped: usize,
}

impl<V> Default for LoadedSnapshot<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            skipped: 0,
        }
    }
}

/// The snapshot file for one category
pub struct SnapshotFile {
    category: Category,
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(category: Category, path: impl Into<PathBuf>) -> Self {
        Self {
            category,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read the snapshot. A missing file is an empty snapshot, not an error.
    pub async fn load<V>(&self) -> Result<LoadedSnapshot<V>, CacheError>
    where
        V: DeserializeOwned,
    {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No {} snapshot at {}", self.category, self.path.display());
                return Ok(LoadedSnapshot::default());
            }
            Err(e) => return Err(CacheError::io(&self.path, e)),
        };

        let snapshot: SnapshotIn = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::VersionMismatch {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        if snapshot.category != self.category {
            return Err(CacheError::CategoryMismatch {
                found: snapshot.category,
                expected: self.category,
            });
        }

        let mut loaded = LoadedSnapshot::default();
        for raw in snapshot.entries {
            match serde_json::from_value::<CacheEntry<V>>(raw) {
                Ok(entry) => loaded.entries.push(entry),
                Err(e) => {
                    warn!("Skipping unreadable {} entry: {}", self.category, e);
                    loaded.skipped += 1;
                }
            }
        }
        Ok(loaded)
    }

    /// Write `entries` as the new snapshot, creating parent directories as needed.
    ///
    /// Concurrent saves of the same file would share the temp file, so the
    /// caller must not overlap them.
    pub async fn save<V>(
        &self,
        entries: &[CacheEntry<V>],
        now_millis: i64,
    ) -> Result<(), CacheError>
    where
        V: Serialize,
    {
        let document = SnapshotOut {
            version: SNAPSHOT_VERSION,
            category: self.category,
            saved_at_millis: now_millis,
            entries: entries.iter().collect(),
        };
        let bytes = serde_json::to_vec(&document)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io(parent, e))?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| CacheError::io(&temp_path, e))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::io(&self.path, e));
        }

        debug!(
            "Saved {} {} entries to {}",
            entries.len(),
            self.category,
            self.path.display()
        );
        Ok(())
    }
}
