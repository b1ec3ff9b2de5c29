use std::path::PathBuf;
use thiserror::Error;

use crate::cache::Category;

/// Failures inside the cache's persistence layer.
///
/// These never cross the cache facade: callers only ever observe a miss or a
/// skipped save.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Snapshot holds {found} entries, expected {expected}")]
    CategoryMismatch { found: Category, expected: Category },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
