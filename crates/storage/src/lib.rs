//! Storage Layer
//!
//! Persists completed feature windows as one snapshot file per window.

mod matrix;
mod snapshot;

pub use matrix::FeatureMatrix;
pub use snapshot::{SnapshotFile, SnapshotStore, SNAPSHOT_VERSION};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u16),
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
