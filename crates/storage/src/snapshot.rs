//! Snapshot files, one per completed window

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{FeatureMatrix, StorageError};

/// Current snapshot file format version
pub const SNAPSHOT_VERSION: u16 = 1;

const SNAPSHOT_PREFIX: &str = "sequence_";
const SNAPSHOT_EXTENSION: &str = "bin";

/// On-disk snapshot (postcard-encoded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub version: u16,
    pub session_id: String,
    /// Wall-clock creation time (ms since Unix epoch)
    pub created_at_ms: i64,
    /// Position of this window within the session
    pub sequence: u32,
    pub matrix: FeatureMatrix,
}

/// Writes snapshot files into one directory for one session
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    session_id: String,
    next_sequence: u32,
}

impl SnapshotStore {
    /// Open (and create if needed) the output directory
    pub fn new(dir: impl Into<PathBuf>, session_id: impl Into<String>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        let session_id = session_id.into();
        info!("Snapshot store at {} for session {}", dir.display(), session_id);
        Ok(Self {
            dir,
            session_id,
            next_sequence: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of snapshots written so far
    pub fn saved(&self) -> u32 {
        self.next_sequence
    }

    /// Persist one window. The file appears atomically (temp file + rename).
    pub fn save(&mut self, matrix: FeatureMatrix) -> Result<PathBuf, StorageError> {
        matrix.validate()?;

        let sequence = self.next_sequence;
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            session_id: self.session_id.clone(),
            created_at_ms: Utc::now().timestamp_millis(),
            sequence,
            matrix,
        };
        let bytes = postcard::to_allocvec(&file)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let name = format!(
            "{}{}_{}_{:04}.{}",
            SNAPSHOT_PREFIX,
            self.session_id,
            Local::now().format("%Y%m%d_%H%M%S"),
            sequence,
            SNAPSHOT_EXTENSION
        );
        let path = self.dir.join(name);
        let tmp = path.with_extension("tmp");

        std::fs::write(&tmp, &bytes).map_err(|e| StorageError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StorageError::io(&path, e))?;

        self.next_sequence += 1;
        info!(
            "Saved {}x{} snapshot to {}",
            file.matrix.rows,
            file.matrix.cols,
            path.display()
        );
        Ok(path)
    }

    /// Read a snapshot file back
    pub fn load(path: &Path) -> Result<SnapshotFile, StorageError> {
        let bytes = std::fs::read(path).map_err(|e| StorageError::io(path, e))?;
        let file: SnapshotFile = postcard::from_bytes(&bytes)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        if file.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion(file.version));
        }
        file.matrix.validate()?;
        debug!("Loaded snapshot {} from {}", file.sequence, path.display());
        Ok(file)
    }

    /// Snapshot files in the directory, in name order
    pub fn list(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&self.dir, e))?.path();
            let is_snapshot = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(SNAPSHOT_PREFIX))
                .unwrap_or(false)
                && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION);
            if is_snapshot {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, cols: usize) -> FeatureMatrix {
        let data: Vec<Vec<f32>> = (0..rows)
            .map(|r| (0..cols).map(|c| (r * cols + c) as f32 * 0.5).collect())
            .collect();
        FeatureMatrix::from_rows(
            data.iter()
                .enumerate()
                .map(|(i, row)| if i == 1 { None } else { Some(row.as_slice()) }),
            cols,
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnapshotStore::new(dir.path(), "abc123").unwrap();

        let original = matrix(30, 6);
        let path = store.save(original.clone()).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("sequence_abc123_"));
        assert!(name.ends_with("_0000.bin"));

        let loaded = SnapshotStore::load(&path).unwrap();
        assert_eq!(loaded.version, SNAPSHOT_VERSION);
        assert_eq!(loaded.session_id, "abc123");
        assert_eq!(loaded.matrix, original);
        assert_eq!(loaded.matrix.present[1], false);
    }

    #[test]
    fn test_sequence_numbers_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnapshotStore::new(dir.path().join("nested"), "s").unwrap();

        store.save(matrix(3, 2)).unwrap();
        store.save(matrix(3, 2)).unwrap();
        std::fs::write(store.dir().join("notes.txt"), b"x").unwrap();

        assert_eq!(store.saved(), 2);
        let files = store.list().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(SnapshotStore::load(&files[1]).unwrap().sequence, 1);
    }

    #[test]
    fn test_rejects_invalid_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnapshotStore::new(dir.path(), "s").unwrap();
        let mut bad = matrix(2, 2);
        bad.rows = 5;
        assert!(matches!(store.save(bad), Err(StorageError::ShapeMismatch(_))));
        assert_eq!(store.saved(), 0);
    }

    #[test]
    fn test_load_oversized_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sequence_crafted.bin");
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            session_id: "x".into(),
            created_at_ms: 0,
            sequence: 0,
            matrix: FeatureMatrix {
                rows: usize::MAX / 2,
                cols: 4,
                data: Vec::new(),
                present: Vec::new(),
            },
        };
        std::fs::write(&path, postcard::to_allocvec(&file).unwrap()).unwrap();

        assert!(matches!(
            SnapshotStore::load(&path),
            Err(StorageError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_load_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sequence_x.bin");
        std::fs::write(&path, [0xFF, 0xFF, 0xFF]).unwrap();
        assert!(SnapshotStore::load(&path).is_err());
    }
}
