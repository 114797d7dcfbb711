//! Dataset recorder: buffers per-frame features and persists full windows

use std::path::PathBuf;

use dms::FrameFeatures;
use ring_buffer::{BatchWindow, RollingWindow, TemporalWindow, WindowError};
use storage::{FeatureMatrix, SnapshotStore, StorageError};
use tracing::{debug, info};

use crate::settings::DatasetMode;

enum Buffer {
    /// Collect exactly N frames, then drain
    Batch(BatchWindow<FrameFeatures>),
    /// Last N frames, snapshotted on request
    Rolling(RollingWindow<FrameFeatures>),
}

/// Feature window plus the store its snapshots go to
pub struct DatasetRecorder {
    buffer: Buffer,
    store: SnapshotStore,
    feature_width: usize,
}

impl DatasetRecorder {
    /// `None` when the mode is `Off`
    pub fn new(
        mode: DatasetMode,
        window_size: usize,
        feature_width: usize,
        store: SnapshotStore,
    ) -> Result<Option<Self>, WindowError> {
        let buffer = match mode {
            DatasetMode::Off => return Ok(None),
            DatasetMode::Batch => Buffer::Batch(BatchWindow::new(window_size)?),
            DatasetMode::OnRequest => Buffer::Rolling(RollingWindow::new(window_size)?),
        };
        info!(
            "Dataset capture: {:?}, {} frames x {} features into {}",
            mode,
            window_size,
            feature_width,
            store.dir().display()
        );
        Ok(Some(Self {
            buffer,
            store,
            feature_width,
        }))
    }

    /// Add one frame. In batch mode, returns the drained window once it
    /// reaches capacity.
    pub fn record(
        &mut self,
        features: FrameFeatures,
    ) -> Result<Option<Vec<FrameFeatures>>, WindowError> {
        match &mut self.buffer {
            Buffer::Batch(window) => {
                window.push(features)?;
                if window.is_full() {
                    return Ok(Some(window.drain()));
                }
                Ok(None)
            }
            Buffer::Rolling(window) => {
                window.push_evicting(features);
                Ok(None)
            }
        }
    }

    /// On-request mode: take the window if it is full, clearing it.
    /// A request on a partial window (or in batch mode) returns `None`.
    pub fn request_snapshot(&mut self) -> Option<Vec<FrameFeatures>> {
        match &mut self.buffer {
            Buffer::Rolling(window) if window.is_full() => {
                let frames = window.snapshot();
                window.clear();
                Some(frames)
            }
            Buffer::Rolling(window) => {
                info!(
                    "Snapshot requested with {}/{} frames; ignored",
                    window.len(),
                    window.capacity()
                );
                None
            }
            Buffer::Batch(_) => {
                debug!("Snapshot request ignored in batch mode");
                None
            }
        }
    }

    /// Export a window as a zero-filled matrix with a presence mask
    pub fn persist(&mut self, frames: &[FrameFeatures]) -> Result<PathBuf, StorageError> {
        let matrix = FeatureMatrix::from_rows(
            frames.iter().map(FrameFeatures::as_slice),
            self.feature_width,
        )?;
        self.store.save(matrix)
    }

    /// Frames buffered / window size
    pub fn progress(&self) -> (usize, usize) {
        match &self.buffer {
            Buffer::Batch(window) => (window.len(), window.capacity()),
            Buffer::Rolling(window) => (window.len(), window.capacity()),
        }
    }

    pub fn snapshots_saved(&self) -> u32 {
        self.store.saved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(v: f32) -> FrameFeatures {
        FrameFeatures::Observed(vec![v, v + 0.5])
    }

    fn recorder(mode: DatasetMode, dir: &std::path::Path) -> DatasetRecorder {
        let store = SnapshotStore::new(dir, "test").unwrap();
        DatasetRecorder::new(mode, 3, 2, store).unwrap().unwrap()
    }

    #[test]
    fn test_off_mode_has_no_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), "test").unwrap();
        assert!(DatasetRecorder::new(DatasetMode::Off, 3, 2, store)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_batch_drains_every_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = recorder(DatasetMode::Batch, dir.path());

        assert!(rec.record(observed(0.0)).unwrap().is_none());
        assert!(rec.record(FrameFeatures::Absent).unwrap().is_none());
        assert_eq!(rec.progress(), (2, 3));

        let window = rec.record(observed(2.0)).unwrap().unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[1], FrameFeatures::Absent);
        assert_eq!(rec.progress(), (0, 3));

        let path = rec.persist(&window).unwrap();
        let file = SnapshotStore::load(&path).unwrap();
        assert_eq!(file.matrix.present, vec![true, false, true]);
        assert_eq!(file.matrix.row(2), Some(&[2.0, 2.5][..]));
        assert_eq!(rec.snapshots_saved(), 1);
    }

    #[test]
    fn test_on_request_needs_full_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = recorder(DatasetMode::OnRequest, dir.path());

        rec.record(observed(0.0)).unwrap();
        assert!(rec.request_snapshot().is_none());

        for i in 1..5 {
            assert!(rec.record(observed(i as f32)).unwrap().is_none());
        }
        let window = rec.request_snapshot().unwrap();
        assert_eq!(
            window,
            vec![observed(2.0), observed(3.0), observed(4.0)]
        );
        assert_eq!(rec.progress(), (0, 3));
    }

    #[test]
    fn test_persist_rejects_wrong_width() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = recorder(DatasetMode::Batch, dir.path());
        let result = rec.persist(&[FrameFeatures::Observed(vec![1.0])]);
        assert!(matches!(result, Err(StorageError::ShapeMismatch(_))));
    }
}
