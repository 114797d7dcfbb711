//! Frame sources

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{CameraError, CaptureConfig, FrameSource, VideoFrame};

/// Reads frames from a directory of image files in file-name order
pub struct ImageSequenceSource {
    files: VecDeque<PathBuf>,
    frame_interval_ns: u64,
    next_sequence: u32,
    closed: bool,
}

impl ImageSequenceSource {
    /// Scan `config.frames_dir` for images with an accepted extension
    pub fn open(config: &CaptureConfig) -> Result<Self, CameraError> {
        let dir = &config.frames_dir;
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?
                .path();
            if path.is_file() && has_extension(&path, &config.extensions) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            warn!("No frame images found in {}", dir.display());
        }
        info!("Opened image sequence {} ({} frames)", dir.display(), files.len());

        Ok(Self {
            files: files.into(),
            frame_interval_ns: 1_000_000_000 / u64::from(config.fps.max(1)),
            next_sequence: 0,
            closed: false,
        })
    }

    /// Frames not yet delivered
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|accepted| *accepted == ext)
        })
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.closed {
            return Err(CameraError::NotInitialized);
        }
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };

        let image = image::open(&path).map_err(|e| CameraError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        debug!("Decoded frame {} from {}", sequence, path.display());

        Ok(Some(VideoFrame::from_rgb_image(
            image.to_rgb8(),
            u64::from(sequence) * self.frame_interval_ns,
            sequence,
        )))
    }

    fn close(&mut self) {
        if !self.closed {
            info!("Closing image sequence ({} frames unread)", self.files.len());
            self.files.clear();
            self.closed = true;
        }
    }
}

/// Serves pre-built frames, then ends the stream or fails
pub struct ReplaySource {
    frames: VecDeque<VideoFrame>,
    failure: Option<String>,
    closed: bool,
}

impl ReplaySource {
    /// Replay `frames` in order, then report end of stream
    pub fn new(frames: impl IntoIterator<Item = VideoFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            failure: None,
            closed: false,
        }
    }

    /// `count` blank frames stamped at `fps`
    pub fn blank(count: u32, fps: u32) -> Self {
        let interval = 1_000_000_000 / u64::from(fps.max(1));
        Self::new((0..count).map(|i| VideoFrame::blank(8, 8, u64::from(i) * interval, i)))
    }

    /// After the last frame, fail with a stream error instead of ending cleanly
    pub fn then_fail(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.closed {
            return Err(CameraError::NotInitialized);
        }
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => match &self.failure {
                Some(reason) => Err(CameraError::Stream(reason.clone())),
                None => Ok(None),
            },
        }
    }

    fn close(&mut self) {
        self.frames.clear();
        self.closed = true;
    }
}
