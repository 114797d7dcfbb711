//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides the frame acquisition side of a monitoring session:
//! - [`VideoFrame`]: decoded RGB frame with capture metadata
//! - [`FrameSource`]: blocking "next frame or end of stream" collaborator
//! - [`ImageSequenceSource`]: frames read from a directory of image files
//! - [`ReplaySource`]: in-memory frames, for replays and tests

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{ImageSequenceSource, ReplaySource};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open frame source: {0}")]
    Open(String),

    #[error("Failed to decode frame {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Frame source not initialized")]
    NotInitialized,
}

/// Blocking source of frames, consumed in order by a single reader
pub trait FrameSource {
    /// Block until the next frame is available.
    ///
    /// `Ok(None)` marks a clean end of stream. An `Err` means the source can
    /// no longer deliver frames.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the underlying device or files. Called once when the session ends.
    fn close(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        (**self).next_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Directory holding the frame images, read in file-name order
    pub frames_dir: PathBuf,
    /// Nominal frame rate, used to stamp frames (fps)
    pub fps: u32,
    /// Accepted file extensions (lowercase)
    pub extensions: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("frames"),
            fps: 30,
            extensions: vec!["png".into(), "jpg".into(), "jpeg".into(), "bmp".into()],
        }
    }
}
