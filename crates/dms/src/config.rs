//! DMS configuration

use ring_buffer::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::landmarks::LandmarkLayout;
use crate::state::NoFacePolicy;
use crate::DmsError;

/// DMS configuration, fixed for the lifetime of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// EAR below this value counts as a closed-eye frame
    pub ear_threshold: f32,

    /// Consecutive closed-eye frames before the driver is declared drowsy
    pub consec_frames: u32,

    /// Temporal window length (frames) for EAR history and dataset capture
    pub window_size: usize,

    /// Handling of frames without a face
    pub no_face_policy: NoFacePolicy,

    /// Landmark convention of the detector
    pub layout: LandmarkLayout,

    /// Landmark model (ONNX)
    pub model_path: Option<PathBuf>,

    /// Square input resolution of the landmark model
    pub model_input_size: u32,

    /// Face presence confidence threshold
    pub face_confidence: f32,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            consec_frames: 48,
            window_size: DEFAULT_CAPACITY,
            no_face_policy: NoFacePolicy::ResetCounter,
            layout: LandmarkLayout::FaceMesh468,
            model_path: None,
            model_input_size: 192,
            face_confidence: 0.5,
        }
    }
}

impl DmsConfig {
    /// Create strict config (alerts sooner)
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.27,
            consec_frames: 30,
            ..Default::default()
        }
    }

    /// Create lenient config (alerts later)
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.22,
            consec_frames: 72,
            ..Default::default()
        }
    }

    /// Check the session constants
    pub fn validate(&self) -> Result<(), DmsError> {
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 {
            return Err(DmsError::Config(format!(
                "ear_threshold must be a positive number, got {}",
                self.ear_threshold
            )));
        }
        if self.consec_frames == 0 {
            return Err(DmsError::Config("consec_frames must be at least 1".into()));
        }
        if self.window_size == 0 {
            return Err(DmsError::Config("window_size must be at least 1".into()));
        }
        if self.model_input_size == 0 {
            return Err(DmsError::Config("model_input_size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.face_confidence) {
            return Err(DmsError::Config(format!(
                "face_confidence must be within [0, 1], got {}",
                self.face_confidence
            )));
        }
        Ok(())
    }
}
