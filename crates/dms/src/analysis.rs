//! DMS analysis results

use serde::{Deserialize, Serialize};

use crate::features::FrameFeatures;
use crate::geometry::EarReading;
use crate::landmarks::Landmark;
use crate::state::{AlertEdge, DrowsinessPhase};

/// Why a frame did not reach the state machine as an EAR value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameIssue {
    /// Detector returned no face
    NoFace,
    /// Detector failed or returned malformed landmarks; treated as no face
    DetectionAnomaly,
    /// Both eyes degenerate or EAR rejected; the state machine skipped the frame
    InvalidMetric,
}

/// Complete DMS analysis of one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Frame sequence number
    pub sequence: u32,

    /// Capture timestamp (milliseconds)
    pub timestamp_ms: u64,

    /// Whether a usable face was detected
    pub face_detected: bool,

    /// Eye aspect ratios (if a face was detected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<EarReading>,

    /// Eye contours for overlays (left, right)
    #[serde(skip)]
    pub eyes: Option<(Vec<Landmark>, Vec<Landmark>)>,

    /// Drowsiness phase after this frame
    pub phase: DrowsinessPhase,

    /// Consecutive closed-eye frames after this frame
    pub consecutive_below: u32,

    /// Drowsy flag after this frame
    pub is_drowsy: bool,

    /// Edge emitted by this frame, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<AlertEdge>,

    /// Fraction of recent frames with EAR below threshold
    pub perclos: f32,

    /// Set when the frame was not a regular measurement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<FrameIssue>,

    /// Landmark snapshot for dataset capture
    #[serde(skip)]
    pub features: Option<FrameFeatures>,
}

impl FrameAnalysis {
    /// Combined EAR, when measured
    pub fn combined_ear(&self) -> Option<f32> {
        self.ear.and_then(|reading| reading.combined)
    }

    /// Whether this frame updated the state machine
    pub fn counted(&self) -> bool {
        !matches!(self.issue, Some(FrameIssue::InvalidMetric))
    }

    /// Take the feature vector out, leaving `Absent` semantics to the caller
    pub fn take_features(&mut self) -> FrameFeatures {
        self.features.take().unwrap_or(FrameFeatures::Absent)
    }
}
