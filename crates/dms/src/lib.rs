//! Driver Monitoring System (DMS)
//!
//! Per-frame drowsiness analysis from facial landmarks:
//! - Eye aspect ratio geometry
//! - Landmark layouts (dlib 68, MediaPipe face mesh)
//! - Hysteresis state machine with edge-triggered alerts
//! - Landmark feature vectors for dataset capture

pub mod analysis;
pub mod config;
pub mod detector;
pub mod features;
pub mod geometry;
pub mod landmarks;
pub mod state;

pub use analysis::{FrameAnalysis, FrameIssue};
pub use config::DmsConfig;
pub use detector::{LandmarkDetector, OnnxLandmarkDetector, ReplayDetector};
pub use features::FrameFeatures;
pub use geometry::{combined_ear, eye_aspect_ratio, EarReading};
pub use landmarks::{EyeSide, Face, Landmark, LandmarkLayout};
pub use state::{AlertEdge, DrowsinessPhase, DrowsinessTracker, NoFacePolicy, Observation};

use camera_capture::VideoFrame;
use ring_buffer::{RollingWindow, TemporalWindow};
use thiserror::Error;
use tracing::{debug, warn};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid landmark input: {0}")]
    InvalidInput(String),

    #[error("Invalid eye aspect ratio: {0}")]
    InvalidMetric(f32),

    #[error("Face has {actual} landmarks, layout needs {expected}")]
    LandmarksMissing { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Window error: {0}")]
    Window(#[from] ring_buffer::WindowError),
}

/// Running counters for a DMS module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DmsStats {
    pub frames_analyzed: u64,
    pub faces_missing: u64,
    pub detection_anomalies: u64,
    pub frames_skipped: u64,
}

/// Driver monitoring module: detector + EAR + drowsiness state
pub struct DmsModule<D> {
    config: DmsConfig,
    detector: D,
    tracker: DrowsinessTracker,
    /// Recent combined EAR values (PERCLOS)
    ear_history: RollingWindow<f32>,
    stats: DmsStats,
}

impl<D: LandmarkDetector> DmsModule<D> {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig, detector: D) -> Result<Self, DmsError> {
        config.validate()?;
        if detector.layout() != config.layout {
            warn!(
                "Detector layout {:?} differs from configured {:?}; using the detector's",
                detector.layout(),
                config.layout
            );
        }
        Ok(Self {
            tracker: DrowsinessTracker::new(
                config.ear_threshold,
                config.consec_frames,
                config.no_face_policy,
            ),
            ear_history: RollingWindow::new(config.window_size)?,
            detector,
            config,
            stats: DmsStats::default(),
        })
    }

    /// Analyze a single frame for driver state.
    ///
    /// Detector failures and malformed faces are recovered here (the frame
    /// counts as "no face"); degenerate eyes skip the state machine.
    pub fn analyze(&mut self, frame: &VideoFrame) -> FrameAnalysis {
        self.stats.frames_analyzed += 1;

        let mut analysis = FrameAnalysis {
            sequence: frame.sequence,
            timestamp_ms: frame.timestamp_ms(),
            features: Some(FrameFeatures::Absent),
            ..Default::default()
        };

        let observation = match self.detect_face(frame) {
            Ok(Some(face)) => self.measure(&face, &mut analysis),
            Ok(None) => {
                self.stats.faces_missing += 1;
                analysis.issue = Some(FrameIssue::NoFace);
                Some(Observation::NoFace)
            }
            Err(e) => {
                warn!("Frame {}: detection anomaly, treating as no face: {}", frame.sequence, e);
                self.stats.detection_anomalies += 1;
                analysis.issue = Some(FrameIssue::DetectionAnomaly);
                Some(Observation::NoFace)
            }
        };

        if let Some(observation) = observation {
            match self.tracker.update(observation) {
                Ok(edge) => {
                    analysis.edge = edge;
                    if let Observation::Ear(ear) = observation {
                        self.ear_history.push_evicting(ear);
                    }
                }
                Err(e) => {
                    warn!("Frame {} skipped: {}", frame.sequence, e);
                    analysis.issue = Some(FrameIssue::InvalidMetric);
                }
            }
        }
        if !analysis.counted() {
            self.stats.frames_skipped += 1;
        }

        let threshold = self.tracker.ear_threshold();
        analysis.perclos = self.ear_history.fraction_where(|&ear| ear < threshold) as f32;
        analysis.phase = self.tracker.phase();
        analysis.consecutive_below = self.tracker.consecutive_below();
        analysis.is_drowsy = self.tracker.is_drowsy();

        debug!(
            "Frame {}: ear={:?} count={} phase={:?}",
            analysis.sequence,
            analysis.combined_ear(),
            analysis.consecutive_below,
            analysis.phase
        );
        analysis
    }

    /// First face of the frame, `Err` for detector failures and incomplete faces
    fn detect_face(&mut self, frame: &VideoFrame) -> Result<Option<Face>, DmsError> {
        let faces = self.detector.detect(frame)?;
        if faces.len() > 1 {
            debug!("Frame {}: {} faces, monitoring the first", frame.sequence, faces.len());
        }
        match faces.into_iter().next() {
            Some(face) if !face.is_complete() => Err(DmsError::LandmarksMissing {
                expected: face.layout.point_count(),
                actual: face.landmarks.len(),
            }),
            other => Ok(other),
        }
    }

    fn measure(&mut self, face: &Face, analysis: &mut FrameAnalysis) -> Option<Observation> {
        let reading = match EarReading::from_face(face) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Frame {}: detection anomaly: {}", analysis.sequence, e);
                self.stats.detection_anomalies += 1;
                analysis.issue = Some(FrameIssue::DetectionAnomaly);
                return Some(Observation::NoFace);
            }
        };

        analysis.face_detected = true;
        analysis.ear = Some(reading);
        analysis.features = Some(FrameFeatures::from_face(face));
        if let (Ok(left), Ok(right)) = (face.eye(EyeSide::Left), face.eye(EyeSide::Right)) {
            analysis.eyes = Some((left, right));
        }

        match reading.combined {
            Some(ear) => Some(Observation::Ear(ear)),
            None => {
                warn!("Frame {} skipped: both eyes degenerate", analysis.sequence);
                analysis.issue = Some(FrameIssue::InvalidMetric);
                None
            }
        }
    }

    pub fn tracker(&self) -> &DrowsinessTracker {
        &self.tracker
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn stats(&self) -> DmsStats {
        self.stats
    }

    /// Recent combined EAR values, oldest first
    pub fn ear_history(&self) -> Vec<f32> {
        self.ear_history.snapshot()
    }
}
