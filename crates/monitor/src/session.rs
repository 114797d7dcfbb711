//! Monitoring session: the frame orchestrator
//!
//! One loop owns all mutable session state. Each iteration pulls a frame,
//! analyzes it, buffers its features and notifies observers; termination is
//! checked between frames only.

use std::path::PathBuf;

use camera_capture::FrameSource;
use dms::{DmsModule, FrameFeatures, LandmarkDetector};
use serde::{Deserialize, Serialize};
use storage::SnapshotStore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::control::{Command, ControlInput};
use crate::observer::{FrameReport, SessionObserver};
use crate::recorder::DatasetRecorder;
use crate::settings::{DatasetMode, MonitorConfig};
use crate::SessionError;

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The frame source ran out of frames
    EndOfStream,
    /// A stop command was received
    Stopped,
    /// `max_frames` reached
    FrameLimit,
    /// The frame source failed; fatal for the session
    AcquisitionFailed(String),
    /// A window contract violation aborted the loop
    Error(String),
}

/// Session totals, produced once on every exit path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub frames_processed: u64,
    pub alert_edges: u64,
    pub snapshots_saved: u32,
    pub snapshot_failures: u64,
    pub faces_missing: u64,
    pub detection_anomalies: u64,
    pub frames_skipped: u64,
    pub end_reason: EndReason,
}

/// Result of one `step`
#[derive(Debug)]
pub enum StepOutcome {
    Processed(dms::FrameAnalysis),
    Finished(EndReason),
}

/// A monitoring session with injected frame source and detector.
///
/// Dropping an unfinished session finishes it: the source is closed and
/// observers receive `on_session_end`.
pub struct Session<S: FrameSource, D: LandmarkDetector> {
    id: String,
    config: MonitorConfig,
    source: S,
    dms: DmsModule<D>,
    recorder: Option<DatasetRecorder>,
    observers: Vec<Box<dyn SessionObserver>>,
    frames_processed: u64,
    alert_edges: u64,
    snapshot_failures: u64,
    ended: Option<EndReason>,
    summary: Option<SessionSummary>,
}

impl<S: FrameSource, D: LandmarkDetector> Session<S, D> {
    pub fn new(config: MonitorConfig, source: S, detector: D) -> Result<Self, SessionError> {
        config.validate()?;

        let id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let feature_width = detector.layout().feature_width();
        let dms = DmsModule::new(config.dms.clone(), detector)?;

        let recorder = match config.dataset.mode {
            DatasetMode::Off => None,
            mode => {
                let store = SnapshotStore::new(&config.dataset.output_dir, id.as_str())?;
                DatasetRecorder::new(mode, config.dms.window_size, feature_width, store)?
            }
        };

        info!(
            "Session {} ready: ear_threshold={}, consec_frames={}, window_size={}",
            id, config.dms.ear_threshold, config.dms.consec_frames, config.dms.window_size
        );

        Ok(Self {
            id,
            config,
            source,
            dms,
            recorder,
            observers: Vec::new(),
            frames_processed: 0,
            alert_edges: 0,
            snapshot_failures: 0,
            ended: None,
            summary: None,
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn dms(&self) -> &DmsModule<D> {
        &self.dms
    }

    /// Dataset collection progress, when capture is enabled
    pub fn collection_progress(&self) -> Option<(usize, usize)> {
        self.recorder.as_ref().map(DatasetRecorder::progress)
    }

    /// Process exactly one frame
    pub fn step(&mut self) -> Result<StepOutcome, SessionError> {
        if let Some(reason) = &self.ended {
            return Ok(StepOutcome::Finished(reason.clone()));
        }

        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Session {}: end of stream", self.id);
                return Ok(self.end(EndReason::EndOfStream));
            }
            Err(e) => {
                error!("Session {}: frame acquisition failed: {}", self.id, e);
                return Ok(self.end(EndReason::AcquisitionFailed(e.to_string())));
            }
        };

        let mut analysis = self.dms.analyze(&frame);
        self.frames_processed += 1;
        self.record_metrics(&analysis);

        if let Some(edge) = analysis.edge {
            self.alert_edges += 1;
            metrics::counter!("dms_alert_edges_total").increment(1);
            if edge.is_entering() {
                info!("Frame {}: driver drowsy", analysis.sequence);
            } else {
                info!("Frame {}: driver recovered", analysis.sequence);
            }
            for observer in &mut self.observers {
                observer.on_alert_edge(edge.is_entering(), &analysis);
            }
        }

        let features = analysis.take_features();
        let completed = match self.recorder.as_mut() {
            Some(recorder) => recorder.record(features)?,
            None => None,
        };
        if let Some(window) = completed {
            self.complete_window(window);
        }

        let report = FrameReport {
            frame: &frame,
            analysis: &analysis,
            collected: self.collection_progress(),
        };
        for observer in &mut self.observers {
            observer.on_frame(&report);
        }

        Ok(StepOutcome::Processed(analysis))
    }

    /// Persist the current window if it is full (on-request mode)
    pub fn request_snapshot(&mut self) {
        let window = self.recorder.as_mut().and_then(DatasetRecorder::request_snapshot);
        match window {
            Some(window) => self.complete_window(window),
            None if self.recorder.is_none() => warn!("Snapshot requested but dataset capture is off"),
            None => {}
        }
    }

    /// Run until end of stream, acquisition failure, frame limit or a stop
    /// command. The source is closed and observers are notified on every
    /// exit path.
    pub fn run<C: ControlInput>(&mut self, mut control: C) -> Result<SessionSummary, SessionError> {
        info!("Session {} started", self.id);

        let reason = loop {
            if let Some(limit) = self.config.max_frames {
                if self.frames_processed >= limit {
                    info!("Session {}: frame limit {} reached", self.id, limit);
                    break EndReason::FrameLimit;
                }
            }

            match self.step() {
                Ok(StepOutcome::Processed(_)) => {}
                Ok(StepOutcome::Finished(reason)) => break reason,
                Err(e) => {
                    self.finish(EndReason::Error(e.to_string()));
                    return Err(e);
                }
            }

            match control.poll() {
                Command::Continue => {}
                Command::SaveSnapshot => self.request_snapshot(),
                Command::Stop => {
                    info!("Session {}: stop requested", self.id);
                    break EndReason::Stopped;
                }
            }
        };

        Ok(self.finish(reason))
    }

    /// Release the source and notify observers. Only the first call has an
    /// effect; later calls return the same summary.
    pub fn finish(&mut self, reason: EndReason) -> SessionSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        self.source.close();
        self.ended.get_or_insert(reason.clone());

        let stats = self.dms.stats();
        let summary = SessionSummary {
            session_id: self.id.clone(),
            frames_processed: self.frames_processed,
            alert_edges: self.alert_edges,
            snapshots_saved: self.recorder.as_ref().map_or(0, DatasetRecorder::snapshots_saved),
            snapshot_failures: self.snapshot_failures,
            faces_missing: stats.faces_missing,
            detection_anomalies: stats.detection_anomalies,
            frames_skipped: stats.frames_skipped,
            end_reason: reason,
        };

        for observer in &mut self.observers {
            observer.on_session_end(&summary);
        }
        info!(
            "Session {} ended ({:?}): {} frames, {} alert edges, {} snapshots",
            summary.session_id,
            summary.end_reason,
            summary.frames_processed,
            summary.alert_edges,
            summary.snapshots_saved
        );

        self.summary = Some(summary.clone());
        summary
    }

    fn end(&mut self, reason: EndReason) -> StepOutcome {
        self.ended = Some(reason.clone());
        StepOutcome::Finished(reason)
    }

    fn complete_window(&mut self, window: Vec<FrameFeatures>) {
        let saved: Option<PathBuf> = match self.recorder.as_mut().map(|r| r.persist(&window)) {
            Some(Ok(path)) => {
                metrics::counter!("dms_snapshots_saved_total").increment(1);
                Some(path)
            }
            Some(Err(e)) => {
                error!("Session {}: failed to save snapshot: {}", self.id, e);
                self.snapshot_failures += 1;
                None
            }
            None => None,
        };

        for observer in &mut self.observers {
            observer.on_window_full(&window, saved.as_deref());
        }
    }

    fn record_metrics(&self, analysis: &dms::FrameAnalysis) {
        metrics::counter!("dms_frames_total").increment(1);
        if !analysis.face_detected {
            metrics::counter!("dms_faces_missing_total").increment(1);
        }
        if !analysis.counted() {
            metrics::counter!("dms_frames_skipped_total").increment(1);
        }
        if let Some(ear) = analysis.combined_ear() {
            metrics::gauge!("dms_ear").set(f64::from(ear));
        }
        metrics::gauge!("dms_consecutive_below").set(f64::from(analysis.consecutive_below));
        debug!("Session {}: {} frames processed", self.id, self.frames_processed);
    }
}

impl<S: FrameSource, D: LandmarkDetector> Drop for Session<S, D> {
    fn drop(&mut self) {
        if self.summary.is_none() {
            let reason = self.ended.clone().unwrap_or(EndReason::Stopped);
            debug!("Session {} dropped before finishing", self.id);
            self.finish(reason);
        }
    }
}
