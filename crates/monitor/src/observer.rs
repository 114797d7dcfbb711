//! Session observers: the output side of the orchestrator

use std::path::Path;

use alerting::{AlertConfig, AlertManager, AlertNotice, AlertSeverity};
use camera_capture::VideoFrame;
use dms::{FrameAnalysis, FrameFeatures};
use tracing::{info, warn};

use crate::session::SessionSummary;

/// Everything known about one processed frame
pub struct FrameReport<'a> {
    pub frame: &'a VideoFrame,
    pub analysis: &'a FrameAnalysis,
    /// Dataset collection progress (buffered, window size)
    pub collected: Option<(usize, usize)>,
}

/// Receives session events. All methods default to no-ops.
pub trait SessionObserver {
    fn on_frame(&mut self, _report: &FrameReport<'_>) {}

    /// Fired once per drowsiness transition, never per frame
    fn on_alert_edge(&mut self, _entering: bool, _analysis: &FrameAnalysis) {}

    /// A completed dataset window; `saved` is its file when persisting succeeded
    fn on_window_full(&mut self, _window: &[FrameFeatures], _saved: Option<&Path>) {}

    fn on_session_end(&mut self, _summary: &SessionSummary) {}
}

/// Turns alert edges into throttled, escalating driver notifications
pub struct AlertObserver {
    manager: AlertManager,
    notices: Vec<AlertNotice>,
}

impl AlertObserver {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            manager: AlertManager::new(config),
            notices: Vec::new(),
        }
    }

    pub fn manager(&self) -> &AlertManager {
        &self.manager
    }

    /// Notices issued so far
    pub fn notices(&self) -> &[AlertNotice] {
        &self.notices
    }
}

impl SessionObserver for AlertObserver {
    fn on_alert_edge(&mut self, entering: bool, analysis: &FrameAnalysis) {
        if let Some(notice) = self.manager.record_edge(entering, analysis.timestamp_ms) {
            match notice.severity {
                AlertSeverity::Critical => warn!(
                    frame = analysis.sequence,
                    episodes = notice.recent_episodes,
                    "DROWSINESS ALERT (critical)"
                ),
                AlertSeverity::Warning => warn!(
                    frame = analysis.sequence,
                    ear = ?analysis.combined_ear(),
                    "DROWSINESS ALERT"
                ),
            }
            self.notices.push(notice);
        }
    }

    fn on_session_end(&mut self, _summary: &SessionSummary) {
        info!(
            "Alert history: {} episodes, {} notifications",
            self.manager.episode_count(),
            self.manager.notified_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms::AlertEdge;

    fn analysis(timestamp_ms: u64, edge: AlertEdge) -> FrameAnalysis {
        FrameAnalysis {
            timestamp_ms,
            edge: Some(edge),
            ..Default::default()
        }
    }

    #[test]
    fn test_alert_observer_tracks_episodes() {
        let mut observer = AlertObserver::new(AlertConfig {
            cooldown_ms: 0,
            ..Default::default()
        });

        observer.on_alert_edge(true, &analysis(1_000, AlertEdge::Entered));
        observer.on_alert_edge(false, &analysis(3_000, AlertEdge::Recovered));

        assert_eq!(observer.notices().len(), 1);
        assert_eq!(observer.notices()[0].severity, AlertSeverity::Warning);
        assert_eq!(observer.manager().episode_count(), 1);
        assert!(observer.manager().active_episode().is_none());
    }
}
