//! Alert Manager Implementation

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between two notifications (ms)
    pub cooldown_ms: u64,
    /// Window in which repeated episodes escalate severity (ms)
    pub escalation_window_ms: u64,
    /// Episodes within the escalation window that make a notice critical
    pub escalate_after: usize,
    /// Episodes kept in history
    pub max_history: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 10_000,
            escalation_window_ms: 10 * 60 * 1000,
            escalate_after: 3,
            max_history: 1000,
        }
    }
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// One continuous drowsy period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrowsyEpisode {
    pub started_ms: u64,
    pub ended_ms: Option<u64>,
    /// Whether this episode produced a notification
    pub notified: bool,
}

impl DrowsyEpisode {
    /// Duration, once the episode has ended
    pub fn duration_ms(&self) -> Option<u64> {
        self.ended_ms.map(|end| end.saturating_sub(self.started_ms))
    }
}

/// Notification to deliver to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertNotice {
    pub severity: AlertSeverity,
    pub timestamp_ms: u64,
    /// Episodes started within the escalation window, this one included
    pub recent_episodes: usize,
}

/// Alert manager for episode tracking and notification throttling
pub struct AlertManager {
    config: AlertConfig,
    episodes: VecDeque<DrowsyEpisode>,
    last_notified_ms: Option<u64>,
    notified: usize,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            episodes: VecDeque::new(),
            last_notified_ms: None,
            notified: 0,
        }
    }

    /// Record a drowsiness edge. Returns a notice when the driver should be
    /// alerted now.
    pub fn record_edge(&mut self, entering: bool, timestamp_ms: u64) -> Option<AlertNotice> {
        if entering {
            self.open_episode(timestamp_ms)
        } else {
            self.close_episode(timestamp_ms);
            None
        }
    }

    fn open_episode(&mut self, timestamp_ms: u64) -> Option<AlertNotice> {
        if self.active_episode().is_some() {
            debug!("Drowsy edge while an episode is open; ignored");
            return None;
        }

        while self.episodes.len() >= self.config.max_history.max(1) {
            self.episodes.pop_front();
        }
        self.episodes.push_back(DrowsyEpisode {
            started_ms: timestamp_ms,
            ended_ms: None,
            notified: false,
        });

        if let Some(last) = self.last_notified_ms {
            if timestamp_ms.saturating_sub(last) < self.config.cooldown_ms {
                debug!("Alert suppressed: in cooldown period");
                return None;
            }
        }

        let recent_episodes = self.recent_episodes(timestamp_ms);
        let severity = if recent_episodes >= self.config.escalate_after {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };

        if let Some(episode) = self.episodes.back_mut() {
            episode.notified = true;
        }
        self.last_notified_ms = Some(timestamp_ms);
        self.notified += 1;

        match severity {
            AlertSeverity::Critical => warn!(
                "CRITICAL drowsiness alert ({} episodes in window)",
                recent_episodes
            ),
            AlertSeverity::Warning => info!("Drowsiness alert"),
        }

        Some(AlertNotice {
            severity,
            timestamp_ms,
            recent_episodes,
        })
    }

    fn close_episode(&mut self, timestamp_ms: u64) {
        match self.episodes.back_mut() {
            Some(episode) if episode.ended_ms.is_none() => {
                episode.ended_ms = Some(timestamp_ms);
                info!(
                    "Drowsy episode ended after {}ms",
                    timestamp_ms.saturating_sub(episode.started_ms)
                );
            }
            _ => debug!("Recovery edge without an open episode"),
        }
    }

    fn recent_episodes(&self, now_ms: u64) -> usize {
        let cutoff = now_ms.saturating_sub(self.config.escalation_window_ms);
        self.episodes
            .iter()
            .filter(|e| e.started_ms >= cutoff)
            .count()
    }

    /// The open episode, if the driver is currently drowsy
    pub fn active_episode(&self) -> Option<&DrowsyEpisode> {
        self.episodes.back().filter(|e| e.ended_ms.is_none())
    }

    /// Episode history, oldest first
    pub fn episodes(&self) -> impl Iterator<Item = &DrowsyEpisode> {
        self.episodes.iter()
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// Notifications issued so far
    pub fn notified_count(&self) -> usize {
        self.notified
    }

    /// Clear all alert state
    pub fn clear(&mut self) {
        self.episodes.clear();
        self.last_notified_ms = None;
        self.notified = 0;
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(cooldown_ms: u64) -> AlertManager {
        AlertManager::new(AlertConfig {
            cooldown_ms,
            escalation_window_ms: 60_000,
            escalate_after: 3,
            max_history: 10,
        })
    }

    #[test]
    fn test_episode_lifecycle() {
        let mut m = manager(0);

        let notice = m.record_edge(true, 1_000).unwrap();
        assert_eq!(notice.severity, AlertSeverity::Warning);
        assert!(m.active_episode().is_some());

        assert!(m.record_edge(false, 4_500).is_none());
        assert!(m.active_episode().is_none());

        let episode = m.episodes().next().unwrap();
        assert_eq!(episode.duration_ms(), Some(3_500));
        assert!(episode.notified);
    }

    #[test]
    fn test_duplicate_entry_edge_ignored() {
        let mut m = manager(0);
        assert!(m.record_edge(true, 0).is_some());
        assert!(m.record_edge(true, 100).is_none());
        assert_eq!(m.episode_count(), 1);
    }

    #[test]
    fn test_cooldown_suppresses_notice() {
        let mut m = manager(10_000);

        assert!(m.record_edge(true, 0).is_some());
        m.record_edge(false, 1_000);

        // still recorded, but no notice
        assert!(m.record_edge(true, 5_000).is_none());
        assert_eq!(m.episode_count(), 2);
        m.record_edge(false, 6_000);

        assert!(m.record_edge(true, 12_000).is_some());
        assert_eq!(m.notified_count(), 2);
    }

    #[test]
    fn test_escalation() {
        let mut m = manager(0);
        for i in 0..2u64 {
            let notice = m.record_edge(true, i * 10_000).unwrap();
            assert_eq!(notice.severity, AlertSeverity::Warning);
            m.record_edge(false, i * 10_000 + 2_000);
        }

        let notice = m.record_edge(true, 25_000).unwrap();
        assert_eq!(notice.severity, AlertSeverity::Critical);
        assert_eq!(notice.recent_episodes, 3);
    }

    #[test]
    fn test_escalation_window_expires() {
        let mut m = manager(0);
        for t in [0u64, 5_000] {
            m.record_edge(true, t);
            m.record_edge(false, t + 1_000);
        }
        // first two episodes fall out of the 60s window
        let notice = m.record_edge(true, 120_000).unwrap();
        assert_eq!(notice.severity, AlertSeverity::Warning);
        assert_eq!(notice.recent_episodes, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut m = manager(0);
        for i in 0..25u64 {
            m.record_edge(true, i * 100);
            m.record_edge(false, i * 100 + 50);
        }
        assert_eq!(m.episode_count(), 10);
        assert_eq!(m.episodes().next().unwrap().started_ms, 1_500);
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&AlertSeverity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn test_clear() {
        let mut m = manager(0);
        m.record_edge(true, 0);
        m.clear();
        assert_eq!(m.episode_count(), 0);
        assert_eq!(m.notified_count(), 0);
        assert!(m.active_episode().is_none());
    }
}
