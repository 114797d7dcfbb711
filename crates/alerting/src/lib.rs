//! Alerting System
//!
//! Turns drowsiness edges into episodes and rate-limited notifications.

mod manager;

pub use manager::{AlertConfig, AlertManager, AlertNotice, AlertSeverity, DrowsyEpisode};
