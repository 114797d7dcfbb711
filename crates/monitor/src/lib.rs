//! Drowsiness Monitor
//!
//! Drives a monitoring session frame by frame: acquire a frame, analyze it,
//! buffer its landmark features, and notify observers of alert edges and
//! completed windows.

pub mod control;
pub mod observer;
pub mod overlay;
pub mod recorder;
pub mod session;
pub mod settings;

pub use control::{Command, ControlInput, StopFlag};
pub use observer::{AlertObserver, FrameReport, SessionObserver};
pub use overlay::OverlayWriter;
pub use recorder::DatasetRecorder;
pub use session::{EndReason, Session, SessionSummary, StepOutcome};
pub use settings::{DatasetConfig, DatasetMode, LoggingConfig, MonitorConfig};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Session-level errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error(transparent)]
    Dms(#[from] dms::DmsError),

    #[error(transparent)]
    Storage(#[from] storage::StorageError),

    #[error("Temporal window contract violated: {0}")]
    Window(#[from] ring_buffer::WindowError),
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), SessionError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| SessionError::Config(format!("unknown log level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    result.map_err(|e| SessionError::Config(format!("failed to set tracing subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_rejects_unknown_level() {
        let config = LoggingConfig {
            level: "chatty".to_string(),
            json: false,
        };
        assert!(matches!(init_logging(&config), Err(SessionError::Config(_))));
    }
}
