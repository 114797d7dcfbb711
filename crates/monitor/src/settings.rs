//! Monitor configuration
//!
//! Loaded from an optional config file (TOML, YAML, JSON, ...) overlaid with
//! `DMS_`-prefixed environment variables, e.g. `DMS_DMS__CONSEC_FRAMES=30`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use alerting::AlertConfig;
use camera_capture::CaptureConfig;
use config::{Config, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// How landmark windows are captured for the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetMode {
    /// No dataset capture
    #[default]
    Off,
    /// Collect exactly `window_size` frames, save, start over
    Batch,
    /// Keep the last `window_size` frames; save when requested and full
    OnRequest,
}

/// Dataset capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub mode: DatasetMode,
    /// Directory for snapshot files
    pub output_dir: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            mode: DatasetMode::Off,
            output_dir: PathBuf::from("dataset"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub dms: DmsConfig,
    pub dataset: DatasetConfig,
    pub capture: CaptureConfig,
    pub alerts: AlertConfig,
    pub logging: LoggingConfig,
    /// Write annotated frames here when set
    pub overlay_dir: Option<PathBuf>,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Prometheus exporter listen address
    pub metrics_addr: Option<SocketAddr>,
}

impl MonitorConfig {
    /// Load from an optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, SessionError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("DMS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: MonitorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-section constraints
    pub fn validate(&self) -> Result<(), SessionError> {
        self.dms.validate()?;
        if self.capture.fps == 0 {
            return Err(SessionError::Config("capture.fps must be positive".into()));
        }
        if self.max_frames == Some(0) {
            return Err(SessionError::Config("max_frames must be positive when set".into()));
        }
        Ok(())
    }
}
