//! Drowsiness Monitor - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use camera_capture::ImageSequenceSource;
use dms::OnnxLandmarkDetector;
use metrics_exporter_prometheus::PrometheusBuilder;
use monitor::{init_logging, AlertObserver, MonitorConfig, OverlayWriter, Session, StopFlag};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = MonitorConfig::load(config_path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file; using defaults and environment"),
    }

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!("Metrics exporter listening on {}", addr);
    }

    let stop = StopFlag::new();
    let on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after the current frame");
            on_signal.request_stop();
        }
    });

    let summary = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let source = ImageSequenceSource::open(&config.capture)?;
        let detector = OnnxLandmarkDetector::new(&config.dms)?;

        let alerts = AlertObserver::new(config.alerts.clone());
        let overlay = match &config.overlay_dir {
            Some(dir) => match OverlayWriter::new(dir) {
                Ok(writer) => Some(writer),
                Err(e) => {
                    warn!("Overlay output disabled: {}", e);
                    None
                }
            },
            None => None,
        };

        let mut session = Session::new(config, source, detector)?;
        session.add_observer(Box::new(alerts));
        if let Some(overlay) = overlay {
            session.add_observer(Box::new(overlay));
        }

        Ok(session.run(stop)?)
    })
    .await
    .context("monitoring task panicked")??;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
