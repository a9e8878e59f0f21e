use anyhow::Result;
use palmlink_core::{CommandTable, Dispatcher, GestureRecognizer};
use palmlink_hw::{Camera, SerialPort};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod transport;

use config::Config;
use transport::SerialTransport;

/// Frames in flight between the capture thread and the dispatcher.
const OBSERVATION_QUEUE: usize = 4;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("palmlinkd starting");
    let config = Config::from_env();

    // Camera and model are required: fail fast.
    let camera = match Camera::open(&config.camera_device) {
        Ok(camera) => camera,
        Err(err) => {
            for dev in Camera::list_devices() {
                tracing::info!(path = %dev.path, name = %dev.name, driver = %dev.driver, "available camera");
            }
            return Err(err.into());
        }
    };
    let recognizer = GestureRecognizer::load(&config.model_path, config.min_confidence)?;

    // The serial link is not: without it commands are logged and dropped.
    let port = match SerialPort::open(&config.serial_port, &config.serial_config()) {
        Ok(port) => Some(port),
        Err(err) => {
            tracing::warn!(
                path = %config.serial_port,
                error = %err,
                "serial port unavailable; commands will be dropped"
            );
            None
        }
    };

    let dispatcher = Dispatcher::new(CommandTable::standard(), SerialTransport::new(port));
    let (tx, rx) = mpsc::channel(OBSERVATION_QUEUE);
    let capture = engine::spawn_capture(camera, recognizer, config.warmup_frames, tx);

    tracing::info!("palmlinkd ready");

    tokio::select! {
        _ = dispatcher.run(rx) => tracing::info!("capture ended"),
        result = shutdown_signal() => match result {
            Ok(()) => tracing::info!("palmlinkd shutting down"),
            Err(err) => tracing::error!(error = %err, "signal handling failed; shutting down"),
        },
    }

    // Cancel, don't fire: the link is about to close.
    dispatcher.shutdown().await;
    tokio::task::spawn_blocking(move || capture.stop()).await?;
    drop(dispatcher);

    tracing::info!("palmlinkd stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}
