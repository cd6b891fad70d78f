use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use cortex_core::config::{Args, RECORDER_PROGRAM};
use cortex_core::recorder::ProcessRecorder;
use cortex_core::{BleTransport, Config, Dispatcher, HttpTransport, Runtime, Store};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = Arc::new(Config::resolve(&args));

    if let Err(error) = cortex_core::telemetry::initialise_tracing("cortex-core") {
        eprintln!("warning: tracing already initialised: {error}");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "fatal error during startup");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Arc<Config>) -> Result<(), cortex_core::CoreError> {
    for dir in [
        &config.recordings_dir,
        &config.notes_dir,
        &config.logs_dir,
        &config.uploads_dir,
    ] {
        tokio::fs::create_dir_all(dir).await?;
    }

    let store = Arc::new(Store::open(&config.db_path)?);
    let recorder = ProcessRecorder::new(RECORDER_PROGRAM, config.recorder_args());
    let runtime = Arc::new(Runtime::new(config.base_dir.clone(), Box::new(recorder)));
    let dispatcher = Arc::new(Dispatcher::new(store.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ble = config.ble_enabled.then(|| {
        BleTransport::spawn(
            (*config).clone(),
            dispatcher.clone(),
            runtime.clone(),
            shutdown_rx.clone(),
        )
    });
    let ble_connected = ble
        .as_ref()
        .map(BleTransport::connected_handle)
        .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));

    let http = if config.http_enabled {
        Some(HttpTransport::spawn(
            config.clone(),
            dispatcher.clone(),
            store.clone(),
            runtime.clone(),
            ble_connected,
            shutdown_rx.clone(),
        )?)
    } else {
        None
    };

    tracing::info!(
        http_enabled = config.http_enabled,
        ble_enabled = config.ble_enabled,
        "cortex-core started"
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(cortex_core::CoreError::Io)?;
    tracing::info!("shutdown signal received");

    let _ = shutdown_tx.send(true);

    if let Some(ble) = ble {
        ble.join().await;
    }
    if let Some(http) = http {
        http.join().await;
    }

    Ok(())
}
