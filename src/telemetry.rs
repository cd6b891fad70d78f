use std::io::{self, IsTerminal};
use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::TelemetryError;

static TRACING_INITIALISED: OnceLock<Result<(), TelemetryError>> = OnceLock::new();

/// Initialises structured logging for the daemon.
pub fn initialise_tracing(service_name: &str) -> Result<(), &'static TelemetryError> {
    TRACING_INITIALISED
        .get_or_init(|| initialise_tracing_once(service_name))
        .as_ref()
        .copied()
}

fn initialise_tracing_once(service_name: &str) -> Result<(), TelemetryError> {
    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let is_interactive = io::stderr().is_terminal();

    if is_interactive {
        tracing_subscriber::registry()
            .with(fmt::layer().pretty().with_target(false).with_filter(log_filter))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(false).with_filter(log_filter))
            .try_init()?;
    }

    tracing::info!(service = service_name, "tracing initialised");
    Ok(())
}
