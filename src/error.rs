use thiserror::Error;

/// Errors returned by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database operation failed")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to obtain a pooled connection")]
    Pool(#[from] r2d2::Error),
}

/// Errors returned while handling a single dispatcher command.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("invalid or missing table")]
    InvalidTable,
    #[error("no active session")]
    NoActiveSession,
    #[error("session not found or already ended")]
    SessionNotFound,
    #[error("file not found")]
    FileNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Wifi(#[from] WifiError),
}

/// Errors returned by the external recorder process supervisor.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to spawn recorder process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("recorder process is already running")]
    AlreadyRunning,
}

/// Errors encountered while shelling out to WiFi management tools.
#[derive(Debug, Error)]
pub enum WifiError {
    #[error("required tool not found on this system")]
    ToolNotFound,
    #[error("{0}")]
    ToolFailed(String),
    #[error("I/O error while running external tool")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the BLE and HTTP transports.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("BLE operation failed")]
    Ble(#[from] btleplug::Error),
    #[error("no BLE adapters were found")]
    NoAdapters,
    #[error("no device matching the configured name was found")]
    NoMatchingDevice,
    #[error("required BLE characteristics are missing on the connected device")]
    MissingCharacteristics,
    #[error("HTTP server failed")]
    Http(#[source] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level errors that abort the daemon at startup.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
