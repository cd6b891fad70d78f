//! Runtime configuration: built-in defaults overridden by environment
//! variables, then by CLI flags (highest precedence last).

use std::path::{Path, PathBuf};

use clap::Parser;

/// BLE GATT service exposed by the companion keyboard-bridge MCU.
pub const BLE_SERVICE_UUID: &str = "a0e1b2c3-d4e5-f6a7-b8c9-0a1b2c3d4e50";
/// Notify characteristic: MCU -> host.
pub const BLE_TX_UUID: &str = "a0e1b2c3-d4e5-f6a7-b8c9-0a1b2c3d4e51";
/// Write characteristic: host -> MCU.
pub const BLE_RX_UUID: &str = "a0e1b2c3-d4e5-f6a7-b8c9-0a1b2c3d4e52";

pub const BLE_RECONNECT_INTERVAL_S: u64 = 5;
pub const BLE_CONNECT_TIMEOUT_S: u64 = 10;
pub const BLE_MAX_MESSAGE_LEN: usize = 512;
pub const BLE_POLL_INTERVAL_MS: u64 = 100;
pub const CHUNK_TIMEOUT_S: f64 = 30.0;
pub const CHUNK_MAX_SIZE: usize = 480;

pub const DEFAULT_HTTP_PORT: u16 = 8420;
pub const MAX_CMD_BODY_BYTES: u64 = 1024 * 1024;
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
pub const STREAM_CHUNK_BYTES: usize = 65536;

/// External PCM recorder invocation, mirroring `config.py`'s
/// `AUDIO_DEVICE`/`SAMPLE_RATE`/`CHANNELS`/`SAMPLE_FORMAT`/`SEGMENT_SECONDS`.
pub const RECORDER_PROGRAM: &str = "arecord";
pub const RECORDER_SAMPLE_RATE: u32 = 16_000;
pub const RECORDER_CHANNELS: u32 = 1;
pub const RECORDER_SAMPLE_FORMAT: &str = "S16_LE";
pub const RECORDER_SEGMENT_SECONDS: u32 = 900;

/// Command-line flags for the `cortex-core` daemon.
#[derive(Debug, Parser)]
#[command(name = "cortex-core", about = "Wearable second-brain recorder core")]
pub struct Args {
    /// Base directory under which recordings/, notes/, logs/, uploads/,
    /// cortex.db, and cortex-http.secret live.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Path to the SQLite database file (overrides `--base-dir`-derived path).
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// TCP port for the HTTP API server.
    #[arg(long)]
    pub http_port: Option<u16>,

    /// Substring to match against the BLE peripheral's advertised name.
    #[arg(long)]
    pub ble_device_name: Option<String>,

    /// Disable the HTTP transport entirely.
    #[arg(long)]
    pub no_http: bool,

    /// Disable the BLE transport entirely.
    #[arg(long)]
    pub no_ble: bool,
}

/// Resolved configuration the daemon runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub db_path: PathBuf,
    pub recordings_dir: PathBuf,
    pub notes_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub http_token_path: PathBuf,
    pub http_port: u16,
    pub http_enabled: bool,
    pub ble_device_name: String,
    pub ble_enabled: bool,
}

impl Config {
    /// Builds configuration from defaults, environment overrides, then CLI
    /// flags, in that ascending precedence order.
    pub fn resolve(args: &Args) -> Self {
        let base_dir = args
            .base_dir
            .clone()
            .or_else(|| std::env::var_os("CORTEX_BASE_DIR").map(PathBuf::from))
            .unwrap_or_else(default_base_dir);

        let db_path = args
            .db_path
            .clone()
            .or_else(|| std::env::var_os("CORTEX_DB_PATH").map(PathBuf::from))
            .unwrap_or_else(|| base_dir.join("cortex.db"));

        let http_port = args
            .http_port
            .or_else(|| {
                std::env::var("CORTEX_HTTP_PORT")
                    .ok()
                    .and_then(|value| value.parse().ok())
            })
            .unwrap_or(DEFAULT_HTTP_PORT);

        let ble_device_name = args
            .ble_device_name
            .clone()
            .or_else(|| std::env::var("CORTEX_BLE_DEVICE_NAME").ok())
            .unwrap_or_else(|| "KeyMaster".to_string());

        Self {
            db_path,
            recordings_dir: base_dir.join("recordings"),
            notes_dir: base_dir.join("notes"),
            logs_dir: base_dir.join("logs"),
            uploads_dir: base_dir.join("uploads"),
            http_token_path: base_dir.join("cortex-http.secret"),
            http_port,
            http_enabled: !args.no_http,
            ble_device_name,
            ble_enabled: !args.no_ble,
            base_dir,
        }
    }

    /// Maps a file category name to its directory, mirroring the HTTP
    /// server's static category table.
    pub fn category_dir(&self, category: &str) -> Option<&Path> {
        match category {
            "recordings" => Some(&self.recordings_dir),
            "notes" => Some(&self.notes_dir),
            "logs" => Some(&self.logs_dir),
            "uploads" => Some(&self.uploads_dir),
            _ => None,
        }
    }

    /// Builds the `arecord` invocation the recorder supervisor spawns,
    /// rotating segments into `recordings_dir` by timestamp.
    pub fn recorder_args(&self) -> Vec<String> {
        let pattern = self.recordings_dir.join("%Y%m%d_%H%M%S.wav");
        vec![
            "-D".to_string(),
            "default".to_string(),
            "-f".to_string(),
            RECORDER_SAMPLE_FORMAT.to_string(),
            "-r".to_string(),
            RECORDER_SAMPLE_RATE.to_string(),
            "-c".to_string(),
            RECORDER_CHANNELS.to_string(),
            "-t".to_string(),
            "wav".to_string(),
            "--max-file-time".to_string(),
            RECORDER_SEGMENT_SECONDS.to_string(),
            "--use-strftime".to_string(),
            pattern.to_string_lossy().into_owned(),
        ]
    }
}

fn default_base_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join("cortex-core"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args_with_base(base: &str) -> Args {
        Args {
            base_dir: Some(PathBuf::from(base)),
            db_path: None,
            http_port: None,
            ble_device_name: None,
            no_http: false,
            no_ble: false,
        }
    }

    #[test]
    fn derives_db_path_and_subdirectories_from_base_dir() {
        let config = Config::resolve(&args_with_base("/tmp/cortex-test"));
        assert_eq!(PathBuf::from("/tmp/cortex-test/cortex.db"), config.db_path);
        assert_eq!(
            PathBuf::from("/tmp/cortex-test/recordings"),
            config.recordings_dir
        );
        assert_eq!(DEFAULT_HTTP_PORT, config.http_port);
        assert_eq!("KeyMaster", config.ble_device_name);
    }

    #[test]
    fn explicit_db_path_overrides_base_dir_derivation() {
        let mut args = args_with_base("/tmp/cortex-test");
        args.db_path = Some(PathBuf::from("/tmp/other.db"));
        let config = Config::resolve(&args);
        assert_eq!(PathBuf::from("/tmp/other.db"), config.db_path);
    }

    #[test]
    fn category_dir_rejects_unknown_category() {
        let config = Config::resolve(&args_with_base("/tmp/cortex-test"));
        assert!(config.category_dir("recordings").is_some());
        assert!(config.category_dir("nope").is_none());
    }

    #[test]
    fn recorder_args_point_at_the_recordings_directory() {
        let config = Config::resolve(&args_with_base("/tmp/cortex-test"));
        let args = config.recorder_args();
        assert!(args.iter().any(|arg| arg.contains("cortex-test/recordings")));
        assert!(args.iter().any(|arg| arg == "16000"));
    }
}
