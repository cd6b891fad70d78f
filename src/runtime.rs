//! Device-local command escape and the runtime context record every
//! status-bearing command needs.
//!
//! Runs ahead of the generic dispatcher: `start_recording`/`stop_recording`
//! touch the device's own recording state machine, which the dispatcher has
//! no business knowing about.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Mutex;

use crate::protocol::RuntimeContext;
use crate::recorder::Recorder;

/// Device-side recording state. The system this was ported from
/// distinguished a legacy `IDLE` from a newer `STT_IDLE`; this
/// reimplementation standardizes on one idle state, since nothing in the
/// device's own control flow ever depends on telling the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Recording,
    Paused,
}

impl DeviceState {
    fn as_str(self) -> &'static str {
        match self {
            DeviceState::Idle => "idle",
            DeviceState::Recording => "recording",
            DeviceState::Paused => "paused",
        }
    }
}

/// Owns the device's recording flag and builds the context record
/// (`app_state`, `uptime_s`, `disk_free_gb`, `ble_connected`) that `status`
/// and the BLE runtime context attach to every dispatch.
pub struct Runtime {
    started_at: Instant,
    recording: AtomicBool,
    paused: AtomicBool,
    disk_probe_dir: PathBuf,
    recorder: Mutex<Box<dyn Recorder>>,
}

impl Runtime {
    pub fn new(disk_probe_dir: impl Into<PathBuf>, recorder: Box<dyn Recorder>) -> Self {
        Self {
            started_at: Instant::now(),
            recording: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            disk_probe_dir: disk_probe_dir.into(),
            recorder: Mutex::new(recorder),
        }
    }

    pub fn device_state(&self) -> DeviceState {
        if !self.recording.load(Ordering::Relaxed) {
            DeviceState::Idle
        } else if self.paused.load(Ordering::Relaxed) {
            DeviceState::Paused
        } else {
            DeviceState::Recording
        }
    }

    /// Intercepts `start_recording`/`stop_recording` ahead of the generic
    /// dispatcher. Returns `Some(response)` if `name` was the device-local
    /// escape; `None` means the caller should fall through to the
    /// dispatcher, which is also what happens for every `CHUNK:` frame since
    /// those never resolve to one of these two names until reassembled.
    pub async fn handle_local_command(&self, name: &str) -> Option<String> {
        match name {
            "start_recording" => Some(self.start_recording().await),
            "stop_recording" => Some(self.stop_recording().await),
            _ => None,
        }
    }

    async fn start_recording(&self) -> String {
        if self.recording.load(Ordering::Relaxed) {
            return "ERR:start_recording:already recording".to_string();
        }
        let mut recorder = self.recorder.lock().await;
        if let Err(error) = recorder.start().await {
            return format!("ERR:start_recording:{error}");
        }
        drop(recorder);
        self.recording.store(true, Ordering::Relaxed);
        self.paused.store(false, Ordering::Relaxed);
        "ACK:start_recording".to_string()
    }

    async fn stop_recording(&self) -> String {
        if !self.recording.load(Ordering::Relaxed) {
            return "ERR:stop_recording:not recording".to_string();
        }
        self.recorder.lock().await.stop().await;
        self.recording.store(false, Ordering::Relaxed);
        self.paused.store(false, Ordering::Relaxed);
        "ACK:stop_recording".to_string()
    }

    /// Builds the context record passed into every status-bearing dispatch.
    pub fn build_context(&self, ble_connected: bool) -> RuntimeContext {
        RuntimeContext {
            app_state: self.device_state().as_str().to_string(),
            uptime_s: self.started_at.elapsed().as_secs_f64(),
            disk_free_gb: disk_free_gb(&self.disk_probe_dir).unwrap_or(0.0),
            ble_connected,
        }
    }
}

/// Shells out to `df` for a portable free-space estimate, matching the
/// external-tool-probe style already used for Wi-Fi status; avoids pulling
/// in a `statvfs` binding for one field.
fn disk_free_gb(path: &Path) -> Option<f64> {
    let probe_path = if path.exists() { path } else { Path::new("/") };
    let output = std::process::Command::new("df")
        .arg("-Pk")
        .arg(probe_path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let available_kb: u64 = text.lines().nth(1)?.split_whitespace().nth(3)?.parse().ok()?;
    Some(available_kb as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::recorder::FakeRecorder;

    fn test_runtime() -> Runtime {
        Runtime::new(".", Box::new(FakeRecorder::new()))
    }

    #[tokio::test]
    async fn start_then_stop_recording_acks_each_transition() {
        let runtime = test_runtime();
        assert_eq!(
            "ACK:start_recording",
            runtime.handle_local_command("start_recording").await.unwrap()
        );
        assert_eq!(DeviceState::Recording, runtime.device_state());
        assert_eq!(
            "ACK:stop_recording",
            runtime.handle_local_command("stop_recording").await.unwrap()
        );
        assert_eq!(DeviceState::Idle, runtime.device_state());
    }

    #[tokio::test]
    async fn starting_recording_twice_is_an_error() {
        let runtime = test_runtime();
        runtime.handle_local_command("start_recording").await;
        assert_eq!(
            "ERR:start_recording:already recording",
            runtime.handle_local_command("start_recording").await.unwrap()
        );
    }

    #[tokio::test]
    async fn stopping_without_recording_is_an_error() {
        let runtime = test_runtime();
        assert_eq!(
            "ERR:stop_recording:not recording",
            runtime.handle_local_command("stop_recording").await.unwrap()
        );
    }

    #[tokio::test]
    async fn unrelated_commands_fall_through_to_the_dispatcher() {
        let runtime = test_runtime();
        assert!(runtime.handle_local_command("note").await.is_none());
    }

    #[tokio::test]
    async fn spawn_failure_surfaces_as_a_non_fatal_err() {
        let runtime = Runtime::new(
            ".",
            Box::new(FakeRecorder {
                running: false,
                fail_to_start: true,
            }),
        );
        let response = runtime.handle_local_command("start_recording").await.unwrap();
        assert!(response.starts_with("ERR:start_recording:"));
        assert_eq!(DeviceState::Idle, runtime.device_state());
    }
}
