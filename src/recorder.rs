//! Supervisor for the external PCM recorder process.
//!
//! Audio capture itself is an out-of-scope collaborator (spec contract: the
//! core only spawns it and observes newly-appeared segment files); what
//! lives here is the non-blocking liveness check and spawn/stop lifecycle
//! `Runtime` needs to answer `start_recording`/`stop_recording` without the
//! dispatcher or either transport ever touching a `Child` directly.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::error::RecorderError;

/// A liveness-checked external process handle, abstracted so tests
/// substitute a fake instead of spawning a real recorder binary.
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn start(&mut self) -> Result<(), RecorderError>;
    async fn stop(&mut self);
    async fn is_alive(&mut self) -> bool;
}

/// Spawns the external PCM recorder with automatic segment splitting,
/// grounded in `original_source/src/recorder.py`'s
/// `start`/`stop`/`is_alive` (there `arecord` with `--use-strftime` segment
/// rotation; the program and argv are caller-supplied here so the core
/// never hard-codes a sample rate or device name).
pub struct ProcessRecorder {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl ProcessRecorder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: None,
        }
    }
}

#[async_trait]
impl Recorder for ProcessRecorder {
    async fn start(&mut self) -> Result<(), RecorderError> {
        if self.is_alive().await {
            return Err(RecorderError::AlreadyRunning);
        }
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(RecorderError::Spawn)?;
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        // The original sends SIGINT so arecord can close the WAV header
        // cleanly; without a signal-sending dependency in this crate's
        // stack, a kill-and-reap is the accepted simplification here (see
        // DESIGN.md).
        let _ = child.kill().await;
        let _ = child.wait().await;
    }

    async fn is_alive(&mut self) -> bool {
        match &mut self.child {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[cfg(test)]
pub struct FakeRecorder {
    pub running: bool,
    pub fail_to_start: bool,
}

#[cfg(test)]
impl FakeRecorder {
    pub fn new() -> Self {
        Self {
            running: false,
            fail_to_start: false,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Recorder for FakeRecorder {
    async fn start(&mut self) -> Result<(), RecorderError> {
        if self.fail_to_start {
            return Err(RecorderError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "fake recorder binary missing",
            )));
        }
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) {
        self.running = false;
    }

    async fn is_alive(&mut self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_recorder_reports_alive_after_start() {
        let mut recorder = FakeRecorder::new();
        assert!(!recorder.is_alive().await);
        recorder.start().await.unwrap();
        assert!(recorder.is_alive().await);
        recorder.stop().await;
        assert!(!recorder.is_alive().await);
    }

    #[tokio::test]
    async fn fake_recorder_surfaces_spawn_failure_without_panicking() {
        let mut recorder = FakeRecorder {
            running: false,
            fail_to_start: true,
        };
        assert!(recorder.start().await.is_err());
        assert!(!recorder.is_alive().await);
    }
}
