//! BLE central transport: scans for the companion peripheral by name,
//! subscribes to its notify characteristic, and drains a per-connection
//! outbound queue onto its write characteristic. Reconnects on every drop.

mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::protocol::Dispatcher;
use crate::runtime::Runtime;

/// Handle to the spawned BLE worker task. Exposes whether a peripheral is
/// currently connected, for the `status` command's `ble_connected` field.
pub struct BleTransport {
    connected: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl BleTransport {
    /// Spawns the scan/connect/serve loop on the current runtime. `shutdown`
    /// firing `true` stops the loop after the current connection attempt.
    pub fn spawn(
        config: Config,
        dispatcher: Arc<Dispatcher>,
        runtime: Arc<Runtime>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let connected = Arc::new(AtomicBool::new(false));
        let task_connected = connected.clone();
        let handle = tokio::spawn(async move {
            worker::run(config, dispatcher, runtime, task_connected, shutdown).await;
        });
        Self { connected, handle }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// A cloneable handle to the connection flag, for transports (HTTP's
    /// `status`/`health` responses) that need to read it without holding a
    /// reference to the whole worker.
    pub fn connected_handle(&self) -> Arc<AtomicBool> {
        self.connected.clone()
    }

    pub async fn join(self) {
        let _ = self.handle.await;
    }
}
