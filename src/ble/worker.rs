use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Manager, Peripheral};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{self, Config};
use crate::error::TransportError;
use crate::protocol::{ChunkAssembler, Dispatcher, chunk_response};
use crate::runtime::Runtime;
use crate::utils::format_hex;

/// Drives `SCAN -> CONNECT -> SUBSCRIBE -> PROVISION -> SERVE -> (on drop)
/// WAIT -> SCAN` until `shutdown` fires.
pub(super) async fn run(
    config: Config,
    dispatcher: Arc<Dispatcher>,
    runtime: Arc<Runtime>,
    connected: Arc<AtomicBool>,
    mut shutdown: watch::Receiver<bool>,
) {
    let manager = match Manager::new().await {
        Ok(manager) => manager,
        Err(error) => {
            warn!(%error, "failed to initialise BLE manager; BLE transport disabled");
            return;
        }
    };

    loop {
        if *shutdown.borrow() {
            return;
        }

        if let Err(error) = serve_once(&manager, &config, &dispatcher, &runtime, &connected, &mut shutdown).await {
            warn!(%error, "BLE session ended, will retry");
        }
        connected.store(false, Ordering::Relaxed);

        if *shutdown.borrow() {
            return;
        }

        tokio::select! {
            _ = sleep(Duration::from_secs(config::BLE_RECONNECT_INTERVAL_S)) => {}
            _ = shutdown.changed() => {}
        }
    }
}

#[instrument(skip_all, fields(device_name = %config.ble_device_name))]
async fn serve_once(
    manager: &Manager,
    config: &Config,
    dispatcher: &Dispatcher,
    runtime: &Runtime,
    connected: &AtomicBool,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), TransportError> {
    let peripheral = scan_for_device(manager, &config.ble_device_name, shutdown).await?;
    peripheral.connect().await?;
    peripheral.discover_services().await?;

    let tx = find_characteristic(&peripheral, config::BLE_TX_UUID)?;
    let rx = find_characteristic(&peripheral, config::BLE_RX_UUID)?;

    peripheral.subscribe(&tx).await?;
    let mut notifications = peripheral.notifications().await?;
    connected.store(true, Ordering::Relaxed);
    info!("BLE peripheral connected and subscribed");

    send_discovery(&peripheral, &rx, config).await;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let mut assembler = ChunkAssembler::default();
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => return Ok(()),

            maybe_event = notifications.next() => {
                let Some(event) = maybe_event else {
                    return Ok(());
                };
                if event.uuid != tx.uuid {
                    continue;
                }
                buffer.extend_from_slice(&event.value);

                while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(..=newline).collect();
                    let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]).trim().to_string();
                    if !line.is_empty() {
                        handle_inbound_line(dispatcher, runtime, &mut assembler, &line, connected, &outbound_tx).await;
                    }
                }

                if buffer.len() > config::BLE_MAX_MESSAGE_LEN {
                    warn!(bytes = %format_hex(&buffer[..buffer.len().min(16)]), "flushing unterminated BLE message at length ceiling");
                    let line = String::from_utf8_lossy(&buffer).trim().to_string();
                    buffer.clear();
                    if !line.is_empty() {
                        handle_inbound_line(dispatcher, runtime, &mut assembler, &line, connected, &outbound_tx).await;
                    }
                }
            }

            Some(message) = outbound_rx.recv() => {
                write_framed(&peripheral, &rx, &message).await?;
            }
        }
    }
}

async fn handle_inbound_line(
    dispatcher: &Dispatcher,
    runtime: &Runtime,
    assembler: &mut ChunkAssembler,
    line: &str,
    connected: &AtomicBool,
    outbound: &mpsc::UnboundedSender<String>,
) {
    if let Some(command) = crate::protocol::parse_command(line) {
        if let Some(response) = runtime.handle_local_command(&command.name).await {
            enqueue_response(outbound, response);
            return;
        }
    }

    let context = runtime.build_context(connected.load(Ordering::Relaxed));
    if let Some(response) = dispatcher.handle_line(assembler, line, &context).await {
        enqueue_response(outbound, response);
    }
}

fn enqueue_response(outbound: &mpsc::UnboundedSender<String>, response: String) {
    if response.len() > config::CHUNK_MAX_SIZE {
        for chunk in chunk_response(&response, config::CHUNK_MAX_SIZE) {
            let _ = outbound.send(chunk);
        }
    } else {
        let _ = outbound.send(response);
    }
}

async fn scan_for_device(
    manager: &Manager,
    name_substring: &str,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Peripheral, TransportError> {
    let adapters = manager.adapters().await?;
    let adapter = adapters.into_iter().next().ok_or(TransportError::NoAdapters)?;

    adapter.start_scan(ScanFilter::default()).await?;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(config::BLE_CONNECT_TIMEOUT_S);

    let result = 'scan: loop {
        for peripheral in adapter.peripherals().await? {
            if let Some(properties) = peripheral.properties().await? {
                if properties
                    .local_name
                    .as_deref()
                    .is_some_and(|name| name.contains(name_substring))
                {
                    break 'scan Ok(peripheral);
                }
            }
        }

        if tokio::time::Instant::now() >= deadline || *shutdown.borrow() {
            break 'scan Err(TransportError::NoMatchingDevice);
        }

        tokio::select! {
            _ = sleep(Duration::from_millis(config::BLE_POLL_INTERVAL_MS)) => {}
            _ = shutdown.changed() => {}
        }
    };

    let _ = adapter.stop_scan().await;
    result
}

fn find_characteristic(peripheral: &Peripheral, uuid: &str) -> Result<Characteristic, TransportError> {
    let target: Uuid = uuid.parse().map_err(|_| TransportError::MissingCharacteristics)?;
    peripheral
        .services()
        .into_iter()
        .flat_map(|service| service.characteristics.into_iter())
        .find(|characteristic| characteristic.uuid == target)
        .ok_or(TransportError::MissingCharacteristics)
}

async fn send_discovery(peripheral: &Peripheral, rx: &Characteristic, config: &Config) {
    let token = std::fs::read_to_string(&config.http_token_path)
        .ok()
        .map(|contents| contents.trim().to_string());
    let payload = serde_json::json!({
        "ip": crate::wifi::local_ip(),
        "http_port": config.http_port,
        "token": token,
    });
    let message = format!("DISCOVER:{payload}\n");

    if let Err(error) = write_raw(peripheral, rx, message.as_bytes()).await {
        warn!(%error, "failed to send BLE discovery payload");
    }
}

async fn write_framed(peripheral: &Peripheral, rx: &Characteristic, message: &str) -> Result<(), TransportError> {
    let mut framed = message.as_bytes().to_vec();
    framed.push(b'\n');
    write_raw(peripheral, rx, &framed).await
}

async fn write_raw(peripheral: &Peripheral, rx: &Characteristic, bytes: &[u8]) -> Result<(), TransportError> {
    let write_type = if rx.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
        WriteType::WithoutResponse
    } else {
        WriteType::WithResponse
    };
    let payload_size = config::BLE_MAX_MESSAGE_LEN.saturating_sub(3).max(1);

    for slice in bytes.chunks(payload_size) {
        peripheral.write(rx, slice, write_type).await?;
    }
    Ok(())
}
