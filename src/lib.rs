//! `cortex-core`: the on-device daemon of a wearable "second brain"
//! recorder. Unifies a framed command/response protocol, an embedded
//! knowledge store, and two concurrent transports (a BLE central link to a
//! companion keyboard-bridge MCU, and a Wi-Fi-reachable HTTP API) behind
//! one shared dispatcher.

mod ble;
pub mod config;
pub mod error;
mod http;
pub mod protocol;
pub mod recorder;
pub mod runtime;
pub mod store;
pub mod telemetry;
mod utils;
pub mod wifi;

pub use ble::BleTransport;
pub use config::{Args, Config};
pub use error::CoreError;
pub use http::HttpTransport;
pub use protocol::Dispatcher;
pub use runtime::Runtime;
pub use store::Store;
