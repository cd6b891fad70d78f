use tokio::sync::Mutex;

use super::chunk::ChunkAssembler;
use super::handlers;
use super::wire::{self, parse_command};
use crate::store::Store;

/// Runtime facts the generic dispatcher has no other way to learn, passed
/// in by whichever transport worker drives the main loop. Mirrors the
/// context dict the device's runtime glue builds per message: current
/// device state, process uptime, free disk space, and BLE link status.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    pub app_state: String,
    pub uptime_s: f64,
    pub disk_free_gb: f64,
    pub ble_connected: bool,
}

/// Parses and routes `CMD:`/`CHUNK:` lines to the right handler, holding
/// the one piece of state that outlives a single message: which session
/// (if any) notes/activities/searches currently attach to.
///
/// One dispatcher instance is shared between the BLE worker and every HTTP
/// connection; all store access underneath it is already safe for
/// concurrent callers, so no additional locking wraps the dispatch path
/// itself beyond the active-session cell.
pub struct Dispatcher {
    store: std::sync::Arc<Store>,
    active_session: Mutex<Option<String>>,
}

impl Dispatcher {
    pub fn new(store: std::sync::Arc<Store>) -> Self {
        Self {
            store,
            active_session: Mutex::new(None),
        }
    }

    /// Feeds one raw line from a transport. Returns `None` while a chunked
    /// message is still being reassembled by the *caller-owned* assembler,
    /// `Some(response)` once a complete `CMD:` message has been dispatched.
    ///
    /// Chunk reassembly state belongs to the transport (each BLE connection
    /// gets its own `ChunkAssembler`), so it's threaded through rather than
    /// owned here.
    pub async fn handle_line(
        &self,
        assembler: &mut ChunkAssembler,
        line: &str,
        context: &RuntimeContext,
    ) -> Option<String> {
        let message = if ChunkAssembler::is_chunk(line) {
            assembler.feed(line)?
        } else {
            line.to_string()
        };

        let command = parse_command(&message)?;
        Some(self.dispatch(&command.name, &command.payload, context).await)
    }

    /// Dispatches an already-parsed command, independent of any chunking —
    /// used directly by the HTTP transport, which always sees whole
    /// messages.
    pub async fn dispatch(&self, name: &str, payload: &str, context: &RuntimeContext) -> String {
        let result = match name {
            "ping" => Ok(handlers::core::ping()),
            "status" => handlers::core::status(&self.store, &self.active_session, context).await,
            "note" => handlers::knowledge::note(&self.store, &self.active_session, payload).await,
            "activity" => {
                handlers::knowledge::activity(&self.store, &self.active_session, payload).await
            }
            "search" => handlers::knowledge::search(&self.store, &self.active_session, payload).await,
            "session_start" => {
                handlers::session::start(&self.store, &self.active_session, payload).await
            }
            "session_end" => {
                handlers::session::end(&self.store, &self.active_session, payload).await
            }
            "get_context" => handlers::context::get_context(&self.store).await,
            "project_upsert" => handlers::directory::project_upsert(&self.store, payload).await,
            "computer_reg" => handlers::directory::computer_reg(&self.store, payload).await,
            "people_upsert" => handlers::directory::people_upsert(&self.store, payload).await,
            "query" => handlers::query::query(&self.store, payload).await,
            "wifi_scan" => handlers::wifi::scan().await,
            "wifi_config" => handlers::wifi::config(payload).await,
            "wifi_status" => handlers::wifi::status().await,
            "file_register" => handlers::files::register(&self.store, &self.active_session, payload).await,
            "file_list" => handlers::files::list(&self.store, payload).await,
            "file_search" => handlers::files::search(&self.store, payload).await,
            "file_delete" => handlers::files::delete(&self.store, payload).await,
            _ => Err(crate::error::HandlerError::UnknownCommand),
        };

        match result {
            Ok(response) => response,
            Err(error) => wire::err(name, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn dispatcher() -> (Dispatcher, tempfile::TempDir) {
        let dir = tempdir().expect("tempdir");
        let store = std::sync::Arc::new(Store::open(&dir.path().join("cortex.db")).expect("open"));
        (Dispatcher::new(store), dir)
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let (dispatcher, _dir) = dispatcher();
        let context = RuntimeContext::default();
        let response = dispatcher.dispatch("ping", "", &context).await;
        assert_eq!("RSP:pong", response);
    }

    #[tokio::test]
    async fn unknown_command_produces_err() {
        let (dispatcher, _dir) = dispatcher();
        let context = RuntimeContext::default();
        let response = dispatcher.dispatch("made_up", "", &context).await;
        assert_eq!("ERR:made_up:unknown command", response);
    }

    #[tokio::test]
    async fn note_without_content_is_an_error_not_a_panic() {
        let (dispatcher, _dir) = dispatcher();
        let context = RuntimeContext::default();
        let response = dispatcher.dispatch("note", "{}", &context).await;
        assert_eq!("ERR:note:missing content field", response);
    }

    #[tokio::test]
    async fn session_start_then_note_attaches_to_active_session() {
        let (dispatcher, _dir) = dispatcher();
        let context = RuntimeContext::default();
        let start = dispatcher.dispatch("session_start", "{}", &context).await;
        assert!(start.starts_with("ACK:session:"));

        let ack = dispatcher
            .dispatch("note", "{\"content\":\"hi\"}", &context)
            .await;
        assert!(ack.starts_with("ACK:note:"));
    }

    #[tokio::test]
    async fn chunked_message_dispatches_only_once_complete() {
        let (dispatcher, _dir) = dispatcher();
        let context = RuntimeContext::default();
        let mut assembler = ChunkAssembler::default();

        let long_content = "z".repeat(1000);
        let payload = serde_json::json!({ "content": long_content }).to_string();
        let wire_message = format!("CMD:note:{payload}");
        let chunks = super::super::chunk::chunk_response(&wire_message, 480);

        let (last, rest) = chunks.split_last().expect("at least one chunk");
        for chunk in rest {
            assert!(dispatcher
                .handle_line(&mut assembler, chunk, &context)
                .await
                .is_none());
        }
        let response = dispatcher
            .handle_line(&mut assembler, last, &context)
            .await
            .expect("complete");
        assert!(response.starts_with("ACK:note:"));
    }
}
