use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::HandlerError;
use crate::protocol::dispatcher::RuntimeContext;
use crate::protocol::wire;
use crate::store::Store;

pub fn ping() -> String {
    "RSP:pong".to_string()
}

#[derive(Serialize)]
struct Status {
    app_state: String,
    uptime_s: f64,
    disk_free_gb: f64,
    ble_connected: bool,
    active_session: Option<String>,
    notes_total: i64,
    activities_total: i64,
    searches_total: i64,
    active_sessions: i64,
    sessions_total: i64,
    projects_total: i64,
    files_total: i64,
}

pub async fn status(
    store: &Store,
    active_session: &Mutex<Option<String>>,
    context: &RuntimeContext,
) -> Result<String, HandlerError> {
    let stats = store.get_stats()?;
    let active_session = active_session.lock().await.clone();

    let status = Status {
        app_state: context.app_state.clone(),
        uptime_s: context.uptime_s,
        disk_free_gb: context.disk_free_gb,
        ble_connected: context.ble_connected,
        active_session,
        notes_total: stats.notes_total,
        activities_total: stats.activities_total,
        searches_total: stats.searches_total,
        active_sessions: stats.active_sessions,
        sessions_total: stats.sessions_total,
        projects_total: stats.projects_total,
        files_total: stats.files_total,
    };

    Ok(wire::response("status", &serde_json::to_string(&status)?))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn status_reports_zeroed_stats_on_a_fresh_store() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);
        let context = RuntimeContext {
            app_state: "idle".to_string(),
            uptime_s: 12.5,
            disk_free_gb: 9.4,
            ble_connected: true,
            ..Default::default()
        };

        let response = status(&store, &active_session, &context).await.expect("status");
        assert!(response.starts_with("RSP:status:"));
        assert!(response.contains("\"app_state\":\"idle\""));
    }
}
