use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::HandlerError;
use crate::protocol::wire;
use crate::store::Store;

fn parse_payload(payload: &str) -> Result<Value, HandlerError> {
    if payload.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(payload)?)
}

fn str_field<'a>(data: &'a Value, field: &str, default: &'a str) -> &'a str {
    data.get(field).and_then(Value::as_str).unwrap_or(default)
}

pub async fn start(
    store: &Store,
    active_session: &Mutex<Option<String>>,
    payload: &str,
) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let session_id = store
        .start_session(
            str_field(&data, "ai_platform", ""),
            str_field(&data, "hostname", ""),
            str_field(&data, "os_info", ""),
        )
        .await?;
    *active_session.lock().await = Some(session_id.clone());
    Ok(wire::ack("session", session_id))
}

pub async fn end(
    store: &Store,
    active_session: &Mutex<Option<String>>,
    payload: &str,
) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let requested = data.get("session_id").and_then(Value::as_str).map(str::to_string);

    let mut active = active_session.lock().await;
    let Some(session_id) = requested.or_else(|| active.clone()) else {
        return Err(HandlerError::NoActiveSession);
    };

    let ended = store
        .end_session(
            &session_id,
            str_field(&data, "summary", ""),
            str_field(&data, "projects", ""),
        )
        .await?;

    if !ended {
        return Err(HandlerError::SessionNotFound);
    }

    if active.as_deref() == Some(session_id.as_str()) {
        *active = None;
    }

    Ok(wire::ack("session_end", session_id))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn start_sets_active_session_and_acks_with_the_new_id() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);

        let response = start(&store, &active_session, "{}").await.expect("start");
        assert!(response.starts_with("ACK:session:"));
        assert!(active_session.lock().await.is_some());
    }

    #[tokio::test]
    async fn end_without_any_active_session_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);

        let error = end(&store, &active_session, "{}").await.unwrap_err();
        assert_eq!("no active session", error.to_string());
    }

    #[tokio::test]
    async fn end_clears_the_active_session_cell() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);

        start(&store, &active_session, "{}").await.expect("start");
        let response = end(&store, &active_session, "{}").await.expect("end");
        assert!(response.starts_with("ACK:session_end:"));
        assert!(active_session.lock().await.is_none());
    }

    #[tokio::test]
    async fn ending_an_explicit_unknown_session_id_fails() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);

        let error = end(&store, &active_session, "{\"session_id\":\"nope\"}")
            .await
            .unwrap_err();
        assert_eq!("session not found or already ended", error.to_string());
    }
}
