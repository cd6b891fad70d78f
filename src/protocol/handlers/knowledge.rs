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

pub async fn note(
    store: &Store,
    active_session: &Mutex<Option<String>>,
    payload: &str,
) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let content = str_field(&data, "content", "");
    if content.is_empty() {
        return Err(HandlerError::MissingField("content"));
    }
    let session_id = active_session.lock().await.clone();
    let row_id = store
        .insert_note(
            content,
            str_field(&data, "tags", ""),
            str_field(&data, "project", ""),
            str_field(&data, "type", "note"),
            "ble",
            session_id.as_deref(),
        )
        .await?;
    Ok(wire::ack("note", row_id))
}

pub async fn activity(
    store: &Store,
    active_session: &Mutex<Option<String>>,
    payload: &str,
) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let program = str_field(&data, "program", "");
    if program.is_empty() {
        return Err(HandlerError::MissingField("program"));
    }
    let session_id = active_session.lock().await.clone();
    let duration_min = data.get("duration_min").and_then(Value::as_i64).unwrap_or(0);
    let row_id = store
        .insert_activity(
            program,
            str_field(&data, "details", ""),
            str_field(&data, "file_path", ""),
            str_field(&data, "project", ""),
            session_id.as_deref(),
            duration_min,
        )
        .await?;
    Ok(wire::ack("activity", row_id))
}

pub async fn search(
    store: &Store,
    active_session: &Mutex<Option<String>>,
    payload: &str,
) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let query = str_field(&data, "query", "");
    if query.is_empty() {
        return Err(HandlerError::MissingField("query"));
    }
    let session_id = active_session.lock().await.clone();
    let row_id = store
        .insert_search(
            query,
            str_field(&data, "source", ""),
            str_field(&data, "url", ""),
            str_field(&data, "project", ""),
            session_id.as_deref(),
        )
        .await?;
    Ok(wire::ack("search", row_id))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn note_requires_content() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);
        let error = note(&store, &active_session, "{}").await.unwrap_err();
        assert_eq!("missing content field", error.to_string());
    }

    #[tokio::test]
    async fn activity_requires_program() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);
        let error = activity(&store, &active_session, "{}").await.unwrap_err();
        assert_eq!("missing program field", error.to_string());
    }

    #[tokio::test]
    async fn search_requires_query() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);
        let error = search(&store, &active_session, "{}").await.unwrap_err();
        assert_eq!("missing query field", error.to_string());
    }

    #[tokio::test]
    async fn note_with_content_acks_with_row_id() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);
        let response = note(&store, &active_session, "{\"content\":\"hi\"}")
            .await
            .expect("note");
        assert_eq!("ACK:note:1", response);
    }
}
