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

pub async fn register(
    store: &Store,
    active_session: &Mutex<Option<String>>,
    payload: &str,
) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let filename = str_field(&data, "filename", "");
    if filename.is_empty() {
        return Err(HandlerError::MissingField("filename"));
    }
    let size_bytes = data.get("size_bytes").and_then(Value::as_i64).unwrap_or(0);
    let session_id = active_session.lock().await.clone();
    let row_id = store
        .insert_file(
            filename,
            str_field(&data, "category", "uploads"),
            str_field(&data, "description", ""),
            str_field(&data, "tags", ""),
            str_field(&data, "project", ""),
            str_field(&data, "mime_type", ""),
            size_bytes,
            str_field(&data, "source", "upload"),
            session_id.as_deref(),
        )
        .await?;
    Ok(wire::ack("file_register", row_id))
}

pub async fn list(store: &Store, payload: &str) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let category = data.get("category").and_then(Value::as_str);
    let project = data.get("project").and_then(Value::as_str);
    let limit = data.get("limit").and_then(Value::as_i64).unwrap_or(20).clamp(1, 100);
    let files = store.list_files(category, project, limit)?;
    Ok(wire::response("file_list", &serde_json::to_string(&files)?))
}

pub async fn search(store: &Store, payload: &str) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let query = str_field(&data, "query", "");
    if query.is_empty() {
        return Err(HandlerError::MissingField("query"));
    }
    let limit = data.get("limit").and_then(Value::as_i64).unwrap_or(20).clamp(1, 100);
    let files = store.search_files(query, limit)?;
    Ok(wire::response("file_search", &serde_json::to_string(&files)?))
}

pub async fn delete(store: &Store, payload: &str) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let Some(id) = data.get("id").and_then(Value::as_i64) else {
        return Err(HandlerError::MissingField("id"));
    };
    let deleted = store.delete_file(id).await?;
    if !deleted {
        return Err(HandlerError::FileNotFound);
    }
    Ok(wire::ack("file_delete", id))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn register_requires_a_filename() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);
        let error = register(&store, &active_session, "{}").await.unwrap_err();
        assert_eq!("missing filename field", error.to_string());
    }

    #[tokio::test]
    async fn register_list_search_and_delete_round_trip() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let active_session = Mutex::new(None);

        let ack = register(
            &store,
            &active_session,
            "{\"filename\":\"meeting.wav\",\"category\":\"recordings\"}",
        )
        .await
        .expect("register");
        assert_eq!("ACK:file_register:1", ack);

        let listed = list(&store, "{\"category\":\"recordings\"}").await.expect("list");
        assert!(listed.contains("meeting.wav"));

        let found = search(&store, "{\"query\":\"meeting\"}").await.expect("search");
        assert!(found.contains("meeting.wav"));

        let deleted = delete(&store, "{\"id\":1}").await.expect("delete");
        assert_eq!("ACK:file_delete:1", deleted);

        let error = delete(&store, "{\"id\":1}").await.unwrap_err();
        assert_eq!("file not found", error.to_string());
    }
}
