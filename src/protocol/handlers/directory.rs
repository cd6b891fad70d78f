use serde_json::Value;

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

pub async fn project_upsert(store: &Store, payload: &str) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let tag = str_field(&data, "tag", "");
    if tag.is_empty() {
        return Err(HandlerError::MissingField("tag"));
    }
    let priority = data.get("priority").and_then(Value::as_i64).unwrap_or(3);
    store
        .upsert_project(
            tag,
            str_field(&data, "name", ""),
            str_field(&data, "status", "active"),
            priority,
            str_field(&data, "description", ""),
            str_field(&data, "collaborators", ""),
        )
        .await?;
    Ok(wire::ack("project", tag))
}

pub async fn computer_reg(store: &Store, payload: &str) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let hostname = str_field(&data, "hostname", "");
    if hostname.is_empty() {
        return Err(HandlerError::MissingField("hostname"));
    }
    let ram_gb = data.get("ram_gb").and_then(Value::as_f64).unwrap_or(0.0);
    store
        .register_computer(
            hostname,
            str_field(&data, "os", ""),
            str_field(&data, "cpu", ""),
            str_field(&data, "gpu", ""),
            ram_gb,
            str_field(&data, "notes", ""),
        )
        .await?;
    Ok(wire::ack("computer", hostname))
}

pub async fn people_upsert(store: &Store, payload: &str) -> Result<String, HandlerError> {
    let data = parse_payload(payload)?;
    let person_id = str_field(&data, "id", "");
    if person_id.is_empty() {
        return Err(HandlerError::MissingField("id"));
    }
    store
        .upsert_person(
            person_id,
            str_field(&data, "name", ""),
            str_field(&data, "role", ""),
            str_field(&data, "email", ""),
            str_field(&data, "projects", ""),
            str_field(&data, "notes", ""),
        )
        .await?;
    Ok(wire::ack("people", person_id))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn project_upsert_requires_a_tag() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let error = project_upsert(&store, "{}").await.unwrap_err();
        assert_eq!("missing tag field", error.to_string());
    }

    #[tokio::test]
    async fn computer_reg_acks_with_hostname() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let response = computer_reg(&store, "{\"hostname\":\"laptop\"}")
            .await
            .expect("register");
        assert_eq!("ACK:computer:laptop", response);
    }

    #[tokio::test]
    async fn people_upsert_requires_an_id() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let error = people_upsert(&store, "{\"name\":\"Ada\"}").await.unwrap_err();
        assert_eq!("missing id field", error.to_string());
    }
}
