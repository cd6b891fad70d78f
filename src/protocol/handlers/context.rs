use crate::error::HandlerError;
use crate::protocol::wire;
use crate::store::Store;

/// Builds the composite startup snapshot an AI agent pulls when it first
/// connects: active projects, recent sessions/notes, pending reminders and
/// decisions, open bugs, recent files, and aggregate stats.
pub async fn get_context(store: &Store) -> Result<String, HandlerError> {
    let context = store.get_context()?;
    Ok(wire::response("context", &serde_json::to_string(&context)?))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn get_context_returns_an_rsp_frame() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let response = get_context(&store).await.expect("context");
        assert!(response.starts_with("RSP:context:"));
        assert!(response.contains("\"active_projects\""));
    }
}
