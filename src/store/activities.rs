use rusqlite::params;

use super::Store;
use crate::error::StoreError;

impl Store {
    /// Inserts an activity record and returns its row id.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_activity(
        &self,
        program: &str,
        details: &str,
        file_path: &str,
        project: &str,
        session_id: Option<&str>,
        duration_min: i64,
    ) -> Result<i64, StoreError> {
        let conn = self.writer.lock().await;
        conn.execute(
            "INSERT INTO activities (program, details, file_path, project, session_id, \
             duration_min) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![program, details, file_path, project, session_id, duration_min],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn insert_activity_assigns_row_id() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");

        let id = store
            .insert_activity("vscode", "editing", "/tmp/foo.rs", "core", None, 12)
            .await
            .expect("insert");
        assert_eq!(1, id);
    }
}
