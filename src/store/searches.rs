use rusqlite::params;

use super::Store;
use crate::error::StoreError;

impl Store {
    /// Inserts a search record and returns its row id.
    pub async fn insert_search(
        &self,
        query: &str,
        source: &str,
        url: &str,
        project: &str,
        session_id: Option<&str>,
    ) -> Result<i64, StoreError> {
        let conn = self.writer.lock().await;
        conn.execute(
            "INSERT INTO searches (query, source, url, project, session_id) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![query, source, url, project, session_id],
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
    async fn insert_search_assigns_row_id() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");

        let id = store
            .insert_search("rust async traits", "web", "https://example.com", "", None)
            .await
            .expect("insert");
        assert_eq!(1, id);
    }
}
