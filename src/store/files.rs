use rusqlite::params;

use super::{FileRow, Store};
use crate::error::StoreError;

impl Store {
    /// Registers a file and returns its row id.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_file(
        &self,
        filename: &str,
        category: &str,
        description: &str,
        tags: &str,
        project: &str,
        mime_type: &str,
        size_bytes: i64,
        source: &str,
        session_id: Option<&str>,
    ) -> Result<i64, StoreError> {
        let conn = self.writer.lock().await;
        conn.execute(
            "INSERT INTO files (filename, category, description, tags, project, mime_type, \
             size_bytes, source, session_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                filename, category, description, tags, project, mime_type, size_bytes, source,
                session_id
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Lists registered files, optionally filtered by category and/or
    /// project, newest first.
    pub fn list_files(
        &self,
        category: Option<&str>,
        project: Option<&str>,
        limit: i64,
    ) -> Result<Vec<FileRow>, StoreError> {
        let conn = self.reader()?;
        let mut sql = "SELECT id, filename, category, description, tags, project, mime_type, \
                        size_bytes, source, session_id, created_at FROM files"
            .to_string();
        let mut wheres = Vec::new();
        if category.is_some() {
            wheres.push("category = ?");
        }
        if project.is_some() {
            wheres.push("project = ?");
        }
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<&dyn rusqlite::ToSql> = Vec::new();
        if let Some(category) = category.as_ref() {
            params.push(category);
        }
        if let Some(project) = project.as_ref() {
            params.push(project);
        }
        params.push(&limit);

        let rows = stmt
            .query_map(params.as_slice(), map_file_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Searches files by substring match against filename, description, or
    /// tags.
    pub fn search_files(&self, query: &str, limit: i64) -> Result<Vec<FileRow>, StoreError> {
        let conn = self.reader()?;
        let pattern = format!("%{query}%");
        let mut stmt = conn.prepare(
            "SELECT id, filename, category, description, tags, project, mime_type, \
             size_bytes, source, session_id, created_at FROM files \
             WHERE filename LIKE ?1 OR description LIKE ?1 OR tags LIKE ?1 \
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![pattern, limit], map_file_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Deletes a file's row by id, returning `true` if a row was removed.
    pub async fn delete_file(&self, file_id: i64) -> Result<bool, StoreError> {
        let conn = self.writer.lock().await;
        let deleted = conn.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
        Ok(deleted > 0)
    }

    /// Deletes a file's row by filename and category; used when the HTTP
    /// transport removes a file from disk and wants the matching rows gone
    /// too.
    pub async fn delete_file_by_name(
        &self,
        category: &str,
        filename: &str,
    ) -> Result<(), StoreError> {
        let conn = self.writer.lock().await;
        conn.execute(
            "DELETE FROM files WHERE category = ?1 AND filename = ?2",
            params![category, filename],
        )?;
        Ok(())
    }
}

fn map_file_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRow> {
    Ok(FileRow {
        id: row.get("id")?,
        filename: row.get("filename")?,
        category: row.get("category")?,
        description: row.get("description")?,
        tags: row.get("tags")?,
        project: row.get("project")?,
        mime_type: row.get("mime_type")?,
        size_bytes: row.get("size_bytes")?,
        source: row.get("source")?,
        session_id: row.get("session_id")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn insert_list_search_and_delete_file() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");

        let id = store
            .insert_file(
                "meeting.wav",
                "recordings",
                "standup",
                "audio",
                "core",
                "audio/wav",
                2048,
                "recorder",
                None,
            )
            .await
            .expect("insert");

        let listed = store.list_files(Some("recordings"), None, 10).expect("list");
        assert_eq!(1, listed.len());

        let found = store.search_files("meeting", 10).expect("search");
        assert_eq!(1, found.len());

        let deleted = store.delete_file(id).await.expect("delete");
        assert!(deleted);
        assert!(store.list_files(None, None, 10).expect("list").is_empty());
    }
}
