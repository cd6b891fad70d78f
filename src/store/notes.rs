use rusqlite::params;

use super::{NoteRow, Store};
use crate::error::StoreError;

impl Store {
    /// Inserts a note and returns its row id.
    pub async fn insert_note(
        &self,
        content: &str,
        tags: &str,
        project: &str,
        note_type: &str,
        source: &str,
        session_id: Option<&str>,
    ) -> Result<i64, StoreError> {
        let conn = self.writer.lock().await;
        conn.execute(
            "INSERT INTO notes (content, tags, project, note_type, source, session_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![content, tags, project, note_type, source, session_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the most recent notes, optionally filtered by project and/or
    /// note type.
    pub fn get_recent_notes(
        &self,
        limit: i64,
        project: Option<&str>,
        note_type: Option<&str>,
    ) -> Result<Vec<NoteRow>, StoreError> {
        let conn = self.reader()?;
        let mut sql = "SELECT id, content, tags, project, note_type, source, session_id, \
                        created_at FROM notes"
            .to_string();
        let mut wheres = Vec::new();
        if project.is_some() {
            wheres.push("project = ?");
        }
        if note_type.is_some() {
            wheres.push("note_type = ?");
        }
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<&dyn rusqlite::ToSql> = Vec::new();
        if let Some(project) = project.as_ref() {
            params.push(project);
        }
        if let Some(note_type) = note_type.as_ref() {
            params.push(note_type);
        }
        params.push(&limit);

        let rows = stmt
            .query_map(params.as_slice(), map_note_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get("id")?,
        content: row.get("content")?,
        tags: row.get("tags")?,
        project: row.get("project")?,
        note_type: row.get("note_type")?,
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
    async fn insert_and_fetch_recent_notes() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");

        store
            .insert_note("buy milk", "errand", "home", "note", "ble", None)
            .await
            .expect("insert");
        store
            .insert_note("fix flaky test", "", "work", "bug", "ble", None)
            .await
            .expect("insert");

        let notes = store.get_recent_notes(10, None, None).expect("query");
        assert_eq!(2, notes.len());
        assert_eq!("fix flaky test", notes[0].content);

        let bugs = store
            .get_recent_notes(10, None, Some("bug"))
            .expect("query");
        assert_eq!(1, bugs.len());
    }
}
