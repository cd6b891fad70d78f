use rusqlite::params;

use super::{ProjectRow, Store};
use crate::error::StoreError;

impl Store {
    /// Inserts or updates a project by its tag.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_project(
        &self,
        tag: &str,
        name: &str,
        status: &str,
        priority: i64,
        description: &str,
        collaborators: &str,
    ) -> Result<(), StoreError> {
        let conn = self.writer.lock().await;
        conn.execute(
            "INSERT INTO projects (tag, name, status, priority, description, collaborators) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(tag) DO UPDATE SET name=excluded.name, status=excluded.status, \
             priority=excluded.priority, description=excluded.description, \
             collaborators=excluded.collaborators, last_touched=datetime('now')",
            params![tag, name, status, priority, description, collaborators],
        )?;
        Ok(())
    }

    /// Returns all projects with `status = 'active'`, most recently touched
    /// first.
    pub fn get_active_projects(&self) -> Result<Vec<ProjectRow>, StoreError> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT tag, name, status, priority, description, collaborators, last_touched, \
             created_at FROM projects WHERE status = 'active' ORDER BY last_touched DESC",
        )?;
        let rows = stmt
            .query_map([], map_project_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_project_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        tag: row.get("tag")?,
        name: row.get("name")?,
        status: row.get("status")?,
        priority: row.get("priority")?,
        description: row.get("description")?,
        collaborators: row.get("collaborators")?,
        last_touched: row.get("last_touched")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn upsert_project_is_idempotent_on_tag() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");

        store
            .upsert_project("core", "Cortex Core", "active", 1, "", "")
            .await
            .expect("insert");
        store
            .upsert_project("core", "Cortex Core", "active", 5, "renamed", "")
            .await
            .expect("update");

        let active = store.get_active_projects().expect("query");
        assert_eq!(1, active.len());
        assert_eq!(5, active[0].priority);
        assert_eq!("renamed", active[0].description);
    }
}
