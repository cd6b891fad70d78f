use rusqlite::params;

use super::Store;
use crate::error::StoreError;

impl Store {
    /// Inserts or updates a person record by id.
    pub async fn upsert_person(
        &self,
        person_id: &str,
        name: &str,
        role: &str,
        email: &str,
        projects: &str,
        notes: &str,
    ) -> Result<(), StoreError> {
        let conn = self.writer.lock().await;
        conn.execute(
            "INSERT INTO people (id, name, role, email, projects, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET name=excluded.name, role=excluded.role, \
             email=excluded.email, projects=excluded.projects, notes=excluded.notes",
            params![person_id, name, role, email, projects, notes],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn upsert_person_inserts_then_updates() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");

        store
            .upsert_person("p1", "Ada", "engineer", "ada@example.com", "core", "")
            .await
            .expect("insert");
        store
            .upsert_person("p1", "Ada Lovelace", "engineer", "ada@example.com", "core", "vip")
            .await
            .expect("update");
    }
}
