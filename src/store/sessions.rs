use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::{SessionRow, Store};
use crate::error::StoreError;

impl Store {
    /// Starts a new session, upserting the reporting computer's record if a
    /// hostname is given, and returns the new session id.
    pub async fn start_session(
        &self,
        ai_platform: &str,
        hostname: &str,
        os_info: &str,
    ) -> Result<String, StoreError> {
        let session_id = Uuid::new_v4().to_string();
        let conn = self.writer.lock().await;
        conn.execute(
            "INSERT INTO sessions (id, ai_platform, hostname, os_info) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, ai_platform, hostname, os_info],
        )?;
        if !hostname.is_empty() {
            conn.execute(
                "INSERT INTO computers (hostname, os) VALUES (?1, ?2) \
                 ON CONFLICT(hostname) DO UPDATE SET os=excluded.os, \
                 last_seen=datetime('now')",
                params![hostname, os_info],
            )?;
        }
        Ok(session_id)
    }

    /// Ends a session, returning `true` if a still-active session matched.
    pub async fn end_session(
        &self,
        session_id: &str,
        summary: &str,
        projects: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.writer.lock().await;
        let updated = conn.execute(
            "UPDATE sessions SET ended_at = datetime('now'), summary = ?1, projects = ?2 \
             WHERE id = ?3 AND ended_at IS NULL",
            params![summary, projects, session_id],
        )?;
        Ok(updated > 0)
    }

    /// Returns the most recently started sessions.
    pub fn get_recent_sessions(&self, limit: i64) -> Result<Vec<SessionRow>, StoreError> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT id, ai_platform, hostname, os_info, started_at, ended_at, summary, \
             projects FROM sessions ORDER BY started_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], map_session_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Looks up a single session by id.
    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>, StoreError> {
        let conn = self.reader()?;
        let row = conn
            .query_row(
                "SELECT id, ai_platform, hostname, os_info, started_at, ended_at, summary, \
                 projects FROM sessions WHERE id = ?1",
                params![session_id],
                map_session_row,
            )
            .optional()?;
        Ok(row)
    }
}

fn map_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get("id")?,
        ai_platform: row.get("ai_platform")?,
        hostname: row.get("hostname")?,
        os_info: row.get("os_info")?,
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        summary: row.get("summary")?,
        projects: row.get("projects")?,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn start_and_end_session_round_trip() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");

        let id = store
            .start_session("claude", "laptop", "linux")
            .await
            .expect("start");
        let session = store.get_session(&id).expect("get").expect("present");
        assert_eq!(None, session.ended_at);

        let ended = store
            .end_session(&id, "wrapped up", "core")
            .await
            .expect("end");
        assert!(ended);

        let session = store.get_session(&id).expect("get").expect("present");
        assert!(session.ended_at.is_some());
    }

    #[tokio::test]
    async fn ending_unknown_session_returns_false() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        let ended = store
            .end_session("does-not-exist", "", "")
            .await
            .expect("end");
        assert!(!ended);
    }
}
