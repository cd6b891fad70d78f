use serde::Serialize;

use super::{FileRow, NoteRow, ProjectRow, SessionRow, Stats, Store};
use crate::error::StoreError;

/// Composite snapshot handed to an AI agent at session startup, gathering
/// everything it needs to pick up where it left off.
#[derive(Debug, Serialize)]
pub struct Context {
    pub active_projects: Vec<ProjectRow>,
    pub recent_sessions: Vec<SessionRow>,
    pub recent_notes: Vec<NoteRow>,
    pub pending_reminders: Vec<NoteRow>,
    pub recent_decisions: Vec<NoteRow>,
    pub open_bugs: Vec<NoteRow>,
    pub recent_files: Vec<FileRow>,
    pub stats: Stats,
}

impl Store {
    /// Builds the composite context snapshot.
    pub fn get_context(&self) -> Result<Context, StoreError> {
        Ok(Context {
            active_projects: self.get_active_projects()?,
            recent_sessions: self.get_recent_sessions(5)?,
            recent_notes: self.get_recent_notes(10, None, None)?,
            pending_reminders: self.get_recent_notes(20, None, Some("reminder"))?,
            recent_decisions: self.get_recent_notes(10, None, Some("decision"))?,
            open_bugs: self.get_recent_notes(20, None, Some("bug"))?,
            recent_files: self.list_files(None, None, 10)?,
            stats: self.get_stats()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn get_context_aggregates_every_section() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        store
            .insert_note("ship the release", "", "core", "reminder", "ble", None)
            .await
            .expect("insert");

        let context = store.get_context().expect("context");
        assert_eq!(1, context.pending_reminders.len());
        assert_eq!(0, context.stats.activities_total);
    }
}
