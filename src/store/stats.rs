use super::{Stats, Store};
use crate::error::StoreError;

impl Store {
    /// Returns aggregate row counts across the knowledge store in a single
    /// round trip.
    pub fn get_stats(&self) -> Result<Stats, StoreError> {
        let conn = self.reader()?;
        let stats = conn.query_row(
            "SELECT \
                (SELECT COUNT(*) FROM notes) AS notes_total, \
                (SELECT COUNT(*) FROM activities) AS activities_total, \
                (SELECT COUNT(*) FROM searches) AS searches_total, \
                (SELECT COUNT(*) FROM sessions WHERE ended_at IS NULL) AS active_sessions, \
                (SELECT COUNT(*) FROM sessions) AS sessions_total, \
                (SELECT COUNT(*) FROM projects) AS projects_total, \
                (SELECT COUNT(*) FROM files) AS files_total",
            [],
            |row| {
                Ok(Stats {
                    notes_total: row.get("notes_total")?,
                    activities_total: row.get("activities_total")?,
                    searches_total: row.get("searches_total")?,
                    active_sessions: row.get("active_sessions")?,
                    sessions_total: row.get("sessions_total")?,
                    projects_total: row.get("projects_total")?,
                    files_total: row.get("files_total")?,
                })
            },
        )?;
        Ok(stats)
    }
}
