//! SQLite persistence for the knowledge store's eight tables.
//!
//! Readers share a pooled connection pool (`r2d2`); every mutating
//! operation goes through one dedicated writer connection serialized by a
//! mutex, so readers never block on readers and writes are strictly
//! ordered.

mod activities;
mod computers;
mod context;
mod files;
mod notes;
mod people;
mod projects;
mod query;
mod rows;
mod searches;
mod sessions;
mod stats;

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::error::StoreError;

pub use context::Context;
pub use rows::*;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    ai_platform TEXT DEFAULT '',
    hostname TEXT DEFAULT '',
    os_info TEXT DEFAULT '',
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    ended_at TEXT,
    summary TEXT DEFAULT '',
    projects TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    tags TEXT DEFAULT '',
    project TEXT DEFAULT '',
    note_type TEXT DEFAULT 'note',
    source TEXT DEFAULT 'ble',
    session_id TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    program TEXT NOT NULL,
    details TEXT DEFAULT '',
    file_path TEXT DEFAULT '',
    project TEXT DEFAULT '',
    session_id TEXT,
    duration_min INTEGER DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS searches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    source TEXT DEFAULT '',
    url TEXT DEFAULT '',
    project TEXT DEFAULT '',
    session_id TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS projects (
    tag TEXT PRIMARY KEY,
    name TEXT DEFAULT '',
    status TEXT DEFAULT 'active',
    priority INTEGER DEFAULT 3,
    description TEXT DEFAULT '',
    collaborators TEXT DEFAULT '',
    last_touched TEXT DEFAULT (datetime('now')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS computers (
    hostname TEXT PRIMARY KEY,
    os TEXT DEFAULT '',
    cpu TEXT DEFAULT '',
    gpu TEXT DEFAULT '',
    ram_gb REAL DEFAULT 0,
    first_seen TEXT NOT NULL DEFAULT (datetime('now')),
    last_seen TEXT DEFAULT (datetime('now')),
    notes TEXT DEFAULT ''
);

CREATE TABLE IF NOT EXISTS people (
    id TEXT PRIMARY KEY,
    name TEXT DEFAULT '',
    role TEXT DEFAULT '',
    email TEXT DEFAULT '',
    projects TEXT DEFAULT '',
    notes TEXT DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    category TEXT DEFAULT 'uploads',
    description TEXT DEFAULT '',
    tags TEXT DEFAULT '',
    project TEXT DEFAULT '',
    mime_type TEXT DEFAULT '',
    size_bytes INTEGER DEFAULT 0,
    source TEXT DEFAULT 'upload',
    session_id TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_notes_project ON notes(project);
CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created_at);
CREATE INDEX IF NOT EXISTS idx_notes_session ON notes(session_id);
CREATE INDEX IF NOT EXISTS idx_notes_type ON notes(note_type);
CREATE INDEX IF NOT EXISTS idx_activities_project ON activities(project);
CREATE INDEX IF NOT EXISTS idx_activities_created ON activities(created_at);
CREATE INDEX IF NOT EXISTS idx_searches_project ON searches(project);
CREATE INDEX IF NOT EXISTS idx_sessions_active ON sessions(ended_at);
CREATE INDEX IF NOT EXISTS idx_files_project ON files(project);
CREATE INDEX IF NOT EXISTS idx_files_category ON files(category);
CREATE INDEX IF NOT EXISTS idx_files_created ON files(created_at);
";

/// Table names the ad-hoc `query` command is allowed to read from.
pub const QUERYABLE_TABLES: &[&str] = &[
    "sessions",
    "notes",
    "activities",
    "searches",
    "projects",
    "computers",
    "people",
    "files",
];

/// The knowledge store: a read pool plus a single serialized writer.
///
/// Foreign keys from notes/activities/searches/files to sessions are
/// intentionally advisory — `PRAGMA foreign_keys` is left at SQLite's
/// default (off), so a dangling `session_id` never fails an insert.
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
    writer: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if necessary) the database at `path`, running the
    /// schema migration and verifying the pool with a trivial query.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(4).build(manager)?;

        let writer = Connection::open(path)?;
        writer.execute_batch("PRAGMA journal_mode=WAL;")?;
        writer.execute_batch(SCHEMA_SQL)?;

        // Verify the read pool is actually serving connections.
        pool.get()?.query_row("SELECT 1", [], |_| Ok(()))?;

        Ok(Self {
            pool,
            writer: Mutex::new(writer),
        })
    }

    fn reader(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn open_creates_schema_and_accepts_reads() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open store");
        let stats = store.get_stats().expect("stats");
        assert_eq!(0, stats.notes_total);
    }
}
