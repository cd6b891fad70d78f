use serde::Serialize;

/// A conversation/work session, started and (optionally) ended explicitly.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRow {
    pub id: String,
    pub ai_platform: String,
    pub hostname: String,
    pub os_info: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub summary: String,
    pub projects: String,
}

/// A free-form note captured from speech-to-text or an API client.
#[derive(Debug, Clone, Serialize)]
pub struct NoteRow {
    pub id: i64,
    pub content: String,
    pub tags: String,
    pub project: String,
    pub note_type: String,
    pub source: String,
    pub session_id: Option<String>,
    pub created_at: String,
}

/// A logged activity (program usage, file edits, ...).
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRow {
    pub id: i64,
    pub program: String,
    pub details: String,
    pub file_path: String,
    pub project: String,
    pub session_id: Option<String>,
    pub duration_min: i64,
    pub created_at: String,
}

/// A recorded search query (web search, codebase search, ...).
#[derive(Debug, Clone, Serialize)]
pub struct SearchRow {
    pub id: i64,
    pub query: String,
    pub source: String,
    pub url: String,
    pub project: String,
    pub session_id: Option<String>,
    pub created_at: String,
}

/// A tracked project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub tag: String,
    pub name: String,
    pub status: String,
    pub priority: i64,
    pub description: String,
    pub collaborators: String,
    pub last_touched: String,
    pub created_at: String,
}

/// A computer that has registered itself (usually at session start).
#[derive(Debug, Clone, Serialize)]
pub struct ComputerRow {
    pub hostname: String,
    pub os: String,
    pub cpu: String,
    pub gpu: String,
    pub ram_gb: f64,
    pub first_seen: String,
    pub last_seen: String,
    pub notes: String,
}

/// A tracked collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct PersonRow {
    pub id: String,
    pub name: String,
    pub role: String,
    pub email: String,
    pub projects: String,
    pub notes: String,
    pub created_at: String,
}

/// A registered file (recording, note export, upload, ...).
#[derive(Debug, Clone, Serialize)]
pub struct FileRow {
    pub id: i64,
    pub filename: String,
    pub category: String,
    pub description: String,
    pub tags: String,
    pub project: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub source: String,
    pub session_id: Option<String>,
    pub created_at: String,
}

/// Aggregate row counts, as returned by `get_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub notes_total: i64,
    pub activities_total: i64,
    pub searches_total: i64,
    pub active_sessions: i64,
    pub sessions_total: i64,
    pub projects_total: i64,
    pub files_total: i64,
}
