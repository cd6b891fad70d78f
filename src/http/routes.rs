//! Route handlers for the Wi-Fi-reachable HTTP API: the `/api/cmd` bridge
//! into the shared dispatcher, and file listing/download/upload/delete
//! under the device's flat category directories.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;

use super::AppState;
use crate::config::STREAM_CHUNK_BYTES;

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            ok: false,
            error: message.into(),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
pub struct HealthResponse {
    ok: bool,
    uptime_s: f64,
    timestamp: String,
}

/// `GET /health` — the one route with no auth gate.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(HealthResponse {
        ok: true,
        uptime_s: state.started_at.elapsed().as_secs_f64(),
        timestamp,
    })
}

#[derive(Deserialize)]
pub struct CmdRequest {
    command: String,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Serialize)]
pub struct CmdResponse {
    ok: bool,
    response: Option<String>,
}

/// `POST /api/cmd` — builds `CMD:<command>[:<json>]` and feeds it to the
/// same dispatcher instance the BLE transport drives, so a command issued
/// over Wi-Fi and one issued over BLE are indistinguishable once they reach
/// the store.
pub async fn cmd(State(state): State<AppState>, Json(body): Json<CmdRequest>) -> Response {
    if body.command.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "missing 'command' field");
    }

    let name = body.command.trim().to_ascii_lowercase();

    if let Some(response) = state.runtime.handle_local_command(&name).await {
        return Json(CmdResponse {
            ok: true,
            response: Some(response),
        })
        .into_response();
    }

    let payload = body
        .payload
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_default();

    let context = state
        .runtime
        .build_context(state.ble_connected.load(Ordering::Relaxed));

    let response = state.dispatcher.dispatch(&name, &payload, &context).await;

    Json(CmdResponse {
        ok: true,
        response: Some(response),
    })
    .into_response()
}

#[derive(Serialize)]
struct FileEntry {
    name: String,
    size: u64,
    mtime: String,
}

#[derive(Serialize)]
struct FileListResponse {
    ok: bool,
    category: String,
    files: Vec<FileEntry>,
}

/// `GET /files/<category>` — lists the flat directory's regular files.
pub async fn list_files(
    State(state): State<AppState>,
    AxumPath(category): AxumPath<String>,
) -> Response {
    let Some(dir) = state.config.category_dir(&category) else {
        return error_response(StatusCode::NOT_FOUND, format!("unknown category: {category}"));
    };

    let mut files = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let mtime = metadata
                .modified()
                .ok()
                .and_then(|time| OffsetDateTime::from(time).format(&Rfc3339).ok())
                .unwrap_or_default();
            files.push(FileEntry {
                name,
                size: metadata.len(),
                mtime,
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Json(FileListResponse {
        ok: true,
        category,
        files,
    })
    .into_response()
}

/// Rejects empty names, leading dots, and any path-traversal component —
/// the same rule on both the download, upload, and delete paths.
fn safe_filename(name: &str) -> Option<&str> {
    if name.is_empty() || name.starts_with('.') || name.contains("..") || name.contains('/') {
        return None;
    }
    Some(name)
}

/// Appends `suffix` to the full filename (SQLite's own convention for its
/// `-wal`/`-shm` siblings), unlike `Path::with_extension` which replaces
/// whatever follows the last dot.
fn append_to_filename(path: &std::path::Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn mime_for(filename: &str) -> &'static str {
    if filename.ends_with(".wav") {
        "audio/wav"
    } else if filename.ends_with(".txt") {
        "text/plain; charset=utf-8"
    } else if filename.ends_with(".jsonl") || filename.ends_with(".json") {
        "application/json"
    } else if filename.ends_with(".db") {
        "application/x-sqlite3"
    } else {
        "application/octet-stream"
    }
}

async fn stream_file(path: PathBuf, mime: &'static str, download_name: &str) -> Response {
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(_) => return error_response(StatusCode::NOT_FOUND, "file not found"),
    };
    let size = file.metadata().await.map(|metadata| metadata.len()).unwrap_or(0);
    let stream = ReaderStream::with_capacity(file, STREAM_CHUNK_BYTES);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{download_name}\""),
        )
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "stream error"))
}

/// `GET /files/<category>/<filename>` — streams the file in 64 KiB chunks.
pub async fn download_file(
    State(state): State<AppState>,
    AxumPath((category, filename)): AxumPath<(String, String)>,
) -> Response {
    let Some(dir) = state.config.category_dir(&category) else {
        return error_response(StatusCode::NOT_FOUND, "unknown category");
    };
    let Some(name) = safe_filename(&filename) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid filename");
    };

    stream_file(dir.join(name), mime_for(name), name).await
}

/// `GET /files/db` — copies the live database (and its WAL sidecar, if
/// present) aside, streams the copy, then unlinks it. Required because a
/// WAL-mode database file alone is not a consistent snapshot while the
/// writer connection is live.
pub async fn download_db(State(state): State<AppState>) -> Response {
    let db_path = &state.config.db_path;
    if !db_path.is_file() {
        return error_response(StatusCode::NOT_FOUND, "database not found");
    }

    let snapshot_path = append_to_filename(db_path, ".download");
    let wal_src = append_to_filename(db_path, "-wal");
    let wal_dst = append_to_filename(&snapshot_path, "-wal");

    if let Err(error) = tokio::fs::copy(db_path, &snapshot_path).await {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string());
    }
    if wal_src.exists() {
        let _ = tokio::fs::copy(&wal_src, &wal_dst).await;
    }

    let contents = tokio::fs::read(&snapshot_path).await;
    let _ = tokio::fs::remove_file(&snapshot_path).await;
    let _ = tokio::fs::remove_file(&wal_dst).await;

    match contents {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/x-sqlite3")
            .header(header::CONTENT_LENGTH, bytes.len())
            .header(
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"cortex.db\"",
            )
            .body(Body::from(bytes))
            .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "stream error")),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

#[derive(Serialize)]
struct UploadResponse {
    ok: bool,
    filename: String,
    size: u64,
    path: String,
}

/// `POST /files/uploads` — raw body, `X-Filename` header names the file;
/// streamed to disk in chunks rather than buffered whole.
pub async fn upload_file(State(state): State<AppState>, request: axum::extract::Request) -> Response {
    let filename = request
        .headers()
        .get("X-Filename")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let Some(filename) = filename.filter(|name| !name.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing X-Filename header");
    };
    let Some(name) = safe_filename(&filename) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid filename");
    };
    let name = name.to_string();

    if let Err(error) = tokio::fs::create_dir_all(&state.config.uploads_dir).await {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string());
    }
    let dest = state.config.uploads_dir.join(&name);

    let file = match tokio::fs::File::create(&dest).await {
        Ok(file) => file,
        Err(error) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };
    let mut writer = tokio::io::BufWriter::new(file);

    let mut stream = request.into_body().into_data_stream();
    let mut total: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => return error_response(StatusCode::BAD_REQUEST, error.to_string()),
        };
        total += chunk.len() as u64;
        if total > crate::config::MAX_UPLOAD_BYTES {
            let _ = tokio::fs::remove_file(&dest).await;
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "file too large (max 100MB)");
        }
        if let Err(error) = tokio::io::AsyncWriteExt::write_all(&mut writer, &chunk).await {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string());
        }
    }
    if let Err(error) = tokio::io::AsyncWriteExt::flush(&mut writer).await {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string());
    }

    if total == 0 {
        let _ = tokio::fs::remove_file(&dest).await;
        return error_response(StatusCode::BAD_REQUEST, "empty body");
    }

    if let Err(error) = state
        .store
        .insert_file(
            &name,
            "uploads",
            "",
            "",
            "",
            &mime_for(&name).to_string(),
            total as i64,
            "upload",
            None,
        )
        .await
    {
        tracing::warn!(%error, "failed to register uploaded file in the store");
    }

    Json(UploadResponse {
        ok: true,
        filename: name,
        size: total,
        path: dest.to_string_lossy().into_owned(),
    })
    .into_response()
}

#[derive(Serialize)]
struct DeleteResponse {
    ok: bool,
    deleted: String,
}

/// `DELETE /files/<category>/<filename>` — only `recordings` and `uploads`
/// permit deletion; every other category is 403.
pub async fn delete_file(
    State(state): State<AppState>,
    AxumPath((category, filename)): AxumPath<(String, String)>,
) -> Response {
    if category != "recordings" && category != "uploads" {
        return error_response(
            StatusCode::FORBIDDEN,
            format!("deletion not allowed for category: {category}"),
        );
    }
    let Some(dir) = state.config.category_dir(&category) else {
        return error_response(StatusCode::NOT_FOUND, "unknown category");
    };
    let Some(name) = safe_filename(&filename) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid filename");
    };

    let filepath = dir.join(name);
    if tokio::fs::remove_file(&filepath).await.is_err() {
        return error_response(StatusCode::NOT_FOUND, "file not found");
    }

    if let Err(error) = state.store.delete_file_by_name(&category, name).await {
        tracing::warn!(%error, "failed to remove file row after disk deletion");
    }

    Json(DeleteResponse {
        ok: true,
        deleted: name.to_string(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("notes.txt", true)]
    #[case("", false)]
    #[case(".hidden", false)]
    #[case("../escape.txt", false)]
    #[case("sub/dir.txt", false)]
    fn safe_filename_rejects_traversal_and_dotfiles(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(expected, safe_filename(name).is_some());
    }

    #[rstest]
    #[case("meeting.wav", "audio/wav")]
    #[case("notes.txt", "text/plain; charset=utf-8")]
    #[case("log.jsonl", "application/json")]
    #[case("cortex.db", "application/x-sqlite3")]
    #[case("blob.bin", "application/octet-stream")]
    fn mime_for_matches_known_extensions(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(expected, mime_for(name));
    }

    #[test]
    fn append_to_filename_does_not_disturb_the_original_extension() {
        let db = PathBuf::from("/data/cortex.db");
        assert_eq!(
            PathBuf::from("/data/cortex.db-wal"),
            append_to_filename(&db, "-wal")
        );
        assert_eq!(
            PathBuf::from("/data/cortex.db.download"),
            append_to_filename(&db, ".download")
        );
    }
}
