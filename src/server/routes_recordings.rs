//! Recording control and saved-recording routes.
//!
//! Start/stop drive the shared [`crate::recording::SessionManager`]; a
//! stopped session is persisted as a `(camera_id, filename)` row. Saved
//! files are served from the recordings directory by stored filename.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use camstation_common::{CameraId, Error, RecordingId};
use camstation_db::models::Recording;
use camstation_db::queries::recordings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path as FsPath, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::recording::{RecordingStatus, StartOutcome, StoppedRecording};
use crate::server::auth::{AdminUser, CurrentUser};
use crate::server::routes_cameras::{parse_camera_id, require_camera};
use crate::server::{AppContext, AppError};

pub fn recording_routes() -> Router<AppContext> {
    Router::new()
        .route("/cameras/:id/record/start", post(start_recording))
        .route("/cameras/:id/record/stop", post(stop_recording))
        .route("/recording/status", get(recording_status))
        .route("/recordings", get(list_recordings))
        .route("/recordings/:id", delete(delete_recording))
        .route("/recordings/:id/play", get(play_recording))
        .route("/recordings/:id/download", get(download_recording))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StartRecordingResponse {
    /// True when this request launched the encoder
    pub started: bool,
    pub already_recording: bool,
    pub filename: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StopRecordingResponse {
    pub stopped: bool,
    pub filename: Option<String>,
    /// How the encoder exited (`graceful`, `force_killed`, ...)
    pub outcome: Option<String>,
    pub duration_secs: Option<u64>,
    /// The saved row, when the filename was persisted
    pub recording: Option<RecordingResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RecordingResponse {
    pub id: String,
    pub camera_id: String,
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Whether the file is present in the recordings directory
    pub available: bool,
}

impl RecordingResponse {
    pub(crate) fn from_row(rec: Recording, dir: &FsPath) -> Self {
        let available = rec
            .filename
            .as_deref()
            .and_then(|f| resolve_recording_path(dir, f).ok())
            .map(|p| p.is_file())
            .unwrap_or(false);

        Self {
            id: rec.id.to_string(),
            camera_id: rec.camera_id.to_string(),
            filename: rec.filename,
            created_at: rec.created_at,
            available,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListRecordingsQuery {
    pub camera_id: Option<String>,
}

/// Join a stored filename onto the recordings directory, refusing anything
/// that is not a single plain file name.
pub(crate) fn resolve_recording_path(dir: &FsPath, filename: &str) -> Result<PathBuf, Error> {
    let mut components = FsPath::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(dir.join(name)),
        _ => Err(Error::validation(format!(
            "Invalid recording filename '{filename}'"
        ))),
    }
}

/// POST /api/cameras/:id/record/start
#[utoipa::path(
    post,
    path = "/api/cameras/{id}/record/start",
    params(("id" = String, Path, description = "Camera ID")),
    responses(
        (status = 200, description = "Recording started or already running", body = StartRecordingResponse),
        (status = 404, description = "Camera not found"),
        (status = 500, description = "Encoder failed to start")
    )
)]
pub async fn start_recording(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<StartRecordingResponse>, AppError> {
    let camera = require_camera(&ctx, &id)?;

    let outcome = ctx.recorder.start_for_camera(camera.id).await?;
    if let StartOutcome::Started { ref filename } = outcome {
        tracing::info!(
            camera_id = %camera.id,
            filename = %filename,
            by = %user.username,
            "Recording requested"
        );
    }

    Ok(Json(StartRecordingResponse {
        started: outcome.is_new(),
        already_recording: !outcome.is_new(),
        filename: outcome.filename().to_string(),
    }))
}

/// POST /api/cameras/:id/record/stop
#[utoipa::path(
    post,
    path = "/api/cameras/{id}/record/stop",
    params(("id" = String, Path, description = "Camera ID")),
    responses(
        (status = 200, description = "Stop result", body = StopRecordingResponse),
        (status = 404, description = "Camera not found and nothing recording")
    )
)]
pub async fn stop_recording(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<StopRecordingResponse>, AppError> {
    // The session is stopped even if the camera row is gone, otherwise a
    // deleted camera would leave the encoder running with no way to end it.
    let requested = parse_camera_id(&id).ok();

    // Stop and persist in a detached task so a client disconnect cannot
    // abort between the encoder exiting and the row being written.
    let task_ctx = ctx.clone();
    let task = tokio::spawn(async move {
        let stopped = task_ctx.recorder.stop().await;
        let saved = stopped
            .as_ref()
            .and_then(|s| persist_recording(&task_ctx, requested, s));
        (stopped, saved)
    });

    let (stopped, saved) = task
        .await
        .map_err(|e| Error::internal(format!("stop task failed: {e}")))?;

    let Some(s) = stopped else {
        require_camera(&ctx, &id)?;
        return Ok(Json(StopRecordingResponse {
            stopped: false,
            filename: None,
            outcome: None,
            duration_secs: None,
            recording: None,
        }));
    };

    tracing::info!(
        camera_id = ?s.camera_id.or(requested),
        filename = %s.filename,
        by = %user.username,
        "Recording stop requested"
    );

    let dir = &ctx.config.recording.dir;
    Ok(Json(StopRecordingResponse {
        stopped: true,
        filename: Some(s.filename),
        outcome: Some(s.outcome.as_str().to_string()),
        duration_secs: Some(s.duration.as_secs()),
        recording: saved.map(|r| RecordingResponse::from_row(r, dir)),
    }))
}

/// Save the stopped file under the camera that started the session.
///
/// Returns `None` without a row when that camera no longer exists.
fn persist_recording(
    ctx: &AppContext,
    requested: Option<CameraId>,
    stopped: &StoppedRecording,
) -> Option<Recording> {
    let camera_id = stopped.camera_id.or(requested)?;
    if let Some(requested) = requested.filter(|r| *r != camera_id) {
        tracing::warn!(
            camera_id = %camera_id,
            requested = %requested,
            filename = %stopped.filename,
            "Stop requested through another camera, saving under the starting camera"
        );
    }

    let result = ctx
        .conn()
        .and_then(|conn| recordings::create_recording(&conn, camera_id, &stopped.filename));

    match result {
        Ok(rec) => Some(rec),
        Err(Error::NotFound { .. }) => {
            tracing::warn!(
                camera_id = %camera_id,
                filename = %stopped.filename,
                "Camera deleted during recording, file kept without a row"
            );
            None
        }
        Err(e) => {
            tracing::error!(
                camera_id = %camera_id,
                filename = %stopped.filename,
                error = %e,
                "Failed to save recording row"
            );
            None
        }
    }
}

/// GET /api/recording/status
#[utoipa::path(
    get,
    path = "/api/recording/status",
    responses(
        (status = 200, description = "Current recording session", body = RecordingStatus)
    )
)]
pub async fn recording_status(
    State(ctx): State<AppContext>,
    _user: CurrentUser,
) -> Json<RecordingStatus> {
    Json(ctx.recorder.status().await)
}

/// GET /api/recordings
#[utoipa::path(
    get,
    path = "/api/recordings",
    params(("camera_id" = Option<String>, Query, description = "Only recordings of this camera")),
    responses(
        (status = 200, description = "Saved recordings, newest first", body = Vec<RecordingResponse>),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_recordings(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Query(query): Query<ListRecordingsQuery>,
) -> Result<Json<Vec<RecordingResponse>>, AppError> {
    let camera_id = query
        .camera_id
        .as_deref()
        .map(|raw| {
            raw.parse::<CameraId>()
                .map_err(|_| Error::validation(format!("Invalid camera_id '{raw}'")))
        })
        .transpose()?;

    let conn = ctx.conn()?;
    let rows = recordings::list_recordings(&conn, camera_id)?;
    let dir = &ctx.config.recording.dir;
    Ok(Json(
        rows.into_iter()
            .map(|r| RecordingResponse::from_row(r, dir))
            .collect(),
    ))
}

fn load_recording_file(ctx: &AppContext, raw_id: &str) -> Result<(String, PathBuf), Error> {
    let id: RecordingId = raw_id
        .parse()
        .map_err(|_| Error::not_found("recording", raw_id))?;
    let conn = ctx.conn()?;
    let rec = recordings::get_recording(&conn, id)?.ok_or_else(|| Error::not_found("recording", id))?;

    let filename = rec
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| Error::not_found("recording file", id))?;
    let path = resolve_recording_path(&ctx.config.recording.dir, &filename)?;
    Ok((filename, path))
}

/// GET /api/recordings/:id/play
#[utoipa::path(
    get,
    path = "/api/recordings/{id}/play",
    params(("id" = String, Path, description = "Recording ID")),
    responses(
        (status = 200, description = "Video file"),
        (status = 206, description = "Partial content"),
        (status = 404, description = "Recording or file not found")
    )
)]
pub async fn play_recording(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (filename, path) = load_recording_file(&ctx, &id)?;
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    Ok(serve_file(&path, &filename, range, Disposition::Inline).await?)
}

/// GET /api/recordings/:id/download
#[utoipa::path(
    get,
    path = "/api/recordings/{id}/download",
    params(("id" = String, Path, description = "Recording ID")),
    responses(
        (status = 200, description = "Video file as attachment"),
        (status = 404, description = "Recording or file not found")
    )
)]
pub async fn download_recording(
    State(ctx): State<AppContext>,
    _admin: AdminUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (filename, path) = load_recording_file(&ctx, &id)?;
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    Ok(serve_file(&path, &filename, range, Disposition::Attachment).await?)
}

/// DELETE /api/recordings/:id
#[utoipa::path(
    delete,
    path = "/api/recordings/{id}",
    params(("id" = String, Path, description = "Recording ID")),
    responses(
        (status = 204, description = "Recording deleted"),
        (status = 404, description = "Recording not found")
    )
)]
pub async fn delete_recording(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: RecordingId = id
        .parse()
        .map_err(|_| Error::not_found("recording", &id))?;

    let rec = {
        let conn = ctx.conn()?;
        recordings::get_recording(&conn, id)?.ok_or_else(|| Error::not_found("recording", id))?
    };

    if let Some(filename) = rec.filename.as_deref().filter(|f| !f.trim().is_empty()) {
        let path = resolve_recording_path(&ctx.config.recording.dir, filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!(path = %path.display(), "Recording file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Recording file already gone")
            }
            Err(e) => return Err(Error::Io(e).into()),
        }
    }

    let conn = ctx.conn()?;
    recordings::delete_recording(&conn, id)?;
    tracing::info!(recording_id = %id, by = %admin.username, "Recording deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// file serving
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// Parse a `Range: bytes=START-END` header value.
pub fn parse_range_header(value: &str) -> Option<(u64, Option<u64>)> {
    let bytes_prefix = value.strip_prefix("bytes=")?;
    let (start_str, end_str) = bytes_prefix.split_once('-')?;

    let start: u64 = start_str.trim().parse().ok()?;
    let end = match end_str.trim() {
        "" => None,
        s => Some(s.parse().ok()?),
    };

    Some((start, end))
}

/// Guess the MIME type from the file extension.
pub fn guess_content_type(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().unwrap_or("") {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Stream a file in 64KB chunks, honouring a single byte range.
pub async fn serve_file(
    path: &FsPath,
    file_name: &str,
    range_header: Option<&str>,
    disposition: Disposition,
) -> Result<Response, Error> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| Error::not_found("recording file", file_name))?;
    if !metadata.is_file() {
        return Err(Error::not_found("recording file", file_name));
    }

    let file_size = metadata.len();
    let content_type = guess_content_type(file_name);
    let disposition = match disposition {
        Disposition::Inline => format!("inline; filename=\"{file_name}\""),
        Disposition::Attachment => format!("attachment; filename=\"{file_name}\""),
    };

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|_| Error::not_found("recording file", file_name))?;

    match range_header.and_then(parse_range_header) {
        Some((start, end_opt)) => {
            let last = file_size.saturating_sub(1);
            let end = end_opt.unwrap_or(last).min(last);
            if file_size == 0 || start > end {
                return Ok((
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(header::CONTENT_RANGE, format!("bytes */{file_size}"))],
                    Body::empty(),
                )
                    .into_response());
            }

            let length = end - start + 1;
            file.seek(std::io::SeekFrom::Start(start)).await?;
            let body = Body::from_stream(ReaderStream::with_capacity(file.take(length), 64 * 1024));

            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_RANGE,
                        format!("bytes {start}-{end}/{file_size}"),
                    ),
                    (header::CONTENT_LENGTH, length.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
        None => {
            let body = Body::from_stream(ReaderStream::with_capacity(file, 64 * 1024));
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::CONTENT_LENGTH, file_size.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}
