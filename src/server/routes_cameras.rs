//! Camera registry routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use camstation_common::{CameraId, Error};
use camstation_db::models::Camera;
use camstation_db::queries::cameras;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::server::auth::{AdminUser, CurrentUser};
use crate::server::{AppContext, AppError};

/// Source string for the local capture device.
pub const WEBCAM_SOURCE: &str = "webcam";

pub fn camera_routes() -> Router<AppContext> {
    Router::new()
        .route("/cameras", get(list_cameras).post(create_camera))
        .route("/cameras/:id", get(get_camera).delete(delete_camera))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CameraResponse {
    pub id: String,
    pub name: String,
    pub source: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

impl From<Camera> for CameraResponse {
    fn from(c: Camera) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name,
            source: c.source,
            location: c.location,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCameraRequest {
    pub name: String,
    #[serde(default)]
    pub location: String,
    /// `webcam` for the default device or `webcam:<index>`
    #[serde(default)]
    pub source: Option<String>,
}

/// Parse a camera id from a path segment; malformed ids are reported as
/// unknown cameras.
pub(crate) fn parse_camera_id(raw: &str) -> Result<CameraId, Error> {
    raw.parse().map_err(|_| Error::not_found("camera", raw))
}

/// Resolve a camera source to a capture device index.
pub(crate) fn device_index(source: &str, default_index: u32) -> Result<u32, Error> {
    match source.split_once(':') {
        None if source == WEBCAM_SOURCE => Ok(default_index),
        Some((WEBCAM_SOURCE, index)) => index
            .parse()
            .map_err(|_| Error::validation(format!("Invalid device index in source '{source}'"))),
        _ => Err(Error::validation(format!(
            "Unsupported camera source '{source}'"
        ))),
    }
}

/// Load a camera or fail with 404.
pub(crate) fn require_camera(ctx: &AppContext, raw_id: &str) -> Result<Camera, Error> {
    let id = parse_camera_id(raw_id)?;
    let conn = ctx.conn()?;
    cameras::get_camera(&conn, id)?.ok_or_else(|| Error::not_found("camera", id))
}

/// GET /api/cameras
#[utoipa::path(
    get,
    path = "/api/cameras",
    responses(
        (status = 200, description = "Registered cameras", body = Vec<CameraResponse>)
    )
)]
pub async fn list_cameras(
    State(ctx): State<AppContext>,
    _user: CurrentUser,
) -> Result<Json<Vec<CameraResponse>>, AppError> {
    let conn = ctx.conn()?;
    let list = cameras::list_cameras(&conn)?;
    Ok(Json(list.into_iter().map(CameraResponse::from).collect()))
}

/// GET /api/cameras/:id
#[utoipa::path(
    get,
    path = "/api/cameras/{id}",
    params(("id" = String, Path, description = "Camera ID")),
    responses(
        (status = 200, description = "Camera", body = CameraResponse),
        (status = 404, description = "Camera not found")
    )
)]
pub async fn get_camera(
    State(ctx): State<AppContext>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<CameraResponse>, AppError> {
    Ok(Json(require_camera(&ctx, &id)?.into()))
}

/// POST /api/cameras
#[utoipa::path(
    post,
    path = "/api/cameras",
    request_body = CreateCameraRequest,
    responses(
        (status = 201, description = "Camera added", body = CameraResponse),
        (status = 400, description = "Invalid camera"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn create_camera(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateCameraRequest>,
) -> Result<(StatusCode, Json<CameraResponse>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Camera name cannot be empty").into());
    }

    let source = req.source.as_deref().unwrap_or(WEBCAM_SOURCE).trim();
    device_index(source, ctx.config.capture.device_index)?;

    let conn = ctx.conn()?;
    let camera = cameras::create_camera(&conn, name, source, req.location.trim())?;

    tracing::info!(
        camera_id = %camera.id,
        name = %camera.name,
        by = %admin.username,
        "Camera added"
    );

    Ok((StatusCode::CREATED, Json(camera.into())))
}

/// DELETE /api/cameras/:id
#[utoipa::path(
    delete,
    path = "/api/cameras/{id}",
    params(("id" = String, Path, description = "Camera ID")),
    responses(
        (status = 204, description = "Camera deleted"),
        (status = 404, description = "Camera not found"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn delete_camera(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_camera_id(&id)?;
    let conn = ctx.conn()?;
    if !cameras::delete_camera(&conn, id)? {
        return Err(Error::not_found("camera", id).into());
    }

    tracing::info!(camera_id = %id, by = %admin.username, "Camera deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_index_for_sources() {
        assert_eq!(device_index("webcam", 0).unwrap(), 0);
        assert_eq!(device_index("webcam", 2).unwrap(), 2);
        assert_eq!(device_index("webcam:3", 0).unwrap(), 3);
        assert!(device_index("webcam:x", 0).is_err());
        assert!(device_index("rtsp://cam", 0).is_err());
        assert!(device_index("", 0).is_err());
    }

    #[test]
    fn test_parse_camera_id_rejects_garbage() {
        let err = parse_camera_id("not-a-uuid").unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
