//! Landing-page data for the two roles.

use axum::{extract::State, routing::get, Json, Router};
use camstation_db::queries::{cameras, recordings, users};
use serde::Serialize;

use crate::recording::RecordingStatus;
use crate::server::auth::{AdminUser, CurrentUser};
use crate::server::routes_cameras::CameraResponse;
use crate::server::routes_recordings::RecordingResponse;
use crate::server::{AppContext, AppError};

pub fn dashboard_routes() -> Router<AppContext> {
    Router::new()
        .route("/dashboard", get(user_dashboard))
        .route("/admin/dashboard", get(admin_dashboard))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserDashboardResponse {
    pub username: String,
    pub cameras: Vec<CameraResponse>,
    pub recording: RecordingStatus,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AdminDashboardResponse {
    pub username: String,
    pub cameras: Vec<CameraResponse>,
    pub recordings: Vec<RecordingResponse>,
    pub user_count: usize,
    pub recording: RecordingStatus,
}

/// GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Cameras and recording state", body = UserDashboardResponse)
    )
)]
pub async fn user_dashboard(
    State(ctx): State<AppContext>,
    user: CurrentUser,
) -> Result<Json<UserDashboardResponse>, AppError> {
    let cameras = {
        let conn = ctx.conn()?;
        cameras::list_cameras(&conn)?
    };

    Ok(Json(UserDashboardResponse {
        username: user.username,
        cameras: cameras.into_iter().map(CameraResponse::from).collect(),
        recording: ctx.recorder.status().await,
    }))
}

/// GET /api/admin/dashboard
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Cameras, saved recordings and recording state", body = AdminDashboardResponse),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn admin_dashboard(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
) -> Result<Json<AdminDashboardResponse>, AppError> {
    let (cameras, recordings, user_count) = {
        let conn = ctx.conn()?;
        (
            cameras::list_cameras(&conn)?,
            recordings::list_recordings(&conn, None)?,
            users::list_users(&conn)?.len(),
        )
    };

    let dir = &ctx.config.recording.dir;
    Ok(Json(AdminDashboardResponse {
        username: admin.username,
        cameras: cameras.into_iter().map(CameraResponse::from).collect(),
        recordings: recordings
            .into_iter()
            .map(|r| RecordingResponse::from_row(r, dir))
            .collect(),
        user_count,
        recording: ctx.recorder.status().await,
    }))
}
