//! Live MJPEG stream route.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use camstation_av::{open_stream, MULTIPART_CONTENT_TYPE};
use futures::StreamExt;
use std::convert::Infallible;

use crate::server::auth::CurrentUser;
use crate::server::routes_cameras::{device_index, require_camera};
use crate::server::{AppContext, AppError};

pub fn stream_routes() -> Router<AppContext> {
    Router::new().route("/cameras/:id/stream", get(stream_camera))
}

/// GET /api/cameras/:id/stream
///
/// Each request gets its own capture process. The body owns the
/// `FrameStream`, so a client disconnect drops it and frees the device.
#[utoipa::path(
    get,
    path = "/api/cameras/{id}/stream",
    params(("id" = String, Path, description = "Camera ID")),
    responses(
        (status = 200, description = "multipart/x-mixed-replace stream of JPEG frames"),
        (status = 404, description = "Camera not found"),
        (status = 500, description = "Capture process could not be started")
    )
)]
pub async fn stream_camera(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let camera = require_camera(&ctx, &id)?;
    let index = device_index(&camera.source, ctx.config.capture.device_index)?;

    let spec = ctx.backend.preview_command(index);
    let frames = open_stream(&spec, format!("{} (device {index})", camera.name))?;

    tracing::info!(
        camera_id = %camera.id,
        device_index = index,
        by = %user.username,
        "Live stream started"
    );

    let shutdown = ctx.shutdown.clone();
    let frames = frames.take_until(async move { shutdown.cancelled().await });
    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));
    Ok((
        [
            (header::CONTENT_TYPE, MULTIPART_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store"),
        ],
        body,
    )
        .into_response())
}
