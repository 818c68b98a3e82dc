//! OpenAPI documentation and Swagger UI integration.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::AppContext;

/// OpenAPI documentation for camstation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Camstation API",
        version = "0.1.0",
        description = "Webcam surveillance station: live streaming and on-demand recording",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "/", description = "Default server")
    ),
    paths(
        // Auth
        super::auth::login,
        super::auth::logout,
        super::auth::auth_status,
        // Dashboards
        super::routes_dashboard::user_dashboard,
        super::routes_dashboard::admin_dashboard,
        // Cameras
        super::routes_cameras::list_cameras,
        super::routes_cameras::get_camera,
        super::routes_cameras::create_camera,
        super::routes_cameras::delete_camera,
        // Recording
        super::routes_recordings::start_recording,
        super::routes_recordings::stop_recording,
        super::routes_recordings::recording_status,
        super::routes_recordings::list_recordings,
        super::routes_recordings::play_recording,
        super::routes_recordings::download_recording,
        super::routes_recordings::delete_recording,
        // Live stream
        super::routes_stream::stream_camera,
    ),
    components(
        schemas(
            super::auth::LoginRequest,
            super::auth::LoginResponse,
            super::auth::AuthStatusResponse,
            super::routes_dashboard::UserDashboardResponse,
            super::routes_dashboard::AdminDashboardResponse,
            super::routes_cameras::CameraResponse,
            super::routes_cameras::CreateCameraRequest,
            super::routes_recordings::StartRecordingResponse,
            super::routes_recordings::StopRecordingResponse,
            super::routes_recordings::RecordingResponse,
            crate::recording::RecordingStatus,
        )
    ),
    tags(
        (name = "camstation", description = "Camstation API")
    )
)]
pub struct ApiDoc;

/// Create OpenAPI documentation routes, mounted at the root.
/// - `/api/docs` - Swagger UI
/// - `/api/openapi.json` - Raw OpenAPI JSON spec (served by SwaggerUi)
pub fn openapi_routes() -> Router<AppContext> {
    Router::new().merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
}
