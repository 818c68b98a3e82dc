use crate::config::Config;
use crate::recording::{RecorderSettings, SessionManager};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use camstation_av::{CaptureBackend, FfmpegBackend, ToolRegistry};
use camstation_common::Role;
use camstation_db::pool::{DbPool, PooledConnection};
use camstation_db::queries::users;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod auth;
mod error;
pub mod openapi;
pub mod routes_cameras;
pub mod routes_dashboard;
pub mod routes_recordings;
pub mod routes_stream;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub db: DbPool,
    /// The single recording session manager
    pub recorder: Arc<SessionManager>,
    /// Builds encoder and preview commands
    pub backend: Arc<dyn CaptureBackend>,
    /// Cancelled when the server shuts down; ends live streams
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(config: Config, db: DbPool, backend: Arc<dyn CaptureBackend>) -> Self {
        let recorder = Arc::new(SessionManager::new(
            backend.clone(),
            RecorderSettings::from_config(&config.recording),
        ));

        Self {
            config: Arc::new(config),
            db,
            recorder,
            backend,
            shutdown: CancellationToken::new(),
        }
    }

    /// Get a pooled database connection.
    pub fn conn(&self) -> camstation_common::Result<PooledConnection> {
        camstation_db::pool::get_conn(&self.db)
    }
}

/// Build the ffmpeg-backed capture backend from configuration.
pub fn ffmpeg_backend(config: &Config, tools: &ToolRegistry) -> FfmpegBackend {
    FfmpegBackend::new(
        tools.path_or_name("ffmpeg"),
        config.capture.capture_settings(),
        config.recording.encode_settings(),
    )
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::RANGE]);

    let mut app = Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api", api_routes(&ctx))
        // OpenAPI documentation (Swagger UI at /api/docs)
        .merge(openapi::openapi_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Serve static files if directory is provided
    // Uses SPA fallback: serves index.html for any route that doesn't match a file
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}

fn api_routes(ctx: &AppContext) -> Router<AppContext> {
    // Auth routes (always available)
    let auth_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/status", get(auth::auth_status));

    // Protected routes; role checks happen in the handlers' extractors
    let protected_routes = routes_dashboard::dashboard_routes()
        .merge(routes_cameras::camera_routes())
        .merge(routes_recordings::recording_routes())
        .merge(routes_stream::stream_routes())
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::auth_middleware,
        ));

    auth_routes.merge(protected_routes)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Create the configured admin account if it does not exist yet.
///
/// Returns true when an account was created.
pub fn ensure_default_admin(ctx: &AppContext) -> Result<bool> {
    let auth_config = &ctx.config.auth;
    let conn = ctx.conn()?;

    if users::get_user_by_username(&conn, &auth_config.default_admin_username)?.is_some() {
        return Ok(false);
    }

    let hash = auth::hash_password(&auth_config.default_admin_password)
        .context("Failed to hash default admin password")?;
    users::create_user(&conn, &auth_config.default_admin_username, &hash, Role::Admin)?;

    tracing::info!(username = %auth_config.default_admin_username, "Created default admin account");
    if auth_config.default_admin_password == "admin" {
        tracing::warn!("Default admin password is in use; change auth.default_admin_password");
    }
    Ok(true)
}

/// Start the HTTP server and run until a shutdown signal arrives.
///
/// An active recording is stopped before returning so its file is finalized.
pub async fn start_server(config: Config, db: DbPool, backend: Arc<dyn CaptureBackend>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let static_dir = config.server.static_dir.clone();
    let ctx = AppContext::new(config, db, backend);

    if ctx.config.auth.enabled {
        ensure_default_admin(&ctx)?;
    } else {
        tracing::warn!("Authentication is disabled; every request is treated as admin");
    }

    let recorder = ctx.recorder.clone();
    let streams = ctx.shutdown.clone();
    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Live streams never finish on their own
            streams.cancel();
            recorder.shutdown().await;
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
