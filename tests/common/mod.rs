//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temporary
//! recordings directory and a full [`AppContext`] whose capture backend runs
//! shell scripts instead of ffmpeg. [`TestHarness::serve`] starts Axum on a
//! random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use camstation::config::Config;
use camstation::recording::{RecorderSettings, SessionManager};
use camstation::server::{create_router, AppContext};
use camstation_av::{CaptureBackend, ProcessSpec};
use camstation_common::{Role, UserId};
use camstation_db::models::{Camera, User};
use camstation_db::pool::{init_memory_pool, DbPool, PooledConnection};
use camstation_db::queries::{auth_tokens, cameras, users};
use chrono::{Duration, Utc};
use tempfile::TempDir;

/// Encoder that finalizes and exits 0 when it reads `q`.
pub const GRACEFUL_ENCODER: &str = r#": > "$1"; read cmd; [ "$cmd" = q ] && exit 0; exit 3"#;

/// Encoder that never reads stdin.
pub const STUBBORN_ENCODER: &str = r#": > "$1"; exec sleep 30"#;

/// Encoder that closes its stdin, so the quit instruction cannot be sent.
pub const DEAF_ENCODER: &str = r#": > "$1"; exec 0<&-; exec sleep 30"#;

/// Encoder that dies right after launch, like ffmpeg on a busy device.
pub const CRASHING_ENCODER: &str = "exit 1";

/// Preview source emitting a tiny JPEG every 50ms.
pub const FRAME_SOURCE: &str = r"while true; do printf '\377\330frame\377\331'; sleep 0.05; done";

/// Capture backend that runs `sh -c <script> camstation-test <output>`.
#[derive(Debug, Clone)]
pub struct ScriptBackend {
    pub program: PathBuf,
    pub record_script: String,
    pub preview_script: String,
}

impl ScriptBackend {
    pub fn new(record_script: &str) -> Self {
        Self {
            program: PathBuf::from("sh"),
            record_script: record_script.to_string(),
            preview_script: FRAME_SOURCE.to_string(),
        }
    }

    pub fn graceful() -> Self {
        Self::new(GRACEFUL_ENCODER)
    }

    pub fn stubborn() -> Self {
        Self::new(STUBBORN_ENCODER)
    }

    /// Backend whose program does not exist.
    pub fn missing_binary() -> Self {
        Self {
            program: PathBuf::from("/nonexistent/camstation-ffmpeg"),
            ..Self::graceful()
        }
    }

    /// Preview source that appends a line to `ticks` per frame.
    pub fn with_ticking_preview(mut self, ticks: &Path) -> Self {
        self.preview_script = format!(
            "while true; do echo x >> '{}'; printf '\\377\\330frame\\377\\331'; sleep 0.05; done",
            ticks.display()
        );
        self
    }
}

impl CaptureBackend for ScriptBackend {
    fn record_command(&self, output: &Path) -> ProcessSpec {
        ProcessSpec::new(&self.program).args([
            "-c".to_string(),
            self.record_script.clone(),
            "camstation-test".to_string(),
            output.to_string_lossy().into_owned(),
        ])
    }

    fn preview_command(&self, _device_index: u32) -> ProcessSpec {
        ProcessSpec::new(&self.program).args(["-c", self.preview_script.as_str()])
    }
}

/// Recorder settings for direct [`SessionManager`] tests.
pub fn recorder_settings(dir: &Path) -> RecorderSettings {
    RecorderSettings {
        dir: dir.to_path_buf(),
        stop_timeout: std::time::Duration::from_secs(1),
        startup_grace: std::time::Duration::ZERO,
        ..RecorderSettings::default()
    }
}

pub fn session_manager(backend: ScriptBackend, dir: &Path) -> SessionManager {
    SessionManager::new(Arc::new(backend), recorder_settings(dir))
}

/// Whether a process with `pid` still exists.
pub fn process_exists(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub recordings: TempDir,
}

impl TestHarness {
    /// Harness with a well-behaved encoder and auth enabled.
    pub fn new() -> Self {
        Self::build(ScriptBackend::graceful(), |_| {})
    }

    pub fn with_backend(backend: ScriptBackend) -> Self {
        Self::build(backend, |_| {})
    }

    /// Harness with a custom backend and config adjustments.
    pub fn build(backend: ScriptBackend, tweak: impl FnOnce(&mut Config)) -> Self {
        let recordings = tempfile::tempdir().expect("failed to create recordings dir");
        let db = init_memory_pool().expect("failed to create in-memory pool");

        let mut config = Config::default();
        config.recording.dir = recordings.path().to_path_buf();
        config.recording.stop_timeout_secs = 1;
        config.recording.startup_grace_ms = 0;
        tweak(&mut config);

        let ctx = AppContext::new(config, db.clone(), Arc::new(backend));
        Self {
            ctx,
            db,
            recordings,
        }
    }

    /// Start an Axum server on a random port.
    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> PooledConnection {
        camstation_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    pub fn recordings_dir(&self) -> &Path {
        self.recordings.path()
    }

    /// Create a user with a cheap bcrypt hash.
    pub fn create_user(&self, username: &str, password: &str, role: Role) -> User {
        let hash = bcrypt::hash(password, 4).expect("bcrypt failed");
        users::create_user(&self.conn(), username, &hash, role).expect("failed to create user")
    }

    /// Issue a session token for `user_id` without going through login.
    pub fn token_for(&self, user_id: UserId) -> String {
        let token = format!("test-token-{}", uuid::Uuid::new_v4());
        auth_tokens::create_token(&self.conn(), user_id, &token, Utc::now() + Duration::hours(1))
            .expect("failed to create token");
        token
    }

    /// Create an admin account and return its token.
    pub fn admin_token(&self) -> String {
        let admin = self.create_user("root", "pw", Role::Admin);
        self.token_for(admin.id)
    }

    /// Create a regular account and return its token.
    pub fn user_token(&self) -> String {
        let user = self.create_user("viewer", "pw", Role::User);
        self.token_for(user.id)
    }

    pub fn create_camera(&self, name: &str) -> Camera {
        cameras::create_camera(&self.conn(), name, "webcam", "Lab").expect("failed to create camera")
    }
}

/// `webcam_record_YYYYMMDD_HHMMSS.mp4`
pub fn is_recording_filename(name: &str) -> bool {
    let Some(stamp) = name
        .strip_prefix("webcam_record_")
        .and_then(|rest| rest.strip_suffix(".mp4"))
    else {
        return false;
    };
    let bytes = stamp.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}
