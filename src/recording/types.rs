use camstation_av::AvError;
use camstation_common::CameraId;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use crate::config::RecordingConfig;

/// Build `<prefix>_<YYYYMMDD_HHMMSS>.<extension>` for a wall-clock time.
pub fn recording_filename(prefix: &str, extension: &str, at: NaiveDateTime) -> String {
    format!("{prefix}_{}.{extension}", at.format("%Y%m%d_%H%M%S"))
}

/// Knobs the session manager needs, resolved from `[recording]`.
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub dir: PathBuf,
    pub prefix: String,
    pub extension: String,
    pub stop_timeout: Duration,
    pub force_kill: bool,
    pub startup_grace: Duration,
}

impl RecorderSettings {
    pub fn from_config(config: &RecordingConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            prefix: config.prefix.clone(),
            extension: config.extension.clone(),
            stop_timeout: config.stop_timeout(),
            force_kill: config.force_kill_on_timeout,
            startup_grace: config.startup_grace(),
        }
    }
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self::from_config(&RecordingConfig::default())
    }
}

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new encoder was launched.
    Started { filename: String },
    /// A session was already active, nothing changed.
    AlreadyRecording { filename: String },
}

impl StartOutcome {
    pub fn filename(&self) -> &str {
        match self {
            StartOutcome::Started { filename } | StartOutcome::AlreadyRecording { filename } => {
                filename
            }
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, StartOutcome::Started { .. })
    }
}

/// How the encoder went away when a session was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The encoder honoured the quit instruction.
    Graceful(ExitStatus),
    /// The encoder had already exited before the stop request.
    AlreadyExited(ExitStatus),
    /// Graceful stop failed and the encoder was killed.
    ForceKilled { reason: String },
    /// Graceful stop failed and the encoder was left to exit on its own.
    Detached { reason: String },
}

impl StopOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopOutcome::Graceful(_) => "graceful",
            StopOutcome::AlreadyExited(_) => "already_exited",
            StopOutcome::ForceKilled { .. } => "force_killed",
            StopOutcome::Detached { .. } => "detached",
        }
    }

    /// Whether the output file was finalized by the encoder itself.
    pub fn is_clean(&self) -> bool {
        match self {
            StopOutcome::Graceful(status) => status.success(),
            _ => false,
        }
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::Graceful(status) | StopOutcome::AlreadyExited(status) => {
                write!(f, "{} ({status})", self.as_str())
            }
            StopOutcome::ForceKilled { reason } | StopOutcome::Detached { reason } => {
                write!(f, "{}: {reason}", self.as_str())
            }
        }
    }
}

/// A session that has just been stopped.
#[derive(Debug, Clone)]
pub struct StoppedRecording {
    /// Camera the session was started for, if any
    pub camera_id: Option<CameraId>,
    pub filename: String,
    pub path: PathBuf,
    pub outcome: StopOutcome,
    pub duration: Duration,
}

/// Snapshot of the session manager.
#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct RecordingStatus {
    pub recording: bool,
    #[schema(value_type = Option<String>)]
    pub camera_id: Option<CameraId>,
    pub filename: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub pid: Option<u32>,
    /// False when the encoder died while the session is still open
    pub encoder_alive: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("failed to start encoder: {0}")]
    Spawn(#[from] AvError),

    #[error("cannot create recordings directory {path:?}: {source}")]
    RecordingsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<RecordingError> for camstation_common::Error {
    fn from(err: RecordingError) -> Self {
        match err {
            RecordingError::Spawn(AvError::ToolNotFound { tool }) => {
                camstation_common::Error::tool(tool, "not installed or not in PATH")
            }
            other => camstation_common::Error::Recording(other.to_string()),
        }
    }
}
