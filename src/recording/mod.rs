//! Recording session lifecycle.
//!
//! [`SessionManager`] owns at most one running encoder. Start and stop
//! requests serialize on a single async mutex; the lock is held across the
//! bounded stop wait so a concurrent start sees either the old session or
//! a fully cleared one.

mod types;

pub use types::*;

use camstation_av::{CaptureBackend, EncoderProcess};
use camstation_common::CameraId;
use chrono::{DateTime, Local, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

struct ActiveSession {
    camera_id: Option<CameraId>,
    encoder: EncoderProcess,
    filename: String,
    path: PathBuf,
    started_at: DateTime<Local>,
    started: Instant,
}

pub struct SessionManager {
    backend: Arc<dyn CaptureBackend>,
    settings: RecorderSettings,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn CaptureBackend>, settings: RecorderSettings) -> Self {
        Self {
            backend,
            settings,
            active: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Start recording unless a session is already active.
    ///
    /// On error nothing is stored and the manager stays idle.
    pub async fn start(&self) -> Result<StartOutcome, RecordingError> {
        self.start_session(None).await
    }

    /// Like [`SessionManager::start`], remembering which camera asked for
    /// the session so the stopped recording can be attributed to it.
    pub async fn start_for_camera(&self, camera_id: CameraId) -> Result<StartOutcome, RecordingError> {
        self.start_session(Some(camera_id)).await
    }

    async fn start_session(&self, camera_id: Option<CameraId>) -> Result<StartOutcome, RecordingError> {
        let mut active = self.active.lock().await;

        if let Some(ref session) = *active {
            tracing::info!(filename = %session.filename, "Recording already in progress");
            return Ok(StartOutcome::AlreadyRecording {
                filename: session.filename.clone(),
            });
        }

        let started_at = Local::now();
        let filename = recording_filename(
            &self.settings.prefix,
            &self.settings.extension,
            started_at.naive_local(),
        );

        let dir = &self.settings.dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| RecordingError::RecordingsDir {
                path: dir.clone(),
                source,
            })?;
        let path = dir.join(&filename);

        let spec = self.backend.record_command(&path);
        let mut encoder = EncoderProcess::spawn(&spec, &path)?;
        if let Err(e) = encoder.ensure_running(self.settings.startup_grace).await {
            tracing::error!(filename = %filename, error = %e, "Encoder failed to start");
            return Err(e.into());
        }

        tracing::info!(
            filename = %filename,
            pid = ?encoder.pid(),
            camera_id = ?camera_id,
            "Recording started"
        );

        *active = Some(ActiveSession {
            camera_id,
            encoder,
            filename: filename.clone(),
            path,
            started_at,
            started: Instant::now(),
        });

        Ok(StartOutcome::Started { filename })
    }

    /// Stop the active session and hand back its filename.
    ///
    /// Returns `None` when idle. Stop failures are logged and reported in
    /// [`StoppedRecording::outcome`]; the session is cleared either way.
    pub async fn stop(&self) -> Option<StoppedRecording> {
        let mut active = self.active.lock().await;
        let session = active.take()?;

        let ActiveSession {
            camera_id,
            encoder,
            filename,
            path,
            started,
            ..
        } = session;

        let outcome = self.finish(encoder, &filename).await;
        let duration = started.elapsed();

        tracing::info!(
            filename = %filename,
            outcome = %outcome,
            duration_secs = duration.as_secs(),
            "Recording stopped"
        );

        Some(StoppedRecording {
            camera_id,
            filename,
            path,
            outcome,
            duration,
        })
    }

    async fn finish(&self, mut encoder: EncoderProcess, filename: &str) -> StopOutcome {
        match encoder.try_exit_status() {
            Ok(Some(status)) => {
                tracing::warn!(
                    filename = %filename,
                    %status,
                    "Encoder exited before stop was requested"
                );
                return StopOutcome::AlreadyExited(status);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(filename = %filename, error = %e, "Failed to poll encoder"),
        }

        let reason = match encoder.request_graceful_stop(self.settings.stop_timeout).await {
            Ok(status) => return StopOutcome::Graceful(status),
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Encoder did not stop gracefully");
                e.to_string()
            }
        };

        if self.settings.force_kill {
            if let Err(e) = encoder.kill().await {
                tracing::warn!(filename = %filename, error = %e, "Failed to kill encoder");
            }
            StopOutcome::ForceKilled { reason }
        } else {
            let filename = filename.to_string();
            tokio::spawn(async move {
                match encoder.wait().await {
                    Ok(status) => {
                        tracing::info!(filename = %filename, %status, "Detached encoder exited")
                    }
                    Err(e) => {
                        tracing::warn!(filename = %filename, error = %e, "Detached encoder wait failed")
                    }
                }
            });
            StopOutcome::Detached { reason }
        }
    }

    pub async fn is_recording(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn status(&self) -> RecordingStatus {
        let mut active = self.active.lock().await;
        match active.as_mut() {
            Some(session) => RecordingStatus {
                recording: true,
                camera_id: session.camera_id,
                filename: Some(session.filename.clone()),
                started_at: Some(session.started_at.with_timezone(&Utc)),
                pid: session.encoder.pid(),
                encoder_alive: Some(session.encoder.is_alive()),
            },
            None => RecordingStatus::default(),
        }
    }

    /// Stop any active session before the process exits so the output is
    /// finalized.
    pub async fn shutdown(&self) {
        if let Some(stopped) = self.stop().await {
            tracing::info!(
                filename = %stopped.filename,
                outcome = %stopped.outcome,
                "Active recording stopped for shutdown"
            );
        }
    }
}
