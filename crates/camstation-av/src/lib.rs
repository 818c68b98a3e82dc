//! # camstation-av
//!
//! ffmpeg process control for the camstation webcam station.
//!
//! This crate provides:
//! - Tool discovery for the ffmpeg executable
//! - Command construction for recording and live preview ([`CaptureBackend`])
//! - An owned encoder process handle that is killed on drop ([`EncoderProcess`])
//! - A multipart MJPEG frame stream read from a capture process ([`FrameStream`])
//!
//! ## Example
//!
//! ```no_run
//! use camstation_av::{CaptureBackend, CaptureSettings, EncodeSettings, EncoderProcess, FfmpegBackend};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn run() -> camstation_av::Result<()> {
//! let backend = FfmpegBackend::new("ffmpeg", CaptureSettings::default(), EncodeSettings::default());
//! let output = Path::new("recordings/webcam_record_20240101_120000.mp4");
//!
//! let mut encoder = EncoderProcess::spawn(&backend.record_command(output), output)?;
//! encoder.ensure_running(Duration::from_millis(500)).await?;
//! // ...
//! encoder.request_graceful_stop(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod backend;
pub mod capture;
pub mod encoder;
pub mod tools;

// Re-exports
pub use backend::{CaptureBackend, CaptureSettings, EncodeSettings, FfmpegBackend, ProcessSpec};
pub use capture::{open_stream, FrameStream, MULTIPART_CONTENT_TYPE};
pub use encoder::EncoderProcess;
pub use error::{AvError, Result};
pub use tools::{ToolInfo, ToolRegistry};
