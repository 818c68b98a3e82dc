//! Error types for camstation-av.

use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, AvError>;

/// Errors raised while driving ffmpeg or reading a capture device.
#[derive(Debug, thiserror::Error)]
pub enum AvError {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// The encoder or capture process could not be launched.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process started but exited before it was considered running
    /// (typically a missing or busy capture device).
    #[error("{program} exited during startup ({status})")]
    ExitedEarly { program: String, status: String },

    /// The process did not exit within the graceful-stop bound.
    #[error("process did not exit within {timeout:?} of the quit request")]
    StopTimeout { timeout: Duration },

    /// Writing the quit instruction to the process failed.
    #[error("failed to signal process: {0}")]
    SignalIo(#[source] std::io::Error),

    /// The capture device stopped producing frames.
    #[error("capture device read failed: {0}")]
    DeviceRead(#[source] std::io::Error),

    /// Any other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvError {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a spawn error.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}

impl From<AvError> for camstation_common::Error {
    fn from(err: AvError) -> Self {
        match err {
            AvError::ToolNotFound { tool } => {
                let message = format!("{tool} not found; is it installed and in PATH?");
                camstation_common::Error::tool(tool, message)
            }
            e @ (AvError::Spawn { .. } | AvError::ExitedEarly { .. }) => {
                camstation_common::Error::Recording(e.to_string())
            }
            AvError::Io(e) => camstation_common::Error::Io(e),
            other => camstation_common::Error::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = AvError::StopTimeout {
            timeout: Duration::from_secs(5),
        };
        assert_eq!(
            err.to_string(),
            "process did not exit within 5s of the quit request"
        );

        let err = AvError::spawn(
            "ffmpeg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        );
        assert_eq!(err.to_string(), "failed to spawn ffmpeg: No such file");
    }

    #[test]
    fn test_spawn_maps_to_recording_error() {
        let err: camstation_common::Error = AvError::spawn(
            "ffmpeg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        )
        .into();
        assert_eq!(err.code(), "recording_error");
    }

    #[test]
    fn test_tool_not_found_maps_to_tool_error() {
        let err: camstation_common::Error = AvError::tool_not_found("ffmpeg").into();
        assert_eq!(err.http_status(), 502);
    }
}
