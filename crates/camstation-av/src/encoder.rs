//! Handle for one running encoder process.
//!
//! The encoder (ffmpeg) is spawned with stdin piped so it can be asked to
//! quit in-band, which lets it finalize the MP4 container. stdout and stderr
//! are discarded. Dropping a handle whose process is still alive kills it.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

use crate::backend::ProcessSpec;
use crate::{AvError, Result};

/// ffmpeg's interactive quit command.
const QUIT_INSTRUCTION: &[u8] = b"q\n";

/// One spawned encoder process writing to `output`.
#[derive(Debug)]
pub struct EncoderProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    pid: Option<u32>,
    program: String,
    output: PathBuf,
}

impl EncoderProcess {
    /// Launch `spec`, which is expected to write to `output`.
    pub fn spawn(spec: &ProcessSpec, output: impl Into<PathBuf>) -> Result<Self> {
        let program = spec.display_name();
        let output = output.into();

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AvError::spawn(&program, e))?;

        let stdin = child.stdin.take();
        let pid = child.id();

        tracing::info!(
            pid = ?pid,
            program = %program,
            output = %output.display(),
            "Encoder started"
        );

        Ok(Self {
            child,
            stdin,
            pid,
            program,
            output,
        })
    }

    /// OS process id captured at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Non-blocking check whether the process is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Exit status if the process has already exited on its own.
    pub fn try_exit_status(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Wait `grace` and fail with [`AvError::ExitedEarly`] if the process
    /// is already gone by then (bad arguments, missing or busy device).
    pub async fn ensure_running(&mut self, grace: Duration) -> Result<()> {
        if !grace.is_zero() {
            if let Ok(status) = tokio::time::timeout(grace, self.child.wait()).await {
                let status = status?;
                return Err(AvError::ExitedEarly {
                    program: self.program.clone(),
                    status: status.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Send the quit instruction and wait up to `timeout` for exit.
    ///
    /// Returns [`AvError::SignalIo`] if the instruction could not be
    /// written and [`AvError::StopTimeout`] if the process outlives the
    /// deadline. The process is never killed here.
    pub async fn request_graceful_stop(&mut self, timeout: Duration) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        let mut stdin = self.stdin.take().ok_or_else(|| {
            AvError::SignalIo(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "encoder stdin already closed",
            ))
        })?;

        tracing::debug!(pid = ?self.pid, "Sending quit instruction to encoder");
        stdin
            .write_all(QUIT_INSTRUCTION)
            .await
            .map_err(AvError::SignalIo)?;
        stdin.flush().await.map_err(AvError::SignalIo)?;
        drop(stdin);

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => Err(AvError::StopTimeout { timeout }),
        }
    }

    /// Wait for the process to exit on its own, without a deadline.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.stdin.take();
        Ok(self.child.wait().await?)
    }

    /// Force-terminate the process and reap it.
    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await?;
        tracing::warn!(pid = ?self.pid, program = %self.program, "Encoder force-killed");
        Ok(())
    }
}

impl Drop for EncoderProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            tracing::warn!(
                pid = ?self.pid,
                output = %self.output.display(),
                "Encoder handle dropped while process alive, killing it"
            );
            let _ = self.child.start_kill();
        }
    }
}
