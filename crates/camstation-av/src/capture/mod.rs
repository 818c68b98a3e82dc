//! Live frame streaming from a capture device.
//!
//! [`open_stream`] starts a preview process that writes MJPEG to stdout and
//! returns a [`FrameStream`] yielding one multipart chunk per frame. The
//! device is released when the stream ends, fails, or is dropped.

mod mjpeg;

use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::codec::FramedRead;

pub use mjpeg::{multipart_chunk, JpegFrameCodec, BOUNDARY, MULTIPART_CONTENT_TYPE};

use crate::backend::ProcessSpec;
use crate::{AvError, Result};

/// Stream of multipart-framed JPEG images read from a capture process.
#[derive(Debug)]
pub struct FrameStream {
    child: Option<Child>,
    frames: FramedRead<ChildStdout, JpegFrameCodec>,
    device: String,
    delivered: u64,
}

/// Spawn the preview process described by `spec` and wrap its stdout.
///
/// `device` is only used for log lines.
pub fn open_stream(spec: &ProcessSpec, device: impl Into<String>) -> Result<FrameStream> {
    let program = spec.display_name();
    let device = device.into();

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| AvError::spawn(&program, e))?;

    let stdout = child.stdout.take().ok_or_else(|| {
        AvError::DeviceRead(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "capture process has no stdout",
        ))
    })?;

    tracing::info!(pid = ?child.id(), device = %device, "Capture stream opened");

    Ok(FrameStream {
        child: Some(child),
        frames: FramedRead::new(stdout, JpegFrameCodec::new()),
        device,
        delivered: 0,
    })
}

impl FrameStream {
    /// Whether the capture process is still held by this stream.
    pub fn is_open(&self) -> bool {
        self.child.is_some()
    }

    /// Number of frames yielded so far.
    pub fn frames_delivered(&self) -> u64 {
        self.delivered
    }

    /// Kill the capture process without waiting for it. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
            tracing::info!(
                device = %self.device,
                frames = self.delivered,
                "Capture stream closed"
            );
        }
    }

    /// Kill the capture process and wait until it has exited.
    pub async fn release(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            child.kill().await?;
            tracing::info!(
                device = %self.device,
                frames = self.delivered,
                "Capture stream released"
            );
        }
        Ok(())
    }
}

impl Stream for FrameStream {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        let this = self.get_mut();
        if this.child.is_none() {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.frames).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(frame))) => {
                this.delivered += 1;
                Poll::Ready(Some(multipart_chunk(&frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                let err = AvError::DeviceRead(e);
                tracing::debug!(device = %this.device, error = %err, "Capture stream ended");
                this.close();
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                tracing::debug!(device = %this.device, "Capture process closed its output");
                this.close();
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.close();
    }
}
