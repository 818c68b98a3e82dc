//! Command lines for recording and live capture.
//!
//! A [`CaptureBackend`] turns "record to this file" and "preview device N"
//! into concrete [`ProcessSpec`]s. [`FfmpegBackend`] is the production
//! implementation; tests substitute shell scripts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Program and arguments for one external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name for log lines and error messages.
    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// Builds the external commands used by the recorder and the frame streamer.
pub trait CaptureBackend: Send + Sync {
    /// Command that records the default capture device into `output` and
    /// quits cleanly when it reads `q` on stdin.
    fn record_command(&self, output: &Path) -> ProcessSpec;

    /// Command that writes a continuous MJPEG stream of `device_index` to
    /// stdout.
    fn preview_command(&self, device_index: u32) -> ProcessSpec;
}

/// How the capture device is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// ffmpeg input format (`v4l2`, `avfoundation`, `dshow`).
    pub input_format: String,
    /// Device selector; `{index}` is replaced with the device index.
    pub device: String,
    /// Index of the default local camera.
    pub device_index: u32,
    /// Real-time input buffer size passed as `-rtbufsize`.
    pub rtbufsize: Option<String>,
    pub framerate: Option<u32>,
    /// Capture size such as `1280x720`.
    pub video_size: Option<String>,
    /// MJPEG quality for previews (`-q:v`, 2 best .. 31 worst).
    pub jpeg_quality: u8,
}

impl CaptureSettings {
    /// Device selector for `index`.
    pub fn device_for(&self, index: u32) -> String {
        self.device.replace("{index}", &index.to_string())
    }

    fn input_args(&self, index: u32) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.input_format.clone()];
        if let Some(ref size) = self.rtbufsize {
            args.extend(["-rtbufsize".to_string(), size.clone()]);
        }
        if let Some(fps) = self.framerate {
            args.extend(["-framerate".to_string(), fps.to_string()]);
        }
        if let Some(ref size) = self.video_size {
            args.extend(["-video_size".to_string(), size.clone()]);
        }
        args.extend(["-i".to_string(), self.device_for(index)]);
        args
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        let (input_format, device) = if cfg!(target_os = "windows") {
            ("dshow", "video=Integrated Camera")
        } else if cfg!(target_os = "macos") {
            ("avfoundation", "{index}")
        } else {
            ("v4l2", "/dev/video{index}")
        };

        Self {
            input_format: input_format.to_string(),
            device: device.to_string(),
            device_index: 0,
            rtbufsize: Some("100M".to_string()),
            framerate: None,
            video_size: None,
            jpeg_quality: 5,
        }
    }
}

/// Encoder options for recordings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub pixel_format: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

/// [`CaptureBackend`] that drives the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    capture: CaptureSettings,
    encode: EncodeSettings,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<PathBuf>, capture: CaptureSettings, encode: EncodeSettings) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            capture,
            encode,
        }
    }

    pub fn capture(&self) -> &CaptureSettings {
        &self.capture
    }
}

impl CaptureBackend for FfmpegBackend {
    fn record_command(&self, output: &Path) -> ProcessSpec {
        let spec = ProcessSpec::new(&self.ffmpeg)
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(self.capture.input_args(self.capture.device_index))
            .args([
                "-vcodec",
                self.encode.video_codec.as_str(),
                "-preset",
                self.encode.preset.as_str(),
                "-pix_fmt",
                self.encode.pixel_format.as_str(),
            ])
            .arg(output.to_string_lossy());

        tracing::debug!("FFmpeg record args: {:?}", spec.args);
        spec
    }

    fn preview_command(&self, device_index: u32) -> ProcessSpec {
        let spec = ProcessSpec::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .args(self.capture.input_args(device_index))
            .args(["-an", "-c:v", "mjpeg", "-q:v"])
            .arg(self.capture.jpeg_quality.to_string())
            .args(["-f", "mjpeg", "pipe:1"]);

        tracing::debug!("FFmpeg preview args: {:?}", spec.args);
        spec
    }
}
