use camstation_av::{CaptureSettings, EncodeSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub recording: RecordingConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_db_path() -> PathBuf {
    PathBuf::from("camstation.db")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Require a session token on protected routes
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Session timeout in hours (default: 24)
    #[serde(default = "default_session_timeout")]
    pub session_timeout_hours: u64,

    /// Admin account created at startup if it does not exist
    #[serde(default = "default_admin_username")]
    pub default_admin_username: String,

    #[serde(default = "default_admin_password")]
    pub default_admin_password: String,
}

fn default_true() -> bool {
    true
}
fn default_session_timeout() -> u64 {
    24
}
fn default_admin_username() -> String {
    "admin".to_string()
}
fn default_admin_password() -> String {
    "admin".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_timeout_hours: default_session_timeout(),
            default_admin_username: default_admin_username(),
            default_admin_password: default_admin_password(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingConfig {
    /// Directory recordings are written to
    #[serde(default = "default_recording_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// How long to wait for the encoder to finalize after the quit request
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Kill the encoder if it does not exit within the stop timeout
    #[serde(default = "default_true")]
    pub force_kill_on_timeout: bool,

    /// How long a new encoder must stay up before start() reports success
    #[serde(default = "default_startup_grace")]
    pub startup_grace_ms: u64,
}

fn default_recording_dir() -> PathBuf {
    PathBuf::from("recordings")
}
fn default_prefix() -> String {
    "webcam_record".to_string()
}
fn default_extension() -> String {
    "mp4".to_string()
}
fn default_video_codec() -> String {
    "libx264".to_string()
}
fn default_preset() -> String {
    "ultrafast".to_string()
}
fn default_pixel_format() -> String {
    "yuv420p".to_string()
}
fn default_stop_timeout() -> u64 {
    5
}
fn default_startup_grace() -> u64 {
    500
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            dir: default_recording_dir(),
            prefix: default_prefix(),
            extension: default_extension(),
            video_codec: default_video_codec(),
            preset: default_preset(),
            pixel_format: default_pixel_format(),
            stop_timeout_secs: default_stop_timeout(),
            force_kill_on_timeout: true,
            startup_grace_ms: default_startup_grace(),
        }
    }
}

impl RecordingConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_codec: self.video_codec.clone(),
            preset: self.preset.clone(),
            pixel_format: self.pixel_format.clone(),
        }
    }
}

/// Capture device settings. Unset fields fall back to the platform default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub input_format: Option<String>,

    /// Device selector, `{index}` is replaced by the device index
    #[serde(default)]
    pub device: Option<String>,

    #[serde(default)]
    pub device_index: u32,

    #[serde(default)]
    pub rtbufsize: Option<String>,

    #[serde(default)]
    pub framerate: Option<u32>,

    #[serde(default)]
    pub video_size: Option<String>,

    #[serde(default)]
    pub jpeg_quality: Option<u8>,
}

impl CaptureConfig {
    pub fn capture_settings(&self) -> CaptureSettings {
        let defaults = CaptureSettings::default();
        CaptureSettings {
            input_format: self
                .input_format
                .clone()
                .unwrap_or(defaults.input_format),
            device: self.device.clone().unwrap_or(defaults.device),
            device_index: self.device_index,
            rtbufsize: self.rtbufsize.clone().or(defaults.rtbufsize),
            framerate: self.framerate,
            video_size: self.video_size.clone(),
            jpeg_quality: self.jpeg_quality.unwrap_or(defaults.jpeg_quality),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Explicit ffmpeg binary, otherwise looked up in PATH
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}
