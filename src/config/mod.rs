mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Locations searched when no config file is given on the command line.
const DEFAULT_PATHS: [&str; 4] = [
    "./config.toml",
    "./camstation.toml",
    "~/.config/camstation/config.toml",
    "/etc/camstation/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to load config file: {:?}", path))?;

    Ok(config)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Invalid TOML")?;
    validate_config(&config)?;
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    match find_config_file(custom_path) {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// Resolve which config file would be used, if any
pub fn find_config_file(custom_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = custom_path {
        return Some(path.to_path_buf());
    }

    DEFAULT_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    let recording = &config.recording;
    if recording.stop_timeout_secs == 0 {
        anyhow::bail!("recording.stop_timeout_secs must be at least 1");
    }
    if recording.prefix.trim().is_empty() {
        anyhow::bail!("recording.prefix cannot be empty");
    }
    if recording.extension.trim().is_empty() || recording.extension.contains(['/', '\\', '.']) {
        anyhow::bail!(
            "recording.extension must be a bare extension, got {:?}",
            recording.extension
        );
    }
    if recording.prefix.contains(['/', '\\']) {
        anyhow::bail!("recording.prefix cannot contain path separators");
    }

    if let Some(q) = config.capture.jpeg_quality {
        if !(2..=31).contains(&q) {
            anyhow::bail!("capture.jpeg_quality must be between 2 and 31, got {q}");
        }
    }

    if config.auth.session_timeout_hours == 0 {
        anyhow::bail!("auth.session_timeout_hours must be at least 1");
    }

    if let Some(ref ffmpeg) = config.tools.ffmpeg_path {
        if !ffmpeg.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", ffmpeg);
        }
    }

    Ok(())
}
