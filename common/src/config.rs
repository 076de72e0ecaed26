use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub url: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default = "default_fps")]
    pub fps: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub base_url: String,
    #[serde(default = "default_detect_path")]
    pub detect_path: String,
    /// Unset means requests may hang indefinitely; the next cycle waits for them.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_player")]
    pub player: String,
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,
    /// Base URL that `/songs/...` references are resolved against.
    /// Falls back to `classifier.base_url`.
    #[serde(default)]
    pub media_base_url: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            player_args: default_player_args(),
            media_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Full URL of the classifier's detect endpoint.
    pub fn detect_url(&self) -> String {
        join_url(&self.classifier.base_url, &self.classifier.detect_path)
    }

    pub fn media_base_url(&self) -> &str {
        self.playback
            .media_base_url
            .as_deref()
            .unwrap_or(&self.classifier.base_url)
    }
}

/// Join a base URL and an absolute path without doubling the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_mode() -> String {
    "mjpeg".into()
}
fn default_quality() -> u32 {
    80
}
fn default_fps() -> f64 {
    10.0
}
fn default_detect_path() -> String {
    "/detect".into()
}
fn default_player() -> String {
    "ffplay".into()
}
fn default_player_args() -> Vec<String> {
    ["-nodisp", "-autoexit", "-loglevel", "quiet"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_log_level() -> String {
    "info".into()
}
