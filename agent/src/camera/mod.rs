pub mod mjpeg;
pub mod polling;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use moodloop_common::config::CameraConfig;
use tracing::info;

pub use mjpeg::MjpegCamera;
pub use polling::PollingCamera;

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("HTTP connection failed: {0}")]
    HttpConnect(reqwest::Error),
    #[error("HTTP stream error: {0}")]
    HttpStream(reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("camera has not produced a frame yet")]
    NotReady,
    #[error("unknown camera mode '{0}', expected 'mjpeg' or 'polling'")]
    UnknownMode(String),
}

/// A live camera that can hand out its most recent JPEG.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// True once the camera has delivered at least one decoded frame.
    fn is_ready(&self) -> bool;

    /// The current raw JPEG as delivered by the camera (not mirrored).
    async fn latest_jpeg(&self) -> Result<Bytes, CameraError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Acquire the camera described by `config`. Failure here is fatal to the agent.
pub async fn acquire(config: &CameraConfig) -> Result<Arc<dyn FrameSource>, CameraError> {
    let url = camera_url(config)?;
    info!(url, mode = config.mode, "acquiring camera");
    match config.mode.as_str() {
        "mjpeg" => Ok(Arc::new(MjpegCamera::acquire(&url).await?)),
        "polling" => Ok(Arc::new(PollingCamera::acquire(&url).await?)),
        other => Err(CameraError::UnknownMode(other.to_string())),
    }
}

/// Build the request URL for the configured mode. Polling mode talks to the
/// single-frame endpoint next to the stream.
pub fn camera_url(config: &CameraConfig) -> Result<String, CameraError> {
    match config.mode.as_str() {
        "mjpeg" => Ok(format!(
            "{}?quality={}&fps={}",
            config.url, config.quality, config.fps
        )),
        "polling" => Ok(format!(
            "{}?quality={}",
            config.url.replace("/stream", "/frame"),
            config.quality
        )),
        other => Err(CameraError::UnknownMode(other.to_string())),
    }
}
