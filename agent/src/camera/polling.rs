use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use super::{CameraError, FrameSource};

/// Camera that fetches a single JPEG snapshot on every capture.
pub struct PollingCamera {
    client: reqwest::Client,
    frame_url: String,
    ready: AtomicBool,
}

impl PollingCamera {
    /// Acquire by fetching one snapshot; a camera that cannot serve a frame
    /// now is treated as unavailable.
    pub async fn acquire(frame_url: &str) -> Result<Self, CameraError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(CameraError::HttpConnect)?;
        let camera = Self {
            client,
            frame_url: frame_url.to_string(),
            ready: AtomicBool::new(false),
        };
        let first = camera.fetch().await?;
        info!(bytes = first.len(), url = frame_url, "camera snapshot endpoint ready");
        Ok(camera)
    }

    async fn fetch(&self) -> Result<Bytes, CameraError> {
        let resp = self
            .client
            .get(&self.frame_url)
            .send()
            .await
            .map_err(CameraError::HttpConnect)?;

        if !resp.status().is_success() {
            return Err(CameraError::HttpStatus(resp.status().as_u16()));
        }

        let jpeg = resp.bytes().await.map_err(CameraError::HttpStream)?;
        debug!(bytes = jpeg.len(), "fetched camera snapshot");
        self.ready.store(true, Ordering::Release);
        Ok(jpeg)
    }
}

#[async_trait]
impl FrameSource for PollingCamera {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn latest_jpeg(&self) -> Result<Bytes, CameraError> {
        self.fetch().await
    }

    fn name(&self) -> &str {
        "polling"
    }
}
