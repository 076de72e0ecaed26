use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{CameraError, FrameSource};

const BOUNDARY: &[u8] = b"--frame\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parse state for the MJPEG multipart stream.
enum ParseState {
    /// Looking for the boundary marker `--frame\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Incremental splitter for a `multipart/x-mixed-replace` JPEG stream.
///
/// Chunks may cut anywhere, including through a boundary; a JPEG is only
/// emitted once the boundary that terminates it has been seen.
pub struct MjpegParser {
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
}

impl MjpegParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
        }
    }

    /// Feed one chunk, returning every JPEG completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);
        let mut completed = Vec::new();

        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                        let _ = self.buffer.split_to(pos + BOUNDARY.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep the tail in case the boundary spans chunks
                        if self.buffer.len() > BOUNDARY.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - BOUNDARY.len());
                        }
                        break;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.jpeg_start = 0;
                        self.state = ParseState::CollectingJpeg;
                    } else {
                        break;
                    }
                }
                ParseState::CollectingJpeg => {
                    let Some(pos) = find_subsequence(&self.buffer[self.jpeg_start..], BOUNDARY)
                    else {
                        // Skip already-scanned bytes next time
                        self.jpeg_start = self.buffer.len().saturating_sub(BOUNDARY.len());
                        break;
                    };

                    let jpeg_end = self.jpeg_start + pos;
                    let end = if jpeg_end >= 2 && &self.buffer[jpeg_end - 2..jpeg_end] == b"\r\n" {
                        jpeg_end - 2
                    } else {
                        jpeg_end
                    };

                    let mut part = self.buffer.split_to(jpeg_end + BOUNDARY.len());
                    part.truncate(end);
                    if !part.is_empty() {
                        completed.push(part.freeze());
                    }

                    self.state = ParseState::SeekingHeaderEnd;
                }
            }
        }

        completed
    }
}

impl Default for MjpegParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera backed by a long-lived MJPEG stream.
///
/// A background task keeps the latest complete JPEG in a watch channel and
/// reconnects with exponential backoff when the stream drops, so capture
/// always reads the newest frame without touching the network.
pub struct MjpegCamera {
    latest: watch::Receiver<Option<Bytes>>,
    task: JoinHandle<()>,
}

impl MjpegCamera {
    /// Connect to the stream. Only this first connection is allowed to fail
    /// the acquisition; later drops are retried in the background.
    pub async fn acquire(url: &str) -> Result<Self, CameraError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(CameraError::HttpConnect)?;
        let response = connect(&client, url).await?;

        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(run_stream(client, url.to_string(), response, tx));

        Ok(Self { latest: rx, task })
    }
}

impl Drop for MjpegCamera {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl FrameSource for MjpegCamera {
    fn is_ready(&self) -> bool {
        self.latest.borrow().is_some()
    }

    async fn latest_jpeg(&self) -> Result<Bytes, CameraError> {
        self.latest.borrow().clone().ok_or(CameraError::NotReady)
    }

    fn name(&self) -> &str {
        "mjpeg"
    }
}

async fn connect(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, CameraError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(CameraError::HttpConnect)?;

    if !response.status().is_success() {
        return Err(CameraError::HttpStatus(response.status().as_u16()));
    }

    info!(status = %response.status(), "connected to MJPEG stream");
    Ok(response)
}

async fn run_stream(
    client: reqwest::Client,
    url: String,
    first: reqwest::Response,
    tx: watch::Sender<Option<Bytes>>,
) {
    let mut backoff = Duration::from_secs(2);
    let max_backoff = Duration::from_secs(30);
    let mut pending = Some(first);

    loop {
        let result = match pending.take() {
            Some(response) => consume_stream(response, &tx).await,
            None => match connect(&client, &url).await {
                Ok(response) => consume_stream(response, &tx).await,
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(()) => {
                info!("stream ended cleanly, reconnecting");
                backoff = Duration::from_secs(2);
            }
            Err(e) => {
                error!(error = %e, "stream error, reconnecting in {:?}", backoff);
            }
        }

        if tx.is_closed() {
            debug!("camera dropped, stopping stream task");
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(max_backoff);
    }
}

async fn consume_stream(
    response: reqwest::Response,
    tx: &watch::Sender<Option<Bytes>>,
) -> Result<(), CameraError> {
    let mut byte_stream = response.bytes_stream();
    let mut parser = MjpegParser::new();
    let mut frames: u64 = 0;

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk.map_err(CameraError::HttpStream)?;
        for jpeg in parser.push(&chunk) {
            frames += 1;
            if frames == 1 {
                info!(bytes = jpeg.len(), "first frame received, camera ready");
            }
            tx.send_replace(Some(jpeg));
        }
    }

    debug!(frames, "MJPEG stream closed");
    Ok(())
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
