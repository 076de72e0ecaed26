use std::time::Duration;

use async_trait::async_trait;
use moodloop_common::classification::ClassificationResult;
use moodloop_common::frame::Frame;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("classifier request failed: {0}")]
    Transport(reqwest::Error),
    #[error("classifier returned HTTP status {0}")]
    Status(u16),
    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

/// Maps one frame to a label and an optional song suggestion.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<ClassificationResult, ClassifyError>;
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    image: &'a str,
}

/// Client for the remote `/detect` endpoint.
///
/// Does not retry; the next sampling tick is the retry. Without a configured
/// timeout a request may wait indefinitely, connection setup included.
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ClassifyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build().map_err(ClassifyError::Client)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, frame: &Frame) -> Result<ClassificationResult, ClassifyError> {
        let image = frame.to_data_uri();
        let response = self
            .client
            .post(&self.url)
            .json(&DetectRequest { image: &image })
            .send()
            .await
            .map_err(ClassifyError::Transport)?;

        if !response.status().is_success() {
            return Err(ClassifyError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await.map_err(ClassifyError::Transport)?;
        let result: ClassificationResult =
            serde_json::from_slice(&body).map_err(|e| ClassifyError::Malformed(e.to_string()))?;

        debug!(
            seq = frame.seq,
            captured_at = frame.captured_at(),
            bytes = frame.size(),
            label = result.label,
            has_suggestion = result.suggestion.is_some(),
            "classified frame"
        );
        Ok(result)
    }
}
