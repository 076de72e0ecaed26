use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// JPEG quality used when re-encoding a sampled frame for transport.
pub const JPEG_QUALITY: u8 = 70;

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// One encoded snapshot of the camera at a sampling instant.
///
/// Frames are produced on demand by the sampler, sent to the classifier once
/// and dropped. Nothing keeps them past their cycle.
#[derive(Debug, Clone)]
pub struct Frame {
    pub jpeg: Vec<u8>,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl Frame {
    pub fn new(jpeg: Vec<u8>, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            jpeg,
            captured_at_ms,
            seq,
        }
    }

    /// Encode as `data:image/jpeg;base64,...`, the form the classifier expects.
    pub fn to_data_uri(&self) -> String {
        let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + self.jpeg.len() * 4 / 3 + 4);
        uri.push_str(DATA_URI_PREFIX);
        STANDARD.encode_string(&self.jpeg, &mut uri);
        uri
    }

    pub fn size(&self) -> usize {
        self.jpeg.len()
    }

    /// Capture time as RFC 3339, for log fields.
    pub fn captured_at(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.captured_at_ms)
            .unwrap_or_else(chrono::Utc::now)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }
}
