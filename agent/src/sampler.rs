use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops;
use image::ImageReader;
use moodloop_common::frame::{Frame, JPEG_QUALITY};
use tracing::debug;

use crate::camera::{CameraError, FrameSource};

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("failed to read camera frame: {0}")]
    Read(std::io::Error),
    #[error("failed to decode camera frame: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode sampled frame: {0}")]
    Encode(image::ImageError),
}

/// Turns the camera's current picture into a transportable [`Frame`].
///
/// The picture is mirrored horizontally so the classifier and the user see
/// the same orientation as a mirror would show, then re-encoded as JPEG at
/// [`JPEG_QUALITY`].
pub struct FrameSampler {
    source: Arc<dyn FrameSource>,
    seq: AtomicU64,
}

impl FrameSampler {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            source,
            seq: AtomicU64::new(0),
        }
    }

    /// Callers must not capture before this is true.
    pub fn is_ready(&self) -> bool {
        self.source.is_ready()
    }

    pub async fn capture(&self) -> Result<Frame, SampleError> {
        let raw = self.source.latest_jpeg().await?;
        let jpeg = mirror_jpeg(&raw, JPEG_QUALITY)?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        debug!(
            seq,
            source = self.source.name(),
            raw_bytes = raw.len(),
            bytes = jpeg.len(),
            "sampled frame"
        );
        Ok(Frame::new(jpeg, Utc::now().timestamp_millis(), seq))
    }
}

/// Decode a JPEG, flip it left-to-right and encode it again.
pub fn mirror_jpeg(raw: &[u8], quality: u8) -> Result<Vec<u8>, SampleError> {
    let img = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(SampleError::Read)?
        .decode()
        .map_err(SampleError::Decode)?;

    let mirrored = imageops::flip_horizontal(&img.to_rgb8());

    let mut out = Vec::with_capacity(raw.len());
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&mirrored)
        .map_err(SampleError::Encode)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::tests::{split_jpeg, StillCamera};
    use bytes::Bytes;

    fn luma_at(jpeg: &[u8], x: u32, y: u32) -> u8 {
        let img = image::load_from_memory(jpeg).unwrap().to_luma8();
        img.get_pixel(x, y).0[0]
    }

    #[test]
    fn mirror_swaps_left_and_right() {
        let raw = split_jpeg(32, 16);
        assert!(luma_at(&raw, 4, 8) > 200);
        assert!(luma_at(&raw, 27, 8) < 50);

        let mirrored = mirror_jpeg(&raw, JPEG_QUALITY).unwrap();
        assert!(luma_at(&mirrored, 4, 8) < 50);
        assert!(luma_at(&mirrored, 27, 8) > 200);
    }

    #[test]
    fn mirror_keeps_dimensions() {
        let mirrored = mirror_jpeg(&split_jpeg(40, 24), JPEG_QUALITY).unwrap();
        let img = image::load_from_memory(&mirrored).unwrap();
        assert_eq!((img.width(), img.height()), (40, 24));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = mirror_jpeg(b"definitely not a jpeg", JPEG_QUALITY).unwrap_err();
        assert!(matches!(err, SampleError::Decode(_)));
    }

    #[tokio::test]
    async fn capture_numbers_frames() {
        let sampler = FrameSampler::new(Arc::new(StillCamera(Some(Bytes::from(split_jpeg(16, 8))))));
        assert!(sampler.is_ready());
        let a = sampler.capture().await.unwrap();
        let b = sampler.capture().await.unwrap();
        assert_eq!((a.seq, b.seq), (0, 1));
        assert!(a.to_data_uri().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[tokio::test]
    async fn capture_before_ready_is_camera_error() {
        let sampler = FrameSampler::new(Arc::new(StillCamera(None)));
        assert!(!sampler.is_ready());
        let err = sampler.capture().await.unwrap_err();
        assert!(matches!(err, SampleError::Camera(CameraError::NotReady)));
    }
}
