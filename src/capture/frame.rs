//! Captured still frames
//!
//! A [`CapturedFrame`] is the JPEG-encoded snapshot taken by `capture()`. It
//! lives only inside the session until it is confirmed (promoted to an
//! [`crate::store::ImageArtifact`]) or discarded by a retake.

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// MIME type of captured stills
pub const CAPTURE_MIME_TYPE: &str = "image/jpeg";

/// A still image taken from a live stream
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// Encoded JPEG bytes
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    /// Synthesized name, `<prefix>-<unix millis>.jpg`
    pub file_name: String,
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    /// Encode a raw frame
    pub fn encode(
        image: &RgbImage,
        quality: u8,
        prefix: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, image::ImageError> {
        Ok(Self {
            bytes: encode_jpeg(image, quality)?,
            width: image.width(),
            height: image.height(),
            mime_type: CAPTURE_MIME_TYPE.to_string(),
            file_name: capture_file_name(prefix, captured_at),
            captured_at,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Name for a still captured at `at`
pub fn capture_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}.jpg", prefix, at.timestamp_millis())
}

/// Lossy JPEG encoding of a raw RGB frame
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100)).encode_image(image)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]))
    }

    #[test]
    fn test_file_name_pattern() {
        let at = DateTime::from_timestamp_millis(1_718_000_000_123).unwrap();
        assert_eq!(
            capture_file_name("cattle-capture", at),
            "cattle-capture-1718000000123.jpg"
        );
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let frame = CapturedFrame::encode(&gradient(64, 36), 90, "cattle-capture", Utc::now()).unwrap();

        assert_eq!(&frame.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 36);
        assert_eq!(frame.mime_type, "image/jpeg");
        assert!(frame.file_name.starts_with("cattle-capture-"));
        assert!(frame.size() > 0);
        assert_eq!(
            image::guess_format(&frame.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_quality_affects_size() {
        let image = gradient(64, 64);
        let low = encode_jpeg(&image, 10).unwrap();
        let high = encode_jpeg(&image, 100).unwrap();
        assert!(low.len() < high.len());
    }
}
