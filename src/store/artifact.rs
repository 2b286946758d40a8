//! Image artifacts exchanged with the shared store
//!
//! An [`ImageArtifact`] is a finalized image ready for display or upload. It
//! comes either from a confirmed camera capture or from the file picker; the
//! store treats both origins identically.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt::{self, Display};

use crate::capture::CapturedFrame;

/// Where an artifact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactOrigin {
    /// Confirmed still from the camera session
    Capture,
    /// File chosen by the user
    Upload,
}

impl Display for ArtifactOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactOrigin::Capture => write!(f, "camera capture"),
            ArtifactOrigin::Upload => write!(f, "upload"),
        }
    }
}

/// Locally resolvable reference used to render an artifact
///
/// Minted by the store for each artifact generation and revoked when that
/// artifact is replaced or cleared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayUrl {
    generation: u64,
    href: String,
}

impl DisplayUrl {
    pub(crate) fn for_generation(generation: u64) -> Self {
        Self {
            generation,
            href: format!("blob:livestock-capture/{}", generation),
        }
    }

    /// Store generation the URL was minted for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn as_str(&self) -> &str {
        &self.href
    }
}

impl Display for DisplayUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href)
    }
}

impl Serialize for DisplayUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.href)
    }
}

/// A finalized image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArtifact {
    bytes: Vec<u8>,
    mime_type: String,
    original_name: String,
    acquired_at: DateTime<Utc>,
    origin: ArtifactOrigin,
}

impl ImageArtifact {
    /// Create an artifact from encoded image bytes
    pub fn new(
        bytes: Vec<u8>,
        mime_type: &str,
        original_name: &str,
        origin: ArtifactOrigin,
    ) -> Self {
        Self {
            bytes,
            mime_type: mime_type.to_string(),
            original_name: original_name.to_string(),
            acquired_at: Utc::now(),
            origin,
        }
    }

    /// Promote a reviewed camera frame
    pub fn from_capture(frame: CapturedFrame) -> Self {
        let captured_at = frame.captured_at;
        let mut artifact = Self::new(
            frame.bytes,
            &frame.mime_type,
            &frame.file_name,
            ArtifactOrigin::Capture,
        );
        artifact.acquired_at = captured_at;
        artifact
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn origin(&self) -> ArtifactOrigin {
        self.origin
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The image as a data URL for use in HTML/web UIs
    pub fn as_data_url(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Read-only snapshot of the store's current artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactView {
    /// Store generation this artifact belongs to
    pub generation: u64,
    pub original_name: String,
    pub display_url: DisplayUrl,
    pub mime_type: String,
    pub size: u64,
    pub acquired_at: DateTime<Utc>,
    pub origin: ArtifactOrigin,
}

impl ArtifactView {
    pub(crate) fn of(artifact: &ImageArtifact, generation: u64, display_url: &DisplayUrl) -> Self {
        Self {
            generation,
            original_name: artifact.original_name.clone(),
            display_url: display_url.clone(),
            mime_type: artifact.mime_type.clone(),
            size: artifact.size(),
            acquired_at: artifact.acquired_at,
            origin: artifact.origin,
        }
    }

    /// Get a display-friendly size string
    pub fn formatted_size(&self) -> String {
        if self.size < 1024 {
            format!("{} B", self.size)
        } else if self.size < 1024 * 1024 {
            format!("{:.1} KB", self.size as f64 / 1024.0)
        } else {
            format!("{:.1} MB", self.size as f64 / (1024.0 * 1024.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let artifact = ImageArtifact::new(vec![1, 2, 3], "image/jpeg", "a.jpg", ArtifactOrigin::Upload);
        assert_eq!(artifact.as_data_url(), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn test_from_capture_keeps_name_and_time() {
        let frame = CapturedFrame {
            bytes: vec![0xFF, 0xD8, 0xFF],
            width: 4,
            height: 2,
            mime_type: "image/jpeg".to_string(),
            file_name: "cattle-capture-1700000000000.jpg".to_string(),
            captured_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };

        let artifact = ImageArtifact::from_capture(frame);
        assert_eq!(artifact.original_name(), "cattle-capture-1700000000000.jpg");
        assert_eq!(artifact.origin(), ArtifactOrigin::Capture);
        assert_eq!(artifact.acquired_at().timestamp_millis(), 1_700_000_000_000);
        assert_eq!(artifact.size(), 3);
    }

    #[test]
    fn test_view_formatted_size() {
        let artifact = ImageArtifact::new(vec![0; 2048], "image/png", "b.png", ArtifactOrigin::Upload);
        let view = ArtifactView::of(&artifact, 3, &DisplayUrl::for_generation(3));
        assert_eq!(view.formatted_size(), "2.0 KB");
        assert_eq!(view.display_url.as_str(), "blob:livestock-capture/3");
        assert_eq!(view.display_url.generation(), 3);
        assert_eq!(view.generation, 3);
        assert_eq!(
            serde_json::to_value(&view).unwrap()["display_url"],
            "blob:livestock-capture/3"
        );
    }
}
