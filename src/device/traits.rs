//! Media device abstraction traits
//!
//! This module defines the platform media-capture capability the capture
//! session depends on. Real platform backends and the simulated devices in
//! [`crate::testdb`] implement the same traits, so the session can be driven
//! and tested without a camera attached.
//!
//! # Architecture
//!
//! - `MediaDevices` - Enumerates capture devices and opens video streams
//! - `VideoStream` - One open video source that can hand out still frames
//! - `MediaDeviceDescriptor` - Enumerated device information (shared, not a trait)
//! - `StreamConstraints` - What the session asks for when opening a stream
//! - `PlatformError` - Raw platform failure, classified into [`DeviceError`]
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use livestock_capture::device::{MediaDevices, StreamConstraints, VideoStream};
//!
//! async fn snapshot<M: MediaDevices>(media: &M) -> Option<(u32, u32)> {
//!     let devices = media.enumerate_devices().await.ok()?;
//!     let constraints = StreamConstraints::default()
//!         .with_device(devices.first().map(|d| d.id.clone()));
//!     let mut stream = media.open_stream(&constraints).await.ok()?;
//!     let frame = stream.grab_frame().ok()?;
//!     stream.close();
//!     Some(frame.dimensions())
//! }
//! ```

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::core::error::DeviceError;

/// Camera facing preference passed with the stream constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the operator
    User,
    /// Rear camera, facing the subject
    Environment,
}

impl Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// An enumerated video capture device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceDescriptor {
    /// Opaque, stable device identifier
    pub id: String,
    /// Human-readable name; empty when the platform withholds labels
    pub label: String,
}

impl MediaDeviceDescriptor {
    /// Create a new descriptor
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    /// Label for display, falling back to `Camera N` (1-based) when unlabeled
    pub fn display_label(&self, index: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Camera {}", index + 1)
        } else {
            self.label.clone()
        }
    }
}

/// Constraints for opening a video stream
///
/// Width and height are hints; the platform picks the closest mode it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Preferred device, or the platform default when `None`
    pub device_id: Option<String>,
    /// Ideal frame width
    pub ideal_width: u32,
    /// Ideal frame height
    pub ideal_height: u32,
    /// Facing preference, or none forced
    pub facing_mode: Option<FacingMode>,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            ideal_width: 1280,
            ideal_height: 720,
            facing_mode: None,
        }
    }
}

impl StreamConstraints {
    pub fn with_device(mut self, device_id: Option<String>) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.ideal_width = width;
        self.ideal_height = height;
        self
    }

    pub fn with_facing(mut self, facing_mode: Option<FacingMode>) -> Self {
        self.facing_mode = facing_mode;
        self
    }
}

/// Platform error names, as reported by media capture APIs
pub mod error_names {
    pub const NOT_ALLOWED: &str = "NotAllowedError";
    pub const PERMISSION_DENIED: &str = "PermissionDeniedError";
    pub const SECURITY: &str = "SecurityError";
    pub const NOT_FOUND: &str = "NotFoundError";
    pub const DEVICES_NOT_FOUND: &str = "DevicesNotFoundError";
    pub const NOT_SUPPORTED: &str = "NotSupportedError";
    pub const NOT_READABLE: &str = "NotReadableError";
    pub const ABORT: &str = "AbortError";
}

/// Raw failure reported by the platform media layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    /// Platform error name, e.g. `NotAllowedError`
    pub name: String,
    /// Free-form platform message
    pub message: String,
}

impl PlatformError {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_allowed() -> Self {
        Self::new(error_names::NOT_ALLOWED, "Permission denied")
    }

    pub fn not_found() -> Self {
        Self::new(error_names::NOT_FOUND, "Requested device not found")
    }

    pub fn not_supported() -> Self {
        Self::new(error_names::NOT_SUPPORTED, "Video capture is not supported")
    }

    pub fn not_readable(message: &str) -> Self {
        Self::new(error_names::NOT_READABLE, message)
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for PlatformError {}

impl From<PlatformError> for DeviceError {
    fn from(err: PlatformError) -> Self {
        use error_names::*;

        match err.name.as_str() {
            NOT_ALLOWED | PERMISSION_DENIED | SECURITY => DeviceError::PermissionDenied,
            NOT_FOUND | DEVICES_NOT_FOUND => DeviceError::DeviceNotFound,
            NOT_SUPPORTED => DeviceError::DeviceUnsupported,
            name if name.to_lowercase().contains("permission") => DeviceError::PermissionDenied,
            _ => DeviceError::Unknown(err.to_string()),
        }
    }
}

/// One open video source
///
/// Implementations must make `close` idempotent. A stream that has been
/// closed never produces frames again.
pub trait VideoStream: Send {
    /// Identifier unique among streams opened by the same backend
    fn id(&self) -> u64;

    /// Device the stream is bound to
    fn device_id(&self) -> &str;

    /// Negotiated frame size
    fn resolution(&self) -> (u32, u32);

    /// Snapshot of the frame currently on the wire
    fn grab_frame(&mut self) -> Result<RgbImage, PlatformError>;

    /// Stop the stream and release the device
    fn close(&mut self);

    /// Whether the stream is still open
    fn is_open(&self) -> bool;
}

/// Platform media-device capability
///
/// Both calls are suspension points and may fail; callers must not assume
/// immediate completion.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// The stream type returned when opening a device
    type Stream: VideoStream + 'static;

    /// Enumerate available video input devices
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceDescriptor>, PlatformError>;

    /// Open a video stream satisfying the constraints as closely as possible
    async fn open_stream(&self, constraints: &StreamConstraints)
        -> Result<Self::Stream, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_display_label() {
        let labeled = MediaDeviceDescriptor::new("cam-1", "Rear Camera");
        assert_eq!(labeled.display_label(0), "Rear Camera");

        let unlabeled = MediaDeviceDescriptor::new("cam-2", "");
        assert_eq!(unlabeled.display_label(1), "Camera 2");

        let blank = MediaDeviceDescriptor::new("cam-3", "   ");
        assert_eq!(blank.display_label(2), "Camera 3");
    }

    #[test]
    fn test_constraints_defaults_and_builders() {
        let constraints = StreamConstraints::default();
        assert_eq!(constraints.ideal_width, 1280);
        assert_eq!(constraints.ideal_height, 720);
        assert!(constraints.device_id.is_none());
        assert!(constraints.facing_mode.is_none());

        let constraints = constraints
            .with_device(Some("cam-1".to_string()))
            .with_resolution(640, 480)
            .with_facing(Some(FacingMode::Environment));
        assert_eq!(constraints.device_id.as_deref(), Some("cam-1"));
        assert_eq!(constraints.ideal_width, 640);
        assert_eq!(constraints.facing_mode, Some(FacingMode::Environment));
    }

    #[test]
    fn test_platform_error_classification() {
        let cases = vec![
            (PlatformError::not_allowed(), "PermissionDenied"),
            (PlatformError::new("PermissionDeniedError", ""), "PermissionDenied"),
            (PlatformError::new("SecurityError", ""), "PermissionDenied"),
            (PlatformError::new("CameraPermissionRevoked", ""), "PermissionDenied"),
            (PlatformError::not_found(), "DeviceNotFound"),
            (PlatformError::new("DevicesNotFoundError", ""), "DeviceNotFound"),
            (PlatformError::not_supported(), "DeviceUnsupported"),
            (PlatformError::not_readable("in use"), "Unknown"),
            (PlatformError::new("AbortError", "aborted"), "Unknown"),
        ];

        for (err, expected) in cases {
            let name = err.name.clone();
            assert_eq!(DeviceError::from(err).kind(), expected, "Failed for: {}", name);
        }
    }

    #[test]
    fn test_unknown_keeps_platform_detail() {
        let err = DeviceError::from(PlatformError::not_readable("device busy"));
        assert_eq!(err.detail(), Some("NotReadableError: device busy"));
        assert!(!err.to_string().contains("busy"));
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let messages = [
            DeviceError::PermissionDenied.to_string(),
            DeviceError::DeviceNotFound.to_string(),
            DeviceError::DeviceUnsupported.to_string(),
            DeviceError::Unknown(String::new()).to_string(),
        ];

        for (i, a) in messages.iter().enumerate() {
            assert!(!a.is_empty());
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_facing_mode_display() {
        assert_eq!(FacingMode::User.to_string(), "user");
        assert_eq!(FacingMode::Environment.to_string(), "environment");
    }
}
