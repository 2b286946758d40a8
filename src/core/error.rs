//! Error types for the capture core
//!
//! Device-layer errors are recoverable by a user-initiated retry. Session and
//! store errors report misuse of the session state machine or the store
//! contract and never come from the hardware.

use std::path::PathBuf;

use thiserror::Error;

use crate::capture::SessionState;

/// Camera failure as presented to the user
///
/// Every variant carries a distinct, actionable message. Platform error names
/// are classified into these variants by [`crate::device::PlatformError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The user declined camera access
    #[error("Camera access denied. Please allow camera permissions and try again.")]
    PermissionDenied,

    /// No capture device is present
    #[error("No camera found. Please connect a camera and try again.")]
    DeviceNotFound,

    /// The platform cannot provide video capture at all
    #[error("Camera not supported on this platform. Please try a different browser or device.")]
    DeviceUnsupported,

    /// Anything else; the detail is kept for logs only
    #[error("Unable to access camera. Please check your camera connection and permissions.")]
    Unknown(String),
}

impl DeviceError {
    /// Stable taxonomy name, used in logs and scenario reports
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceError::PermissionDenied => "PermissionDenied",
            DeviceError::DeviceNotFound => "DeviceNotFound",
            DeviceError::DeviceUnsupported => "DeviceUnsupported",
            DeviceError::Unknown(_) => "Unknown",
        }
    }

    /// Platform detail behind an `Unknown` error
    pub fn detail(&self) -> Option<&str> {
        match self {
            DeviceError::Unknown(detail) => Some(detail.as_str()),
            _ => None,
        }
    }
}

/// Error returned by session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The operation is not valid in the current state; nothing changed
    #[error("cannot {operation} while the camera session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },

    /// `select_device` named a device that was not enumerated
    #[error("unknown camera device '{0}'")]
    UnknownDevice(String),

    /// A newer open, device switch or close took over while this call was suspended
    #[error("camera request superseded by a newer request")]
    Superseded,

    /// The captured frame could not be encoded
    #[error("failed to encode captured frame: {0}")]
    Encode(String),

    /// The operation ended with the session in the `Error` state
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Error in the shared image store access contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store was requested outside of any provider scope
    #[error("image store used outside of an ImageStoreProvider scope")]
    Uninitialized,
}

/// Error raised while turning a user-selected file into an image artifact
#[derive(Error, Debug)]
pub enum UploadError {
    /// The path has no usable file name
    #[error("'{0}' does not name a file")]
    NoFileName(PathBuf),

    /// The file is not an image
    #[error("'{name}' is not a supported image file")]
    NotAnImage { name: String },

    /// The file exceeds the configured size limit
    #[error("'{name}' is {size} bytes, larger than the {max} byte limit")]
    TooLarge { name: String, size: u64, max: u64 },

    /// The file could not be read
    #[error("failed to read '{path}': {message}")]
    Io { path: PathBuf, message: String },
}
