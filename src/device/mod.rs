//! Device interaction module
//!
//! This module defines the platform media-capture capability the capture
//! session is built on.
//!
//! # Submodules
//!
//! - `traits` - Abstraction traits for media devices and video streams
//! - `stream` - Scoped stream ownership that guarantees release
//!
//! # Architecture
//!
//! The module uses a trait-based abstraction to enable testing without real cameras:
//!
//! - `MediaDevices` - Enumerates devices and opens streams
//! - `VideoStream` - An open stream producing still frames
//! - `StreamGuard` - Owns a stream and closes it on every exit path
//!
//! Platform backends and the simulated devices in `testdb` implement these
//! traits, allowing the capture session to work with either.

pub mod stream;
pub mod traits;

pub use stream::StreamGuard;
pub use traits::{
    error_names, FacingMode, MediaDeviceDescriptor, MediaDevices, PlatformError,
    StreamConstraints, VideoStream,
};
