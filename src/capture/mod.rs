//! Camera capture module
//!
//! # Submodules
//!
//! - `state` - Session states
//! - `frame` - Captured stills and JPEG encoding
//! - `session` - The acquisition state machine

pub mod frame;
pub mod session;
pub mod state;

pub use frame::{capture_file_name, encode_jpeg, CapturedFrame, CAPTURE_MIME_TYPE};
pub use session::ImageAcquisitionSession;
pub use state::SessionState;
