//! Shared image store module
//!
//! Holds "the current image" for every screen of the application, with
//! explicit replace/release semantics and synchronous change notification.
//!
//! # Submodules
//!
//! - `artifact` - Image artifacts, display URLs and read-only views
//! - `image_store` - The store itself and its change events
//! - `provider` - Scoped, fail-fast access for consumers without an explicit handle
//! - `upload` - File-picker path producing artifacts from files on disk

pub mod artifact;
pub mod image_store;
pub mod provider;
pub mod upload;

pub use artifact::{ArtifactOrigin, ArtifactView, DisplayUrl, ImageArtifact};
pub use image_store::{SharedImageStore, StoreEvent};
pub use provider::{try_use_image_store, use_image_store, ImageStoreProvider, StoreScope};
pub use upload::upload_image;
