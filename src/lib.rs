//! Livestock Capture Library
//!
//! Acquires a single still image of an animal, either from a live camera or
//! from a file, and hands it to the rest of the application through a shared
//! image store.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration and error types
//! - [`device`] - Media device traits, stream ownership and platform error mapping
//! - [`capture`] - The image acquisition session state machine
//! - [`store`] - The shared image store, its provider scopes and the upload path
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - Simulated cameras and capture scenarios
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use livestock_capture::capture::ImageAcquisitionSession;
//! use livestock_capture::core::config::CaptureConfig;
//! use livestock_capture::store::SharedImageStore;
//! use livestock_capture::testdb::MockMediaDevices;
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = Arc::new(SharedImageStore::new());
//! let session = ImageAcquisitionSession::new(
//!     Arc::new(MockMediaDevices::dual_camera()),
//!     Arc::clone(&store),
//!     CaptureConfig::default(),
//! );
//!
//! session.open().await?;
//! session.capture().await?;
//! let image = session.confirm_and_submit()?;
//! println!("{} is ready at {}", image.original_name, image.display_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Testing Without a Camera
//!
//! ```rust,no_run
//! use livestock_capture::testdb::ScenarioRunner;
//!
//! # async fn demo() {
//! let mut runner = ScenarioRunner::new();
//! let summary = runner.run_quick().await;
//! println!("Passed: {}/{}", summary.passed, summary.total);
//! # }
//! ```

pub mod capture;
pub mod cli;
pub mod core;
pub mod device;
pub mod store;
pub mod testdb;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
