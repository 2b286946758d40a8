//! Core functionality module
//!
//! Configuration management and the error types shared by the capture
//! session, the image store and the CLI.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error types and result aliases

pub mod config;
pub mod error;
