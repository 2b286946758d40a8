//! CLI module for the capture tool
//!
//! # Submodules
//!
//! - `args` - Command-line argument definitions using clap
//! - `commands` - Command handler implementations
//! - `progress` - Spinners and CLI output utilities

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Args, Commands, ScenarioCommands};
pub use commands::run_command;
pub use progress::DualWriter;
