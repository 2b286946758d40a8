//! Simulated cameras
//!
//! This module provides a testing framework that exercises the whole capture
//! flow without a real camera attached.
//!
//! # Features
//!
//! - **Mock Devices**: Simulated cameras with configurable failures and latency
//! - **Stream Ledger**: Record of every stream opened and closed
//! - **Scenarios**: Pre-built camera setups with expected outcomes
//! - **Runner**: Execute scenarios and generate reports
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use livestock_capture::testdb::{ScenarioRunner, RunnerConfig};
//!
//! # async fn demo() {
//! let mut runner = ScenarioRunner::with_config(RunnerConfig {
//!     verbose: true,
//!     ..Default::default()
//! });
//! let summary = runner.run_by_names(&["dual_camera", "permission_denied"]).await;
//! println!("Passed: {}/{}", summary.passed, summary.total);
//! # }
//! ```
//!
//! # Available Scenarios
//!
//! - `single_camera` - One integrated webcam
//! - `dual_camera` - Front and rear cameras, rear preferred
//! - `unlabeled_cameras` - Cameras without labels
//! - `no_camera` - Nothing attached
//! - `permission_denied` - User declines access
//! - `unsupported_browser` - No video capture support
//! - `busy_camera` - Camera held by another application
//! - `slow_camera` - Slow stream start

pub mod mock_device;
pub mod runner;
pub mod scenarios;

pub use mock_device::{MockDeviceConfig, MockMediaDevices, MockStream, StreamEvent, StreamLedger};
pub use runner::{ExecutionStats, RunSummary, RunnerConfig, ScenarioResult, ScenarioRunner};
pub use scenarios::{ExpectedResults, ScenarioLibrary, TestScenario};

/// Get a list of all available scenario names
pub fn list_scenario_names() -> Vec<String> {
    ScenarioLibrary::all_scenarios()
        .into_iter()
        .map(|s| s.name)
        .collect()
}

/// Get a list of all available tags
pub fn list_tags() -> Vec<String> {
    let mut tags: Vec<String> = ScenarioLibrary::all_scenarios()
        .into_iter()
        .flat_map(|s| s.tags)
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Print available scenarios to console
pub fn print_available_scenarios() {
    println!("\nAvailable scenarios:\n");

    let scenarios = ScenarioLibrary::all_scenarios();
    for scenario in &scenarios {
        println!(
            "   • {:<20} {} [{}]",
            scenario.name,
            scenario.description,
            scenario.tags.join(", ")
        );
    }

    println!("\nTotal: {} scenarios available\n", scenarios.len());
}
