//! Scenario runner
//!
//! Drives a full open, capture and confirm cycle against each scenario's
//! simulated cameras and checks the outcome, the device list, and that no
//! stream was left open.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::scenarios::{ExpectedResults, ScenarioLibrary, TestScenario};
use crate::capture::{ImageAcquisitionSession, SessionState};
use crate::core::config::CaptureConfig;
use crate::core::error::SessionError;
use crate::store::SharedImageStore;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether the scenario behaved as expected
    pub passed: bool,
    /// Execution time in milliseconds
    pub duration_ms: f64,
    /// What actually happened
    pub stats: ExecutionStats,
    /// Expected results for comparison
    pub expected: ExpectedResults,
    /// Failure reason (if any)
    pub failure_reason: Option<String>,
}

impl ScenarioResult {
    fn new(name: &str, duration: Duration, stats: ExecutionStats, expected: ExpectedResults) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            duration_ms: duration.as_secs_f64() * 1000.0,
            stats,
            expected,
            failure_reason: None,
        }
    }

    fn fail(mut self, reason: String) -> Self {
        self.passed = false;
        self.failure_reason = Some(reason);
        self
    }
}

/// Observations from one capture cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionStats {
    /// Cameras reported by enumeration
    pub devices_found: usize,
    /// Labels as the device picker would show them
    pub display_labels: Vec<String>,
    pub selected_device: Option<String>,
    /// Facing preference sent with the last stream request
    pub facing_mode: Option<crate::device::FacingMode>,
    /// Session state after the cycle
    pub final_state: SessionState,
    /// Error kind, when the session ended in `Error`
    pub error_kind: Option<String>,
    /// User-facing error message
    pub error_message: Option<String>,
    /// Name of the image that reached the store
    pub stored_image: Option<String>,
    pub stored_bytes: u64,
    pub streams_opened: usize,
    /// Most streams open at once
    pub max_concurrent_streams: usize,
    /// Streams still open after the cycle
    pub streams_leaked: usize,
}

/// Summary of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_duration_ms: f64,
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    /// Calculate pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// Get all failed scenario names
    pub fn failed_scenarios(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Print each result as it completes
    pub verbose: bool,
    /// Stop on first failure
    pub fail_fast: bool,
    /// Only run scenarios with one of these tags
    pub tag_filter: Option<Vec<String>>,
    /// Only run scenarios whose name contains this
    pub name_filter: Option<String>,
    /// Write `scenario_report.json` here
    pub report_dir: Option<PathBuf>,
    /// Session settings used for every scenario
    pub capture: CaptureConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            fail_fast: false,
            tag_filter: None,
            name_filter: None,
            report_dir: None,
            capture: CaptureConfig::instant(),
        }
    }
}

/// Runs scenarios against simulated cameras
pub struct ScenarioRunner {
    config: RunnerConfig,
    results: Vec<ScenarioResult>,
}

impl ScenarioRunner {
    /// Create a new runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a new runner with configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
        }
    }

    /// Run all available scenarios
    pub async fn run_all(&mut self) -> RunSummary {
        self.run_scenarios(ScenarioLibrary::all_scenarios()).await
    }

    /// Run quick scenarios only
    pub async fn run_quick(&mut self) -> RunSummary {
        self.run_scenarios(ScenarioLibrary::quick_scenarios()).await
    }

    /// Run scenarios filtered by tag
    pub async fn run_by_tag(&mut self, tag: &str) -> RunSummary {
        self.run_scenarios(ScenarioLibrary::scenarios_by_tag(tag)).await
    }

    /// Run specific scenarios by name
    pub async fn run_by_names(&mut self, names: &[&str]) -> RunSummary {
        let scenarios: Vec<_> = ScenarioLibrary::all_scenarios()
            .into_iter()
            .filter(|s| names.contains(&s.name.as_str()))
            .collect();
        self.run_scenarios(scenarios).await
    }

    /// Run a list of scenarios
    pub async fn run_scenarios(&mut self, scenarios: Vec<TestScenario>) -> RunSummary {
        let start = Instant::now();
        self.results.clear();

        let scenarios = self.filter_scenarios(scenarios);
        info!("Running {} scenario(s)", scenarios.len());

        if self.config.verbose {
            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║              LIVESTOCK CAPTURE - SCENARIO RUNNER             ║");
            println!("╚══════════════════════════════════════════════════════════════╝\n");
        }

        for scenario in scenarios {
            let result = self.run_single_scenario(scenario).await;

            if self.config.verbose {
                Self::print_result(&result);
            }

            let should_stop = self.config.fail_fast && !result.passed;
            self.results.push(result);

            if should_stop {
                if self.config.verbose {
                    println!("\n⚠️  Stopping early due to fail-fast mode\n");
                }
                break;
            }
        }

        let summary = RunSummary {
            total: self.results.len(),
            passed: self.results.iter().filter(|r| r.passed).count(),
            failed: self.results.iter().filter(|r| !r.passed).count(),
            total_duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            results: self.results.clone(),
        };

        if self.config.verbose {
            Self::print_summary(&summary);
        }

        if let Some(ref dir) = self.config.report_dir {
            match write_json_report(dir, &summary) {
                Ok(path) => info!("Scenario report written to {}", path.display()),
                Err(e) => warn!("Failed to write scenario report: {}", e),
            }
        }

        summary
    }

    fn filter_scenarios(&self, scenarios: Vec<TestScenario>) -> Vec<TestScenario> {
        let mut filtered = scenarios;

        if let Some(ref tags) = self.config.tag_filter {
            filtered.retain(|s| s.tags.iter().any(|t| tags.contains(t)));
        }

        if let Some(ref pattern) = self.config.name_filter {
            let pattern = pattern.to_lowercase();
            filtered.retain(|s| s.name.to_lowercase().contains(&pattern));
        }

        filtered
    }

    async fn run_single_scenario(&self, scenario: TestScenario) -> ScenarioResult {
        debug!("Scenario {}: {}", scenario.name, scenario.description);
        let start = Instant::now();

        let stats = self.execute_scenario(&scenario).await;
        let result = ScenarioResult::new(&scenario.name, start.elapsed(), stats, scenario.expected);

        match Self::compare_results(&result.stats, &result.expected) {
            Ok(()) => result,
            Err(reason) => result.fail(reason),
        }
    }

    /// Open, capture, confirm, then close
    async fn execute_scenario(&self, scenario: &TestScenario) -> ExecutionStats {
        let media = scenario.media_devices();
        media.update_config(|c| *c = c.clone().with_sensor(320, 180));
        let ledger = media.ledger();
        let store = Arc::new(SharedImageStore::new());
        let session = ImageAcquisitionSession::new(
            Arc::new(media),
            Arc::clone(&store),
            self.config.capture.clone(),
        );

        let outcome = async {
            session.open().await?;
            session.capture().await?;
            session.confirm_and_submit()?;
            Ok::<(), SessionError>(())
        }
        .await;

        if let Err(ref e) = outcome {
            debug!("Scenario {} stopped: {}", scenario.name, e);
        }

        let devices = session.devices();
        let error = session.error();
        let mut stats = ExecutionStats {
            devices_found: devices.len(),
            display_labels: devices
                .iter()
                .enumerate()
                .map(|(i, d)| d.display_label(i))
                .collect(),
            selected_device: session.selected_device(),
            facing_mode: ledger.last_constraints().and_then(|c| c.facing_mode),
            final_state: session.state(),
            error_kind: error.as_ref().map(|e| e.kind().to_string()),
            error_message: error.as_ref().map(|e| e.to_string()),
            ..Default::default()
        };

        if let Some(image) = store.get_image() {
            stats.stored_image = Some(image.original_name);
            stats.stored_bytes = image.size;
        }

        session.close();
        stats.streams_opened = ledger.opened_total();
        stats.max_concurrent_streams = ledger.max_concurrent();
        stats.streams_leaked = ledger.open_count();
        stats
    }

    fn compare_results(actual: &ExecutionStats, expected: &ExpectedResults) -> Result<(), String> {
        if actual.streams_leaked > 0 {
            return Err(format!("{} stream(s) left open", actual.streams_leaked));
        }
        if actual.max_concurrent_streams > 1 {
            return Err(format!(
                "{} streams were open at once",
                actual.max_concurrent_streams
            ));
        }
        if actual.devices_found != expected.devices_found {
            return Err(format!(
                "expected {} camera(s), found {}",
                expected.devices_found, actual.devices_found
            ));
        }

        if expected.should_succeed {
            if actual.stored_image.is_none() {
                return Err(format!(
                    "no image reached the store (session {}, error {:?})",
                    actual.final_state, actual.error_kind
                ));
            }
            if actual.final_state != SessionState::Closed {
                return Err(format!("session ended {}", actual.final_state));
            }
            if actual.facing_mode != expected.facing_mode {
                return Err(format!(
                    "expected facing {:?}, requested {:?}",
                    expected.facing_mode, actual.facing_mode
                ));
            }
            if !expected.display_labels.is_empty() && actual.display_labels != expected.display_labels {
                return Err(format!("unexpected device labels {:?}", actual.display_labels));
            }
        } else {
            if actual.final_state != SessionState::Error {
                return Err(format!("expected an error, session ended {}", actual.final_state));
            }
            if actual.error_kind != expected.expected_error {
                return Err(format!(
                    "expected {:?}, got {:?}",
                    expected.expected_error, actual.error_kind
                ));
            }
            if actual.stored_image.is_some() {
                return Err("an image reached the store despite the error".to_string());
            }
        }

        Ok(())
    }

    fn print_result(result: &ScenarioResult) {
        let (status, color) = if result.passed {
            ("✓ PASS", "\x1b[32m")
        } else {
            ("✗ FAIL", "\x1b[31m")
        };

        println!(
            "  {}{}\x1b[0m - {} ({:.2}ms)",
            color, status, result.name, result.duration_ms
        );

        if let Some(ref reason) = result.failure_reason {
            println!("      └─ Reason: {}", reason);
        }
        if let Some(ref name) = result.stats.stored_image {
            println!("      └─ Stored {} ({} bytes)", name, result.stats.stored_bytes);
        } else if let Some(ref message) = result.stats.error_message {
            println!("      └─ {}", message);
        }
    }

    fn print_summary(summary: &RunSummary) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      SCENARIO SUMMARY                        ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║  Total:    {:>4}", summary.total);
        println!("║  Passed:   {:>4} \x1b[32m✓\x1b[0m", summary.passed);
        println!("║  Failed:   {:>4} \x1b[31m✗\x1b[0m", summary.failed);
        println!("║  Pass Rate: {:>5.1}%", summary.pass_rate());
        println!("║  Duration:  {:>5.2}s", summary.total_duration_ms / 1000.0);
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        if !summary.all_passed() {
            println!("Failed scenarios:");
            for name in summary.failed_scenarios() {
                println!("  • {}", name);
            }
            println!();
        }
    }

    /// Get all results
    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the summary as `scenario_report.json` in `dir`
pub fn write_json_report(dir: &Path, summary: &RunSummary) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join("scenario_report.json");
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_all_scenarios_pass() {
        let mut runner = ScenarioRunner::new();
        let summary = runner.run_all().await;

        assert_eq!(summary.total, ScenarioLibrary::all_scenarios().len());
        assert!(
            summary.all_passed(),
            "failed: {:?}",
            summary
                .results
                .iter()
                .filter(|r| !r.passed)
                .map(|r| (&r.name, &r.failure_reason))
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_dual_camera_stats() {
        let mut runner = ScenarioRunner::new();
        let summary = runner.run_by_names(&["dual_camera"]).await;
        let stats = &summary.results[0].stats;

        assert_eq!(stats.devices_found, 2);
        assert_eq!(stats.selected_device.as_deref(), Some("cam-front-0001"));
        assert_eq!(stats.streams_opened, 1);
        assert_eq!(stats.streams_leaked, 0);
        assert!(stats.stored_image.as_deref().unwrap().starts_with("cattle-capture-"));
        assert!(stats.stored_bytes > 0);
    }

    #[tokio::test]
    async fn test_mismatch_is_reported() {
        let mut scenario = ScenarioLibrary::no_camera();
        scenario.expected.expected_error = Some("PermissionDenied".to_string());

        let mut runner = ScenarioRunner::new();
        let summary = runner.run_scenarios(vec![scenario]).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_scenarios(), vec!["no_camera"]);
        assert!(summary.results[0]
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("DeviceNotFound"));
    }

    #[tokio::test]
    async fn test_filters_and_fail_fast() {
        let mut runner = ScenarioRunner::with_config(RunnerConfig {
            tag_filter: Some(vec!["error".to_string()]),
            ..Default::default()
        });
        let summary = runner.run_all().await;
        assert_eq!(summary.total, 4);

        let mut broken = ScenarioLibrary::single_camera();
        broken.expected.devices_found = 5;
        let mut runner = ScenarioRunner::with_config(RunnerConfig {
            fail_fast: true,
            ..Default::default()
        });
        let summary = runner
            .run_scenarios(vec![broken, ScenarioLibrary::dual_camera()])
            .await;
        assert_eq!(summary.total, 1);
        assert_eq!(runner.results().len(), 1);
    }

    #[tokio::test]
    async fn test_json_report() {
        let dir = TempDir::new().unwrap();
        let mut runner = ScenarioRunner::with_config(RunnerConfig {
            report_dir: Some(dir.path().to_path_buf()),
            name_filter: Some("single".to_string()),
            ..Default::default()
        });
        runner.run_all().await;

        let report = fs::read_to_string(dir.path().join("scenario_report.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["results"][0]["name"], "single_camera");
        assert_eq!(value["results"][0]["stats"]["final_state"], "Closed");
    }

    #[test]
    fn test_pass_rate() {
        let summary = RunSummary {
            total: 4,
            passed: 3,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(summary.pass_rate(), 75.0);
        assert_eq!(RunSummary::default().pass_rate(), 100.0);
    }
}
