//! Predefined camera scenarios
//!
//! Each scenario describes a simulated set of attached cameras, how they
//! behave, and what a full open, capture and confirm cycle should end in.

use serde::Serialize;

use super::mock_device::{MockDeviceConfig, MockMediaDevices};
use crate::device::{FacingMode, MediaDeviceDescriptor, PlatformError};

/// A complete scenario with its devices and expected outcome
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// Scenario name for identification
    pub name: String,
    /// Description of what this scenario tests
    pub description: String,
    /// Attached cameras
    pub devices: Vec<MediaDeviceDescriptor>,
    /// How the cameras behave
    pub device_config: MockDeviceConfig,
    /// Expected outcome of a full cycle
    pub expected: ExpectedResults,
    /// Tags for filtering scenarios
    pub tags: Vec<String>,
}

/// Expected outcome of a capture cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpectedResults {
    /// Should the cycle end with an image in the store
    pub should_succeed: bool,
    /// Expected error kind when it should not succeed
    pub expected_error: Option<String>,
    /// Number of cameras enumeration should report
    pub devices_found: usize,
    /// Facing preference the stream request should carry
    pub facing_mode: Option<FacingMode>,
    /// Labels the device picker should show
    pub display_labels: Vec<String>,
}

impl TestScenario {
    /// Create a new scenario
    pub fn new(
        name: &str,
        description: &str,
        devices: Vec<MediaDeviceDescriptor>,
        device_config: MockDeviceConfig,
        expected: ExpectedResults,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            devices,
            device_config,
            expected,
            tags: Vec::new(),
        }
    }

    /// Add tags to the scenario
    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.tags = tags.into_iter().map(String::from).collect();
        self
    }

    /// Simulated backend for this scenario
    pub fn media_devices(&self) -> MockMediaDevices {
        MockMediaDevices::with_config(self.devices.clone(), self.device_config.clone())
    }
}

/// Collection of all predefined scenarios
pub struct ScenarioLibrary;

impl ScenarioLibrary {
    fn front_camera() -> MediaDeviceDescriptor {
        MediaDeviceDescriptor::new("cam-front-0001", "Front Camera")
    }

    fn rear_camera() -> MediaDeviceDescriptor {
        MediaDeviceDescriptor::new("cam-rear-0002", "Back Camera")
    }

    fn failure(kind: &str, devices_found: usize) -> ExpectedResults {
        ExpectedResults {
            should_succeed: false,
            expected_error: Some(kind.to_string()),
            devices_found,
            ..Default::default()
        }
    }

    // =========================================================================
    // DEVICE DETECTION
    // =========================================================================

    /// Scenario: one webcam, no facing preference
    pub fn single_camera() -> TestScenario {
        TestScenario::new(
            "single_camera",
            "Laptop with one integrated webcam",
            vec![MediaDeviceDescriptor::new("cam-int-0001", "Integrated Webcam")],
            MockDeviceConfig::default(),
            ExpectedResults {
                should_succeed: true,
                devices_found: 1,
                display_labels: vec!["Integrated Webcam".to_string()],
                ..Default::default()
            },
        )
        .with_tags(vec!["device", "basic"])
    }

    /// Scenario: phone with front and rear cameras
    pub fn dual_camera() -> TestScenario {
        TestScenario::new(
            "dual_camera",
            "Phone with front and rear cameras, rear camera preferred",
            vec![Self::front_camera(), Self::rear_camera()],
            MockDeviceConfig::default(),
            ExpectedResults {
                should_succeed: true,
                devices_found: 2,
                facing_mode: Some(FacingMode::Environment),
                display_labels: vec!["Front Camera".to_string(), "Back Camera".to_string()],
                ..Default::default()
            },
        )
        .with_tags(vec!["device", "basic", "multi-camera"])
    }

    /// Scenario: cameras exposed without labels before permission is granted
    pub fn unlabeled_cameras() -> TestScenario {
        TestScenario::new(
            "unlabeled_cameras",
            "Cameras without labels get numbered fallback names",
            vec![
                MediaDeviceDescriptor::new("a1b2c3", ""),
                MediaDeviceDescriptor::new("d4e5f6", ""),
            ],
            MockDeviceConfig::default(),
            ExpectedResults {
                should_succeed: true,
                devices_found: 2,
                facing_mode: Some(FacingMode::Environment),
                display_labels: vec!["Camera 1".to_string(), "Camera 2".to_string()],
                ..Default::default()
            },
        )
        .with_tags(vec!["device", "multi-camera"])
    }

    // =========================================================================
    // ERROR CONDITIONS
    // =========================================================================

    /// Scenario: nothing attached
    pub fn no_camera() -> TestScenario {
        TestScenario::new(
            "no_camera",
            "No camera attached",
            Vec::new(),
            MockDeviceConfig::default(),
            Self::failure("DeviceNotFound", 0),
        )
        .with_tags(vec!["device", "error"])
    }

    /// Scenario: the user declines the permission prompt
    pub fn permission_denied() -> TestScenario {
        TestScenario::new(
            "permission_denied",
            "User declines camera access",
            vec![Self::front_camera()],
            MockDeviceConfig::denied(),
            Self::failure("PermissionDenied", 1),
        )
        .with_tags(vec!["error", "permission"])
    }

    /// Scenario: no video capture API on the platform
    pub fn unsupported_browser() -> TestScenario {
        TestScenario::new(
            "unsupported_browser",
            "Platform without video capture support",
            vec![Self::front_camera()],
            MockDeviceConfig::unsupported(),
            Self::failure("DeviceUnsupported", 0),
        )
        .with_tags(vec!["error", "platform"])
    }

    /// Scenario: camera held by another application
    pub fn busy_camera() -> TestScenario {
        TestScenario::new(
            "busy_camera",
            "Camera is in use by another application",
            vec![Self::front_camera()],
            MockDeviceConfig {
                open_error: Some(PlatformError::not_readable("Could not start video source")),
                ..Default::default()
            },
            Self::failure("Unknown", 1),
        )
        .with_tags(vec!["error", "device"])
    }

    // =========================================================================
    // TIMING
    // =========================================================================

    /// Scenario: camera takes a while to start
    pub fn slow_camera() -> TestScenario {
        TestScenario::new(
            "slow_camera",
            "Camera takes 150ms to start streaming",
            vec![Self::front_camera(), Self::rear_camera()],
            MockDeviceConfig::slow(150),
            ExpectedResults {
                should_succeed: true,
                devices_found: 2,
                facing_mode: Some(FacingMode::Environment),
                display_labels: vec!["Front Camera".to_string(), "Back Camera".to_string()],
                ..Default::default()
            },
        )
        .with_tags(vec!["timing", "slow"])
    }

    /// Get all available scenarios
    pub fn all_scenarios() -> Vec<TestScenario> {
        vec![
            Self::single_camera(),
            Self::dual_camera(),
            Self::unlabeled_cameras(),
            Self::no_camera(),
            Self::permission_denied(),
            Self::unsupported_browser(),
            Self::busy_camera(),
            Self::slow_camera(),
        ]
    }

    /// Get scenarios by tag
    pub fn scenarios_by_tag(tag: &str) -> Vec<TestScenario> {
        Self::all_scenarios()
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Look up a scenario by name
    pub fn by_name(name: &str) -> Option<TestScenario> {
        Self::all_scenarios().into_iter().find(|s| s.name == name)
    }

    /// Scenarios without simulated latency
    pub fn quick_scenarios() -> Vec<TestScenario> {
        vec![
            Self::single_camera(),
            Self::dual_camera(),
            Self::no_camera(),
            Self::permission_denied(),
            Self::unsupported_browser(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_load() {
        let scenarios = ScenarioLibrary::all_scenarios();
        assert_eq!(scenarios.len(), 8);

        let mut names: Vec<_> = scenarios.iter().map(|s| s.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), scenarios.len());
    }

    #[test]
    fn test_scenario_by_tag() {
        let error_scenarios = ScenarioLibrary::scenarios_by_tag("error");
        assert_eq!(error_scenarios.len(), 4);
        for s in &error_scenarios {
            assert!(!s.expected.should_succeed);
            assert!(s.expected.expected_error.is_some());
        }
    }

    #[test]
    fn test_by_name() {
        assert_eq!(
            ScenarioLibrary::by_name("dual_camera").unwrap().devices.len(),
            2
        );
        assert!(ScenarioLibrary::by_name("nope").is_none());
    }

    #[test]
    fn test_media_devices_follow_scenario() {
        let scenario = ScenarioLibrary::permission_denied();
        let media = scenario.media_devices();
        assert_eq!(media.devices(), scenario.devices.as_slice());
        assert!(media.config().open_error.is_some());
    }

    #[test]
    fn test_quick_scenarios_have_no_latency() {
        for s in ScenarioLibrary::quick_scenarios() {
            assert!(s.device_config.open_delay.is_zero(), "{}", s.name);
        }
    }
}
