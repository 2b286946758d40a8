//! Configuration module for the capture tool
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\livestock_capture\config.toml
//! - Linux/macOS: ~/.config/livestock_capture/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::device::FacingMode;

/// Application name used for config directory
const APP_NAME: &str = "livestock_capture";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Local config file names checked before the standard location
const LOCAL_CONFIG_FILES: [&str; 2] = ["./config.toml", "./livestock_capture.toml"];

/// Get the standard configuration directory for the application.
///
/// Returns:
/// - Windows: %APPDATA%\livestock_capture
/// - Linux/macOS: ~/.config/livestock_capture
pub fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_NAME))
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config").join(APP_NAME))
    }
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera session settings
    pub capture: CaptureConfig,

    /// File-picker upload settings
    pub upload: UploadConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Simulated device settings used by the CLI
    pub simulation: SimulationConfig,
}

/// Camera session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Ideal stream width requested from the platform
    pub ideal_width: u32,

    /// Ideal stream height requested from the platform
    pub ideal_height: u32,

    /// JPEG quality for captured stills (1-100)
    pub jpeg_quality: u8,

    /// Minimum time a capture stays in the `Capturing` state, in milliseconds.
    /// Gives the UI time to play its flash animation.
    pub review_delay_ms: u64,

    /// Give up on a device open after this many milliseconds (0 = wait forever)
    pub open_timeout_ms: u64,

    /// Ask for the rear camera when more than one device is available
    pub prefer_environment_facing: bool,

    /// Prefix of synthesized capture file names
    pub file_prefix: String,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted upload in bytes (0 = no limit)
    pub max_file_size: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

/// Simulated device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Scenario providing the simulated cameras
    pub scenario: String,

    /// Artificial device-open latency in milliseconds
    pub open_latency_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            jpeg_quality: 90,
            review_delay_ms: 800,
            open_timeout_ms: 0,
            prefer_environment_facing: true,
            file_prefix: "cattle-capture".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Config with no artificial delays, for tests and scripted runs
    pub fn instant() -> Self {
        Self {
            review_delay_ms: 0,
            ..Default::default()
        }
    }

    /// Set the review delay
    pub fn with_review_delay(mut self, ms: u64) -> Self {
        self.review_delay_ms = ms;
        self
    }

    /// Set the open timeout
    pub fn with_open_timeout(mut self, ms: u64) -> Self {
        self.open_timeout_ms = ms;
        self
    }

    /// Set JPEG quality
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn review_delay(&self) -> Duration {
        Duration::from_millis(self.review_delay_ms)
    }

    pub fn open_timeout(&self) -> Option<Duration> {
        (self.open_timeout_ms > 0).then(|| Duration::from_millis(self.open_timeout_ms))
    }

    /// Facing preference for a given number of enumerated devices
    ///
    /// With several cameras the subject is usually in front of the operator,
    /// so the rear camera is requested. A single camera gets no preference.
    pub fn facing_for(&self, device_count: usize) -> Option<FacingMode> {
        if self.prefer_environment_facing && device_count > 1 {
            Some(FacingMode::Environment)
        } else {
            None
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./livestock_capture.log"),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scenario: "dual_camera".to_string(),
            open_latency_ms: 300,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./config.toml
    /// 2. ./livestock_capture.toml
    /// 3. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        for path in LOCAL_CONFIG_FILES.iter().map(PathBuf::from) {
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Path of the config file in use, or the standard location if none exists
    pub fn get_active_config_path() -> PathBuf {
        for path in LOCAL_CONFIG_FILES.iter().map(PathBuf::from) {
            if path.exists() {
                return path;
            }
        }

        get_config_path().unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    ParseError(PathBuf, String),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(String),

    #[error("Failed to write config file '{}': {}", .0.display(), .1)]
    WriteError(PathBuf, String),

    #[error("Could not determine configuration directory")]
    ConfigDirNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_config_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.ideal_width, 1280);
        assert_eq!(config.ideal_height, 720);
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.review_delay(), Duration::from_millis(800));
        assert_eq!(config.open_timeout(), None);
        assert_eq!(config.file_prefix, "cattle-capture");
    }

    #[test]
    fn test_capture_config_builders() {
        let config = CaptureConfig::instant()
            .with_open_timeout(250)
            .with_quality(150);

        assert!(config.review_delay().is_zero());
        assert_eq!(config.open_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.jpeg_quality, 100);
        assert_eq!(CaptureConfig::default().with_quality(0).jpeg_quality, 1);
    }

    #[test]
    fn test_facing_preference() {
        let config = CaptureConfig::default();
        assert_eq!(config.facing_for(0), None);
        assert_eq!(config.facing_for(1), None);
        assert_eq!(config.facing_for(2), Some(FacingMode::Environment));

        let mut no_pref = CaptureConfig::default();
        no_pref.prefer_environment_facing = false;
        assert_eq!(no_pref.facing_for(3), None);
    }

    #[test]
    fn test_upload_limit_default() {
        assert_eq!(UploadConfig::default().max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(&Config::generate_default_config()).unwrap();
        assert_eq!(config.capture.ideal_width, 1280);
        assert_eq!(config.capture.jpeg_quality, 90);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.simulation.scenario, "dual_camera");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.capture.review_delay_ms = 0;
        config.simulation.scenario = "single_camera".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.capture.review_delay_ms, 0);
        assert_eq!(loaded.simulation.scenario, "single_camera");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[capture]\njpeg_quality = 75\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.capture.jpeg_quality, 75);
        assert_eq!(loaded.capture.ideal_height, 720);
        assert_eq!(loaded.upload.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/definitely/not/here/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[capture\nbroken").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ParseError(_, _))
        ));
    }
}
