//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Capture or upload a photo of an animal for breed analysis
#[derive(Parser, Debug)]
#[command(name = "livestock-capture")]
#[command(version = "1.0.0")]
#[command(about = "Capture livestock photos from a camera, review them, and hand them to analysis", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Simulated camera setup to use (overrides config)
    #[arg(short, long, global = true)]
    pub scenario: Option<String>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available cameras
    Devices,

    /// Open the camera, take a photo and confirm it
    ///
    /// This is the default when no subcommand is given.
    Capture {
        /// Directory to save the confirmed photo in
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Camera to use instead of the default
        #[arg(short, long)]
        device: Option<String>,

        /// Use the first photo without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Load an image file instead of using the camera
    Upload {
        /// Image file to load
        path: PathBuf,
    },

    /// Show or reset the configuration file
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\livestock_capture\config.toml
    /// - Linux/macOS: ~/.config/livestock_capture/config.toml
    Config {
        /// Show the config file path
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,

    /// Run capture scenarios against simulated cameras
    Scenarios {
        #[command(subcommand)]
        scenario_command: ScenarioCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScenarioCommands {
    /// Run all available scenarios
    RunAll {
        /// Directory to write scenario_report.json to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop on first failure
        #[arg(long)]
        fail_fast: bool,
    },

    /// Run scenarios without simulated latency
    RunQuick {
        /// Verbose output showing detailed results
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run scenarios filtered by tag
    RunTag {
        /// Tag to filter scenarios by
        tag: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run specific scenarios by name
    Run {
        /// Scenario names to run (comma-separated or multiple values)
        #[arg(value_delimiter = ',')]
        scenarios: Vec<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List all available scenarios
    List {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// List all available tags for filtering
    ListTags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capture() {
        let args = Args::try_parse_from([
            "livestock-capture",
            "--scenario",
            "single_camera",
            "capture",
            "--yes",
            "-o",
            "photos",
        ])
        .unwrap();

        assert_eq!(args.scenario.as_deref(), Some("single_camera"));
        match args.command {
            Some(Commands::Capture { output, device, yes }) => {
                assert_eq!(output, Some(PathBuf::from("photos")));
                assert!(device.is_none());
                assert!(yes);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_scenario_list() {
        let args = Args::try_parse_from([
            "livestock-capture",
            "scenarios",
            "run",
            "dual_camera,no_camera",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.log_level.as_deref(), Some("debug"));
        match args.command {
            Some(Commands::Scenarios {
                scenario_command: ScenarioCommands::Run { scenarios, verbose },
            }) => {
                assert_eq!(scenarios, vec!["dual_camera", "no_camera"]);
                assert!(!verbose);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand() {
        let args = Args::try_parse_from(["livestock-capture"]).unwrap();
        assert!(args.command.is_none());
    }
}
