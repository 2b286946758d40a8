//! Livestock Capture - CLI Entry Point
//!
//! Loads configuration, sets up logging and the Ctrl+C handler, then hands the
//! parsed command to the library.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use livestock_capture::cli::{self, Args, DualWriter};
use livestock_capture::core::config::{Config, LoggingConfig};
use log::{info, LevelFilter};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Config file from `--config`, or the default search path, with CLI overrides applied
fn load_config(args: &Args) -> Config {
    let mut config = match args.config {
        Some(ref path) => Config::load(path).unwrap_or_else(|e| {
            eprintln!("Warning: {}; using default settings", e);
            Config::default()
        }),
        None => Config::load_default().unwrap_or_default(),
    };

    if let Some(ref scenario) = args.scenario {
        config.simulation.scenario = scenario.clone();
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    config
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    if !logging.log_to_file {
        Builder::from_env(env_logger::Env::default().default_filter_or(&logging.level)).init();
        return Ok(());
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logging.log_file)
        .with_context(|| format!("Failed to open log file {}", logging.log_file.display()))?;

    Builder::new()
        .filter_level(logging.level.parse().unwrap_or(LevelFilter::Info))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(DualWriter {
            console: std::io::stderr(),
            file: log_file,
        })))
        .init();

    info!("Logging to file: {}", logging.log_file.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args);

    // The capture loop and its watcher close the camera once this is set
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown_flag);
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("\nReleasing the camera...");
    })
    .context("Failed to set Ctrl+C handler")?;

    init_logging(&config.logging)?;
    info!(
        "{} v{} (simulated cameras: {})",
        livestock_capture::NAME,
        livestock_capture::VERSION,
        config.simulation.scenario
    );

    cli::run_command(&args, &config, shutdown_flag)
}
