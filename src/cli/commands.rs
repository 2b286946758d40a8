//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::capture::ImageAcquisitionSession;
use crate::cli::progress::{
    print_error, print_header, print_info, print_success, print_warning, CameraSpinner,
};
use crate::cli::{Args, Commands, ScenarioCommands};
use crate::core::config::{get_config_path, init_config, Config};
use crate::core::error::{DeviceError, SessionError};
use crate::device::MediaDevices;
use crate::store::{try_use_image_store, upload_image, ArtifactView, ImageStoreProvider, SharedImageStore};
use crate::testdb::{self, MockMediaDevices, RunnerConfig, ScenarioLibrary, ScenarioRunner};
use anyhow::{anyhow, Context, Result};
use dialoguer::{Confirm, Select};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Session over the simulated camera backend
type SimulatedSession = ImageAcquisitionSession<MockMediaDevices>;

/// What the user decided after seeing the captured photo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewChoice {
    UsePhoto,
    Retake,
    Cancel,
}

/// A request that (re)starts the camera
#[derive(Debug, Clone, Copy)]
enum CameraRequest<'a> {
    Open,
    Switch(&'a str),
    Retake,
}

impl CameraRequest<'_> {
    fn message(&self) -> String {
        match self {
            CameraRequest::Open => "Starting camera...".to_string(),
            CameraRequest::Switch(id) => format!("Switching to camera '{}'...", id),
            CameraRequest::Retake => "Restarting camera...".to_string(),
        }
    }
}

/// Run the appropriate command based on CLI arguments
///
/// The image store is provided for the duration of the command, so capture
/// and upload both land in the same place.
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    let provider = ImageStoreProvider::new();
    let _scope = provider.enter();

    match &args.command {
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
        Some(Commands::Devices) => {
            runtime()?.block_on(list_devices(config))?;
        }
        Some(Commands::Capture {
            output,
            device,
            yes,
        }) => {
            capture_photo(config, output.as_deref(), device.as_deref(), *yes, shutdown_flag)?;
        }
        None => {
            capture_photo(config, None, None, false, shutdown_flag)?;
        }
        Some(Commands::Upload { path }) => {
            upload_file(config, path)?;
        }
        Some(Commands::Scenarios { scenario_command }) => {
            handle_scenario_command(scenario_command, config)?;
        }
    }

    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Simulated cameras for the configured setup
fn simulated_devices(config: &Config) -> Result<MockMediaDevices> {
    let scenario = ScenarioLibrary::by_name(&config.simulation.scenario).ok_or_else(|| {
        anyhow!(
            "Unknown camera setup '{}'. Run 'scenarios list' to see the available ones.",
            config.simulation.scenario
        )
    })?;
    info!("Using simulated cameras: {}", scenario.description);

    let media = scenario.media_devices();
    let latency = Duration::from_millis(config.simulation.open_latency_ms);
    media.update_config(|c| {
        if c.open_delay.is_zero() {
            c.open_delay = latency;
        }
    });
    Ok(media)
}

// ============================================================================
// Devices
// ============================================================================

/// List available cameras
pub async fn list_devices(config: &Config) -> Result<()> {
    let media = simulated_devices(config)?;

    info!("Scanning for cameras...");

    let devices = match media.enumerate_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            debug!("Enumeration failed: {}", e);
            print_error(&DeviceError::from(e).to_string());
            return Ok(());
        }
    };

    if devices.is_empty() {
        info!("No cameras found.");
        info!("");
        info!("Make sure your camera is:");
        info!("  1. Connected");
        info!("  2. Not in use by another application");
        return Ok(());
    }

    info!("Found {} camera(s):", devices.len());
    info!("");
    for (i, device) in devices.iter().enumerate() {
        let marker = if i == 0 { " (default)" } else { "" };
        info!("[{}] {}{}", i + 1, device.display_label(i), marker);
        info!("    Device ID: {}", device.id);
    }

    if let Some(facing) = config.capture.facing_for(devices.len()) {
        info!("");
        info!("Preferred facing: {}", facing);
    }

    Ok(())
}

// ============================================================================
// Capture
// ============================================================================

/// Open the camera, take a photo, review it and submit it to the image store
pub fn capture_photo(
    config: &Config,
    output: Option<&Path>,
    device: Option<&str>,
    auto_confirm: bool,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<()> {
    let store = try_use_image_store()?;
    let media = Arc::new(simulated_devices(config)?);
    let session = Arc::new(ImageAcquisitionSession::new(
        media,
        Arc::clone(&store),
        config.capture.clone(),
    ));

    print_header("LIVESTOCK CAPTURE");

    let outcome = runtime()?.block_on(async {
        let watcher = tokio::spawn(close_on_shutdown(
            Arc::clone(&session),
            Arc::clone(&shutdown_flag),
        ));
        let outcome = run_capture(&session, device, auto_confirm, &shutdown_flag).await;
        watcher.abort();
        outcome
    });
    session.close();

    let Some(view) = outcome? else {
        print_warning("Capture cancelled, no photo was submitted");
        return Ok(());
    };

    print_success(&format!(
        "Submitted {} ({}) for analysis",
        view.original_name,
        view.formatted_size()
    ));

    if let Some(dir) = output {
        let path = save_current_image(&store, dir)?;
        print_success(&format!("Saved to {}", path.display()));
    }

    Ok(())
}

/// Close the session as soon as a shutdown is requested
async fn close_on_shutdown(session: Arc<SimulatedSession>, shutdown_flag: Arc<AtomicBool>) {
    while !shutdown_flag.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    warn!("Shutdown requested, releasing the camera");
    session.close();
}

/// Interactive capture loop; `None` when the user gave up
async fn run_capture<M: MediaDevices>(
    session: &ImageAcquisitionSession<M>,
    device: Option<&str>,
    auto_confirm: bool,
    shutdown_flag: &AtomicBool,
) -> Result<Option<ArtifactView>> {
    if !start_camera(session, CameraRequest::Open, auto_confirm).await? {
        return Ok(None);
    }
    if let Some(id) = device {
        if !start_camera(session, CameraRequest::Switch(id), auto_confirm).await? {
            return Ok(None);
        }
    }

    loop {
        if shutdown_flag.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let spinner = CameraSpinner::start("Capturing...");
        match session.capture().await {
            Ok(()) => {}
            Err(SessionError::Superseded) => {
                spinner.fail("Capture interrupted");
                return Ok(None);
            }
            Err(SessionError::Device(e)) => {
                spinner.fail(&e.to_string());
                if auto_confirm {
                    return Err(e.into());
                }
                if !prompt_retry()? || !start_camera(session, CameraRequest::Open, false).await? {
                    return Ok(None);
                }
                continue;
            }
            Err(e) => {
                spinner.fail("Capture failed");
                return Err(e.into());
            }
        }

        let frame = session
            .captured_frame()
            .ok_or_else(|| anyhow!("No photo to review"))?;
        spinner.finish(&format!(
            "Captured {} ({}x{})",
            frame.file_name, frame.width, frame.height
        ));

        let choice = if auto_confirm {
            ReviewChoice::UsePhoto
        } else {
            prompt_review()?
        };

        match choice {
            ReviewChoice::UsePhoto => return Ok(Some(session.confirm_and_submit()?)),
            ReviewChoice::Retake => {
                if !start_camera(session, CameraRequest::Retake, auto_confirm).await? {
                    return Ok(None);
                }
            }
            ReviewChoice::Cancel => return Ok(None),
        }
    }
}

/// Run a camera request until the camera is live or the user gives up
async fn start_camera<M: MediaDevices>(
    session: &ImageAcquisitionSession<M>,
    request: CameraRequest<'_>,
    non_interactive: bool,
) -> Result<bool> {
    let mut request = request;

    loop {
        let spinner = CameraSpinner::start(&request.message());
        let result = match request {
            CameraRequest::Open => session.open().await,
            CameraRequest::Switch(id) => session.select_device(id).await,
            CameraRequest::Retake => session.retake().await,
        };

        match result {
            Ok(()) => {
                spinner.finish(&format!("Camera live: {}", active_camera_label(session)));
                return Ok(true);
            }
            Err(SessionError::Superseded) => {
                spinner.fail("Camera request cancelled");
                return Ok(false);
            }
            Err(SessionError::Device(e)) => {
                spinner.fail(&e.to_string());
                if non_interactive {
                    return Err(e.into());
                }
                if !prompt_retry()? {
                    return Ok(false);
                }
                request = CameraRequest::Open;
            }
            Err(e) => {
                spinner.fail("Camera unavailable");
                return Err(e.into());
            }
        }
    }
}

fn active_camera_label<M: MediaDevices>(session: &ImageAcquisitionSession<M>) -> String {
    let devices = session.devices();
    session
        .selected_device()
        .and_then(|id| {
            devices
                .iter()
                .enumerate()
                .find(|(_, d)| d.id == id)
                .map(|(i, d)| d.display_label(i))
        })
        .unwrap_or_else(|| "default camera".to_string())
}

fn prompt_review() -> Result<ReviewChoice> {
    let items = ["Use photo", "Retake", "Cancel"];
    let selection = Select::new()
        .with_prompt("Review the photo")
        .items(&items)
        .default(0)
        .interact()
        .context("Failed to read input")?;

    Ok(match selection {
        0 => ReviewChoice::UsePhoto,
        1 => ReviewChoice::Retake,
        _ => ReviewChoice::Cancel,
    })
}

fn prompt_retry() -> Result<bool> {
    Confirm::new()
        .with_prompt("Try again?")
        .default(true)
        .interact()
        .context("Failed to read input")
}

/// Write the store's current image into `dir`
fn save_current_image(store: &SharedImageStore, dir: &Path) -> Result<PathBuf> {
    let (name, bytes) = store
        .with_image(|a| (a.original_name().to_string(), a.bytes().to_vec()))
        .ok_or_else(|| anyhow!("No image to save"))?;

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(name);
    fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

// ============================================================================
// Upload
// ============================================================================

/// Load an image file into the image store
pub fn upload_file(config: &Config, path: &Path) -> Result<()> {
    let store = try_use_image_store()?;
    let view = upload_image(&store, path, &config.upload)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    print_success(&format!(
        "Loaded {} ({}, {})",
        view.original_name,
        view.mime_type,
        view.formatted_size()
    ));
    print_info(&format!("Display URL: {}", view.display_url));
    if let Some(length) = store.with_image(|a| a.as_data_url().len()) {
        debug!("Data URL is {} characters", length);
    }

    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

/// Show the config path, or reset the config file
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    let path = init_config()?;
    info!("Config file: {}", path.display());
    info!("Edit this file to change capture, upload and logging settings.");
    info!("Run 'livestock-capture show-config' to verify your settings.");

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            fs::write(&path, Config::generate_default_config())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to customize the capture settings.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[capture]");
    info!(
        "  ideal resolution = {}x{}",
        config.capture.ideal_width, config.capture.ideal_height
    );
    info!("  jpeg_quality = {}", config.capture.jpeg_quality);
    info!("  review_delay_ms = {}", config.capture.review_delay_ms);
    match config.capture.open_timeout() {
        Some(timeout) => info!("  open_timeout_ms = {}", timeout.as_millis()),
        None => info!("  open_timeout_ms = 0 (wait indefinitely)"),
    }
    info!(
        "  prefer_environment_facing = {}",
        config.capture.prefer_environment_facing
    );
    info!("  file_prefix = \"{}\"", config.capture.file_prefix);
    info!("");
    info!("[upload]");
    info!("  max_file_size = {}", config.upload.max_file_size);
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
    info!("");
    info!("[simulation]");
    info!("  scenario = \"{}\"", config.simulation.scenario);
    info!("  open_latency_ms = {}", config.simulation.open_latency_ms);
}

// ============================================================================
// Scenarios
// ============================================================================

/// Handle scenario subcommands
pub fn handle_scenario_command(command: &ScenarioCommands, config: &Config) -> Result<()> {
    let runner_config = |verbose: bool| RunnerConfig {
        verbose,
        capture: config.capture.clone().with_review_delay(0),
        ..Default::default()
    };

    let summary = match command {
        ScenarioCommands::RunAll { output, fail_fast } => {
            let mut runner = ScenarioRunner::with_config(RunnerConfig {
                fail_fast: *fail_fast,
                report_dir: output.clone(),
                ..runner_config(true)
            });
            runtime()?.block_on(runner.run_all())
        }
        ScenarioCommands::RunQuick { verbose } => {
            let mut runner = ScenarioRunner::with_config(runner_config(*verbose));
            runtime()?.block_on(runner.run_quick())
        }
        ScenarioCommands::RunTag { tag, verbose } => {
            let mut runner = ScenarioRunner::with_config(runner_config(*verbose));
            runtime()?.block_on(runner.run_by_tag(tag))
        }
        ScenarioCommands::Run { scenarios, verbose } => {
            let names: Vec<&str> = scenarios.iter().map(|s| s.as_str()).collect();
            let mut runner = ScenarioRunner::with_config(runner_config(*verbose));
            runtime()?.block_on(runner.run_by_names(&names))
        }
        ScenarioCommands::List { tag } => {
            list_scenarios(tag.as_deref());
            return Ok(());
        }
        ScenarioCommands::ListTags => {
            println!("\nAvailable tags:\n");
            for tag in testdb::list_tags() {
                println!("   • {}", tag);
            }
            println!();
            return Ok(());
        }
    };

    println!(
        "\n✓ Scenarios complete: {}/{} passed",
        summary.passed, summary.total
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn list_scenarios(tag_filter: Option<&str>) {
    let Some(tag) = tag_filter else {
        testdb::print_available_scenarios();
        return;
    };

    let scenarios = ScenarioLibrary::scenarios_by_tag(tag);
    if scenarios.is_empty() {
        println!("No scenarios tagged '{}'", tag);
        return;
    }

    println!("\nScenarios tagged '{}':\n", tag);
    for scenario in scenarios {
        println!("   • {:<20} {}", scenario.name, scenario.description);
    }
    println!();
}
