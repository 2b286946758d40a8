//! Progress and console output utilities for the CLI
//!
//! Key features:
//! - A spinner shown while the camera starts or a photo is encoded
//! - Consistent visual styling for status lines
//! - A writer that mirrors log output to a file

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::{Duration, Instant};

// ============================================================================
// Styles
// ============================================================================

/// Get the spinner style for waiting on the camera
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap()
        .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Spinner for camera operations
// ============================================================================

/// Spinner shown while waiting on the camera
pub struct CameraSpinner {
    spinner: ProgressBar,
    start_time: Instant,
}

impl CameraSpinner {
    /// Start spinning with a message
    pub fn start(msg: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message(msg.to_string());

        Self {
            spinner,
            start_time: Instant::now(),
        }
    }

    /// Hidden spinner, for non-interactive runs
    pub fn hidden() -> Self {
        Self {
            spinner: ProgressBar::hidden(),
            start_time: Instant::now(),
        }
    }

    /// Update the message
    pub fn set_message(&self, msg: &str) {
        self.spinner.set_message(msg.to_string());
    }

    /// Time since the spinner started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Stop and leave a success line
    pub fn finish(&self, msg: &str) {
        self.spinner
            .finish_with_message(format!("✓ {} ({:.1}s)", msg, self.elapsed().as_secs_f64()));
    }

    /// Stop and leave a failure line
    pub fn fail(&self, msg: &str) {
        self.spinner.abandon_with_message(format!("✗ {}", msg));
    }
}

impl Drop for CameraSpinner {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hidden_spinner_finishes() {
        let spinner = CameraSpinner::hidden();
        spinner.set_message("Starting camera...");
        spinner.finish("Camera ready");
        assert!(spinner.spinner.is_finished());
    }

    #[test]
    fn test_dual_writer_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.log");
        let mut writer = DualWriter {
            console: std::io::stderr(),
            file: fs::File::create(&path).unwrap(),
        };

        writeln!(writer, "camera live").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "camera live\n");
    }
}
