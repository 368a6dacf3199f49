use indicatif::ProgressBar;
use std::time::Duration;

/// Callbacks for long-running pipeline phases.
///
/// The CLI implements this with an indicatif spinner; tests use the silent
/// implementation. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_progress(&self, _files_found: usize, _current_path: &str) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_hash_start(&self) {}
    fn on_hash_complete(&self, _duplicate_sets: usize, _duration_secs: f64) {}
    fn on_actions_start(&self, _duplicate_sets: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

pub struct CliReporter {
    spinner: ProgressBar,
}

impl CliReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self { spinner }
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        self.spinner.set_message("Scanning files...");
    }

    fn on_scan_progress(&self, files_found: usize, current_path: &str) {
        self.spinner
            .set_message(format!("Scanned {} files ({})", files_found, current_path));
    }

    fn on_scan_complete(&self, total_files: usize, duration_secs: f64) {
        self.spinner.println(format!(
            "Scanned {} files in {:.2}s",
            total_files, duration_secs
        ));
    }

    fn on_hash_start(&self) {
        self.spinner.set_message("Hashing candidate files...");
    }

    fn on_hash_complete(&self, duplicate_sets: usize, duration_secs: f64) {
        self.spinner.println(format!(
            "Confirmed {} duplicate sets in {:.2}s",
            duplicate_sets, duration_secs
        ));
        self.spinner.finish_and_clear();
    }

    fn on_actions_start(&self, duplicate_sets: usize) {
        self.spinner
            .set_message(format!("Consolidating {} duplicate sets...", duplicate_sets));
    }
}
