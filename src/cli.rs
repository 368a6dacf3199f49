use clap::{Parser, ValueEnum};

use crate::actions::ConsolidateMode;
use crate::config::{AppConfig, BackendKind};

#[derive(Debug, Parser)]
#[command(name = "dupelink")]
#[command(
    about = "Find duplicate files and reclaim space by hardlinking or deleting them",
    long_about = None
)]
pub struct Cli {
    /// Root directories to scan
    pub roots: Vec<String>,

    /// Action to apply to confirmed duplicate sets (omit for report-only)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Where the file catalog lives during the run
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Rows per insert batch for the external-store backend
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Glob pattern to exclude from the scan (repeatable)
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore_patterns: Vec<String>,

    /// PostgreSQL connection URL (defaults to DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Append the run summary to this CSV file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Layer the command line over the file-based configuration; the command
    /// line wins wherever both are set.
    pub fn apply(self, mut config: AppConfig) -> AppConfig {
        if !self.roots.is_empty() {
            config.root_paths = self.roots;
        }
        config.ignore_patterns.extend(self.ignore_patterns);
        if let Some(mode) = self.mode {
            config.mode = Some(mode.into());
        }
        if let Some(backend) = self.backend {
            config.backend = backend.into();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.database_url.is_some() {
            config.database_url = self.database_url;
        }
        if self.csv.is_some() {
            config.csv_path = self.csv;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Hardlink,
    Delete,
}

impl From<ModeArg> for ConsolidateMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Hardlink => ConsolidateMode::Hardlink,
            ModeArg::Delete => ConsolidateMode::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    InMemory,
    ExternalStore,
}

impl From<BackendArg> for BackendKind {
    fn from(backend: BackendArg) -> Self {
        match backend {
            BackendArg::InMemory => BackendKind::InMemory,
            BackendArg::ExternalStore => BackendKind::ExternalStore,
        }
    }
}
