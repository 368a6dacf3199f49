pub mod actions;
pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod logging;
pub mod model;
pub mod progress;
pub mod report;
pub mod scanner;

pub use config::AppConfig;
pub use engine::{DedupeEngine, RunOutcome};
pub use error::Error;
pub use model::{DuplicateSet, FileRecord, RunStats};
pub use progress::{CliReporter, ProgressReporter, SilentReporter};
