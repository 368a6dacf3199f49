use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

use crate::actions::ConsolidateMode;
use crate::backend::store::MAX_BATCH_ROWS;
use crate::error::Error;

pub const DEFAULT_BATCH_SIZE: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    InMemory,
    ExternalStore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub root_paths: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub backend: BackendKind,
    pub mode: Option<ConsolidateMode>,
    pub batch_size: usize,
    pub database_url: Option<String>,
    pub csv_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            backend: BackendKind::InMemory,
            mode: None,
            batch_size: DEFAULT_BATCH_SIZE,
            database_url: None,
            csv_path: None,
        }
    }
}

impl AppConfig {
    /// Fatal checks, applied before any traversal begins.
    pub fn validate(&self) -> Result<(), Error> {
        if self.root_paths.is_empty() {
            return Err(Error::InvalidConfig(
                "no root paths given (pass them as arguments or set root_paths in Dupelink.toml)"
                    .to_string(),
            ));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_ROWS {
            return Err(Error::InvalidConfig(format!(
                "batch size must be between 1 and {}",
                MAX_BATCH_ROWS
            )));
        }
        Ok(())
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Dupelink").required(false))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the
/// list, so no file is cataloged twice.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        let mut should_add = true;
        let result_clone = result.clone();

        for res_dir in &result_clone {
            let res_dir_path = Path::new(res_dir);

            if dir_path.starts_with(res_dir_path) {
                should_add = false;
                break;
            }

            if res_dir_path.starts_with(dir_path) {
                result.retain(|x| x != res_dir);
                break;
            }
        }

        if should_add {
            result.push(dir);
        }
    }

    result
}
