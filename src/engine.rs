use std::time::Instant;
use tracing::{debug, info};

use crate::actions::{self, ActionReport};
use crate::backend::{Backend, ExternalStoreBackend, InMemoryBackend, Resolution};
use crate::config::{self, AppConfig, BackendKind};
use crate::error::Error;
use crate::hasher::Blake3Digester;
use crate::model::{DuplicateSet, RunStats};
use crate::progress::ProgressReporter;
use crate::scanner::ScanStream;

pub struct DedupeEngine {
    config: AppConfig,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub stats: RunStats,
    pub sets: Vec<DuplicateSet>,
    pub actions: Option<ActionReport>,
}

impl DedupeEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the full duplicate detection pipeline:
    /// 1. Walk the roots into the backend's catalog
    /// 2. Discard unique (device, size) groups, collapse hardlinks
    /// 3. Confirm duplicates by full-content digest
    /// 4. Consolidate (hardlink/delete) if a mode was requested
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunOutcome, Error> {
        self.config.validate()?;

        let roots = config::non_overlapping_directories(self.config.root_paths.clone());
        info!("Processing directories: {:?}", roots);

        let mut backend = self.build_backend()?;
        let digester = Blake3Digester;
        let mut stats = RunStats::default();

        // Phase 1: Scan
        reporter.on_scan_start();
        let scan_start = Instant::now();
        let mut stream = ScanStream::new(&roots, &self.config.ignore_patterns);
        {
            let mut seen = 0usize;
            let mut counted = stream.by_ref().inspect(|record| {
                seen += 1;
                if seen % 1024 == 0 {
                    reporter.on_scan_progress(seen, &record.path.to_string_lossy());
                }
            });
            stats.files_cataloged = backend.load_catalog(&mut counted)?;
        }
        stats.zero_byte_files = stream.zero_byte_files;
        stats.scan_errors = stream.scan_errors;
        stats.scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(
            stats.files_cataloged as usize,
            stats.scan_duration.as_secs_f64(),
        );
        debug!(
            "Scan completed in {:.2}s — {} files cataloged, {} zero-byte, {} errors",
            stats.scan_duration.as_secs_f64(),
            stats.files_cataloged,
            stats.zero_byte_files,
            stats.scan_errors,
        );

        // Phase 2: Eliminate what cannot be duplicated
        stats.unique_size_eliminations += backend.candidate_groups()?;
        stats.hardlink_eliminations = backend.collapse_hardlinks()?;
        // Groups the collapse reduced to one member fall to the size filter.
        stats.unique_size_eliminations += backend.candidate_groups()?;
        debug!(
            "{} unique-size groups eliminated, {} hardlinked entries collapsed",
            stats.unique_size_eliminations, stats.hardlink_eliminations,
        );

        // Phase 3: Confirm by digest
        reporter.on_hash_start();
        let hash_start = Instant::now();
        let Resolution {
            sets,
            hash_failures,
        } = backend.duplicate_sets(&digester)?;
        stats.hash_duration = hash_start.elapsed();
        stats.hash_failures = hash_failures;
        stats.duplicate_sets = sets.len() as u64;
        stats.duplicate_files = sets.iter().map(|s| s.members.len() as u64).sum();
        stats.wasted_bytes = sets.iter().map(DuplicateSet::wasted_bytes).sum();
        reporter.on_hash_complete(sets.len(), stats.hash_duration.as_secs_f64());
        debug!(
            "Hash completed in {:.2}s — {} duplicate sets, {} files, {} bytes wasted",
            stats.hash_duration.as_secs_f64(),
            stats.duplicate_sets,
            stats.duplicate_files,
            stats.wasted_bytes,
        );

        // Phase 4: Consolidate
        let actions = match self.config.mode {
            Some(mode) => {
                reporter.on_actions_start(sets.len());
                let action_start = Instant::now();
                let mut report = ActionReport::default();
                for set in &sets {
                    report.merge(actions::consolidate(set, mode));
                }
                stats.action_duration = action_start.elapsed();
                stats.actions_failed = report.failed.len() as u64;
                Some(report)
            }
            None => None,
        };

        Ok(RunOutcome {
            stats,
            sets,
            actions,
        })
    }

    fn build_backend(&self) -> Result<Box<dyn Backend>, Error> {
        match self.config.backend {
            BackendKind::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendKind::ExternalStore => {
                let url = self.config.database_url.as_deref().ok_or_else(|| {
                    Error::InvalidConfig(
                        "external-store backend requires a database URL \
                         (--database-url or DATABASE_URL)"
                            .to_string(),
                    )
                })?;
                let backend = ExternalStoreBackend::connect(url, self.config.batch_size)?;
                Ok(Box::new(backend))
            }
        }
    }
}
