use std::fs::{Metadata, OpenOptions};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// One regular file discovered by the scanner. The digest stays unset until
/// the duplicate resolver confirms the file needs a full-content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub device: u64,
    pub inode: u64,
    pub size: u64,
    pub link_count: u64,
    pub mode: u32,
    pub owner: u32,
    pub group: u32,
    pub digest: Option<String>,
}

impl FileRecord {
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            device: metadata.dev(),
            inode: metadata.ino(),
            size: metadata.len(),
            link_count: metadata.nlink(),
            mode: metadata.mode(),
            owner: metadata.uid(),
            group: metadata.gid(),
            digest: None,
        }
    }
}

/// Candidate-group key. Hardlinks cannot cross devices, so files on
/// different devices are never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub device: u64,
    pub size: u64,
}

/// Files confirmed byte-identical by a full-content digest. Members are
/// sorted by path; the first member is the canonical one when consolidating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSet {
    pub device: u64,
    pub size: u64,
    pub digest: String,
    pub members: Vec<FileRecord>,
}

impl DuplicateSet {
    pub fn wasted_bytes(&self) -> u64 {
        self.size * (self.members.len() as u64).saturating_sub(1)
    }
}

/// Counters accumulated across the pipeline stages, finalized once per run.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub files_cataloged: u64,
    pub zero_byte_files: u64,
    pub scan_errors: u64,
    pub unique_size_eliminations: u64,
    pub hardlink_eliminations: u64,
    pub hash_failures: u64,
    pub duplicate_sets: u64,
    pub duplicate_files: u64,
    pub wasted_bytes: u64,
    pub actions_failed: u64,
    pub scan_duration: Duration,
    pub hash_duration: Duration,
    pub action_duration: Duration,
}

impl RunStats {
    /// Append one summary row per run so consecutive runs can be compared.
    pub fn write_csv(&self, path: &str) -> Result<(), Error> {
        let write_header = !Path::new(path).exists();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record([
                "timestamp",
                "files_cataloged",
                "zero_byte_files",
                "scan_errors",
                "unique_size_eliminations",
                "hardlink_eliminations",
                "hash_failures",
                "duplicate_sets",
                "duplicate_files",
                "wasted_bytes",
                "actions_failed",
                "scan_secs",
                "hash_secs",
            ])?;
        }

        writer.write_record([
            chrono::Utc::now().to_rfc3339(),
            self.files_cataloged.to_string(),
            self.zero_byte_files.to_string(),
            self.scan_errors.to_string(),
            self.unique_size_eliminations.to_string(),
            self.hardlink_eliminations.to_string(),
            self.hash_failures.to_string(),
            self.duplicate_sets.to_string(),
            self.duplicate_files.to_string(),
            self.wasted_bytes.to_string(),
            self.actions_failed.to_string(),
            format!("{:.3}", self.scan_duration.as_secs_f64()),
            format!("{:.3}", self.hash_duration.as_secs_f64()),
        ])?;
        writer.flush()?;
        Ok(())
    }
}
