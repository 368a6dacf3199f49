use glob::Pattern;
use tracing::{error, warn};
use walkdir::{DirEntry, WalkDir};

use crate::model::FileRecord;

/// Pull-based stream of catalog records over one or more root trees.
///
/// Directories, symlinks and other non-regular entries are skipped. Zero-byte
/// files and unreadable entries are counted but never emitted; a failure on
/// one entry never aborts the walk. Peak memory stays proportional to one
/// path, so the external-store backend can consume the stream batch by batch.
pub struct ScanStream {
    walker: Box<dyn Iterator<Item = walkdir::Result<DirEntry>>>,
    ignore_patterns: Vec<Pattern>,
    pub zero_byte_files: u64,
    pub scan_errors: u64,
}

impl ScanStream {
    pub fn new(root_paths: &[String], ignore_globs: &[String]) -> Self {
        let ignore_patterns = compile_patterns(ignore_globs);

        let walkers: Vec<_> = root_paths
            .iter()
            .map(|root| WalkDir::new(root).follow_links(false).into_iter())
            .collect();

        Self {
            walker: Box::new(walkers.into_iter().flatten()),
            ignore_patterns,
            zero_byte_files: 0,
            scan_errors: 0,
        }
    }
}

impl Iterator for ScanStream {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    self.scan_errors += 1;
                    continue;
                }
            };

            if self
                .ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path(entry.path()))
            {
                continue;
            }

            // file_type() comes from the directory entry; symlinks and
            // directories are rejected without another syscall.
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(
                        "Error getting metadata for {}: {}",
                        entry.path().display(),
                        err
                    );
                    self.scan_errors += 1;
                    continue;
                }
            };

            if metadata.len() == 0 {
                self.zero_byte_files += 1;
                continue;
            }

            return Some(FileRecord::from_metadata(entry.into_path(), &metadata));
        }
    }
}

fn compile_patterns(ignore_globs: &[String]) -> Vec<Pattern> {
    ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                error!("Invalid glob pattern '{}': {}", glob, err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn roots(paths: &[&std::path::Path]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_scan_emits_regular_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/a.txt"), "aa").unwrap();
        fs::write(dir.path().join("b.txt"), "bb").unwrap();

        let records: Vec<FileRecord> =
            ScanStream::new(&roots(&[dir.path()]), &[]).collect();
        let mut names: Vec<PathBuf> = records.iter().map(|r| r.path.clone()).collect();
        names.sort();

        assert_eq!(records.len(), 2);
        assert!(names[1].ends_with("sub/a.txt"));
    }

    #[test]
    fn test_zero_byte_files_are_counted_not_emitted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty"), "").unwrap();
        fs::write(dir.path().join("full"), "x").unwrap();

        let mut stream = ScanStream::new(&roots(&[dir.path()]), &[]);
        let records: Vec<FileRecord> = stream.by_ref().collect();

        assert_eq!(records.len(), 1);
        assert_eq!(stream.zero_byte_files, 1);
    }

    #[test]
    fn test_broken_symlink_is_skipped_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real"), "x").unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("missing-target"),
            dir.path().join("dangling"),
        )
        .unwrap();

        let mut stream = ScanStream::new(&roots(&[dir.path()]), &[]);
        let records: Vec<FileRecord> = stream.by_ref().collect();

        // The dangling symlink is not a regular file; the walk still finishes.
        assert_eq!(records.len(), 1);
        assert!(records[0].path.ends_with("real"));
    }

    #[test]
    fn test_ignore_patterns_filter_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("cache")).unwrap();
        fs::write(dir.path().join("cache/skip.bin"), "zz").unwrap();
        fs::write(dir.path().join("keep.bin"), "zz").unwrap();

        let ignores = vec!["**/cache/**".to_string()];
        let records: Vec<FileRecord> =
            ScanStream::new(&roots(&[dir.path()]), &ignores).collect();

        assert_eq!(records.len(), 1);
        assert!(records[0].path.ends_with("keep.bin"));
    }

    #[test]
    fn test_multiple_roots_are_chained() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        fs::write(dir_a.path().join("a"), "1").unwrap();
        fs::write(dir_b.path().join("b"), "2").unwrap();

        let records: Vec<FileRecord> =
            ScanStream::new(&roots(&[dir_a.path(), dir_b.path()]), &[]).collect();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_record_carries_inode_and_link_count() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("original");
        fs::write(&original, "zzz").unwrap();
        fs::hard_link(&original, dir.path().join("linked")).unwrap();

        let records: Vec<FileRecord> =
            ScanStream::new(&roots(&[dir.path()]), &[]).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].inode, records[1].inode);
        assert!(records.iter().all(|r| r.link_count == 2));
    }
}
