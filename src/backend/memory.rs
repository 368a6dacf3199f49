use ahash::AHashMap;
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use super::{Backend, Resolution};
use crate::error::Error;
use crate::hasher::{self, ContentDigester};
use crate::model::{DuplicateSet, FileRecord, GroupKey};

/// Catalog held entirely in process maps. Rule of thumb is roughly 1KB per
/// file; above that, use the external store.
#[derive(Default)]
pub struct InMemoryBackend {
    groups: AHashMap<GroupKey, Vec<FileRecord>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for InMemoryBackend {
    fn load_catalog(
        &mut self,
        records: &mut dyn Iterator<Item = FileRecord>,
    ) -> Result<u64, Error> {
        let mut loaded = 0u64;
        for record in records {
            let key = GroupKey {
                device: record.device,
                size: record.size,
            };
            self.groups.entry(key).or_default().push(record);
            loaded += 1;
        }
        Ok(loaded)
    }

    fn candidate_groups(&mut self) -> Result<u64, Error> {
        let before = self.groups.len() as u64;
        self.groups.retain(|_, members| members.len() > 1);
        Ok(before - self.groups.len() as u64)
    }

    fn collapse_hardlinks(&mut self) -> Result<u64, Error> {
        let mut eliminated = 0u64;
        for members in self.groups.values_mut() {
            eliminated += collapse_group(members);
        }
        Ok(eliminated)
    }

    fn duplicate_sets(
        &mut self,
        digester: &dyn ContentDigester,
    ) -> Result<Resolution, Error> {
        let groups: Vec<(GroupKey, Vec<FileRecord>)> = self.groups.drain().collect();
        let hash_failures = AtomicU64::new(0);

        let mut sets: Vec<DuplicateSet> = groups
            .into_par_iter()
            .flat_map(|(key, members)| resolve_group(key, members, digester, &hash_failures))
            .collect();

        sets.sort_by(|a, b| {
            a.device
                .cmp(&b.device)
                .then(b.size.cmp(&a.size))
                .then(a.digest.cmp(&b.digest))
        });

        Ok(Resolution {
            sets,
            hash_failures: hash_failures.into_inner(),
        })
    }
}

/// Keep one representative per inode among members that are hardlinks of each
/// other, with the link count normalized so later stages treat it as a single
/// logical file. The representative is the smallest path, so re-running the
/// collapse yields the same survivors.
fn collapse_group(members: &mut Vec<FileRecord>) -> u64 {
    let before = members.len();

    let mut representatives: AHashMap<u64, FileRecord> = AHashMap::new();
    let mut survivors: Vec<FileRecord> = Vec::with_capacity(before);

    for record in members.drain(..) {
        if record.link_count > 1 {
            match representatives.entry(record.inode) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    if record.path < entry.get().path {
                        entry.insert(record);
                    }
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(record);
                }
            }
        } else {
            survivors.push(record);
        }
    }

    for (_, mut representative) in representatives {
        representative.link_count = 1;
        survivors.push(representative);
    }
    survivors.sort_by(|a, b| a.path.cmp(&b.path));

    *members = survivors;
    (before - members.len()) as u64
}

/// Two-tier resolution of one candidate group: a partial hash over the
/// leading block prunes members that cannot match anything, then the full
/// digest partitions what is left. Only the full digest ever confirms a
/// duplicate.
fn resolve_group(
    key: GroupKey,
    members: Vec<FileRecord>,
    digester: &dyn ContentDigester,
    hash_failures: &AtomicU64,
) -> Vec<DuplicateSet> {
    let mut by_partial: AHashMap<u64, Vec<FileRecord>> = AHashMap::new();
    for record in members {
        match hasher::partial_hash(&record.path) {
            Ok(hash) => by_partial.entry(hash).or_default().push(record),
            Err(err) => {
                warn!("Error reading '{}': {}", record.path.display(), err);
                hash_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    let by_digest: DashMap<String, Vec<FileRecord>> = DashMap::new();
    for (_, candidates) in by_partial {
        if candidates.len() < 2 {
            continue;
        }
        candidates.into_par_iter().for_each(|mut record| {
            match digester.digest_file(&record.path) {
                Ok(digest) => {
                    record.digest = Some(digest.clone());
                    by_digest.entry(digest).or_default().push(record);
                }
                Err(err) => {
                    warn!("Error hashing '{}': {}", record.path.display(), err);
                    hash_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }

    let mut sets: Vec<DuplicateSet> = by_digest
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(digest, mut members)| {
            members.sort_by(|a, b| a.path.cmp(&b.path));
            DuplicateSet {
                device: key.device,
                size: key.size,
                digest,
                members,
            }
        })
        .collect();
    sets.sort_by(|a, b| a.digest.cmp(&b.digest));
    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(path: &str, device: u64, inode: u64, size: u64, link_count: u64) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            device,
            inode,
            size,
            link_count,
            mode: 0o100644,
            owner: 0,
            group: 0,
            digest: None,
        }
    }

    fn load(backend: &mut InMemoryBackend, records: Vec<FileRecord>) {
        backend
            .load_catalog(&mut records.into_iter())
            .unwrap();
    }

    #[test]
    fn test_unique_sizes_are_discarded_and_counted() {
        let mut backend = InMemoryBackend::new();
        load(
            &mut backend,
            vec![
                record("/a", 1, 1, 10, 1),
                record("/b", 1, 2, 10, 1),
                record("/c", 1, 3, 20, 1),
            ],
        );

        assert_eq!(backend.candidate_groups().unwrap(), 1);
        assert_eq!(backend.groups.len(), 1);
    }

    #[test]
    fn test_same_size_on_different_devices_never_grouped() {
        let mut backend = InMemoryBackend::new();
        load(
            &mut backend,
            vec![record("/a", 1, 1, 10, 1), record("/b", 2, 2, 10, 1)],
        );

        // Each file is alone on its device, so both groups are eliminated.
        assert_eq!(backend.candidate_groups().unwrap(), 2);
        assert!(backend.groups.is_empty());
    }

    #[test]
    fn test_hardlink_collapse_keeps_smallest_path() {
        let mut backend = InMemoryBackend::new();
        load(
            &mut backend,
            vec![
                record("/z-link", 1, 7, 10, 2),
                record("/a-link", 1, 7, 10, 2),
                record("/other", 1, 8, 10, 1),
            ],
        );

        assert_eq!(backend.collapse_hardlinks().unwrap(), 1);
        let members = backend.groups.values().next().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].path, PathBuf::from("/a-link"));
        assert_eq!(members[0].link_count, 1);
    }

    #[test]
    fn test_hardlink_collapse_is_idempotent() {
        let mut backend = InMemoryBackend::new();
        load(
            &mut backend,
            vec![
                record("/l1", 1, 7, 10, 3),
                record("/l2", 1, 7, 10, 3),
                record("/l3", 1, 7, 10, 3),
            ],
        );

        assert_eq!(backend.collapse_hardlinks().unwrap(), 2);
        let first: Vec<FileRecord> = backend.groups.values().next().unwrap().clone();

        assert_eq!(backend.collapse_hardlinks().unwrap(), 0);
        assert_eq!(backend.groups.values().next().unwrap(), &first);
    }

    #[test]
    fn test_group_collapsed_to_singleton_is_eliminated() {
        let mut backend = InMemoryBackend::new();
        load(
            &mut backend,
            vec![record("/l1", 1, 7, 10, 2), record("/l2", 1, 7, 10, 2)],
        );

        assert_eq!(backend.candidate_groups().unwrap(), 0);
        assert_eq!(backend.collapse_hardlinks().unwrap(), 1);
        assert_eq!(backend.candidate_groups().unwrap(), 1);
        assert!(backend.groups.is_empty());
    }

    #[test]
    fn test_duplicate_sets_confirmed_by_digest() {
        use crate::hasher::Blake3Digester;
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        fs::write(&a, "same bytes").unwrap();
        fs::write(&b, "same bytes").unwrap();
        fs::write(&c, "diff bytes").unwrap();

        let mut backend = InMemoryBackend::new();
        let mut stream = crate::scanner::ScanStream::new(
            &[dir.path().to_string_lossy().into_owned()],
            &[],
        );
        backend.load_catalog(&mut stream).unwrap();
        backend.candidate_groups().unwrap();
        backend.collapse_hardlinks().unwrap();
        backend.candidate_groups().unwrap();

        let resolution = backend.duplicate_sets(&Blake3Digester).unwrap();
        assert_eq!(resolution.hash_failures, 0);
        assert_eq!(resolution.sets.len(), 1);

        let set = &resolution.sets[0];
        assert_eq!(set.members.len(), 2);
        assert_eq!(set.members[0].path, a);
        assert_eq!(set.members[1].path, b);
        assert_eq!(set.members[0].digest.as_deref(), Some(set.digest.as_str()));
    }

    #[test]
    fn test_vanished_file_counts_as_hash_failure() {
        use crate::hasher::Blake3Digester;

        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, "same bytes").unwrap();
        std::fs::write(&b, "same bytes").unwrap();

        let mut backend = InMemoryBackend::new();
        let mut stream = crate::scanner::ScanStream::new(
            &[dir.path().to_string_lossy().into_owned()],
            &[],
        );
        backend.load_catalog(&mut stream).unwrap();
        backend.candidate_groups().unwrap();

        // File disappears between scan and hash
        std::fs::remove_file(&b).unwrap();

        let resolution = backend.duplicate_sets(&Blake3Digester).unwrap();
        assert_eq!(resolution.hash_failures, 1);
        assert!(resolution.sets.is_empty());
    }
}
