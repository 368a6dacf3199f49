mod memory;
pub mod store;

pub use memory::InMemoryBackend;
pub use store::ExternalStoreBackend;

use crate::error::Error;
use crate::hasher::ContentDigester;
use crate::model::{DuplicateSet, FileRecord};

/// Confirmed duplicate sets plus the number of candidates that failed
/// hashing (dropped from their group, never fatal).
#[derive(Debug, Default)]
pub struct Resolution {
    pub sets: Vec<DuplicateSet>,
    pub hash_failures: u64,
}

/// Storage substrate for the grouping/hashing pipeline. The in-memory
/// implementation holds the catalog in process maps; the external-store
/// implementation re-expresses each stage as bulk loads and aggregate
/// queries. Both must produce identical duplicate-set membership for the
/// same input tree.
pub trait Backend {
    /// Consume the scanner stream into the catalog. Returns records loaded.
    fn load_catalog(
        &mut self,
        records: &mut dyn Iterator<Item = FileRecord>,
    ) -> Result<u64, Error>;

    /// Discard (device, size) groups that cannot contain a duplicate.
    /// Returns the number of groups eliminated. Called again after hardlink
    /// collapse to catch groups the collapse reduced to a single member.
    fn candidate_groups(&mut self) -> Result<u64, Error>;

    /// Collapse entries that already share an inode down to one
    /// representative with a normalized link count. Returns entries removed.
    /// Idempotent.
    fn collapse_hardlinks(&mut self) -> Result<u64, Error>;

    /// Digest every surviving candidate and partition into duplicate sets.
    fn duplicate_sets(&mut self, digester: &dyn ContentDigester)
        -> Result<Resolution, Error>;
}
