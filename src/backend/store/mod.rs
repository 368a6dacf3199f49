mod catalog;
mod schema;

pub use catalog::{CatalogRow, NewCatalogEntry, CATALOG_ENTRY_FIELD_COUNT};

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_query;
use rayon::prelude::*;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use super::{Backend, Resolution};
use crate::error::Error;
use crate::hasher::ContentDigester;
use crate::model::{DuplicateSet, FileRecord};

pub const POSTGRES_MAX_PARAMETERS: usize = 65535;

/// Upper bound on rows per insert statement, so one batch never exceeds the
/// store's bind-parameter limit.
pub const MAX_BATCH_ROWS: usize = POSTGRES_MAX_PARAMETERS / CATALOG_ENTRY_FIELD_COUNT;

/// Catalog persisted in a single PostgreSQL table. Each pipeline stage is an
/// aggregate query over that table instead of an in-process map, so the
/// working set never has to fit in memory. The run owns the table: it is
/// created if absent and truncated at the start of every run.
pub struct ExternalStoreBackend {
    conn: PgConnection,
    batch_size: usize,
}

impl ExternalStoreBackend {
    pub fn connect(database_url: &str, batch_size: usize) -> Result<Self, Error> {
        let mut conn = PgConnection::establish(database_url)?;
        init_catalog_table(&mut conn)?;
        Ok(Self { conn, batch_size })
    }

    fn insert_batch(&mut self, batch: &[NewCatalogEntry]) -> Result<usize, Error> {
        let rows = diesel::insert_into(schema::catalog_entry::table)
            .values(batch)
            .execute(&mut self.conn)?;
        debug!("Inserted batch of {} catalog rows", rows);
        Ok(rows)
    }

    /// Remove rows whose (device, file_size) class has a single member. Each
    /// removed row is one eliminated group.
    fn delete_unique_sizes(&mut self) -> Result<u64, Error> {
        let removed = sql_query(
            "DELETE FROM catalog_entry a \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM catalog_entry b \
                 WHERE b.device = a.device \
                   AND b.file_size = a.file_size \
                   AND b.id <> a.id)",
        )
        .execute(&mut self.conn)?;
        Ok(removed as u64)
    }
}

fn init_catalog_table(conn: &mut PgConnection) -> Result<(), Error> {
    sql_query(
        "CREATE TABLE IF NOT EXISTS catalog_entry ( \
             id SERIAL PRIMARY KEY, \
             path TEXT NOT NULL, \
             device BIGINT NOT NULL, \
             inode BIGINT NOT NULL, \
             file_size BIGINT NOT NULL, \
             link_count BIGINT NOT NULL, \
             mode INTEGER NOT NULL, \
             owner INTEGER NOT NULL, \
             file_group INTEGER NOT NULL, \
             digest TEXT)",
    )
    .execute(conn)?;
    sql_query(
        "CREATE INDEX IF NOT EXISTS catalog_entry_inode_idx \
         ON catalog_entry (device, inode)",
    )
    .execute(conn)?;
    sql_query(
        "CREATE INDEX IF NOT EXISTS catalog_entry_size_idx \
         ON catalog_entry (device, file_size)",
    )
    .execute(conn)?;
    sql_query(
        "CREATE INDEX IF NOT EXISTS catalog_entry_digest_idx \
         ON catalog_entry (digest)",
    )
    .execute(conn)?;

    debug!("Truncating table: catalog_entry");
    sql_query("TRUNCATE TABLE catalog_entry RESTART IDENTITY").execute(conn)?;
    Ok(())
}

impl Backend for ExternalStoreBackend {
    fn load_catalog(
        &mut self,
        records: &mut dyn Iterator<Item = FileRecord>,
    ) -> Result<u64, Error> {
        let mut loaded = 0u64;
        let mut batch: Vec<NewCatalogEntry> = Vec::with_capacity(self.batch_size);

        for record in records {
            batch.push(NewCatalogEntry::from_record(&record));
            if batch.len() >= self.batch_size {
                loaded += self.insert_batch(&batch)? as u64;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            loaded += self.insert_batch(&batch)? as u64;
        }
        Ok(loaded)
    }

    fn candidate_groups(&mut self) -> Result<u64, Error> {
        self.delete_unique_sizes()
    }

    fn collapse_hardlinks(&mut self) -> Result<u64, Error> {
        // Keep the minimum-path row per (device, inode) among hardlinked
        // entries, then normalize survivors to a single logical link.
        let eliminated = sql_query(
            "DELETE FROM catalog_entry a \
             USING catalog_entry b \
             WHERE a.link_count > 1 \
               AND b.link_count > 1 \
               AND a.device = b.device \
               AND a.inode = b.inode \
               AND b.path < a.path",
        )
        .execute(&mut self.conn)?;

        sql_query("UPDATE catalog_entry SET link_count = 1 WHERE link_count > 1")
            .execute(&mut self.conn)?;

        Ok(eliminated as u64)
    }

    fn duplicate_sets(
        &mut self,
        digester: &dyn ContentDigester,
    ) -> Result<Resolution, Error> {
        use schema::catalog_entry::dsl as ce;

        let pending: Vec<(i32, String)> = ce::catalog_entry
            .select((ce::id, ce::path))
            .order(ce::id.asc())
            .load(&mut self.conn)?;

        // Read each surviving file once; hashing dominates the run, so it is
        // the one stage spread across a worker pool.
        let hashed: Vec<(i32, String, io::Result<String>)> = pending
            .into_par_iter()
            .map(|(row_id, path)| {
                let result = digester.digest_file(Path::new(&path));
                (row_id, path, result)
            })
            .collect();

        let mut updates: Vec<(i32, String)> = Vec::with_capacity(hashed.len());
        let mut failed_ids: Vec<i32> = Vec::new();
        for (row_id, path, result) in hashed {
            match result {
                Ok(digest) => updates.push((row_id, digest)),
                Err(err) => {
                    warn!("Error hashing '{}': {}", path, err);
                    failed_ids.push(row_id);
                }
            }
        }
        let hash_failures = failed_ids.len() as u64;

        // Persist digests back by primary key, one transaction per batch.
        for chunk in updates.chunks(self.batch_size) {
            self.conn
                .transaction::<_, diesel::result::Error, _>(|conn| {
                    for (row_id, digest_hex) in chunk {
                        diesel::update(ce::catalog_entry.find(row_id))
                            .set(ce::digest.eq(digest_hex))
                            .execute(conn)?;
                    }
                    Ok(())
                })?;
        }
        if !failed_ids.is_empty() {
            diesel::delete(ce::catalog_entry.filter(ce::id.eq_any(&failed_ids)))
                .execute(&mut self.conn)?;
        }

        // One ordered pass; consecutive rows sharing (device, size, digest)
        // form a set, and only runs of two or more survive.
        let rows: Vec<CatalogRow> = ce::catalog_entry
            .filter(ce::digest.is_not_null())
            .order((
                ce::device.asc(),
                ce::file_size.desc(),
                ce::digest.asc(),
                ce::path.asc(),
            ))
            .load(&mut self.conn)?;

        let mut sets: Vec<DuplicateSet> = Vec::new();
        let mut run: Vec<FileRecord> = Vec::new();
        for row in rows {
            let record = row.into_record();
            let same_run = run.first().is_some_and(|first| {
                first.device == record.device
                    && first.size == record.size
                    && first.digest == record.digest
            });
            if !same_run {
                flush_run(&mut sets, std::mem::take(&mut run));
            }
            run.push(record);
        }
        flush_run(&mut sets, run);

        Ok(Resolution {
            sets,
            hash_failures,
        })
    }
}

fn flush_run(sets: &mut Vec<DuplicateSet>, run: Vec<FileRecord>) {
    if run.len() < 2 {
        return;
    }
    let first = &run[0];
    let Some(digest) = first.digest.clone() else {
        return;
    };
    sets.push(DuplicateSet {
        device: first.device,
        size: first.size,
        digest,
        members: run,
    });
}
