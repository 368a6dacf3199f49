use diesel::prelude::{Insertable, Queryable};
use std::path::PathBuf;

use super::schema::catalog_entry;
use crate::model::FileRecord;

pub const CATALOG_ENTRY_FIELD_COUNT: usize = 9;

#[derive(Debug, Insertable)]
#[diesel(table_name = catalog_entry)]
pub struct NewCatalogEntry {
    pub path: String,
    pub device: i64,
    pub inode: i64,
    pub file_size: i64,
    pub link_count: i64,
    pub mode: i32,
    pub owner: i32,
    pub file_group: i32,
    pub digest: Option<String>,
}

impl NewCatalogEntry {
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            path: record.path.to_string_lossy().into_owned(),
            device: record.device as i64,
            inode: record.inode as i64,
            file_size: record.size as i64,
            link_count: record.link_count as i64,
            mode: record.mode as i32,
            owner: record.owner as i32,
            file_group: record.group as i32,
            digest: record.digest.clone(),
        }
    }
}

#[derive(Debug, Queryable)]
pub struct CatalogRow {
    pub id: i32,
    pub path: String,
    pub device: i64,
    pub inode: i64,
    pub file_size: i64,
    pub link_count: i64,
    pub mode: i32,
    pub owner: i32,
    pub file_group: i32,
    pub digest: Option<String>,
}

impl CatalogRow {
    pub fn into_record(self) -> FileRecord {
        FileRecord {
            path: PathBuf::from(self.path),
            device: self.device as u64,
            inode: self.inode as u64,
            size: self.file_size as u64,
            link_count: self.link_count as u64,
            mode: self.mode as u32,
            owner: self.owner as u32,
            group: self.file_group as u32,
            digest: self.digest,
        }
    }
}
