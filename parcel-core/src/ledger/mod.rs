use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::hash::digest::Digest;

pub mod backend;
pub mod factory;
pub mod json_fs;
pub mod record;

pub use backend::{LedgerBackend, Table};
pub use record::FileRecord;

/// In-memory working copy of the delivery history, the dedup authority.
/// Mutations stay in memory until [`HistoryStore::persist`].
pub struct HistoryStore {
    backend: Box<dyn LedgerBackend>,
    table: Table,
    // digest → number of records carrying it
    by_hash: HashMap<Digest, usize>,
}

pub fn key_for(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl HistoryStore {
    pub fn load(backend: Box<dyn LedgerBackend>) -> Result<Self> {
        let table = backend.load()?;
        let mut by_hash = HashMap::new();
        for rec in table.values() {
            *by_hash.entry(rec.content_hash.clone()).or_insert(0) += 1;
        }
        Ok(Self {
            backend,
            table,
            by_hash,
        })
    }

    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.table.get(&key_for(path))
    }

    /// Global check: any path, not only the candidate's own.
    pub fn any_record_with_hash(&self, hash: &Digest) -> bool {
        self.by_hash.get(hash).is_some_and(|n| *n > 0)
    }

    pub fn upsert(&mut self, path: &Path, record: FileRecord) {
        let new_hash = record.content_hash.clone();
        if let Some(old) = self.table.insert(key_for(path), record) {
            if let Some(n) = self.by_hash.get_mut(&old.content_hash) {
                *n -= 1;
                if *n == 0 {
                    self.by_hash.remove(&old.content_hash);
                }
            }
        }
        *self.by_hash.entry(new_hash).or_insert(0) += 1;
    }

    /// Writes the entire table through the backend.
    pub fn persist(&self) -> Result<()> {
        self.backend.save(&self.table)
    }

    pub fn records(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn max_sequence_id(&self) -> u64 {
        self.table
            .values()
            .map(|r| r.sequence_id)
            .max()
            .unwrap_or(0)
    }
}
