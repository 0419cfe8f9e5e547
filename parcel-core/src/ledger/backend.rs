// parcel_core/src/ledger/backend.rs
use super::record::FileRecord;
use crate::error::Result;
use std::collections::BTreeMap;

/// Path (as stored) → record.
pub type Table = BTreeMap<String, FileRecord>;

/// Whole-table persistence. No partial writes, no concurrent writers.
pub trait LedgerBackend: Send + Sync {
    fn load(&self) -> Result<Table>;

    fn save(&self, table: &Table) -> Result<()>;
}
