use std::path::Path;

use super::HistoryStore;
use super::json_fs::{JsonFileLedger, MemoryLedger};
use crate::error::Result;

pub enum Backend {
    JsonFile,
    Memory,
}

/// Opens and loads the history table. `path` is ignored for `Memory`.
pub fn open_ledger(backend: Backend, path: &Path) -> Result<HistoryStore> {
    match backend {
        Backend::JsonFile => HistoryStore::load(Box::new(JsonFileLedger::new(path))),
        Backend::Memory => HistoryStore::load(Box::new(MemoryLedger::default())),
    }
}
