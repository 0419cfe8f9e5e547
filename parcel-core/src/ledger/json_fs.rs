use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::backend::{LedgerBackend, Table};
use crate::error::Result;
use crate::util::json_file::{read_json_or_default, write_json_atomic};

/// History table kept as one JSON object on disk.
pub struct JsonFileLedger {
    path: PathBuf,
}

impl JsonFileLedger {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerBackend for JsonFileLedger {
    fn load(&self) -> Result<Table> {
        read_json_or_default(&self.path)
    }

    fn save(&self, table: &Table) -> Result<()> {
        write_json_atomic(&self.path, table)
    }
}

/// Volatile backend; clones share one table so tests can inspect what was
/// saved.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    saved: Arc<Mutex<Table>>,
    saves: Arc<Mutex<u64>>,
}

impl MemoryLedger {
    pub fn with_table(table: Table) -> Self {
        Self {
            saved: Arc::new(Mutex::new(table)),
            saves: Arc::default(),
        }
    }

    pub fn snapshot(&self) -> Table {
        self.saved.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> u64 {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl LedgerBackend for MemoryLedger {
    fn load(&self) -> Result<Table> {
        Ok(self.snapshot())
    }

    fn save(&self, table: &Table) -> Result<()> {
        if let Ok(mut t) = self.saved.lock() {
            *t = table.clone();
        }
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}
