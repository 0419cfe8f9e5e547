#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;
pub mod stats;

pub mod util {
    pub mod json_file;
}

pub mod chunking {
    pub mod reassembly;
    pub mod splitter;
}

pub mod hash {
    pub mod digest;
}

pub mod codec;

pub mod ledger;

pub mod pack {
    pub mod archiver;
}

pub mod scan {
    pub mod order;
    pub mod walker;
}

// Re-exports: stable API surface
pub use chunking::reassembly::ReassemblyInstructions;
pub use chunking::splitter::{Splitter, split};
pub use config::Settings;
pub use domain::{ArchiveMode, Artifact, DeliveryPart};
pub use error::{ParcelError, Result};
pub use hash::digest::{Digest, hash_file};
pub use ledger::{FileRecord, HistoryStore};
pub use pack::archiver::Archiver;
