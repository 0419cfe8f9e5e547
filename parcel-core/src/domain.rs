// parcel_core/src/domain.rs
use std::ops::Range;
use std::path::PathBuf;

/// How the archiver produced the artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveMode {
    Passthrough,
    Compressed,
    Encrypted,
}

/// The single packaged file handed to the splitter or the sender.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub path: PathBuf,
    pub mode: ArchiveMode,
    pub size: u64,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn is_encrypted(&self) -> bool {
        self.mode == ArchiveMode::Encrypted
    }
}

/// One slice of an oversized artifact. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryPart {
    /// 1-based.
    pub index: u32,
    pub total: u32,
    pub range: Range<u64>,
    pub path: PathBuf,
}

impl DeliveryPart {
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.index == self.total
    }
}
