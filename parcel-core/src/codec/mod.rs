use crate::error::{ParcelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zip::CompressionMethod;

/// Entry codec written into the single-entry zip artifact.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store = 0,
    Deflate = 8,
}

impl CodecId {
    pub fn method(self) -> CompressionMethod {
        match self {
            CodecId::Store => CompressionMethod::Stored,
            CodecId::Deflate => CompressionMethod::Deflated,
        }
    }
}

/// `compression_level` as written in the config file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Send sources untouched.
    None,
    #[default]
    Default,
    Store,
}

impl CompressionLevel {
    /// Codec used for the archive entry; `None` means no archive at all.
    pub fn codec(self) -> Option<CodecId> {
        match self {
            CompressionLevel::None => None,
            CompressionLevel::Default => Some(CodecId::Deflate),
            CompressionLevel::Store => Some(CodecId::Store),
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = ParcelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionLevel::None),
            "default" => Ok(CompressionLevel::Default),
            "store" => Ok(CompressionLevel::Store),
            other => Err(ParcelError::Config(format!(
                "unknown compression level '{other}' (expected none, default or store)"
            ))),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompressionLevel::None => "none",
            CompressionLevel::Default => "default",
            CompressionLevel::Store => "store",
        };
        f.write_str(s)
    }
}
