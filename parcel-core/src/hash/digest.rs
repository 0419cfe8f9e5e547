use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read block size for hashing.
pub const HASH_BLOCK: usize = 8192;

/// Lowercase-hex content digest; the dedup key stored in history.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Digest(hex.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streams `path` through BLAKE3 in fixed blocks. Used for change detection
/// only.
pub fn hash_file(path: &Path) -> Result<Digest> {
    let mut f = File::open(path)?;
    hash_reader(&mut f)
}

pub fn hash_reader(r: &mut dyn Read) -> Result<Digest> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; HASH_BLOCK];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest(hex::encode(hasher.finalize().as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_one_shot_blake3() {
        let data = vec![7u8; HASH_BLOCK * 3 + 17];
        let d = hash_reader(&mut &data[..]).unwrap();
        assert_eq!(d.as_str(), blake3::hash(&data).to_hex().as_str());
    }

    #[test]
    fn from_hex_normalizes_case() {
        assert_eq!(Digest::from_hex("ABcd"), Digest::from_hex("abcd"));
    }
}
