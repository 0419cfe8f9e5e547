use crate::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

/// Reads a whole JSON document. A missing file or undecodable content yields
/// `T::default()`; other I/O errors propagate.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("file not found: {}, starting empty", path.display());
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_reader(BufReader::new(f)) {
        Ok(v) => Ok(v),
        Err(e) => {
            error!("cannot decode JSON from {}: {e}, starting empty", path.display());
            Ok(T::default())
        }
    }
}

/// Replaces `path` with the full serialized value. Writes a sibling temp file
/// and renames it, so readers see either the old or the new document.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut tmp, value)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    info!("data saved to {}", path.display());
    Ok(())
}
