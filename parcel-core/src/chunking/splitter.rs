use crate::domain::DeliveryPart;
use crate::error::Result;
use crate::pack::archiver::base_name;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `<basename>.<NNN>`, 1-based. Indices are zero-padded to at least three
/// digits and to the width of `total`, so a lexical glob keeps part order.
pub fn part_name(base: &str, index: u32, total: u32) -> String {
    let width = total.to_string().len().max(3);
    format!("{base}.{index:0width$}")
}

pub fn total_parts(size: u64, max_part_bytes: u64) -> u32 {
    size.div_ceil(max_part_bytes) as u32
}

/// Lazily cuts an artifact into fixed-size parts, one file per call to
/// [`Splitter::next_part`], so a failed send leaves later parts unwritten.
pub struct Splitter {
    src: File,
    base: String,
    out_dir: PathBuf,
    max_part_bytes: u64,
    size: u64,
    total: u32,
    next_index: u32,
    offset: u64,
}

impl Splitter {
    pub fn open(artifact: &Path, max_part_bytes: u64, out_dir: &Path) -> Result<Self> {
        if max_part_bytes == 0 {
            return Err(
                io::Error::new(io::ErrorKind::InvalidInput, "part size must be positive").into(),
            );
        }
        let src = File::open(artifact)?;
        let size = src.metadata()?.len();
        Ok(Self {
            src,
            base: base_name(artifact)?,
            out_dir: out_dir.to_path_buf(),
            max_part_bytes,
            size,
            // Known before the loop hits EOF so every caption can carry it.
            total: total_parts(size, max_part_bytes),
            next_index: 1,
            offset: 0,
        })
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn artifact_size(&self) -> u64 {
        self.size
    }

    pub fn base_name(&self) -> &str {
        &self.base
    }

    /// Writes the next part and returns it, or `None` after the last one.
    pub fn next_part(&mut self) -> Result<Option<DeliveryPart>> {
        let mut limited = (&mut self.src).take(self.max_part_bytes);
        let mut buf = Vec::with_capacity(self.max_part_bytes.min(1 << 20) as usize);
        let n = limited.read_to_end(&mut buf)? as u64;
        if n == 0 {
            return Ok(None);
        }

        let path = self.out_dir.join(part_name(&self.base, self.next_index, self.total));
        let mut out = File::create(&path)?;
        out.write_all(&buf)?;
        out.flush()?;

        let part = DeliveryPart {
            index: self.next_index,
            total: self.total,
            range: self.offset..self.offset + n,
            path,
        };
        debug!(
            part = part.index,
            total = part.total,
            bytes = n,
            "wrote part {}",
            part.path.display()
        );
        self.next_index += 1;
        self.offset += n;
        Ok(Some(part))
    }
}

impl Iterator for Splitter {
    type Item = Result<DeliveryPart>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_part().transpose()
    }
}

/// Eager form: writes every part and returns their paths in order.
pub fn split(artifact: &Path, max_part_bytes: u64, out_dir: &Path) -> Result<Vec<PathBuf>> {
    Splitter::open(artifact, max_part_bytes, out_dir)?
        .map(|p| p.map(|p| p.path))
        .collect()
}
