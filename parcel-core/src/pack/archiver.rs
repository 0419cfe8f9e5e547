use crate::codec::{CodecId, CompressionLevel};
use crate::config::Settings;
use crate::domain::{ArchiveMode, Artifact};
use crate::error::Result;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{AesMode, ZipWriter};

/// Entries at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Builds the deliverable artifact for one source file.
#[derive(Clone, Debug)]
pub struct Archiver {
    compression: CompressionLevel,
    password: Option<String>,
}

impl Archiver {
    /// `password` must be `None` when `compression` is `None`; config
    /// validation guarantees it.
    pub fn new(compression: CompressionLevel, password: Option<String>) -> Self {
        Self {
            compression,
            password,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.compression, settings.password().map(str::to_string))
    }

    pub fn mode_for(&self, source: &Path) -> ArchiveMode {
        match self.compression.codec() {
            None => ArchiveMode::Passthrough,
            Some(_) if self.password.is_some() => ArchiveMode::Encrypted,
            Some(_) if is_zip(source) => ArchiveMode::Passthrough,
            Some(_) => ArchiveMode::Compressed,
        }
    }

    /// Writes `<scratch>/<basename>.zip` unless the source passes through.
    /// The caller owns `scratch` and its cleanup.
    pub fn build(&self, source: &Path, scratch: &Path) -> Result<Artifact> {
        let mode = self.mode_for(source);
        let codec = match (mode, self.compression.codec()) {
            (ArchiveMode::Passthrough, _) | (_, None) => {
                let size = fs::metadata(source)?.len();
                debug!(path = %source.display(), size, "artifact passes through");
                return Ok(Artifact {
                    path: source.to_path_buf(),
                    mode: ArchiveMode::Passthrough,
                    size,
                });
            }
            (_, Some(codec)) => codec,
        };

        let entry_name = base_name(source)?;
        let out = scratch.join(format!("{entry_name}.zip"));
        info!(
            source = %source.display(),
            artifact = %out.display(),
            ?codec,
            encrypted = mode == ArchiveMode::Encrypted,
            "compressing file"
        );

        let mut src = File::open(source)?;
        let src_len = src.metadata()?.len();
        write_single_entry(
            &mut src,
            src_len,
            &entry_name,
            &out,
            codec,
            self.password.as_deref(),
        )?;

        let size = fs::metadata(&out)?.len();
        Ok(Artifact {
            path: out,
            mode,
            size,
        })
    }
}

fn write_single_entry(
    src: &mut File,
    src_len: u64,
    entry_name: &str,
    out: &Path,
    codec: CodecId,
    password: Option<&str>,
) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(out)?);
    let options: FileOptions<'_, ()> = FileOptions::default()
        .compression_method(codec.method())
        .large_file(src_len >= ZIP64_THRESHOLD);
    // AES protects the entry data; names and sizes in the container stay visible.
    let options = match password {
        Some(pw) => options.with_aes_encryption(AesMode::Aes256, pw),
        None => options,
    };
    zip.start_file(entry_name, options)?;
    io::copy(src, &mut zip)?;
    zip.finish()?;
    Ok(())
}

pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

pub fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no file name in {}", path.display()),
            )
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn mode_selection() {
        let zip = PathBuf::from("/in/bundle.ZIP");
        let txt = PathBuf::from("/in/notes.txt");

        let none = Archiver::new(CompressionLevel::None, None);
        assert_eq!(none.mode_for(&txt), ArchiveMode::Passthrough);

        let plain = Archiver::new(CompressionLevel::Default, None);
        assert_eq!(plain.mode_for(&txt), ArchiveMode::Compressed);
        assert_eq!(plain.mode_for(&zip), ArchiveMode::Passthrough);

        let sealed = Archiver::new(CompressionLevel::Store, Some("pw".into()));
        assert_eq!(sealed.mode_for(&zip), ArchiveMode::Encrypted);
        assert_eq!(sealed.mode_for(&txt), ArchiveMode::Encrypted);
    }
}
