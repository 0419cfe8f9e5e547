use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Regular files under every root, recursively. Unreadable entries are logged
/// and skipped so one bad directory does not hide the rest of a folder.
pub fn collect_files<P: AsRef<Path>>(roots: &[P]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        let root = root.as_ref();
        for e in WalkDir::new(root).follow_links(false) {
            let e = match e {
                Ok(e) => e,
                Err(err) => {
                    warn!("skipping unreadable entry under {}: {err}", root.display());
                    continue;
                }
            };
            // (symlinks skipped)
            if e.file_type().is_file() {
                files.push(e.into_path());
            }
        }
    }
    files
}
