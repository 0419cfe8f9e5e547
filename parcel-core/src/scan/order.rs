use crate::config::Settings;
use crate::scan::walker::collect_files;
use crate::util::json_file::write_json_atomic;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Path → size, rebuilt from scratch every cycle. Orders the scan; never used
/// for dedup.
pub type SizeCache = BTreeMap<String, u64>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub size: u64,
}

/// Stats every file in parallel; files that vanish in between are dropped.
pub fn stat_sizes(files: &[PathBuf]) -> Vec<ScanEntry> {
    files
        .par_iter()
        .filter_map(|p| match fs::metadata(p) {
            Ok(md) => Some(ScanEntry {
                path: p.clone(),
                size: md.len(),
            }),
            Err(e) => {
                warn!("cannot stat {}: {e}", p.display());
                None
            }
        })
        .collect()
}

/// Smallest first; equal sizes by path so the order is deterministic.
pub fn order_by_size(mut entries: Vec<ScanEntry>) -> Vec<ScanEntry> {
    entries.sort_by(|a, b| a.size.cmp(&b.size).then_with(|| a.path.cmp(&b.path)));
    entries
}

pub fn to_cache(entries: &[ScanEntry]) -> SizeCache {
    entries
        .iter()
        .map(|e| (e.path.to_string_lossy().to_string(), e.size))
        .collect()
}

/// One scan of the monitored folders in delivery order. With the cache toggle
/// on, the size table is also written to `cache_path`.
pub fn plan_cycle(folders: &[PathBuf], cache_path: Option<&Path>) -> Vec<ScanEntry> {
    let files = collect_files(folders);
    let entries = order_by_size(stat_sizes(&files));
    if let Some(path) = cache_path {
        match write_json_atomic(path, &to_cache(&entries)) {
            Ok(()) => info!("file size cache built ({} files)", entries.len()),
            Err(e) => error!("cannot write size cache {}: {e}", path.display()),
        }
    }
    entries
}

pub fn plan_for(settings: &Settings) -> Vec<ScanEntry> {
    let cache = settings.enable_cache.then(|| settings.size_cache_path());
    plan_cycle(&settings.folders, cache.as_deref())
}
