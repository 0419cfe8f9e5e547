//! The scan → package → deliver loop.
//!
//! Cycles are strictly sequential and so are the files inside a cycle: at
//! most one upload is in flight. A file either ends fully delivered and
//! recorded, or leaves no trace in history and is retried next cycle.

use crate::error::{DeliveryError, Result};
use crate::sender::RateLimitedSender;
use crate::telemetry::{DeliveryEvent, EventKind, TelemetrySink};
use crate::transport::Transport;
use crate::transport::markup::{document_caption, part_caption};
use parcel_core::chunking::splitter::Splitter;
use parcel_core::ledger::record::now_rfc3339;
use parcel_core::scan::order::{ScanEntry, plan_for};
use parcel_core::stats::DeliveryStats;
use parcel_core::{
    Archiver, Artifact, Digest, FileRecord, HistoryStore, ReassemblyInstructions, Settings,
    hash_file,
};
use std::fs;
use std::future::Future;
use std::path::Path;
use tempfile::TempDir;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

/// Everything the loop mutates: the history working copy and the last
/// sequence id handed out.
pub struct SchedulerState {
    pub history: HistoryStore,
    pub last_sequence: u64,
}

impl SchedulerState {
    pub fn new(history: HistoryStore) -> Self {
        let last_sequence = history.max_sequence_id();
        Self {
            history,
            last_sequence,
        }
    }

    /// Re-deliveries of a known path keep its id; new paths get the next one.
    fn sequence_for(&mut self, path: &Path) -> u64 {
        if let Some(rec) = self.history.get(path) {
            return rec.sequence_id;
        }
        self.last_sequence += 1;
        self.last_sequence
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Extension,
    AlreadyDelivered,
    /// Vanished or unreadable; retried next cycle.
    Unreadable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Delivered { sequence_id: u64, parts: u32 },
    Skipped(SkipReason),
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub scanned: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CycleReport {
    fn tally(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Delivered { .. } => self.delivered += 1,
            FileOutcome::Skipped(_) => self.skipped += 1,
            FileOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct Scheduler<T: Transport> {
    settings: Settings,
    archiver: Archiver,
    sender: RateLimitedSender<T>,
    telemetry: Box<dyn TelemetrySink>,
    state: SchedulerState,
}

impl<T: Transport> Scheduler<T> {
    pub fn new(
        settings: Settings,
        sender: RateLimitedSender<T>,
        telemetry: Box<dyn TelemetrySink>,
        history: HistoryStore,
    ) -> Self {
        Self {
            archiver: Archiver::from_settings(&settings),
            settings,
            sender,
            telemetry,
            state: SchedulerState::new(history),
        }
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn sender(&self) -> &RateLimitedSender<T> {
        &self.sender
    }

    /// Waits, bounded, for telemetry still in flight.
    pub async fn flush_telemetry(&self) {
        self.telemetry.flush().await;
    }

    /// Pushes the full history to the telemetry backend.
    pub async fn sync_history(&self) {
        self.telemetry
            .sync_history(self.state.history.records())
            .await;
    }

    /// Cycles until `shutdown` resolves, sleeping `check_interval` in between.
    /// Shutdown is honoured mid-cycle; history stays as of the last persist.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let interval = self.settings.check_interval;
        loop {
            tokio::select! {
                report = self.run_cycle() => {
                    info!(
                        scanned = report.scanned,
                        delivered = report.delivered,
                        skipped = report.skipped,
                        failed = report.failed,
                        "cycle finished, next scan in {interval:?}"
                    );
                }
                _ = &mut shutdown => break,
            }
            tokio::select! {
                _ = sleep(interval) => {}
                _ = &mut shutdown => break,
            }
        }
        info!("shutting down");
    }

    /// One scan over every monitored folder, smallest file first.
    pub async fn run_cycle(&mut self) -> CycleReport {
        info!("checking for new files");
        let plan = plan_for(&self.settings);
        let mut report = CycleReport {
            scanned: plan.len(),
            ..Default::default()
        };
        for entry in &plan {
            let outcome = self.process_file(entry).await;
            report.tally(outcome);
        }
        report
    }

    pub async fn process_file(&mut self, entry: &ScanEntry) -> FileOutcome {
        let path = entry.path.as_path();
        if !self.settings.extension_allowed(path) {
            debug!("skipping {} (extension not allowed)", path.display());
            return FileOutcome::Skipped(SkipReason::Extension);
        }

        let started = Instant::now();
        let hash = match hash_file(path) {
            Ok(h) => h,
            Err(e) => {
                warn!("cannot hash {}, skipping this cycle: {e}", path.display());
                return FileOutcome::Skipped(SkipReason::Unreadable);
            }
        };
        if self.state.history.any_record_with_hash(&hash) {
            debug!("already sent: {}", path.display());
            return FileOutcome::Skipped(SkipReason::AlreadyDelivered);
        }

        info!("processing file: {}", path.display());
        let name = file_label(path);
        let scratch = match scratch_dir(&self.settings.scratch_root()) {
            Ok(dir) => dir,
            Err(e) => return self.fail(path, &name, &hash, entry.size, e.into()).await,
        };
        let artifact = match self.archiver.build(path, scratch.path()) {
            Ok(a) => a,
            Err(e) if e.is_transient() => {
                warn!("{} became unreadable, skipping this cycle: {e}", path.display());
                return FileOutcome::Skipped(SkipReason::Unreadable);
            }
            Err(e) => return self.fail(path, &name, &hash, entry.size, e.into()).await,
        };
        info!(
            mode = ?artifact.mode,
            size = artifact.size,
            "artifact ready: {}",
            artifact.path.display()
        );

        let key = parcel_core::ledger::key_for(path);
        let upload_started = Instant::now();
        let sent = if artifact.size > self.settings.max_part_bytes {
            self.deliver_split(&key, &artifact, scratch.path()).await
        } else {
            self.deliver_single(&key, &artifact).await
        };
        let upload = upload_started.elapsed();

        let parts = match sent {
            Ok(parts) => parts,
            Err(e) => return self.fail(path, &name, &hash, entry.size, e).await,
        };

        let stats = DeliveryStats::measure(entry.size, artifact.size, started.elapsed(), upload);
        let sequence_id = self.state.sequence_for(path);
        let encrypted = artifact.is_encrypted();
        self.state.history.upsert(
            path,
            FileRecord {
                content_hash: hash.clone(),
                last_sent_at: now_rfc3339(),
                send_succeeded: true,
                encrypted,
                encryption_algorithm: FileRecord::algorithm_for(encrypted).to_string(),
                sequence_id,
                original_size: stats.original_size,
                processed_size: stats.processed_size,
                processing_time_ms: stats.processing_time_ms,
                upload_bytes_per_sec: stats.upload_bytes_per_sec,
            },
        );
        if let Err(e) = self.state.history.persist() {
            error!("cannot persist history after sending {}: {e}", path.display());
        }
        info!(sequence_id, parts, "delivered {}", path.display());

        self.telemetry.emit(DeliveryEvent {
            kind: EventKind::Success,
            file: name,
            file_id: sequence_id,
            hash: hash.to_string(),
            file_size: stats.original_size,
            processing_time: stats.processing_time_ms,
            upload_speed: stats.upload_bytes_per_sec,
        });
        FileOutcome::Delivered { sequence_id, parts }
    }

    /// Artifact fits in one document.
    pub async fn deliver_single(&self, key: &str, artifact: &Artifact) -> Result<u32> {
        let caption = document_caption(&artifact.file_name(), artifact.is_encrypted());
        self.sender
            .send_document(&artifact.path, &caption, key)
            .await?;
        Ok(1)
    }

    /// Parts are cut and sent one at a time; the first failure stops the file
    /// before later parts are even written. Instructions follow the last part.
    pub async fn deliver_split(
        &self,
        key: &str,
        artifact: &Artifact,
        scratch: &Path,
    ) -> Result<u32> {
        let parts_dir = scratch.join("parts");
        fs::create_dir_all(&parts_dir)?;
        let mut splitter =
            Splitter::open(&artifact.path, self.settings.max_part_bytes, &parts_dir)?;
        let total = splitter.total();
        info!(total, "splitting {} into parts", artifact.file_name());

        while let Some(part) = splitter.next_part()? {
            let caption = part_caption(splitter.base_name(), part.index, part.total);
            self.sender.send_document(&part.path, &caption, key).await?;
            info!(part = part.index, total, "part sent");
            if let Err(e) = fs::remove_file(&part.path) {
                warn!("cannot remove part {}: {e}", part.path.display());
            }
        }

        let instructions =
            ReassemblyInstructions::new(splitter.base_name(), total, artifact.is_encrypted());
        if let Err(e) = self.sender.send_instructions(&instructions.render()).await {
            // Only document sends notify from inside the sender.
            self.sender
                .send_processing_notice(&file_label(Path::new(key)))
                .await;
            return Err(e);
        }
        Ok(total)
    }

    async fn fail(
        &self,
        path: &Path,
        name: &str,
        hash: &Digest,
        size: u64,
        err: DeliveryError,
    ) -> FileOutcome {
        error!("delivery of {} failed: {err}", path.display());
        // Transport failures already left their own notice.
        if matches!(err, DeliveryError::Core(_)) {
            self.sender.send_processing_notice(name).await;
        }
        self.telemetry.emit(DeliveryEvent::failure(
            name.to_string(),
            self.state.last_sequence,
            hash.to_string(),
            size,
        ));
        FileOutcome::Failed
    }
}

fn scratch_dir(root: &Path) -> std::io::Result<TempDir> {
    fs::create_dir_all(root)?;
    tempfile::Builder::new().prefix("parcel-").tempdir_in(root)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
