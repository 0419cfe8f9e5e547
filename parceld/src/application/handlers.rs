use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parcel_core::chunking::splitter::total_parts;
use parcel_core::ledger::factory::{Backend, open_ledger};
use parcel_core::pack::archiver::base_name;
use parcel_core::{ReassemblyInstructions, Settings, hash_file, split};
use parcel_relay::{RateLimitedSender, Result, Scheduler, TelegramTransport, sink_for};
use tracing::{error, info};

use super::init_tracing;

fn load_settings(config: &Path) -> Result<Settings> {
    let settings = Settings::load(config)?;
    init_tracing(settings.disable_logs);
    info!("configuration loaded from {}", config.display());
    Ok(settings)
}

/// Wires the production transport, telemetry and history into a scheduler.
pub fn build_scheduler(settings: Settings) -> Result<Scheduler<TelegramTransport>> {
    settings.require_transport()?;
    let transport = Arc::new(TelegramTransport::new(&settings.telegram)?);
    let sender = RateLimitedSender::new(transport, settings.telegram.chat_id)
        .with_forward(settings.telegram.forward_target())
        .with_flood_limits(settings.flood);
    let telemetry = sink_for(settings.backend_url.as_deref());
    let history = open_ledger(Backend::JsonFile, &settings.history_path())?;
    info!("file history loaded ({} records)", history.len());
    Ok(Scheduler::new(settings, sender, telemetry, history))
}

pub async fn handle_run(config: PathBuf) -> Result<()> {
    let settings = load_settings(&config)?;
    let mut scheduler = build_scheduler(settings)?;
    scheduler.sync_history().await;
    info!("bot started, watching for files");
    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;
    scheduler.flush_telemetry().await;
    Ok(())
}

pub async fn handle_once(config: PathBuf) -> Result<()> {
    let settings = load_settings(&config)?;
    let mut scheduler = build_scheduler(settings)?;
    let report = scheduler.run_cycle().await;
    scheduler.flush_telemetry().await;
    println!(
        "scanned={} delivered={} skipped={} failed={}",
        report.scanned, report.delivered, report.skipped, report.failed
    );
    Ok(())
}

pub fn handle_check_config(config: PathBuf) -> Result<()> {
    let s = load_settings(&config)?;
    println!("folders:            {:?}", s.folders);
    println!("check interval:     {:?}", s.check_interval);
    println!("max part bytes:     {}", s.max_part_bytes);
    println!("allowed extensions: {:?}", s.allowed_extensions);
    println!("compression:        {}", s.compression);
    println!("encryption:         {}", if s.is_encrypted() { "AES-256" } else { "off" });
    println!("size cache:         {}", s.enable_cache);
    println!("history:            {}", s.history_path().display());
    println!("chat id:            {}", s.telegram.chat_id);
    println!("forward to:         {:?}", s.telegram.forward_target());
    println!("telemetry:          {}", s.backend_url.as_deref().unwrap_or("disabled"));
    match s.require_transport() {
        Ok(()) => println!("transport:          ready"),
        Err(e) => println!("transport:          {e}"),
    }
    Ok(())
}

pub fn handle_hash(file: PathBuf) -> Result<()> {
    let digest = hash_file(&file)?;
    println!("{digest}  {}", file.display());
    Ok(())
}

pub fn handle_split(
    artifact: PathBuf,
    part_size: u64,
    out: PathBuf,
    encrypted: bool,
) -> Result<()> {
    fs::create_dir_all(&out)?;
    let parts = split(&artifact, part_size, &out)?;
    for p in &parts {
        println!("{}", p.display());
    }
    let size = fs::metadata(&artifact)?.len();
    let instructions =
        ReassemblyInstructions::new(base_name(&artifact)?, total_parts(size, part_size), encrypted);
    println!("{}", instructions.render());
    Ok(())
}

pub fn handle_history(config: PathBuf) -> Result<()> {
    let settings = load_settings(&config)?;
    let history = open_ledger(Backend::JsonFile, &settings.history_path())?;
    for (path, rec) in history.records() {
        println!(
            "#{:<5} {} {} sent={} enc={} size={} -> {} {}",
            rec.sequence_id,
            &rec.content_hash.as_str()[..rec.content_hash.as_str().len().min(12)],
            rec.last_sent_at,
            rec.send_succeeded,
            rec.encryption_algorithm,
            rec.original_size,
            rec.processed_size,
            path
        );
    }
    println!("{} records", history.len());
    Ok(())
}
