//! Best-effort delivery events for the dashboard backend.
//!
//! Nothing here can fail a delivery: every network error is logged at warn and
//! dropped.

use async_trait::async_trait;
use parcel_core::ledger::Table;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Success,
    Failure,
}

/// Body of `POST <backend>/event`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeliveryEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub file: String,
    pub file_id: u64,
    pub hash: String,
    pub file_size: u64,
    pub processing_time: f64,
    pub upload_speed: f64,
}

impl DeliveryEvent {
    /// Failures carry no timing.
    pub fn failure(file: String, file_id: u64, hash: String, file_size: u64) -> Self {
        Self {
            kind: EventKind::Failure,
            file,
            file_id,
            hash,
            file_size,
            processing_time: 0.0,
            upload_speed: 0.0,
        }
    }
}

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Must return without waiting on the network.
    fn emit(&self, event: DeliveryEvent);

    /// Pushes the whole history table, once at startup.
    async fn sync_history(&self, table: &Table);

    /// Waits for emitted events still in flight.
    async fn flush(&self) {}
}

/// Sink used when no backend is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTelemetry;

#[async_trait]
impl TelemetrySink for NoTelemetry {
    fn emit(&self, _event: DeliveryEvent) {}

    async fn sync_history(&self, _table: &Table) {}
}

#[derive(Debug)]
pub struct HttpTelemetry {
    http: reqwest::Client,
    base: String,
    in_flight: Mutex<JoinSet<()>>,
}

impl HttpTelemetry {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(TELEMETRY_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
            in_flight: Mutex::default(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn in_flight(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn post_event(http: reqwest::Client, url: String, event: DeliveryEvent) {
    match http.post(&url).json(&event).send().await {
        Ok(resp) if resp.status().is_success() => {}
        Ok(resp) => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("error sending event to backend: {status} {body}");
        }
        Err(e) => warn!("could not connect to backend: {e}"),
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetry {
    fn emit(&self, event: DeliveryEvent) {
        let mut tasks = self.in_flight();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(post_event(self.http.clone(), self.url("event"), event));
    }

    async fn sync_history(&self, table: &Table) {
        match self.http.post(self.url("file_history")).json(table).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("file history synced to backend ({} records)", table.len())
            }
            Ok(resp) => warn!("error syncing file history: {}", resp.status()),
            Err(e) => warn!("could not connect to backend: {e}"),
        }
    }

    async fn flush(&self) {
        let mut tasks = std::mem::take(&mut *self.in_flight());
        let drained = tokio::time::timeout(TELEMETRY_TIMEOUT, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("dropping {} telemetry events still in flight", tasks.len());
        }
    }
}

/// HTTP sink when a backend URL is configured, otherwise the no-op sink.
pub fn sink_for(backend_url: Option<&str>) -> Box<dyn TelemetrySink> {
    match backend_url.map(HttpTelemetry::new) {
        Some(Ok(http)) => Box::new(http),
        Some(Err(e)) => {
            warn!("telemetry disabled, cannot build HTTP client: {e}");
            Box::new(NoTelemetry)
        }
        None => Box::new(NoTelemetry),
    }
}
