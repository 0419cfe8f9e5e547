#![allow(dead_code)]

use async_trait::async_trait;
use parcel_core::ledger::Table;
use parcel_core::ledger::json_fs::MemoryLedger;
use parcel_core::{HistoryStore, Settings};
use parcel_relay::{
    DeliveryEvent, MessageRef, RateLimitedSender, Scheduler, TelemetrySink, TextFormat, Transport,
    TransportError,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CHAT: i64 = 1;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Document {
        chat_id: i64,
        name: String,
        caption: String,
        bytes: Vec<u8>,
    },
    Text {
        chat_id: i64,
        text: String,
        format: TextFormat,
    },
    Delete(MessageRef),
    Forward {
        message: MessageRef,
        to: i64,
    },
}

/// Scripted answer to the next `send_document`.
#[derive(Clone, Copy, Debug)]
pub enum Reply {
    Ok,
    Flood(Duration),
    Fail,
}

/// In-process transport that records every accepted call.
#[derive(Default)]
pub struct StubTransport {
    calls: Mutex<Vec<Call>>,
    script: Mutex<VecDeque<Reply>>,
    attempts: AtomicUsize,
    next_id: AtomicI64,
    reject_markdown: AtomicBool,
    remove_after_first_document: Mutex<Option<PathBuf>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        let t = Self::default();
        t.script.lock().unwrap().extend(replies);
        Arc::new(t)
    }

    pub fn push_replies(&self, replies: impl IntoIterator<Item = Reply>) {
        self.script.lock().unwrap().extend(replies);
    }

    /// Markdown texts fail with a 400 from now on; plain text still goes out.
    pub fn reject_markdown(&self) {
        self.reject_markdown.store(true, Ordering::SeqCst);
    }

    /// Deletes `path` from disk once the first document has been accepted.
    pub fn remove_after_first_document(&self, path: PathBuf) {
        *self.remove_after_first_document.lock().unwrap() = Some(path);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Accepted documents as (file name, bytes), in send order.
    pub fn documents(&self) -> Vec<(String, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Document { name, bytes, .. } => Some((name, bytes)),
                _ => None,
            })
            .collect()
    }

    pub fn document_names(&self) -> Vec<String> {
        self.documents().into_iter().map(|(n, _)| n).collect()
    }

    pub fn captions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Document { caption, .. } => Some(caption),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<(i64, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Text { chat_id, text, .. } => Some((chat_id, text)),
                _ => None,
            })
            .collect()
    }

    /// Every `send_document` call, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn next_ref(&self, chat_id: i64) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<MessageRef, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let reply = self.script.lock().unwrap().pop_front().unwrap_or(Reply::Ok);
        match reply {
            Reply::Flood(retry_after) => Err(TransportError::RateLimited { retry_after }),
            Reply::Fail => Err(TransportError::Api {
                code: 400,
                description: "Bad Request: stub failure".into(),
            }),
            Reply::Ok => {
                let bytes = std::fs::read(path)?;
                let name = path.file_name().unwrap().to_string_lossy().to_string();
                self.record(Call::Document {
                    chat_id,
                    name,
                    caption: caption.to_string(),
                    bytes,
                });
                let doomed = self.remove_after_first_document.lock().unwrap().take();
                if let Some(doomed) = doomed {
                    std::fs::remove_file(doomed)?;
                }
                Ok(self.next_ref(chat_id))
            }
        }
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        format: TextFormat,
    ) -> Result<MessageRef, TransportError> {
        if format == TextFormat::Markdown && self.reject_markdown.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                code: 400,
                description: "Bad Request: can't parse entities".into(),
            });
        }
        self.record(Call::Text {
            chat_id,
            text: text.to_string(),
            format,
        });
        Ok(self.next_ref(chat_id))
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), TransportError> {
        self.record(Call::Delete(message));
        Ok(())
    }

    async fn forward_message(
        &self,
        message: MessageRef,
        to_chat: i64,
    ) -> Result<MessageRef, TransportError> {
        self.record(Call::Forward {
            message,
            to: to_chat,
        });
        Ok(self.next_ref(to_chat))
    }
}

#[derive(Clone, Default)]
pub struct RecordingTelemetry {
    pub events: Arc<Mutex<Vec<DeliveryEvent>>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<DeliveryEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, event: DeliveryEvent) {
        self.events.lock().unwrap().push(event);
    }

    async fn sync_history(&self, _table: &Table) {}
}

/// Settings watching `watch`, with `extra` merged over the defaults.
pub fn settings_for(watch: &Path, data: &Path, extra: Value) -> Settings {
    let mut v = json!({
        "folders_to_monitor": [watch],
        "data_dir": data,
        "enable_cache": false,
        "telegram": { "chat_id": CHAT },
    });
    if let (Some(base), Some(extra)) = (v.as_object_mut(), extra.as_object()) {
        for (k, val) in extra {
            base.insert(k.clone(), val.clone());
        }
    }
    Settings::from_json(&v.to_string()).unwrap()
}

pub fn scheduler_with(
    settings: Settings,
    transport: Arc<StubTransport>,
    ledger: MemoryLedger,
    telemetry: RecordingTelemetry,
) -> Scheduler<StubTransport> {
    let sender = RateLimitedSender::new(transport, CHAT)
        .with_forward(settings.telegram.forward_target())
        .with_flood_limits(settings.flood);
    let history = HistoryStore::load(Box::new(ledger)).unwrap();
    Scheduler::new(settings, sender, Box::new(telemetry), history)
}

/// Deterministic incompressible bytes.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect()
}
