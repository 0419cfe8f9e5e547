//! Rate-limited, flood-aware front of a [`Transport`].
//!
//! Every call waits for a token from its budget, then retries flood-control
//! replies after the delay the transport asked for. Terminal failures of a
//! document upload leave a notice in the main chat, keyed by source path, that
//! the next successful upload for the same path retracts.

use crate::error::{DeliveryError, Result, TransportError};
use crate::limiter::TokenBucket;
use crate::transport::{MessageRef, TextFormat, Transport};
use dashmap::DashMap;
use parcel_core::config::FloodLimits;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// A successful upload plus the flood-control cost of getting there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivered {
    pub message: MessageRef,
    pub flood_waits: u32,
    pub waited: Duration,
}

struct Retried<R> {
    value: R,
    flood_waits: u32,
    waited: Duration,
}

pub struct RateLimitedSender<T: Transport> {
    transport: Arc<T>,
    chat_id: i64,
    forward_to: Option<i64>,
    limits: FloodLimits,
    messages: TokenBucket,
    media: TokenBucket,
    notices: DashMap<String, MessageRef>,
}

impl<T: Transport> RateLimitedSender<T> {
    pub fn new(transport: Arc<T>, chat_id: i64) -> Self {
        Self {
            transport,
            chat_id,
            forward_to: None,
            limits: FloodLimits::default(),
            messages: TokenBucket::messages(),
            media: TokenBucket::media(),
            notices: DashMap::new(),
        }
    }

    pub fn with_forward(mut self, to_chat: Option<i64>) -> Self {
        self.forward_to = to_chat;
        self
    }

    pub fn with_flood_limits(mut self, limits: FloodLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Runs `op` until it stops answering with flood control.
    async fn with_flood_retry<R, F, Fut>(&self, what: &str, mut op: F) -> Result<Retried<R>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<R, TransportError>>,
    {
        let mut attempts: u32 = 0;
        let mut waited = Duration::ZERO;
        loop {
            attempts += 1;
            match op().await {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        flood_waits: attempts - 1,
                        waited,
                    });
                }
                Err(TransportError::RateLimited { retry_after }) => {
                    let over_attempts = self.limits.max_attempts.is_some_and(|max| attempts >= max);
                    let over_wait = self
                        .limits
                        .max_wait()
                        .is_some_and(|max| waited + retry_after > max);
                    if over_attempts || over_wait {
                        return Err(DeliveryError::FloodExhausted { attempts, waited });
                    }
                    warn!("flood control on {what}, retrying in {retry_after:?}");
                    sleep(retry_after).await;
                    waited += retry_after;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Uploads one payload (a whole artifact or one part) to the main chat.
    ///
    /// `source_key` names the source file the payload came from; it keys the
    /// error notice left behind on failure.
    pub async fn send_document(
        &self,
        payload: &Path,
        caption: &str,
        source_key: &str,
    ) -> Result<Delivered> {
        let outcome = self
            .with_flood_retry("sendDocument", || async move {
                self.media.acquire().await;
                self.messages.acquire().await;
                self.transport
                    .send_document(self.chat_id, payload, caption)
                    .await
            })
            .await;

        match outcome {
            Ok(sent) => {
                self.retract_notice(source_key).await;
                if let Some(to) = self.forward_to {
                    self.forward(sent.value, to).await;
                }
                Ok(Delivered {
                    message: sent.value,
                    flood_waits: sent.flood_waits,
                    waited: sent.waited,
                })
            }
            Err(e) => {
                error!("error sending file {}: {e}", payload.display());
                self.send_error_notice(source_key).await;
                Err(e)
            }
        }
    }

    /// Text to the main chat.
    pub async fn send_text(&self, text: &str, format: TextFormat) -> Result<MessageRef> {
        self.text_to(self.chat_id, text, format).await
    }

    async fn text_to(&self, chat_id: i64, text: &str, format: TextFormat) -> Result<MessageRef> {
        let sent = self
            .with_flood_retry("sendMessage", || async move {
                self.messages.acquire().await;
                self.transport.send_text(chat_id, text, format).await
            })
            .await?;
        Ok(sent.value)
    }

    /// Reassembly instructions go to the main chat and, when forwarding is on,
    /// to the forward chat as well. Only the main chat is required to succeed.
    pub async fn send_instructions(&self, text: &str) -> Result<MessageRef> {
        let main = self.send_text(text, TextFormat::Markdown).await?;
        info!("reassembly instructions sent");
        if let Some(to) = self.forward_to {
            match self.text_to(to, text, TextFormat::Markdown).await {
                Ok(_) => info!("reassembly instructions sent to forward chat {to}"),
                Err(e) => error!("cannot send reassembly instructions to {to}: {e}"),
            }
        }
        Ok(main)
    }

    /// Leaves `Error sending file: <key>. Check logs.` in the main chat and
    /// remembers it for later retraction.
    pub async fn send_error_notice(&self, source_key: &str) {
        let text = format!("Error sending file: {source_key}. Check logs.");
        match self.send_text(&text, TextFormat::Plain).await {
            Ok(msg) => {
                if let Some(stale) = self.notices.insert(source_key.to_string(), msg) {
                    self.delete_quietly(stale).await;
                }
            }
            Err(e) => error!("cannot send error notice for {source_key}: {e}"),
        }
    }

    /// Generic notice for failures outside the send path.
    pub async fn send_processing_notice(&self, name: &str) {
        let text = format!("Error processing file: {name}. Check logs.");
        if let Err(e) = self.send_text(&text, TextFormat::Plain).await {
            error!("cannot send processing notice for {name}: {e}");
        }
    }

    /// Deletes the outstanding notice for `source_key`, if any.
    pub async fn retract_notice(&self, source_key: &str) {
        if let Some((_, msg)) = self.notices.remove(source_key) {
            self.delete_quietly(msg).await;
            info!("error notice for {source_key} retracted");
        }
    }

    /// Source keys that still have a notice in the chat.
    pub fn pending_notices(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.notices.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    async fn delete_quietly(&self, msg: MessageRef) {
        let outcome = self
            .with_flood_retry("deleteMessage", || async move {
                self.messages.acquire().await;
                self.transport.delete_message(msg).await
            })
            .await;
        if let Err(e) = outcome {
            error!("cannot delete message {}: {e}", msg.message_id);
        }
    }

    async fn forward(&self, msg: MessageRef, to: i64) {
        let outcome = self
            .with_flood_retry("forwardMessage", || async move {
                self.messages.acquire().await;
                self.transport.forward_message(msg, to).await
            })
            .await;
        if let Err(e) = outcome {
            error!("error forwarding message to {to}: {e}");
        }
    }
}
