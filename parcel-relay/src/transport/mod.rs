//! Message transport seam. The pipeline only talks to [`Transport`];
//! [`telegram::TelegramTransport`] is the production implementation.

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod markup;
pub mod telegram;

/// Handle to a message the transport accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Markup dialect of a text message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Markdown,
    MarkdownV2,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Uploads `path` as a document. `caption` is already MarkdownV2-escaped.
    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<MessageRef, TransportError>;

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        format: TextFormat,
    ) -> Result<MessageRef, TransportError>;

    async fn delete_message(&self, message: MessageRef) -> Result<(), TransportError>;

    async fn forward_message(
        &self,
        message: MessageRef,
        to_chat: i64,
    ) -> Result<MessageRef, TransportError>;
}
