//! Telegram Bot API client: documents, text, delete, forward.
//!
//! Flood control (`429` / `error_code: 429`) is surfaced as
//! [`TransportError::RateLimited`]; retrying is the sender's job.

use super::{MessageRef, TextFormat, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use parcel_core::config::TelegramSettings;
use reqwest::header::RETRY_AFTER;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
/// Used when a 429 carries no usable delay.
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i32>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
}

impl From<TgMessage> for MessageRef {
    fn from(m: TgMessage) -> Self {
        MessageRef {
            chat_id: m.chat.id,
            message_id: m.message_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgChatMember {
    status: String,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

fn parse_mode_name(format: TextFormat) -> Option<&'static str> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Markdown => Some("Markdown"),
        TextFormat::MarkdownV2 => Some("MarkdownV2"),
    }
}

/// Maps a raw Bot API reply onto a result.
fn interpret<R: DeserializeOwned>(
    method: &str,
    status: u16,
    retry_after_header: Option<u64>,
    body: &str,
) -> Result<R, TransportError> {
    let parsed: Option<ApiResponse<R>> = serde_json::from_str(body).ok();

    let flood = status == 429 || parsed.as_ref().and_then(|r| r.error_code) == Some(429);
    if flood {
        let secs = parsed
            .as_ref()
            .and_then(|r| r.parameters.as_ref())
            .and_then(|p| p.retry_after)
            .or(retry_after_header);
        let retry_after = secs.map(Duration::from_secs).unwrap_or(FALLBACK_RETRY_AFTER);
        return Err(TransportError::RateLimited { retry_after });
    }

    let resp = parsed.ok_or_else(|| {
        TransportError::Protocol(format!("{method}: HTTP {status}, undecodable body: {body}"))
    })?;
    if resp.ok {
        return resp
            .result
            .ok_or_else(|| TransportError::Protocol(format!("{method}: ok=true but no result")));
    }
    Err(TransportError::Api {
        code: resp.error_code.unwrap_or(i32::from(status)),
        description: resp.description.unwrap_or_else(|| "Unknown error".into()),
    })
}

#[derive(Debug, Clone)]
pub struct TelegramTransport {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl TelegramTransport {
    pub fn new(settings: &TelegramSettings) -> Result<Self, TransportError> {
        if settings.token.trim().is_empty() {
            return Err(TransportError::Protocol("bot token must not be empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            token: settings.token.clone(),
            api_base: settings
                .api_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn finish<R: DeserializeOwned>(
        &self,
        method: &str,
        resp: reqwest::Response,
    ) -> Result<R, TransportError> {
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = resp.text().await?;
        debug!(method, status, "Bot API reply");
        interpret(method, status, retry_after, &body)
    }

    async fn call<P: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, TransportError> {
        let resp = self
            .http
            .post(self.method_url(method))
            .json(params)
            .send()
            .await?;
        self.finish(method, resp).await
    }

    async fn call_multipart<R: DeserializeOwned>(
        &self,
        method: &str,
        form: multipart::Form,
    ) -> Result<R, TransportError> {
        let resp = self
            .http
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await?;
        self.finish(method, resp).await
    }

    /// Status of this bot inside `chat_id`, e.g. `member` or `kicked`.
    async fn own_status_in(&self, chat_id: i64) -> Result<String, TransportError> {
        let me: TgUser = self.call("getMe", &json!({})).await?;
        let member: TgChatMember = self
            .call("getChatMember", &json!({ "chat_id": chat_id, "user_id": me.id }))
            .await?;
        Ok(member.status)
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<MessageRef, TransportError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let part = multipart::Part::bytes(data).file_name(file_name);
        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "MarkdownV2")
            .part("document", part);
        let msg: TgMessage = self.call_multipart("sendDocument", form).await?;
        info!("file sent successfully: {}", path.display());
        Ok(msg.into())
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        format: TextFormat,
    ) -> Result<MessageRef, TransportError> {
        let body = SendMessageBody {
            chat_id,
            text,
            parse_mode: parse_mode_name(format),
        };
        let msg: TgMessage = self.call("sendMessage", &body).await?;
        Ok(msg.into())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), TransportError> {
        let _: bool = self
            .call(
                "deleteMessage",
                &json!({ "chat_id": message.chat_id, "message_id": message.message_id }),
            )
            .await?;
        Ok(())
    }

    async fn forward_message(
        &self,
        message: MessageRef,
        to_chat: i64,
    ) -> Result<MessageRef, TransportError> {
        if self.own_status_in(to_chat).await? == "kicked" {
            error!("bot kicked from chat: {to_chat}");
            return Err(TransportError::Api {
                code: 403,
                description: format!("bot was kicked from chat {to_chat}"),
            });
        }
        let msg: TgMessage = self
            .call(
                "forwardMessage",
                &json!({
                    "chat_id": to_chat,
                    "from_chat_id": message.chat_id,
                    "message_id": message.message_id,
                }),
            )
            .await?;
        info!("message forwarded to {to_chat}");
        Ok(msg.into())
    }
}
