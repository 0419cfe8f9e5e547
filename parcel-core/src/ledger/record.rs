use crate::hash::digest::Digest;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Outcome of the last successful delivery of one source path. Field names on
/// disk match the table the backend mirror already reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "hash")]
    pub content_hash: Digest,
    #[serde(rename = "last_sent")]
    pub last_sent_at: String,
    #[serde(rename = "send_success")]
    pub send_succeeded: bool,
    pub encrypted: bool,
    pub encryption_algorithm: String,
    #[serde(rename = "file_id")]
    pub sequence_id: u64,
    #[serde(rename = "file_size")]
    pub original_size: u64,
    #[serde(default)]
    pub processed_size: u64,
    #[serde(rename = "processing_time", default)]
    pub processing_time_ms: f64,
    #[serde(rename = "upload_speed", default)]
    pub upload_bytes_per_sec: f64,
}

impl FileRecord {
    pub fn algorithm_for(encrypted: bool) -> &'static str {
        if encrypted { "AES" } else { "None" }
    }
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
