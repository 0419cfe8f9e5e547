use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of one file's trip through the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub original_size: u64,
    pub processed_size: u64,
    pub processing_time_ms: f64,
    pub upload_bytes_per_sec: f64,
}

impl DeliveryStats {
    /// `total` spans hash to last ack; `upload` only the sending phase.
    pub fn measure(
        original_size: u64,
        processed_size: u64,
        total: Duration,
        upload: Duration,
    ) -> Self {
        let secs = upload.as_secs_f64();
        Self {
            original_size,
            processed_size,
            processing_time_ms: total.as_secs_f64() * 1000.0,
            upload_bytes_per_sec: if secs > 0.0 {
                processed_size as f64 / secs
            } else {
                0.0
            },
        }
    }
}
