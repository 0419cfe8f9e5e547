use parcel_core::ParcelError;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`crate::transport::Transport`].
#[derive(Error, Debug)]
pub enum TransportError {
    /// Flood control: the transport asks us to wait before retrying.
    #[error("flood control exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {code}: {description}")]
    Api { code: i32, description: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected response: {0}")]
    Protocol(String),
}

/// Why one file's delivery stopped.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error(transparent)]
    Core(#[from] ParcelError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("flood control persisted after {attempts} attempts ({waited:?} spent waiting)")]
    FloodExhausted { attempts: u32, waited: Duration },
}

impl From<std::io::Error> for DeliveryError {
    fn from(e: std::io::Error) -> Self {
        DeliveryError::Core(ParcelError::Io(e))
    }
}

impl DeliveryError {
    /// File vanished or became unreadable mid-pipeline.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Core(e) if e.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
