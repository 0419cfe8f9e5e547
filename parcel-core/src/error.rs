use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParcelError {
    /// File vanished, permission denied, short read. Transient for one file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ParcelError {
    /// True for errors that should only skip the current file.
    pub fn is_transient(&self) -> bool {
        matches!(self, ParcelError::Io(_) | ParcelError::Walk(_))
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, ParcelError>;
