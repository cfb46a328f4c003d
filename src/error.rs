use std::io;

use thiserror::Error;

/// Durable storage failure. The store logs these and carries on.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure (disk full, permission denied).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Storage is not available on this host.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because the storage quota is exhausted.
    #[error("storage quota exceeded")]
    QuotaExceeded,
}

/// A persisted snapshot could not be turned back into a configuration.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid base64 in fragment: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("fragment is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed JSON was not an object.
    #[error("snapshot is not a JSON object")]
    NotAnObject,
}
