//! Store errors
//!
//! Only writes can fail. Reads degrade to typed defaults and never surface a
//! `StoreError`.

use std::path::PathBuf;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while persisting documents
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Staging, flushing or renaming a document failed
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        /// File or directory the failing call targeted
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A document could not be serialized
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        /// Document the payload was destined for
        path: PathBuf,
        /// Underlying serde error
        source: serde_json::Error,
    },

    /// Target path does not name a file
    #[error("document path has no file name: {}", path.display())]
    InvalidPath {
        /// Offending path
        path: PathBuf,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
