//! Error types for the core library.

use thiserror::Error;

use crate::mail::MailId;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Postal-directory lookup failed.
    #[error("directory error: {0}")]
    Directory(#[from] pinroute_directory::Error),

    /// Vision extraction failed.
    #[error("extraction error: {0}")]
    Extraction(#[from] pinroute_vision::Error),

    /// Object-storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Mail record not found (or not visible to the caller).
    #[error("mail record not found: {0}")]
    MailNotFound(MailId),
}

impl Error {
    /// Whether retrying the failed operation could reasonably succeed.
    ///
    /// Only collaborator transport/server failures are transient; database
    /// and serialization errors are not retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Directory(e) => e.is_transient(),
            Self::Extraction(e) => e.is_transient(),
            Self::Database(_) | Self::Serde(_) | Self::Storage(_) | Self::MailNotFound(_) => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
