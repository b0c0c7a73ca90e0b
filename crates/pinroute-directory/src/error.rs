//! Error types for directory lookups.

/// Result type alias for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while querying the pincode directory.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory answered with a non-success HTTP status.
    #[error("directory returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated to what the server sent.
        body: String,
    },

    /// The response body did not match the documented envelope.
    #[error("malformed directory response: {0}")]
    Malformed(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether a retry of the same lookup could reasonably succeed.
    ///
    /// Transport failures and server-side (5xx) statuses are transient;
    /// malformed payloads and client-side statuses are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status >= 500,
            Self::Malformed(_) | Self::Json(_) => false,
        }
    }
}
