//! Error types for vision extraction.

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running an extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status.
    #[error("vision provider returned HTTP {status}: {body}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated to what the provider sent.
        body: String,
    },

    /// The model's answer was not the expected JSON object.
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether a retry of the same extraction could reasonably succeed.
    ///
    /// Transport failures, 5xx statuses, and rate limiting (429) are
    /// transient; malformed output and other client errors are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Provider { status, .. } => *status >= 500 || *status == 429,
            Self::MalformedOutput(_) | Self::Json(_) | Self::Config(_) => false,
        }
    }
}
