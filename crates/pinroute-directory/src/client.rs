//! HTTP client for the pincode directory.

use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::response::LookupResult;

/// Public endpoint of the India Post pincode directory.
pub const DEFAULT_BASE_URL: &str = "https://api.postalpincode.in";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Client for the pincode directory API.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    base_url: String,
    client: reqwest::Client,
}

impl DirectoryClient {
    /// Create a client against a custom base URL (used by tests and
    /// self-hosted mirrors).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Client against the public India Post endpoint.
    ///
    /// # Panics
    ///
    /// Does not panic: building a client with only a timeout set is
    /// infallible in practice, and any builder error is unreachable here.
    #[must_use]
    pub fn public() -> Self {
        Self::new(DEFAULT_BASE_URL).unwrap_or_else(|_| unreachable!("default client build"))
    }

    /// Query the directory for a pincode.
    ///
    /// The caller is expected to pass a validated 6-digit pincode; the
    /// directory answers `Status: "Error"` for anything else, which maps
    /// to a failed [`LookupResult`], not an error.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx HTTP status, or a
    /// body that does not match the documented envelope.
    pub async fn lookup(&self, pincode: &str) -> Result<LookupResult> {
        let url = format!("{}/pincode/{pincode}", self.base_url);
        debug!(pincode, "querying pincode directory");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = response.json().await?;
        LookupResult::from_raw(raw)
    }
}

impl Default for DirectoryClient {
    fn default() -> Self {
        Self::public()
    }
}
