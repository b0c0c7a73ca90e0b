//! Core configuration.

use serde::Deserialize;

use crate::service::RetryPolicy;

const DEFAULT_READ_REFERENCE_TTL_SECS: u64 = 300;

/// Configuration for the processing pipeline and resolver.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Lifetime of the time-limited read reference handed to the vision
    /// provider, in seconds.
    #[serde(default = "CoreConfig::default_read_reference_ttl_secs")]
    pub read_reference_ttl_secs: u64,

    /// Retry policy for transient extraction and resolution failures.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Expiry for resolved pincode cache entries, in seconds.
    ///
    /// `None` keeps entries forever. Postal boundaries do change, so
    /// deployments that care set a TTL; a stale entry is treated as a miss
    /// and refreshed in place.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl CoreConfig {
    const fn default_read_reference_ttl_secs() -> u64 {
        DEFAULT_READ_REFERENCE_TTL_SECS
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            read_reference_ttl_secs: DEFAULT_READ_REFERENCE_TTL_SECS,
            retry: RetryPolicy::default(),
            cache_ttl_secs: None,
        }
    }
}
