//! Cache-aside sorting-center resolution.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use pinroute_directory::{DirectoryClient, LookupResult};
use tracing::debug;

use super::model::PincodeCacheEntry;
use super::repository::PincodeCacheRepository;
use crate::Result;

/// Boundary seam for the external postal directory.
///
/// Implemented by [`DirectoryClient`] in production and by fakes in tests.
pub trait DirectoryLookup: Send + Sync {
    /// Query the directory for a validated 6-digit pincode.
    fn lookup(
        &self,
        pincode: &str,
    ) -> impl Future<Output = pinroute_directory::Result<LookupResult>> + Send;
}

impl DirectoryLookup for DirectoryClient {
    async fn lookup(&self, pincode: &str) -> pinroute_directory::Result<LookupResult> {
        Self::lookup(self, pincode).await
    }
}

/// Cache-aside resolver from pincode to sorting center.
#[derive(Debug, Clone)]
pub struct PincodeResolver<D> {
    cache: PincodeCacheRepository,
    directory: D,
    cache_ttl: Option<Duration>,
}

impl<D: DirectoryLookup> PincodeResolver<D> {
    /// Create a resolver with a permanent cache (no expiry).
    pub const fn new(cache: PincodeCacheRepository, directory: D) -> Self {
        Self {
            cache,
            directory,
            cache_ttl: None,
        }
    }

    /// Set the cache expiry. `None` keeps entries forever.
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Resolve a pincode to its sorting division.
    ///
    /// Cache hit: answered locally, no external call. Miss: one directory
    /// lookup; a successful answer is cached (first office wins: the
    /// division is uniform across offices under one pincode), a failed or
    /// empty answer yields `None` and caches nothing, so a later call
    /// retries the directory.
    ///
    /// Callers must pass only validated 6-digit pincodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is unreachable or the directory call
    /// fails (transport/HTTP failure, not a no-match answer).
    pub async fn resolve(&self, pincode: &str) -> Result<Option<String>> {
        if let Some(entry) = self.cache.get(pincode).await? {
            if self.is_fresh(&entry) {
                debug!(pincode, "pincode cache hit");
                return Ok(Some(entry.sorting_division));
            }
            debug!(pincode, "pincode cache entry expired");
        }

        let result = self.directory.lookup(pincode).await?;
        let Some(office) = result.first_office() else {
            debug!(pincode, "directory has no match");
            return Ok(None);
        };

        let entry = PincodeCacheEntry {
            pincode: pincode.to_string(),
            sorting_district: office.district.clone(),
            sorting_division: office.division.clone(),
            state: office.state.clone(),
            raw_lookup: result.raw.clone(),
            updated_at: Utc::now(),
        };
        self.cache.upsert(&entry).await?;

        Ok(Some(entry.sorting_division))
    }

    fn is_fresh(&self, entry: &PincodeCacheEntry) -> bool {
        let Some(ttl) = self.cache_ttl else {
            return true;
        };
        let age = Utc::now().signed_duration_since(entry.updated_at);
        // Future-dated entries (clock skew) count as fresh.
        age.to_std().map_or(true, |age| age <= ttl)
    }
}
