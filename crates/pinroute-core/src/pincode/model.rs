//! Pincode cache data models.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One resolved pincode, cached so the external directory is queried at
/// most once per code (modulo a configured expiry).
#[derive(Debug, Clone, Serialize)]
pub struct PincodeCacheEntry {
    /// The 6-digit postal code (primary key).
    pub pincode: String,
    /// Sorting district (e.g. "Hyderabad").
    pub sorting_district: String,
    /// Sorting division (e.g. "Hyderabad City"); what callers route by.
    pub sorting_division: String,
    /// State name (e.g. "Telangana").
    pub state: String,
    /// Raw directory response, kept for auditability.
    pub raw_lookup: serde_json::Value,
    /// When the entry was written or refreshed.
    pub updated_at: DateTime<Utc>,
}
