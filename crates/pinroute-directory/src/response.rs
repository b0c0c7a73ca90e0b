//! Wire types for the pincode directory API.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Outcome reported by the directory for one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    /// The pincode is known and at least the envelope carries entries.
    Success,
    /// The pincode is unknown or the query was rejected ("Error", "404").
    Fail,
}

impl LookupStatus {
    /// Parse the directory's `Status` string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("success") {
            Self::Success
        } else {
            Self::Fail
        }
    }
}

/// One post office entry under a pincode.
///
/// The directory reports more fields than these; only the ones routing
/// cares about are kept, the rest stay in the raw payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PostOffice {
    /// Post office name.
    #[serde(default)]
    pub name: String,
    /// Sorting district (e.g. "Bengaluru").
    #[serde(default)]
    pub district: String,
    /// Sorting division (e.g. "Bengaluru City"); the routing destination.
    #[serde(default)]
    pub division: String,
    /// State name (e.g. "Karnataka").
    #[serde(default)]
    pub state: String,
}

/// Envelope element as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireEnvelope {
    #[allow(dead_code)]
    #[serde(default)]
    message: Option<String>,
    status: String,
    #[serde(default)]
    post_office: Option<Vec<PostOffice>>,
}

/// Parsed result of one directory lookup.
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// Reported status.
    pub status: LookupStatus,
    /// Post offices under the pincode; empty on failure.
    pub offices: Vec<PostOffice>,
    /// The untouched response body, retained for auditing.
    pub raw: serde_json::Value,
}

impl LookupResult {
    /// Parse the one-element array envelope the API wraps answers in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the body is not a non-empty array,
    /// or [`Error::Json`] if the first element does not decode.
    pub fn from_raw(raw: serde_json::Value) -> Result<Self> {
        let first = raw
            .as_array()
            .and_then(|entries| entries.first())
            .ok_or_else(|| Error::Malformed("expected a non-empty array envelope".into()))?;

        let envelope: WireEnvelope = serde_json::from_value(first.clone())?;
        let status = LookupStatus::parse(&envelope.status);
        let offices = match status {
            LookupStatus::Success => envelope.post_office.unwrap_or_default(),
            LookupStatus::Fail => Vec::new(),
        };

        Ok(Self {
            status,
            offices,
            raw,
        })
    }

    /// The first post office entry, if any.
    ///
    /// The division is uniform across offices under one pincode, so the
    /// first entry decides routing.
    #[must_use]
    pub fn first_office(&self) -> Option<&PostOffice> {
        self.offices.first()
    }

    /// Whether the lookup succeeded and carries at least one entry.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.status == LookupStatus::Success && !self.offices.is_empty()
    }
}
