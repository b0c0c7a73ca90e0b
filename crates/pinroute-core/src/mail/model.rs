//! Mail record data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a mail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailId(pub i64);

impl MailId {
    /// Create a new mail ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MailId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user owning a mail record.
///
/// Users themselves are managed by the authentication collaborator; the
/// core only scopes reads and writes by this reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub i64);

impl OwnerId {
    /// Create a new owner ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a mail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Photo stored, waiting for a processing trigger.
    #[default]
    Pending,
    /// A pipeline run holds the claim and is extracting/resolving.
    Processing,
    /// Extraction and resolution finished; fields are trustworthy.
    Completed,
    /// The run hit a collaborator failure; fields are not final.
    Failed,
}

impl ProcessingStatus {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether this status ends a pipeline run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One photographed mail item and its processing state.
#[derive(Debug, Clone, Serialize)]
pub struct MailRecord {
    /// Unique identifier.
    pub id: MailId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Opaque object-storage key of the uploaded photo.
    pub image_key: String,
    /// Lifecycle state.
    pub status: ProcessingStatus,
    /// Extracted receiver name; set by a successful run.
    pub receiver_name: Option<String>,
    /// Extracted receiver address.
    pub receiver_address: Option<String>,
    /// Extracted receiver pincode (six digits or empty-when-unresolved).
    pub receiver_pincode: Option<String>,
    /// Extracted sender name.
    pub sender_name: Option<String>,
    /// Extracted sender address.
    pub sender_address: Option<String>,
    /// Extracted sender pincode.
    pub sender_pincode: Option<String>,
    /// Raw extraction payload, kept for auditability.
    pub raw_extraction: Option<serde_json::Value>,
    /// Sorting center resolved from the receiver pincode; may stay null on
    /// a completed record when the directory had no match.
    pub sorting_center: Option<String>,
    /// Creation time (immutable).
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}
