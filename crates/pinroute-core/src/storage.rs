//! Object-storage boundary.
//!
//! Presigned-URL issuance lives in the storage collaborator; the core only
//! needs the two operations below. The upload handshake is two-step by
//! design: the client uploads against `upload_url`, confirms, and only then
//! triggers processing, so the core never checks that `image_key` exists.
//! A dangling key surfaces later as an extraction failure.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::Result;
use crate::mail::OwnerId;

/// Target for one photo upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReference {
    /// URL the client uploads the photo to.
    pub upload_url: String,
    /// Opaque storage key the photo will live under; passed to `register`.
    pub image_key: String,
}

/// Boundary seam for the object-storage collaborator.
pub trait ObjectStorage: Send + Sync {
    /// Allocate an upload target for an owner's next photo.
    fn issue_upload_reference(
        &self,
        owner_id: OwnerId,
    ) -> impl Future<Output = Result<UploadReference>> + Send;

    /// Issue a time-limited read URL for a stored photo, handed to the
    /// vision provider for the duration of one extraction.
    fn issue_read_reference(
        &self,
        image_key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<String>> + Send;
}
