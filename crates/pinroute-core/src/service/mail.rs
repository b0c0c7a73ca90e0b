//! The mail-processing pipeline service.
//!
//! [`MailService`] owns every status transition of a mail record. The
//! synchronous operations (`register`, `get`, `list`, `trigger`) surface
//! errors to the caller. The background run never lets a collaborator
//! failure escape: it is logged and becomes terminal status `failed`, the
//! only externally observable failure signal for asynchronous work.

use std::future::Future;
use std::time::Duration;

use pinroute_vision::{Extraction, RawExtraction, VisionClient};
use tracing::{debug, error, info, warn};

use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::mail::{MailId, MailRecord, MailRepository, OwnerId};
use crate::pincode::{DirectoryLookup, PincodeResolver};
use crate::service::retry::with_backoff;
use crate::storage::{ObjectStorage, UploadReference};

/// Boundary seam for the vision extraction adapter.
///
/// Implemented by [`VisionClient`] in production and by fakes in tests.
pub trait ImageExtractor: Send + Sync {
    /// Run one extraction against the image behind a read URL.
    fn extract(
        &self,
        image_url: &str,
    ) -> impl Future<Output = pinroute_vision::Result<RawExtraction>> + Send;
}

impl ImageExtractor for VisionClient {
    async fn extract(&self, image_url: &str) -> pinroute_vision::Result<RawExtraction> {
        Self::extract(self, image_url).await
    }
}

/// What a successful run produced; persisted in one update.
struct RunOutcome {
    fields: Extraction,
    raw: serde_json::Value,
    sorting_center: Option<String>,
}

/// Orchestrates the mail record lifecycle.
#[derive(Debug, Clone)]
pub struct MailService<S, X, D> {
    mail: MailRepository,
    resolver: PincodeResolver<D>,
    storage: S,
    extractor: X,
    config: CoreConfig,
}

impl<S, X, D> MailService<S, X, D>
where
    S: ObjectStorage + Clone + Send + Sync + 'static,
    X: ImageExtractor + Clone + Send + Sync + 'static,
    D: DirectoryLookup + Clone + Send + Sync + 'static,
{
    /// Assemble the service from its collaborators.
    ///
    /// The configured cache expiry is applied to the resolver here, so a
    /// caller never has to set it on both.
    pub fn new(
        mail: MailRepository,
        resolver: PincodeResolver<D>,
        storage: S,
        extractor: X,
        config: CoreConfig,
    ) -> Self {
        let resolver = resolver.with_cache_ttl(config.cache_ttl_secs.map(Duration::from_secs));
        Self {
            mail,
            resolver,
            storage,
            extractor,
            config,
        }
    }

    /// Allocate an upload target for the owner's next photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage collaborator fails.
    pub async fn issue_upload_reference(&self, owner_id: OwnerId) -> Result<UploadReference> {
        self.storage.issue_upload_reference(owner_id).await
    }

    /// Register an uploaded photo as a new `pending` mail record.
    ///
    /// `image_key` is an opaque key already allocated by the storage
    /// collaborator; no existence check happens here.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails.
    pub async fn register(&self, owner_id: OwnerId, image_key: &str) -> Result<MailRecord> {
        let record = self.mail.create(owner_id, image_key).await?;
        info!(id = %record.id, %owner_id, "mail record registered");
        Ok(record)
    }

    /// Start a background processing run for a record.
    ///
    /// Returns as soon as the run is dispatched; progress is observed
    /// through the record's status. A trigger while a run is already in
    /// flight is a no-op (the run loses the processing claim).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailNotFound`] if the record does not exist.
    pub async fn trigger(&self, id: MailId) -> Result<()> {
        if self.mail.get(id).await?.is_none() {
            return Err(Error::MailNotFound(id));
        }

        let service = self.clone();
        tokio::spawn(async move { service.run(id).await });
        Ok(())
    }

    /// Owner-scoped point read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailNotFound`] if the record does not exist or
    /// belongs to another owner.
    pub async fn get(&self, id: MailId, owner_id: OwnerId) -> Result<MailRecord> {
        self.mail
            .get_for_owner(id, owner_id)
            .await?
            .ok_or(Error::MailNotFound(id))
    }

    /// Owner-scoped listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, owner_id: OwnerId, limit: u32, offset: u32) -> Result<Vec<MailRecord>> {
        self.mail.list(owner_id, limit, offset).await
    }

    /// Execute one pipeline run to a terminal status.
    ///
    /// Failures never escape: collaborator errors become status `failed`,
    /// a missing record or a lost claim end the run silently. The terminal
    /// write is the single commit point for the whole run.
    pub async fn run(&self, id: MailId) {
        let record = match self.mail.get(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%id, "mail record missing at run start");
                return;
            }
            Err(e) => {
                warn!(%id, error = %e, "could not load mail record for run");
                return;
            }
        };

        match self.mail.claim_processing(id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(%id, "processing claim lost, another run is in flight");
                return;
            }
            Err(e) => {
                warn!(%id, error = %e, "could not claim mail record");
                return;
            }
        }

        match self.execute(&record).await {
            Ok(outcome) => {
                let result = self
                    .mail
                    .complete(id, &outcome.fields, &outcome.raw, outcome.sorting_center.as_deref())
                    .await;
                match result {
                    Ok(()) => info!(%id, sorting_center = ?outcome.sorting_center, "mail processing completed"),
                    Err(e) => error!(%id, error = %e, "could not persist completed run"),
                }
            }
            Err(e) => {
                warn!(%id, error = %e, "mail processing failed");
                if let Err(e) = self.mail.fail(id).await {
                    error!(%id, error = %e, "could not persist failed run");
                }
            }
        }
    }

    /// Extraction, normalization, and resolution for one record.
    async fn execute(&self, record: &MailRecord) -> Result<RunOutcome> {
        let ttl = Duration::from_secs(self.config.read_reference_ttl_secs);
        let image_url = self
            .storage
            .issue_read_reference(&record.image_key, ttl)
            .await?;

        let raw = with_backoff(
            &self.config.retry,
            pinroute_vision::Error::is_transient,
            || self.extractor.extract(&image_url),
        )
        .await?;

        let fields = Extraction::from_raw(&raw);
        let raw_payload = serde_json::to_value(&raw)?;

        // The resolver contract only admits validated 6-digit keys; an
        // unresolved pincode completes with a null sorting center.
        let sorting_center = if fields.receiver_pincode.is_empty() {
            debug!(id = %record.id, "receiver pincode unresolved, skipping resolution");
            None
        } else {
            with_backoff(&self.config.retry, Error::is_transient, || {
                self.resolver.resolve(&fields.receiver_pincode)
            })
            .await?
        };

        Ok(RunOutcome {
            fields,
            raw: raw_payload,
            sorting_center,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pinroute_directory::{Error as DirectoryError, LookupResult, LookupStatus, PostOffice};
    use pinroute_vision::Error as VisionError;
    use serde_json::json;

    use super::*;
    use crate::mail::ProcessingStatus;
    use crate::pincode::{PincodeCacheEntry, PincodeCacheRepository};
    use crate::service::retry::RetryPolicy;

    #[derive(Clone)]
    struct StaticStorage;

    impl ObjectStorage for StaticStorage {
        async fn issue_upload_reference(&self, owner_id: OwnerId) -> Result<UploadReference> {
            Ok(UploadReference {
                upload_url: format!("https://storage.test/upload/{owner_id}"),
                image_key: format!("mail/{owner_id}/photo.jpg"),
            })
        }

        async fn issue_read_reference(&self, image_key: &str, _ttl: Duration) -> Result<String> {
            Ok(format!("https://storage.test/{image_key}?sig=test"))
        }
    }

    #[derive(Clone)]
    struct FixedExtractor {
        raw: RawExtraction,
        calls: Arc<AtomicUsize>,
    }

    impl FixedExtractor {
        fn new(raw: RawExtraction) -> Self {
            Self {
                raw,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ImageExtractor for FixedExtractor {
        async fn extract(&self, _image_url: &str) -> pinroute_vision::Result<RawExtraction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.raw.clone())
        }
    }

    #[derive(Clone)]
    struct FailingExtractor {
        calls: Arc<AtomicUsize>,
    }

    impl FailingExtractor {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ImageExtractor for FailingExtractor {
        async fn extract(&self, _image_url: &str) -> pinroute_vision::Result<RawExtraction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(VisionError::Provider {
                status: 503,
                body: "model unavailable".to_string(),
            })
        }
    }

    #[derive(Clone)]
    struct FixedDirectory {
        result: LookupResult,
        calls: Arc<AtomicUsize>,
    }

    impl FixedDirectory {
        fn hit(division: &str) -> Self {
            Self {
                result: LookupResult {
                    status: LookupStatus::Success,
                    offices: vec![PostOffice {
                        name: String::new(),
                        district: "Bengaluru".to_string(),
                        division: division.to_string(),
                        state: "Karnataka".to_string(),
                    }],
                    raw: json!([{"Status": "Success"}]),
                },
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn miss() -> Self {
            Self {
                result: LookupResult {
                    status: LookupStatus::Fail,
                    offices: Vec::new(),
                    raw: json!([{"Status": "Error"}]),
                },
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DirectoryLookup for FixedDirectory {
        async fn lookup(&self, _pincode: &str) -> pinroute_directory::Result<LookupResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    #[derive(Clone)]
    struct FailingDirectory {
        calls: Arc<AtomicUsize>,
    }

    impl FailingDirectory {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DirectoryLookup for FailingDirectory {
        async fn lookup(&self, _pincode: &str) -> pinroute_directory::Result<LookupResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DirectoryError::Api {
                status: 502,
                body: "bad gateway".to_string(),
            })
        }
    }

    fn test_config() -> CoreConfig {
        CoreConfig {
            read_reference_ttl_secs: 60,
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
            cache_ttl_secs: None,
        }
    }

    fn readable_envelope() -> RawExtraction {
        RawExtraction {
            receiver_name: " Ravi Kumar ".to_string(),
            receiver_address: "12 MG Road, Bengaluru".to_string(),
            receiver_pincode: "560001, 560002".to_string(),
            sender_name: "Asha Patel".to_string(),
            sender_address: "Fort, Mumbai".to_string(),
            sender_pincode: "400001".to_string(),
        }
    }

    async fn service<X, D>(extractor: X, directory: D) -> MailService<StaticStorage, X, D>
    where
        X: ImageExtractor + Clone + Send + Sync + 'static,
        D: DirectoryLookup + Clone + Send + Sync + 'static,
    {
        let mail = MailRepository::in_memory().await.unwrap();
        let cache = PincodeCacheRepository::in_memory().await.unwrap();
        let resolver = PincodeResolver::new(cache, directory);
        MailService::new(mail, resolver, StaticStorage, extractor, test_config())
    }

    #[tokio::test]
    async fn register_creates_a_pending_record() {
        let service = service(
            FixedExtractor::new(RawExtraction::default()),
            FixedDirectory::miss(),
        )
        .await;

        let record = service.register(OwnerId(1), "mail/1/photo.jpg").await.unwrap();
        assert_eq!(record.status, ProcessingStatus::Pending);
        assert!(record.receiver_name.is_none());
        assert!(record.receiver_pincode.is_none());
        assert!(record.sender_name.is_none());
        assert!(record.sorting_center.is_none());
    }

    #[tokio::test]
    async fn get_is_owner_scoped() {
        let service = service(
            FixedExtractor::new(RawExtraction::default()),
            FixedDirectory::miss(),
        )
        .await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        assert!(service.get(record.id, OwnerId(1)).await.is_ok());
        assert!(matches!(
            service.get(record.id, OwnerId(2)).await,
            Err(Error::MailNotFound(_))
        ));
    }

    #[tokio::test]
    async fn trigger_on_unknown_id_is_not_found() {
        let service = service(
            FixedExtractor::new(RawExtraction::default()),
            FixedDirectory::miss(),
        )
        .await;

        assert!(matches!(
            service.trigger(MailId(42)).await,
            Err(Error::MailNotFound(MailId(42)))
        ));
    }

    #[tokio::test]
    async fn run_success_path_populates_everything() {
        let extractor = FixedExtractor::new(readable_envelope());
        let directory = FixedDirectory::hit("Bengaluru City");
        let service = service(extractor, directory).await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        service.run(record.id).await;

        let done = service.get(record.id, OwnerId(1)).await.unwrap();
        assert_eq!(done.status, ProcessingStatus::Completed);
        assert_eq!(done.receiver_name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(done.receiver_address.as_deref(), Some("12 MG Road, Bengaluru"));
        // First valid token of a multi-value reading wins.
        assert_eq!(done.receiver_pincode.as_deref(), Some("560001"));
        assert_eq!(done.sender_name.as_deref(), Some("Asha Patel"));
        assert_eq!(done.sender_address.as_deref(), Some("Fort, Mumbai"));
        assert_eq!(done.sender_pincode.as_deref(), Some("400001"));
        assert_eq!(done.sorting_center.as_deref(), Some("Bengaluru City"));
        assert!(done.raw_extraction.is_some());
    }

    #[tokio::test]
    async fn run_failure_path_leaves_fields_untouched() {
        let extractor = FailingExtractor::new();
        let service = service(extractor.clone(), FixedDirectory::miss()).await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        service.run(record.id).await;

        let failed = service.get(record.id, OwnerId(1)).await.unwrap();
        assert_eq!(failed.status, ProcessingStatus::Failed);
        assert!(failed.receiver_name.is_none());
        assert!(failed.raw_extraction.is_none());
        assert!(failed.sorting_center.is_none());
        // The transient provider failure was retried up to the policy.
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resolution_failure_fails_the_whole_record() {
        let directory = FailingDirectory::new();
        let service = service(FixedExtractor::new(readable_envelope()), directory.clone()).await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        service.run(record.id).await;

        let failed = service.get(record.id, OwnerId(1)).await.unwrap();
        assert_eq!(failed.status, ProcessingStatus::Failed);
        // Extraction succeeded but its fields are not committed.
        assert!(failed.receiver_name.is_none());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn directory_miss_completes_with_null_center() {
        let service = service(
            FixedExtractor::new(readable_envelope()),
            FixedDirectory::miss(),
        )
        .await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        service.run(record.id).await;

        let done = service.get(record.id, OwnerId(1)).await.unwrap();
        assert_eq!(done.status, ProcessingStatus::Completed);
        assert!(done.sorting_center.is_none());
        assert_eq!(done.receiver_pincode.as_deref(), Some("560001"));
    }

    #[tokio::test]
    async fn unresolved_pincode_skips_resolution() {
        let directory = FixedDirectory::hit("Bengaluru City");
        let raw = RawExtraction {
            receiver_pincode: "12345".to_string(),
            ..readable_envelope()
        };
        let service = service(FixedExtractor::new(raw), directory.clone()).await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        service.run(record.id).await;

        let done = service.get(record.id, OwnerId(1)).await.unwrap();
        assert_eq!(done.status, ProcessingStatus::Completed);
        assert_eq!(done.receiver_pincode.as_deref(), Some(""));
        assert!(done.sorting_center.is_none());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn configured_cache_ttl_refreshes_stale_entries() {
        let mail = MailRepository::in_memory().await.unwrap();
        let cache = PincodeCacheRepository::in_memory().await.unwrap();
        cache
            .upsert(&PincodeCacheEntry {
                pincode: "560001".to_string(),
                sorting_district: "Bengaluru".to_string(),
                sorting_division: "Old Division".to_string(),
                state: "Karnataka".to_string(),
                raw_lookup: json!([]),
                updated_at: chrono::Utc::now() - chrono::Duration::hours(2),
            })
            .await
            .unwrap();

        let directory = FixedDirectory::hit("Bengaluru City");
        let resolver = PincodeResolver::new(cache.clone(), directory.clone());
        let config = CoreConfig {
            cache_ttl_secs: Some(3600),
            ..test_config()
        };
        let service = MailService::new(
            mail,
            resolver,
            StaticStorage,
            FixedExtractor::new(readable_envelope()),
            config,
        );
        let record = service.register(OwnerId(1), "k").await.unwrap();

        service.run(record.id).await;

        // The hour-old entry is past the configured expiry, so the run
        // reaches the directory and commits the fresh division.
        let done = service.get(record.id, OwnerId(1)).await.unwrap();
        assert_eq!(done.sorting_center.as_deref(), Some("Bengaluru City"));
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        let refreshed = cache.get("560001").await.unwrap().unwrap();
        assert_eq!(refreshed.sorting_division, "Bengaluru City");
    }

    #[tokio::test]
    async fn run_while_in_flight_is_a_no_op() {
        let extractor = FixedExtractor::new(readable_envelope());
        let service = service(extractor.clone(), FixedDirectory::miss()).await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        // Another run holds the claim.
        assert!(service.mail.claim_processing(record.id).await.unwrap());
        service.run(record.id).await;

        let unchanged = service.get(record.id, OwnerId(1)).await.unwrap();
        assert_eq!(unchanged.status, ProcessingStatus::Processing);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sequential_reruns_converge_on_the_second_outcome() {
        let service = service(
            FixedExtractor::new(readable_envelope()),
            FixedDirectory::hit("Bengaluru City"),
        )
        .await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        service.run(record.id).await;
        let first = service.get(record.id, OwnerId(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        service.run(record.id).await;
        let second = service.get(record.id, OwnerId(1)).await.unwrap();

        assert_eq!(second.status, ProcessingStatus::Completed);
        assert_eq!(second.sorting_center.as_deref(), Some("Bengaluru City"));
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn trigger_drives_the_record_to_terminal_state() {
        let service = service(
            FixedExtractor::new(readable_envelope()),
            FixedDirectory::hit("Bengaluru City"),
        )
        .await;
        let record = service.register(OwnerId(1), "k").await.unwrap();

        service.trigger(record.id).await.unwrap();

        let mut status = ProcessingStatus::Pending;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            status = service.get(record.id, OwnerId(1)).await.unwrap().status;
            if status.is_terminal() {
                break;
            }
        }
        assert_eq!(status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn upload_reference_comes_from_storage() {
        let service = service(
            FixedExtractor::new(RawExtraction::default()),
            FixedDirectory::miss(),
        )
        .await;

        let reference = service.issue_upload_reference(OwnerId(9)).await.unwrap();
        assert_eq!(reference.image_key, "mail/9/photo.jpg");
        assert!(reference.upload_url.contains("https://storage.test/upload/9"));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let service = service(
            FixedExtractor::new(RawExtraction::default()),
            FixedDirectory::miss(),
        )
        .await;
        let first = service.register(OwnerId(1), "a").await.unwrap();
        let second = service.register(OwnerId(1), "b").await.unwrap();

        let listed = service.list(OwnerId(1), 10, 0).await.unwrap();
        let ids: Vec<MailId> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
