//! In-process endpoint wiring the client transmitter straight into the
//! server ingest service, no HTTP in between. Integration tests exercise
//! the full pipeline against it.

use logship_client::{DeliveryError, IngestEndpoint};
use logship_server::{Database, Error as ServerError, IngestPolicy, IngestService};
use logship_types::{IngestBatch, IngestReport, OwnerId};
use std::time::Duration;

pub struct LocalEndpoint {
    db: Database,
    owner: OwnerId,
    policy: IngestPolicy,
}

impl LocalEndpoint {
    pub fn new(owner: impl Into<String>) -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        Self {
            db,
            owner: OwnerId::new(owner),
            policy: IngestPolicy::default(),
        }
    }

    pub fn with_policy(owner: impl Into<String>, policy: IngestPolicy) -> Self {
        let mut endpoint = Self::new(owner);
        endpoint.policy = policy;
        endpoint
    }

    /// Swap the quota policy while keeping the store, as a server
    /// operator would between client runs.
    pub fn set_policy(&mut self, policy: IngestPolicy) {
        self.policy = policy;
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}

impl IngestEndpoint for LocalEndpoint {
    fn submit(&self, batch: &IngestBatch) -> Result<IngestReport, DeliveryError> {
        let service = IngestService::with_policy(&self.db, self.policy.clone());
        match service.ingest(&self.owner, batch) {
            Ok(report) => Ok(report),
            Err(ServerError::QuotaExceeded { retry_after_secs }) => {
                Err(DeliveryError::QuotaExceeded {
                    retry_after: retry_after_secs.map(Duration::from_secs),
                })
            }
            Err(ServerError::Ownership(msg)) => Err(DeliveryError::Rejected(msg)),
            Err(other) => Err(DeliveryError::Transient(other.to_string())),
        }
    }
}

/// Endpoint decorator that drops responses for scripted submissions,
/// simulating a network that fails after the server did the work.
pub struct FlakyEndpoint<E> {
    inner: E,
    drop_responses: std::cell::RefCell<u32>,
}

impl<E: IngestEndpoint> FlakyEndpoint<E> {
    /// Swallow the response of the first `drop_responses` submissions.
    pub fn new(inner: E, drop_responses: u32) -> Self {
        Self {
            inner,
            drop_responses: std::cell::RefCell::new(drop_responses),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: IngestEndpoint> IngestEndpoint for FlakyEndpoint<E> {
    fn submit(&self, batch: &IngestBatch) -> Result<IngestReport, DeliveryError> {
        let result = self.inner.submit(batch);
        let mut remaining = self.drop_responses.borrow_mut();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(DeliveryError::Transient(
                "response lost in transit".to_string(),
            ));
        }
        result
    }
}
