use crate::CanonicalMessage;
use serde::{Deserialize, Serialize};

/// Wire unit submitted to the ingestion endpoint.
///
/// `batch_token` is client-generated and makes whole-batch retries
/// idempotent independently of per-message dedup: replaying a token returns
/// the recorded report without touching data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestBatch {
    pub batch_token: String,
    /// Client-supplied project path used to resolve (or create) the owning
    /// project on the server.
    pub project_path: String,
    /// Ordered messages. Order matters for cursor advancement on the client.
    pub messages: Vec<CanonicalMessage>,
}

impl IngestBatch {
    pub fn new(project_path: impl Into<String>, messages: Vec<CanonicalMessage>) -> Self {
        Self {
            batch_token: uuid::Uuid::new_v4().to_string(),
            project_path: project_path.into(),
            messages,
        }
    }
}

/// Why a single message within a batch was not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailure {
    /// Index of the message within the submitted batch.
    pub index: usize,
    pub id: String,
    pub reason: String,
}

/// Per-batch ingestion summary returned by the server.
///
/// A batch with some failures is still a success at the transport level;
/// only the ids named in `failures` are eligible for client-side retry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Messages durably persisted by this call.
    pub processed: u64,
    /// Duplicates (already persisted) and non-retryable invalid messages.
    pub skipped: u64,
    /// Messages that could not be persisted this time.
    pub failed: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    /// Whether a message id was acknowledged (persisted now or previously).
    ///
    /// Anything not named in `failures` is acknowledged: the server reports
    /// failures explicitly, so absence means processed-or-skipped.
    pub fn acknowledged(&self, id: &str) -> bool {
        !self.failures.iter().any(|f| f.id == id)
    }

    pub fn merge(&mut self, other: IngestReport) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}
