use logship_types::{CanonicalMessage, IngestBatch, IngestReport};
use std::time::Duration;

/// Failure modes a delivery attempt can surface. Transient and quota
/// errors are retryable; a rejection is final for the whole source.
#[derive(Debug, Clone)]
pub enum DeliveryError {
    /// Network failure or server-side hiccup. Resend the same batch,
    /// same token, after backing off.
    Transient(String),
    /// Server refused on rate-limit grounds. Honor the retry hint when
    /// present, otherwise fall back to exponential backoff.
    QuotaExceeded { retry_after: Option<Duration> },
    /// Authentication or validation failure. Retrying cannot help.
    Rejected(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Transient(msg) => write!(f, "transient delivery failure: {}", msg),
            DeliveryError::QuotaExceeded { retry_after } => match retry_after {
                Some(d) => write!(f, "quota exceeded, retry after {}s", d.as_secs()),
                None => write!(f, "quota exceeded"),
            },
            DeliveryError::Rejected(msg) => write!(f, "batch rejected: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Anything that can accept a batch and return a per-message report.
/// The HTTP client implements this for production; tests drive the
/// transmitter against in-process fakes.
pub trait IngestEndpoint {
    fn submit(&self, batch: &IngestBatch) -> std::result::Result<IngestReport, DeliveryError>;
}

#[derive(Debug, Clone)]
pub struct TransmitOptions {
    /// Hard cap on messages per batch.
    pub max_messages: usize,
    /// Soft cap on serialized batch size. A single oversized message
    /// still ships alone rather than stalling the source.
    pub max_bytes: usize,
    /// Delivery attempts per batch before giving up on the source.
    pub max_attempts: u32,
}

impl Default for TransmitOptions {
    fn default() -> Self {
        Self {
            max_messages: 200,
            max_bytes: 512 * 1024,
            max_attempts: 5,
        }
    }
}

/// Exponential backoff: 500ms doubling per attempt, capped at 30s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base = Duration::from_millis(500);
    let capped = base.saturating_mul(1u32 << attempt.min(6));
    capped.min(Duration::from_secs(30))
}

/// Where a batch ended up after `send_batch` returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    /// Every message acknowledged (processed or skipped as duplicate).
    Done,
    /// Some messages acknowledged, the rest failed even after retries.
    PartiallyAcked,
    /// No attempt succeeded within the retry budget.
    ExhaustedRetries,
    /// The endpoint rejected the batch outright.
    Rejected(String),
}

#[derive(Debug)]
pub struct BatchOutcome {
    /// Messages 0..acknowledged_prefix of the submitted slice are safe
    /// to advance the cursor past. A failure mid-batch stops the prefix
    /// there even when later messages landed, so the cursor never skips
    /// an unconfirmed line.
    pub acknowledged_prefix: usize,
    pub report: IngestReport,
    pub state: AttemptState,
}

/// Splits a message run into batches honoring count and byte limits.
pub fn plan_batches(messages: &[CanonicalMessage], options: &TransmitOptions) -> Vec<Vec<usize>> {
    let mut batches = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_bytes = 0usize;

    for (idx, message) in messages.iter().enumerate() {
        let size = message.wire_size();
        let over_count = current.len() >= options.max_messages;
        let over_bytes = !current.is_empty() && current_bytes + size > options.max_bytes;
        if over_count || over_bytes {
            batches.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current.push(idx);
        current_bytes += size;
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Drives batches through an endpoint with retry and partial-failure
/// handling. Sleeps between attempts, so callers hand it the whole
/// retry budget for a source.
pub struct Transmitter<'a, E: IngestEndpoint> {
    endpoint: &'a E,
    options: TransmitOptions,
    /// Test hook: when false, backoff delays are computed but not slept.
    sleep_enabled: bool,
}

impl<'a, E: IngestEndpoint> Transmitter<'a, E> {
    pub fn new(endpoint: &'a E, options: TransmitOptions) -> Self {
        Self {
            endpoint,
            options,
            sleep_enabled: true,
        }
    }

    #[cfg(test)]
    fn without_sleep(endpoint: &'a E, options: TransmitOptions) -> Self {
        Self {
            endpoint,
            options,
            sleep_enabled: false,
        }
    }

    pub fn options(&self) -> &TransmitOptions {
        &self.options
    }

    /// Sends one planned batch, retrying transient failures with the
    /// same token and partial failures with a fresh token covering only
    /// the unacknowledged messages.
    pub fn send_batch(&self, project_path: &str, messages: &[CanonicalMessage]) -> BatchOutcome {
        let mut report = IngestReport::default();
        // Per-message ack flags, indexed into `messages`.
        let mut acked = vec![false; messages.len()];
        // Indices still awaiting acknowledgment, in original order.
        let mut pending: Vec<usize> = (0..messages.len()).collect();
        let mut batch = IngestBatch::new(project_path.to_string(), messages.to_vec());

        let mut attempt = 0u32;
        while attempt < self.options.max_attempts && !pending.is_empty() {
            if attempt > 0 {
                self.pause(backoff_delay(attempt - 1));
            }
            match self.endpoint.submit(&batch) {
                Ok(attempt_report) => {
                    let mut still_failed = Vec::new();
                    for &idx in &pending {
                        if attempt_report.acknowledged(&messages[idx].id) {
                            acked[idx] = true;
                        } else {
                            still_failed.push(idx);
                        }
                    }
                    report.merge(attempt_report);
                    if still_failed.is_empty() {
                        return BatchOutcome {
                            acknowledged_prefix: messages.len(),
                            report,
                            state: AttemptState::Done,
                        };
                    }
                    // Retry only the unacknowledged messages. A fresh
                    // token is required: the server memoized the old
                    // one and would replay the failed report verbatim.
                    pending = still_failed;
                    let retry_messages: Vec<CanonicalMessage> =
                        pending.iter().map(|&i| messages[i].clone()).collect();
                    batch = IngestBatch::new(project_path.to_string(), retry_messages);
                    attempt += 1;
                }
                Err(DeliveryError::Transient(_)) => {
                    // Same token: if the server did process the batch
                    // and only the response was lost, the memoized
                    // report comes back instead of double-counting.
                    attempt += 1;
                }
                Err(DeliveryError::QuotaExceeded { retry_after }) => {
                    if let Some(delay) = retry_after {
                        self.pause(delay);
                    }
                    attempt += 1;
                }
                Err(DeliveryError::Rejected(reason)) => {
                    return BatchOutcome {
                        acknowledged_prefix: acked_prefix(&acked),
                        report,
                        state: AttemptState::Rejected(reason),
                    };
                }
            }
        }

        let prefix = acked_prefix(&acked);
        let state = if acked.iter().any(|&a| a) {
            AttemptState::PartiallyAcked
        } else {
            AttemptState::ExhaustedRetries
        };
        BatchOutcome {
            acknowledged_prefix: prefix,
            report,
            state,
        }
    }

    fn pause(&self, delay: Duration) {
        if self.sleep_enabled {
            std::thread::sleep(delay);
        }
    }
}

fn acked_prefix(acked: &[bool]) -> usize {
    acked.iter().take_while(|&&a| a).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use logship_types::{IngestFailure, MessageKind};
    use std::cell::RefCell;

    fn message(id: &str) -> CanonicalMessage {
        CanonicalMessage {
            id: id.to_string(),
            kind: MessageKind::User,
            session_id: "s-1".to_string(),
            parent_id: None,
            timestamp: chrono::Utc::now(),
            text_content: Some(format!("hello from {}", id)),
            model_name: None,
            token_usage: None,
            cost_estimate: None,
            duration_ms: None,
            tool_payload: None,
            content_hash: format!("hash-{}", id),
        }
    }

    /// Scripted endpoint: pops one response per submission and records
    /// every batch it saw.
    struct ScriptedEndpoint {
        responses: RefCell<Vec<std::result::Result<IngestReport, DeliveryError>>>,
        submissions: RefCell<Vec<IngestBatch>>,
    }

    impl ScriptedEndpoint {
        fn new(mut responses: Vec<std::result::Result<IngestReport, DeliveryError>>) -> Self {
            responses.reverse();
            Self {
                responses: RefCell::new(responses),
                submissions: RefCell::new(Vec::new()),
            }
        }
    }

    impl IngestEndpoint for ScriptedEndpoint {
        fn submit(&self, batch: &IngestBatch) -> std::result::Result<IngestReport, DeliveryError> {
            self.submissions.borrow_mut().push(batch.clone());
            self.responses
                .borrow_mut()
                .pop()
                .expect("endpoint called more times than scripted")
        }
    }

    fn success_report(processed: u64) -> IngestReport {
        IngestReport {
            processed,
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(10), Duration::from_secs(30));
    }

    #[test]
    fn test_plan_batches_by_count() {
        let messages: Vec<CanonicalMessage> =
            (0..5).map(|i| message(&format!("m-{}", i))).collect();
        let options = TransmitOptions {
            max_messages: 2,
            ..Default::default()
        };
        let batches = plan_batches(&messages, &options);
        assert_eq!(
            batches,
            vec![vec![0, 1], vec![2, 3], vec![4]]
        );
    }

    #[test]
    fn test_plan_batches_by_bytes() {
        let messages: Vec<CanonicalMessage> =
            (0..3).map(|i| message(&format!("m-{}", i))).collect();
        let per_message = messages[0].wire_size();
        let options = TransmitOptions {
            max_messages: 100,
            max_bytes: per_message + 1,
            max_attempts: 5,
        };
        let batches = plan_batches(&messages, &options);
        // Each message nearly fills the byte budget, so one per batch.
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_oversized_message_ships_alone() {
        let mut big = message("m-big");
        big.text_content = Some("x".repeat(4096));
        let messages = vec![big];
        let options = TransmitOptions {
            max_messages: 100,
            max_bytes: 16,
            max_attempts: 5,
        };
        let batches = plan_batches(&messages, &options);
        assert_eq!(batches, vec![vec![0]]);
    }

    #[test]
    fn test_clean_send_acknowledges_everything() {
        let messages = vec![message("m-1"), message("m-2")];
        let endpoint = ScriptedEndpoint::new(vec![Ok(success_report(2))]);
        let tx = Transmitter::without_sleep(&endpoint, TransmitOptions::default());

        let outcome = tx.send_batch("/proj", &messages);
        assert_eq!(outcome.state, AttemptState::Done);
        assert_eq!(outcome.acknowledged_prefix, 2);
        assert_eq!(outcome.report.processed, 2);
    }

    #[test]
    fn test_transient_failure_resends_same_token() {
        let messages = vec![message("m-1")];
        let endpoint = ScriptedEndpoint::new(vec![
            Err(DeliveryError::Transient("connection reset".to_string())),
            Ok(success_report(1)),
        ]);
        let tx = Transmitter::without_sleep(&endpoint, TransmitOptions::default());

        let outcome = tx.send_batch("/proj", &messages);
        assert_eq!(outcome.state, AttemptState::Done);

        let submissions = endpoint.submissions.borrow();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].batch_token, submissions[1].batch_token);
    }

    #[test]
    fn test_partial_failure_retries_failed_ids_under_fresh_token() {
        let messages = vec![message("m-1"), message("m-2"), message("m-3")];
        let first = IngestReport {
            processed: 2,
            failed: 1,
            failures: vec![IngestFailure {
                index: 1,
                id: "m-2".to_string(),
                reason: "storage error".to_string(),
            }],
            ..Default::default()
        };
        let endpoint = ScriptedEndpoint::new(vec![Ok(first), Ok(success_report(1))]);
        let tx = Transmitter::without_sleep(&endpoint, TransmitOptions::default());

        let outcome = tx.send_batch("/proj", &messages);
        assert_eq!(outcome.state, AttemptState::Done);
        assert_eq!(outcome.acknowledged_prefix, 3);

        let submissions = endpoint.submissions.borrow();
        assert_eq!(submissions.len(), 2);
        // Retry carries only the failed message.
        assert_eq!(submissions[1].messages.len(), 1);
        assert_eq!(submissions[1].messages[0].id, "m-2");
        assert_ne!(submissions[0].batch_token, submissions[1].batch_token);
    }

    #[test]
    fn test_persistent_failure_stops_prefix_at_gap() {
        let messages = vec![message("m-1"), message("m-2"), message("m-3")];
        let report = IngestReport {
            processed: 2,
            failed: 1,
            failures: vec![IngestFailure {
                index: 0,
                id: "m-1".to_string(),
                reason: "storage error".to_string(),
            }],
            ..Default::default()
        };
        let retry_fail = IngestReport {
            failed: 1,
            failures: vec![IngestFailure {
                index: 0,
                id: "m-1".to_string(),
                reason: "storage error".to_string(),
            }],
            ..Default::default()
        };
        let mut responses: Vec<std::result::Result<IngestReport, DeliveryError>> =
            vec![Ok(report)];
        for _ in 0..4 {
            responses.push(Ok(retry_fail.clone()));
        }
        let endpoint = ScriptedEndpoint::new(responses);
        let tx = Transmitter::without_sleep(&endpoint, TransmitOptions::default());

        let outcome = tx.send_batch("/proj", &messages);
        assert_eq!(outcome.state, AttemptState::PartiallyAcked);
        // m-2 and m-3 landed, but the cursor cannot advance past the
        // failed m-1 at index 0.
        assert_eq!(outcome.acknowledged_prefix, 0);
    }

    #[test]
    fn test_exhausted_retries_when_nothing_lands() {
        let messages = vec![message("m-1")];
        let responses: Vec<std::result::Result<IngestReport, DeliveryError>> = (0..5)
            .map(|_| {
                Err(DeliveryError::Transient("unreachable".to_string()))
                    as std::result::Result<IngestReport, DeliveryError>
            })
            .collect();
        let endpoint = ScriptedEndpoint::new(responses);
        let tx = Transmitter::without_sleep(&endpoint, TransmitOptions::default());

        let outcome = tx.send_batch("/proj", &messages);
        assert_eq!(outcome.state, AttemptState::ExhaustedRetries);
        assert_eq!(outcome.acknowledged_prefix, 0);
        assert_eq!(endpoint.submissions.borrow().len(), 5);
    }

    #[test]
    fn test_rejection_is_final() {
        let messages = vec![message("m-1")];
        let endpoint = ScriptedEndpoint::new(vec![Err(DeliveryError::Rejected(
            "invalid token".to_string(),
        ))]);
        let tx = Transmitter::without_sleep(&endpoint, TransmitOptions::default());

        let outcome = tx.send_batch("/proj", &messages);
        assert!(matches!(outcome.state, AttemptState::Rejected(_)));
        assert_eq!(endpoint.submissions.borrow().len(), 1);
    }

    #[test]
    fn test_quota_exceeded_counts_as_attempt() {
        let messages = vec![message("m-1")];
        let endpoint = ScriptedEndpoint::new(vec![
            Err(DeliveryError::QuotaExceeded {
                retry_after: Some(Duration::from_millis(1)),
            }),
            Ok(success_report(1)),
        ]);
        let tx = Transmitter::without_sleep(&endpoint, TransmitOptions::default());

        let outcome = tx.send_batch("/proj", &messages);
        assert_eq!(outcome.state, AttemptState::Done);
        assert_eq!(endpoint.submissions.borrow().len(), 2);
    }
}
