use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::db::Database;
use crate::queries::{batch, message, project, session};
use crate::rate::RateLimiter;
use crate::records::LimitType;
use crate::{Error, Result};
use logship_types::{IngestBatch, IngestFailure, IngestReport, OwnerId};

/// Quota applied to ingestion calls.
#[derive(Debug, Clone, Copy)]
pub struct IngestPolicy {
    pub window_hours: i64,
    pub max_requests: i64,
    /// Cool-down hint returned with quota rejections, in seconds.
    pub retry_after_secs: u64,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            window_hours: 1,
            max_requests: 600,
            retry_after_secs: 300,
        }
    }
}

/// Idempotent, ownership-scoped write path.
///
/// There is no global transaction: per-message idempotency, not batch-level
/// atomicity, is the correctness boundary. An abandoned submission may have
/// partially committed; the client re-sends and dedup absorbs the overlap.
pub struct IngestService<'a> {
    db: &'a Database,
    policy: IngestPolicy,
}

impl<'a> IngestService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            policy: IngestPolicy::default(),
        }
    }

    pub fn with_policy(db: &'a Database, policy: IngestPolicy) -> Self {
        Self { db, policy }
    }

    /// Ingest one batch for a resolved owner identity.
    ///
    /// Errors reject the batch in its entirety and happen before any write:
    /// quota exhaustion and ownership violations. Per-message problems are
    /// reported in the returned summary, never as errors.
    pub fn ingest(&self, owner: &OwnerId, ingest_batch: &IngestBatch) -> Result<IngestReport> {
        let conn = &self.db.conn;
        let now = Utc::now().to_rfc3339();

        // Whole-batch replay: a token we have already processed returns the
        // recorded report without touching data.
        if let Some(report) = batch::get_report(conn, owner, &ingest_batch.batch_token)? {
            debug!(token = %ingest_batch.batch_token, "replayed batch token");
            return Ok(report);
        }

        // Quota gate. This guards cost-incurring writes, so a storage error
        // during the check denies the request (fail closed).
        let allowed = match RateLimiter::new(self.db).check_and_record(
            owner,
            LimitType::Import,
            self.policy.window_hours,
            self.policy.max_requests,
        ) {
            Ok(allowed) => allowed,
            Err(err) => {
                warn!(owner = %owner, error = %err, "rate limit check failed, denying");
                false
            }
        };
        if !allowed {
            return Err(Error::QuotaExceeded {
                retry_after_secs: Some(self.policy.retry_after_secs),
            });
        }

        // Single ownership checkpoint: resolves (or creates) the project and
        // rejects the whole batch if the path belongs to another owner.
        let project = project::resolve_owned(conn, owner, &ingest_batch.project_path, &now)?;

        let mut report = IngestReport::default();
        let mut seen_sessions: HashSet<String> = HashSet::new();

        for (index, msg) in ingest_batch.messages.iter().enumerate() {
            if !seen_sessions.contains(&msg.session_id) {
                if let Err(err) =
                    session::resolve_or_create(conn, owner, &msg.session_id, &project.id, &now)
                {
                    warn!(id = %msg.id, error = %err, "session resolution failed");
                    report.failed += 1;
                    report.failures.push(IngestFailure {
                        index,
                        id: msg.id.clone(),
                        reason: format!("session resolution failed: {}", err),
                    });
                    continue;
                }
                seen_sessions.insert(msg.session_id.clone());
            }

            match message::insert_if_absent(conn, owner, &project.id, msg) {
                Ok(message::InsertOutcome::Inserted) => {
                    report.processed += 1;
                    let cost = msg.cost_estimate.unwrap_or(0.0);
                    session::increment_counters(conn, owner, &msg.session_id, 1, cost)?;
                    project::increment_counters(conn, &project.id, 1, cost)?;
                }
                Ok(message::InsertOutcome::Duplicate) => {
                    // Re-submission is a no-op, counted as skipped
                    report.skipped += 1;
                }
                Err(err) => {
                    warn!(id = %msg.id, error = %err, "message insert failed");
                    report.failed += 1;
                    report.failures.push(IngestFailure {
                        index,
                        id: msg.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        batch::record_report(conn, owner, &ingest_batch.batch_token, &report, &now)?;

        debug!(
            owner = %owner,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "batch ingested"
        );
        Ok(report)
    }
}
