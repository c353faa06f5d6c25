use chrono::Utc;
use tracing::{info, warn};

use crate::db::Database;
use crate::queries::{batch, deletion, message, project, session};
use crate::records::{DeletionMarker, DeletionPhase};
use crate::Result;
use logship_types::OwnerId;

/// Counts from one orphan sweep. Failures are logged and counted, never
/// fatal; the sweep is best-effort and convergent across runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    pub orphan_sessions_removed: usize,
    pub orphan_messages_removed: usize,
    pub failures: usize,
}

/// Counts from one cascading delete (or its resumption).
#[derive(Debug, Default, Clone, Copy)]
pub struct CascadeReport {
    pub sessions_deleted: usize,
    pub messages_deleted: usize,
}

/// Maintenance over the persisted store, outside the ingestion hot path.
///
/// Two independent duties: sweeping records whose parent no longer exists,
/// and resuming cascading deletions interrupted mid-phase. Any process
/// instance can resume a deletion started by another.
pub struct Reclaimer<'a> {
    db: &'a Database,
}

impl<'a> Reclaimer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Delete sessions and messages whose declared parent no longer exists.
    ///
    /// Records are removed one at a time so an individual failure (or a
    /// cancellation between records) never blocks the rest; no invariant
    /// depends on completing in one pass.
    pub fn sweep_orphans(&self) -> Result<SweepReport> {
        let conn = &self.db.conn;
        let mut report = SweepReport::default();

        for (owner_id, session_id) in session::list_orphans(conn)? {
            match session::delete_one(conn, &owner_id, &session_id) {
                Ok(()) => report.orphan_sessions_removed += 1,
                Err(err) => {
                    warn!(session = %session_id, error = %err, "orphan session delete failed");
                    report.failures += 1;
                }
            }
        }

        for (owner_id, message_id) in message::list_orphans(conn)? {
            match message::delete_one(conn, &owner_id, &message_id) {
                Ok(()) => report.orphan_messages_removed += 1,
                Err(err) => {
                    warn!(message = %message_id, error = %err, "orphan message delete failed");
                    report.failures += 1;
                }
            }
        }

        info!(
            sessions = report.orphan_sessions_removed,
            messages = report.orphan_messages_removed,
            failures = report.failures,
            "orphan sweep complete"
        );
        Ok(report)
    }

    /// Age out recorded batch tokens older than the retention window.
    /// The replay ledger only needs to outlive client retry loops;
    /// anything older is dead weight.
    pub fn prune_batch_ledger(&self, retention_hours: i64) -> Result<usize> {
        let cutoff = (Utc::now() - chrono::Duration::hours(retention_hours)).to_rfc3339();
        let pruned = batch::prune_before(&self.db.conn, &cutoff)?;
        if pruned > 0 {
            info!(pruned, "batch ledger pruned");
        }
        Ok(pruned)
    }

    /// Start (or restart) a cascading delete of a project and everything
    /// beneath it. Ownership is checked before the marker is written.
    pub fn delete_project(&self, owner: &OwnerId, project_id: &str) -> Result<CascadeReport> {
        let conn = &self.db.conn;
        let project = project::resolve_owned_by_id(conn, owner, project_id)?;

        let marker = DeletionMarker {
            project_id: project.id.clone(),
            owner_id: owner.clone(),
            phase: DeletionPhase::SessionsPending,
            started_at: Utc::now().to_rfc3339(),
        };
        deletion::upsert(conn, &marker)?;

        self.run_cascade(&marker)
    }

    /// Resume every in-flight deletion left by a prior interrupted run.
    /// Returns the number of deletions completed.
    pub fn resume_pending(&self) -> Result<usize> {
        let markers = deletion::list(&self.db.conn)?;
        let count = markers.len();

        for marker in markers {
            info!(
                project = %marker.project_id,
                phase = marker.phase.as_str(),
                "resuming interrupted deletion"
            );
            self.run_cascade(&marker)?;
        }

        Ok(count)
    }

    /// Execute the cascade from the recorded phase onward. The marker is
    /// updated before each phase transition, so a crash between phases
    /// resumes from the last completed phase, never from scratch.
    fn run_cascade(&self, marker: &DeletionMarker) -> Result<CascadeReport> {
        let conn = &self.db.conn;
        let mut report = CascadeReport::default();
        let mut phase = marker.phase;

        if phase == DeletionPhase::SessionsPending {
            report.sessions_deleted =
                session::delete_for_project(conn, &marker.owner_id, &marker.project_id)?;

            phase = DeletionPhase::MessagesPending;
            deletion::upsert(
                conn,
                &DeletionMarker {
                    phase,
                    ..marker.clone()
                },
            )?;
        }

        if phase == DeletionPhase::MessagesPending {
            report.messages_deleted =
                message::delete_for_project(conn, &marker.owner_id, &marker.project_id)?;

            phase = DeletionPhase::Done;
            deletion::upsert(
                conn,
                &DeletionMarker {
                    phase,
                    ..marker.clone()
                },
            )?;
        }

        // Done: drop the project record, then the marker itself
        project::delete(conn, &marker.project_id)?;
        deletion::remove(conn, &marker.project_id)?;

        Ok(report)
    }
}
