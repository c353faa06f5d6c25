use chrono::{Duration, Utc};

use crate::db::Database;
use crate::queries::rate_limit;
use crate::records::LimitType;
use crate::Result;
use logship_types::OwnerId;

/// Sliding-window quota enforcement per owner and limit type.
///
/// The window is counted over `[now - window_hours, now]`, not a fixed
/// calendar bucket. Distinct limit types are independent windows. Callers
/// guarding cost-incurring operations must treat a storage error from
/// `check_and_record` as "not allowed" (fail closed), never fail open.
pub struct RateLimiter<'a> {
    db: &'a Database,
}

impl<'a> RateLimiter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Check the window and record one unit of usage if under the limit.
    /// Returns whether the request is allowed. The check and the insert
    /// are one guarded statement, so concurrent processes sharing the
    /// store cannot both take the last remaining slot.
    pub fn check_and_record(
        &self,
        owner: &OwnerId,
        limit_type: LimitType,
        window_hours: i64,
        max_requests: i64,
    ) -> Result<bool> {
        let now = Utc::now();
        let window_start = (now - Duration::hours(window_hours)).to_rfc3339();

        rate_limit::record_if_under(
            &self.db.conn,
            owner,
            limit_type,
            &now.to_rfc3339(),
            &window_start,
            max_requests,
        )
    }

    /// Age out usage records older than the retention window.
    pub fn prune(&self, retention_hours: i64) -> Result<usize> {
        let cutoff = (Utc::now() - Duration::hours(retention_hours)).to_rfc3339();
        rate_limit::prune_before(&self.db.conn, &cutoff)
    }
}
