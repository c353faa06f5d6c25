use logship_types::OwnerId;
use rusqlite::{Connection, params};

use crate::{Result, records::LimitType};

pub fn record_usage(
    conn: &Connection,
    owner: &OwnerId,
    limit_type: LimitType,
    now: &str,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO rate_limit_usage (owner_id, limit_type, timestamp, requests_made)
        VALUES (?1, ?2, ?3, 1)
        "#,
        params![owner.as_str(), limit_type.as_str(), now],
    )?;

    Ok(())
}

/// Record one unit of usage only if the window still has room, in a
/// single statement. Two processes sharing the store cannot both take
/// the last remaining slot.
pub fn record_if_under(
    conn: &Connection,
    owner: &OwnerId,
    limit_type: LimitType,
    now: &str,
    window_start: &str,
    max_requests: i64,
) -> Result<bool> {
    let inserted = conn.execute(
        r#"
        INSERT INTO rate_limit_usage (owner_id, limit_type, timestamp, requests_made)
        SELECT ?1, ?2, ?3, 1
        WHERE (
            SELECT COALESCE(SUM(requests_made), 0)
            FROM rate_limit_usage
            WHERE owner_id = ?1 AND limit_type = ?2 AND timestamp >= ?4
        ) < ?5
        "#,
        params![
            owner.as_str(),
            limit_type.as_str(),
            now,
            window_start,
            max_requests
        ],
    )?;

    Ok(inserted > 0)
}

/// Age out records older than the retention cutoff. The table is
/// append-only otherwise.
pub fn prune_before(conn: &Connection, cutoff: &str) -> Result<usize> {
    let pruned = conn.execute(
        "DELETE FROM rate_limit_usage WHERE timestamp < ?1",
        [cutoff],
    )?;

    Ok(pruned)
}
