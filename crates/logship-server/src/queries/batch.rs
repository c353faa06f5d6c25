use logship_types::{IngestReport, OwnerId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Result;

/// Look up the recorded report for a previously processed batch token.
/// A replayed token returns this report without touching any data.
pub fn get_report(
    conn: &Connection,
    owner: &OwnerId,
    token: &str,
) -> Result<Option<IngestReport>> {
    let report_json: Option<String> = conn
        .query_row(
            r#"
        SELECT report
        FROM ingest_batches
        WHERE owner_id = ?1 AND token = ?2
        "#,
            params![owner.as_str(), token],
            |row| row.get(0),
        )
        .optional()?;

    match report_json {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn record_report(
    conn: &Connection,
    owner: &OwnerId,
    token: &str,
    report: &IngestReport,
    now: &str,
) -> Result<()> {
    let json = serde_json::to_string(report)?;
    conn.execute(
        r#"
        INSERT INTO ingest_batches (owner_id, token, report, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(owner_id, token) DO NOTHING
        "#,
        params![owner.as_str(), token, json, now],
    )?;

    Ok(())
}

/// Age out recorded batch tokens older than the retention cutoff. A token
/// this old can no longer be replayed by any live client retry loop, and
/// per-message dedup still absorbs a resend of the same messages.
pub fn prune_before(conn: &Connection, cutoff: &str) -> Result<usize> {
    let pruned = conn.execute(
        "DELETE FROM ingest_batches WHERE created_at < ?1",
        [cutoff],
    )?;

    Ok(pruned)
}
