use logship_types::OwnerId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Result, records::SessionRecord};

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        owner_id: OwnerId::new(row.get::<_, String>(0)?),
        id: row.get(1)?,
        project_id: row.get(2)?,
        message_count: row.get(3)?,
        total_cost: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn get(conn: &Connection, owner: &OwnerId, session_id: &str) -> Result<Option<SessionRecord>> {
    let result = conn
        .query_row(
            r#"
        SELECT owner_id, id, project_id, message_count, total_cost, created_at
        FROM sessions
        WHERE owner_id = ?1 AND id = ?2
        "#,
            params![owner.as_str(), session_id],
            row_to_record,
        )
        .optional()?;

    Ok(result)
}

/// Insert-if-absent under the owner's scope. Sessions are keyed by
/// (owner, id), so the same session id under two owners never collides.
pub fn resolve_or_create(
    conn: &Connection,
    owner: &OwnerId,
    session_id: &str,
    project_id: &str,
    now: &str,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO sessions (owner_id, id, project_id, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(owner_id, id) DO NOTHING
        "#,
        params![owner.as_str(), session_id, project_id, now],
    )?;

    Ok(())
}

/// Atomic counter bump; never read-modify-write. Two concurrent batches
/// touching the same session leave counters exactly additive.
pub fn increment_counters(
    conn: &Connection,
    owner: &OwnerId,
    session_id: &str,
    message_delta: i64,
    cost_delta: f64,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE sessions
        SET message_count = message_count + ?3,
            total_cost = total_cost + ?4
        WHERE owner_id = ?1 AND id = ?2
        "#,
        params![owner.as_str(), session_id, message_delta, cost_delta],
    )?;

    Ok(())
}

pub fn set_counters(
    conn: &Connection,
    owner: &OwnerId,
    session_id: &str,
    message_count: i64,
    total_cost: f64,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE sessions
        SET message_count = ?3, total_cost = ?4
        WHERE owner_id = ?1 AND id = ?2
        "#,
        params![owner.as_str(), session_id, message_count, total_cost],
    )?;

    Ok(())
}

pub fn count_for_project(conn: &Connection, owner: &OwnerId, project_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        r#"
        SELECT COUNT(*)
        FROM sessions
        WHERE owner_id = ?1 AND project_id = ?2
        "#,
        params![owner.as_str(), project_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

pub fn delete_for_project(conn: &Connection, owner: &OwnerId, project_id: &str) -> Result<usize> {
    let deleted = conn.execute(
        r#"
        DELETE FROM sessions
        WHERE owner_id = ?1 AND project_id = ?2
        "#,
        params![owner.as_str(), project_id],
    )?;

    Ok(deleted)
}

/// Sessions whose declared project no longer exists.
pub fn list_orphans(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT s.owner_id, s.id
        FROM sessions s
        WHERE NOT EXISTS (SELECT 1 FROM projects p WHERE p.id = s.project_id)
        "#,
    )?;

    let orphans = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(orphans)
}

pub fn delete_one(conn: &Connection, owner_id: &str, session_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM sessions WHERE owner_id = ?1 AND id = ?2",
        params![owner_id, session_id],
    )?;
    Ok(())
}
