use logship_types::{CanonicalMessage, OwnerId};
use rusqlite::{Connection, params};

use crate::Result;

/// Outcome of the conditional message write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Already durably persisted (by id, or by content hash when the id was
    /// regenerated). A no-op that callers count as skipped.
    Duplicate,
}

/// Atomic insert-if-absent.
///
/// The decision and the write are one conditional statement: the primary
/// key (owner, id) and the unique (owner, session, content_hash) index both
/// resolve to DO NOTHING, so two overlapping retries of the same message
/// can never both insert. An existing id is never re-bound to new content.
pub fn insert_if_absent(
    conn: &Connection,
    owner: &OwnerId,
    project_id: &str,
    message: &CanonicalMessage,
) -> Result<InsertOutcome> {
    let token_usage = message
        .token_usage
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let tool_payload = message
        .tool_payload
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let inserted = conn.execute(
        r#"
        INSERT INTO messages (owner_id, id, session_id, project_id, kind, parent_id,
                              timestamp, text_content, model_name, token_usage, cost,
                              content_hash, tool_payload)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT DO NOTHING
        "#,
        params![
            owner.as_str(),
            &message.id,
            &message.session_id,
            project_id,
            message.kind.as_str(),
            &message.parent_id,
            message.timestamp.to_rfc3339(),
            &message.text_content,
            &message.model_name,
            token_usage,
            message.cost_estimate,
            &message.content_hash,
            tool_payload,
        ],
    )?;

    if inserted == 0 {
        Ok(InsertOutcome::Duplicate)
    } else {
        Ok(InsertOutcome::Inserted)
    }
}

pub fn count_for_session(conn: &Connection, owner: &OwnerId, session_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        r#"
        SELECT COUNT(*)
        FROM messages
        WHERE owner_id = ?1 AND session_id = ?2
        "#,
        params![owner.as_str(), session_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

pub fn count_for_project(conn: &Connection, owner: &OwnerId, project_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        r#"
        SELECT COUNT(*)
        FROM messages
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
        DELETE FROM messages
        WHERE owner_id = ?1 AND project_id = ?2
        "#,
        params![owner.as_str(), project_id],
    )?;

    Ok(deleted)
}

/// Messages whose declared session no longer exists, excluding projects
/// with an in-flight deletion marker (those belong to the cascade).
pub fn list_orphans(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT m.owner_id, m.id
        FROM messages m
        WHERE NOT EXISTS (SELECT 1 FROM sessions s
                          WHERE s.owner_id = m.owner_id AND s.id = m.session_id)
          AND NOT EXISTS (SELECT 1 FROM deletion_markers d
                          WHERE d.project_id = m.project_id)
        "#,
    )?;

    let orphans = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(orphans)
}

pub fn delete_one(conn: &Connection, owner_id: &str, message_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM messages WHERE owner_id = ?1 AND id = ?2",
        params![owner_id, message_id],
    )?;
    Ok(())
}
