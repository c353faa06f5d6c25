use logship_types::{OwnerId, project_id_from_path};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Error, Result, records::ProjectRecord};

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get(0)?,
        owner_id: OwnerId::new(row.get::<_, String>(1)?),
        path: row.get(2)?,
        message_count: row.get(3)?,
        total_cost: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn get(conn: &Connection, project_id: &str) -> Result<Option<ProjectRecord>> {
    let result = conn
        .query_row(
            r#"
        SELECT id, owner_id, path, message_count, total_cost, created_at
        FROM projects
        WHERE id = ?1
        "#,
            [project_id],
            row_to_record,
        )
        .optional()?;

    Ok(result)
}

pub fn get_by_path(conn: &Connection, path: &str) -> Result<Option<ProjectRecord>> {
    let result = conn
        .query_row(
            r#"
        SELECT id, owner_id, path, message_count, total_cost, created_at
        FROM projects
        WHERE path = ?1
        "#,
            [path],
            row_to_record,
        )
        .optional()?;

    Ok(result)
}

/// Resolve the owner-scoped view of a project, creating it if absent.
///
/// This is the single ownership checkpoint for the write path: a
/// pre-existing project at the same path under a different owner rejects
/// the caller with an ownership violation before anything is written.
/// Ownership is never silently reassigned.
pub fn resolve_owned(
    conn: &Connection,
    owner: &OwnerId,
    path: &str,
    now: &str,
) -> Result<ProjectRecord> {
    let id = project_id_from_path(path);

    // Insert-if-absent; a concurrent create of the same path converges on
    // the deterministic id and one of the writers wins harmlessly.
    conn.execute(
        r#"
        INSERT INTO projects (id, owner_id, path, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(id) DO NOTHING
        "#,
        params![&id, owner.as_str(), path, now],
    )?;

    let project = get(conn, &id)?.ok_or_else(|| {
        Error::Database(rusqlite::Error::QueryReturnedNoRows)
    })?;

    if project.owner_id != *owner {
        return Err(Error::Ownership(format!(
            "project at '{}' belongs to another owner",
            path
        )));
    }

    Ok(project)
}

/// Resolve a project by id, enforcing ownership. Used by the deletion path.
pub fn resolve_owned_by_id(
    conn: &Connection,
    owner: &OwnerId,
    project_id: &str,
) -> Result<ProjectRecord> {
    let project = get(conn, project_id)?
        .ok_or_else(|| Error::Ownership(format!("no project '{}'", project_id)))?;

    if project.owner_id != *owner {
        return Err(Error::Ownership(format!(
            "project '{}' belongs to another owner",
            project_id
        )));
    }

    Ok(project)
}

/// Atomic counter bump; never read-modify-write.
pub fn increment_counters(
    conn: &Connection,
    project_id: &str,
    message_delta: i64,
    cost_delta: f64,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE projects
        SET message_count = message_count + ?2,
            total_cost = total_cost + ?3
        WHERE id = ?1
        "#,
        params![project_id, message_delta, cost_delta],
    )?;

    Ok(())
}

pub fn set_counters(
    conn: &Connection,
    project_id: &str,
    message_count: i64,
    total_cost: f64,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE projects
        SET message_count = ?2, total_cost = ?3
        WHERE id = ?1
        "#,
        params![project_id, message_count, total_cost],
    )?;

    Ok(())
}

pub fn delete(conn: &Connection, project_id: &str) -> Result<()> {
    conn.execute("DELETE FROM projects WHERE id = ?1", [project_id])?;
    Ok(())
}
