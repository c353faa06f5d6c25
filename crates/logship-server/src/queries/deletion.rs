use logship_types::OwnerId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Result, records::DeletionMarker, records::DeletionPhase};

fn row_to_marker(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeletionMarker> {
    let phase_str: String = row.get(2)?;
    Ok(DeletionMarker {
        project_id: row.get(0)?,
        owner_id: OwnerId::new(row.get::<_, String>(1)?),
        // Unknown phase strings resume from the top; strictly more work,
        // never less
        phase: DeletionPhase::parse(&phase_str).unwrap_or(DeletionPhase::SessionsPending),
        started_at: row.get(3)?,
    })
}

/// Record the marker before entering a phase, so a crash between phases is
/// always resumable from the last completed one.
pub fn upsert(conn: &Connection, marker: &DeletionMarker) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO deletion_markers (project_id, owner_id, phase, started_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(project_id) DO UPDATE SET
            phase = ?3
        "#,
        params![
            &marker.project_id,
            marker.owner_id.as_str(),
            marker.phase.as_str(),
            &marker.started_at
        ],
    )?;

    Ok(())
}

pub fn get(conn: &Connection, project_id: &str) -> Result<Option<DeletionMarker>> {
    let result = conn
        .query_row(
            r#"
        SELECT project_id, owner_id, phase, started_at
        FROM deletion_markers
        WHERE project_id = ?1
        "#,
            [project_id],
            row_to_marker,
        )
        .optional()?;

    Ok(result)
}

pub fn list(conn: &Connection) -> Result<Vec<DeletionMarker>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT project_id, owner_id, phase, started_at
        FROM deletion_markers
        ORDER BY started_at
        "#,
    )?;

    let markers = stmt
        .query_map([], row_to_marker)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(markers)
}

pub fn remove(conn: &Connection, project_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM deletion_markers WHERE project_id = ?1",
        [project_id],
    )?;
    Ok(())
}
