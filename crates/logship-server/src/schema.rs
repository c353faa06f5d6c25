use crate::Result;
use rusqlite::Connection;

// Schema version (increment when changing table definitions)
pub const SCHEMA_VERSION: i32 = 1;

// NOTE: Store Design Rationale
//
// Why denormalized owner_id on every table?
// - Every authorization check becomes a single-field filter
// - No join can accidentally widen a query across owners
//
// Why project_id on messages (in addition to session_id)?
// - The cascading delete runs sessions-then-messages; once the sessions
//   phase has removed the session rows, only project_id can still name the
//   messages that belong to the interrupted deletion
//
// Why conditional writes instead of read-then-insert?
// - Two overlapping client retries may ingest the same message
//   concurrently; the INSERT ... ON CONFLICT DO NOTHING + changes() pair is
//   the storage engine's native atomic insert-if-absent, closing the race
//   without any in-process lock

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != 0 && current_version != SCHEMA_VERSION {
        drop_all_tables(conn)?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            path TEXT NOT NULL UNIQUE,
            message_count INTEGER NOT NULL DEFAULT 0,
            total_cost REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            owner_id TEXT NOT NULL,
            id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            message_count INTEGER NOT NULL DEFAULT 0,
            total_cost REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            PRIMARY KEY (owner_id, id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            owner_id TEXT NOT NULL,
            id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            parent_id TEXT,
            timestamp TEXT NOT NULL,
            text_content TEXT,
            model_name TEXT,
            token_usage TEXT,
            cost REAL,
            content_hash TEXT NOT NULL,
            tool_payload TEXT,
            PRIMARY KEY (owner_id, id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_content
            ON messages(owner_id, session_id, content_hash);
        CREATE INDEX IF NOT EXISTS idx_messages_session
            ON messages(owner_id, session_id);
        CREATE INDEX IF NOT EXISTS idx_messages_project
            ON messages(owner_id, project_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_project
            ON sessions(owner_id, project_id);

        CREATE TABLE IF NOT EXISTS rate_limit_usage (
            owner_id TEXT NOT NULL,
            limit_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            requests_made INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_rate_limit_window
            ON rate_limit_usage(owner_id, limit_type, timestamp);

        CREATE TABLE IF NOT EXISTS deletion_markers (
            project_id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            phase TEXT NOT NULL,
            started_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ingest_batches (
            owner_id TEXT NOT NULL,
            token TEXT NOT NULL,
            report TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (owner_id, token)
        );
        "#,
    )?;

    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;

    Ok(())
}

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS ingest_batches;
        DROP TABLE IF EXISTS deletion_markers;
        DROP TABLE IF EXISTS rate_limit_usage;
        DROP TABLE IF EXISTS messages;
        DROP TABLE IF EXISTS sessions;
        DROP TABLE IF EXISTS projects;
        "#,
    )?;
    Ok(())
}
