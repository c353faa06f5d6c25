use crate::Result;
use crate::records::{DeletionMarker, ProjectRecord, SessionRecord};
use crate::{queries, schema};
use logship_types::OwnerId;
use rusqlite::Connection;
use std::path::Path;

/// Handle to the persisted store.
///
/// Explicitly constructed and passed to each service at construction time;
/// lifecycle is owned by the process entry point, never by global state.
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        schema::init_schema(&db.conn)?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        schema::init_schema(&db.conn)?;
        Ok(db)
    }

    // Read-side delegates used by the CLI and by external tests. Writes go
    // through the services so invariants (counters, markers) hold.

    pub fn get_project_by_path(&self, path: &str) -> Result<Option<ProjectRecord>> {
        queries::project::get_by_path(&self.conn, path)
    }

    pub fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        queries::project::get(&self.conn, project_id)
    }

    pub fn get_session(&self, owner: &OwnerId, session_id: &str) -> Result<Option<SessionRecord>> {
        queries::session::get(&self.conn, owner, session_id)
    }

    pub fn count_session_messages(&self, owner: &OwnerId, session_id: &str) -> Result<i64> {
        queries::message::count_for_session(&self.conn, owner, session_id)
    }

    pub fn count_project_sessions(&self, owner: &OwnerId, project_id: &str) -> Result<i64> {
        queries::session::count_for_project(&self.conn, owner, project_id)
    }

    pub fn count_project_messages(&self, owner: &OwnerId, project_id: &str) -> Result<i64> {
        queries::message::count_for_project(&self.conn, owner, project_id)
    }

    pub fn list_deletion_markers(&self) -> Result<Vec<DeletionMarker>> {
        queries::deletion::list(&self.conn)
    }

    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute("VACUUM", [])?;
        Ok(())
    }
}
