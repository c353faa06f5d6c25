//! Isolated temp environment for full-pipeline tests.

use crate::fixtures;
use anyhow::Result;
use logship_client::{CursorStore, IngestEndpoint, SyncService, SyncSummary, TransmitOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One throwaway world per test: a log root for sources and a state dir
/// for cursors, both under a temp directory that cleans itself up.
pub struct TestWorld {
    _temp_dir: TempDir,
    log_root: PathBuf,
    state_dir: PathBuf,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let log_root = temp_dir.path().join("logs");
        let state_dir = temp_dir.path().join("state");
        std::fs::create_dir_all(&log_root).expect("Failed to create log root");
        std::fs::create_dir_all(&state_dir).expect("Failed to create state dir");

        Self {
            _temp_dir: temp_dir,
            log_root,
            state_dir,
        }
    }

    pub fn log_root(&self) -> &Path {
        &self.log_root
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.state_dir.join("cursors.toml")
    }

    /// Place a session file with the given raw lines.
    pub fn with_session(self, project_dir: &str, session: &str, lines: &[String]) -> Self {
        fixtures::write_session(&self.log_root, project_dir, session, lines)
            .expect("Failed to write session");
        self
    }

    /// Append raw lines to an already placed session file.
    pub fn append_session(&self, project_dir: &str, session: &str, lines: &[String]) -> Result<()> {
        let path = self
            .log_root
            .join(fixtures::encode_project_dir(project_dir))
            .join(format!("{}.jsonl", session));
        fixtures::append_session(&path, lines)
    }

    /// Run one sync pass against an endpoint, loading cursors fresh from
    /// disk so consecutive calls behave like separate process invocations.
    pub fn sync<E: IngestEndpoint>(&self, endpoint: &E) -> Result<SyncSummary> {
        self.sync_with_options(endpoint, TransmitOptions::default())
    }

    pub fn sync_with_options<E: IngestEndpoint>(
        &self,
        endpoint: &E,
        options: TransmitOptions,
    ) -> Result<SyncSummary> {
        let cursors = CursorStore::load(&self.cursor_path())?;
        let mut service = SyncService::new(endpoint, options, cursors);
        Ok(service.sync_all(&self.log_root, &mut |_| {})?)
    }
}
