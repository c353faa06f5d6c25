use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Durable marker of how far a source has been consumed.
///
/// Owned exclusively by the cursor store and mutated only after the server
/// has acknowledged a batch, so a crash re-sends at most the unconfirmed
/// tail (which dedup absorbs server-side).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncCursor {
    /// Path the source was last seen at. Informational: the store key is
    /// the stable source identity, not this path.
    pub source_path: String,
    /// Next line to read (zero-based; everything before it is confirmed).
    pub last_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct CursorFile {
    #[serde(default)]
    sources: BTreeMap<String, SyncCursor>,
}

/// One cursor per discovered source, persisted as TOML so an operator can
/// inspect (and in a pinch, edit) sync state directly.
pub struct CursorStore {
    path: PathBuf,
    cursors: BTreeMap<String, SyncCursor>,
}

impl CursorStore {
    pub fn load(path: &Path) -> Result<Self> {
        let cursors = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let file: CursorFile = toml::from_str(&content)?;
            file.sources
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            cursors,
        })
    }

    /// Where to begin reading a source. Unknown sources start at line zero.
    pub fn resolve_start_point(&self, source_id: &str) -> SyncCursor {
        self.cursors.get(source_id).cloned().unwrap_or_default()
    }

    /// Persist progress for a source. Called only after acknowledgment;
    /// the write is flushed immediately so progress survives a crash.
    pub fn record_progress(&mut self, source_id: &str, cursor: SyncCursor) -> Result<()> {
        self.cursors.insert(source_id.to_string(), cursor);
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = CursorFile {
            sources: self.cursors.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SyncCursor)> {
        self.cursors.iter()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_source_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let store = CursorStore::load(&dir.path().join("cursors.toml")).unwrap();

        let cursor = store.resolve_start_point("s-1");
        assert_eq!(cursor.last_line, 0);
        assert!(cursor.last_synced_id.is_none());
    }

    #[test]
    fn test_progress_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cursors.toml");

        let mut store = CursorStore::load(&path).unwrap();
        store
            .record_progress(
                "s-1",
                SyncCursor {
                    source_path: "/logs/s-1.jsonl".to_string(),
                    last_line: 42,
                    last_synced_id: Some("m-42".to_string()),
                    last_synced_at: Some("2025-01-01T00:00:00Z".to_string()),
                },
            )
            .unwrap();

        let reloaded = CursorStore::load(&path).unwrap();
        let cursor = reloaded.resolve_start_point("s-1");
        assert_eq!(cursor.last_line, 42);
        assert_eq!(cursor.last_synced_id.as_deref(), Some("m-42"));
    }

    #[test]
    fn test_cursor_file_is_human_readable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cursors.toml");

        let mut store = CursorStore::load(&path).unwrap();
        store
            .record_progress(
                "s-1",
                SyncCursor {
                    source_path: "/logs/s-1.jsonl".to_string(),
                    last_line: 7,
                    last_synced_id: None,
                    last_synced_at: None,
                },
            )
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[sources.s-1]"));
        assert!(content.contains("last_line = 7"));
    }

    #[test]
    fn test_unknown_keys_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cursors.toml");
        std::fs::write(
            &path,
            r#"
[sources.s-1]
source_path = "/logs/s-1.jsonl"
last_line = 3
future_field = "ignored"
"#,
        )
        .unwrap();

        let store = CursorStore::load(&path).unwrap();
        assert_eq!(store.resolve_start_point("s-1").last_line, 3);
    }
}
