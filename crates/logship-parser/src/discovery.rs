use crate::Result;
use crate::io::extract_source_header;
use logship_types::source_hash_from_path;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discovered source log file with its stable identity.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Stable source identity: the session id from the file header when one
    /// is readable, otherwise a hash of the path. Cursors are keyed by this
    /// so a moved file at worst re-syncs (dedup makes that harmless).
    pub source_id: String,
    /// Project directory the session ran in, if recorded.
    pub project_path: Option<String>,
}

fn is_source_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    if path.extension().is_none_or(|e| e != "jsonl") {
        return false;
    }
    // Empty files carry nothing worth a cursor
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Discover source log files under a log root.
///
/// Layout is `<log_root>/<encoded-project-dir>/<session>.jsonl`, but any
/// `.jsonl` within two levels is accepted.
pub fn discover_sources(log_root: &Path) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();

    for entry in WalkDir::new(log_root)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !is_source_file(path) {
            continue;
        }

        let header = extract_source_header(path)?;
        let source_id = header
            .session_id
            .unwrap_or_else(|| source_hash_from_path(path));

        sources.push(SourceFile {
            path: path.to_path_buf(),
            source_id,
            project_path: header.cwd,
        });
    }

    // Deterministic processing order for operators reading the output
    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}
