use crate::Result;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::schema::RawRecord;

/// Read lines of a source file starting at a zero-based line index.
///
/// Returns `(line_index, line)` pairs so callers can tie parse outcomes back
/// to cursor positions. Source files are append-only; re-reading from the
/// cursor line is how incremental sync works.
pub fn read_lines_from(path: &Path, from_line: usize) -> Result<Vec<(usize, String)>> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if idx < from_line {
            continue;
        }
        lines.push((idx, line));
    }

    Ok(lines)
}

/// Header information probed from the first records of a source file.
#[derive(Debug)]
pub struct SourceHeader {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub timestamp: Option<String>,
}

/// Extract header information by reading the first records of a source.
///
/// The session id found here is the stable source identity: cursor records
/// are keyed by it rather than by the (movable) filesystem path.
pub fn extract_source_header(path: &Path) -> Result<SourceHeader> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut session_id = None;
    let mut cwd = None;
    let mut timestamp = None;

    for line in reader.lines().take(50).map_while(|l| l.ok()) {
        if let Ok(record) = serde_json::from_str::<RawRecord>(&line) {
            match &record {
                RawRecord::User(user) => {
                    if session_id.is_none() {
                        session_id = user.session_id.clone();
                    }
                    if cwd.is_none() {
                        cwd = user.cwd.clone();
                    }
                    if timestamp.is_none() {
                        timestamp = user.timestamp.clone();
                    }
                }
                RawRecord::Assistant(asst) => {
                    if session_id.is_none() {
                        session_id = asst.session_id.clone();
                    }
                    if timestamp.is_none() {
                        timestamp = asst.timestamp.clone();
                    }
                }
                _ => {}
            }
        }

        if session_id.is_some() && cwd.is_some() && timestamp.is_some() {
            break;
        }
    }

    Ok(SourceHeader {
        session_id,
        cwd,
        timestamp,
    })
}
