use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Compute the deterministic content hash of a normalized message payload.
///
/// The hash covers the fields that define message identity when ids are
/// ambiguous: kind, session, parent link, text, and the verbatim tool
/// payload. Aggregates (tokens, cost) are excluded so late-arriving
/// enrichment does not change identity.
pub fn content_hash(
    kind: &str,
    session_id: &str,
    parent_id: Option<&str>,
    text_content: Option<&str>,
    tool_payload: Option<&serde_json::Value>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(session_id.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(parent_id.unwrap_or("").as_bytes());
    hasher.update(b"\x1f");
    hasher.update(text_content.unwrap_or("").as_bytes());
    hasher.update(b"\x1f");
    if let Some(payload) = tool_payload {
        hasher.update(payload.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Generate a stable source identity hash from a log file path.
/// Used only for sources without a readable session header.
pub fn source_hash_from_path(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derive the project id from its path.
///
/// Deterministic so that concurrent batches creating the same project
/// converge on one row instead of racing on a generated id.
pub fn project_id_from_path(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Parse a log timestamp tolerantly.
///
/// Both the trailing-Z form (`2024-01-01T00:00:00Z`) and the offset form
/// (`2024-01-01T09:00:00+09:00`) parse to the same instant. Returns None
/// for unparsable input; callers decide whether that is a skip.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Truncate a string to a maximum length
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "...(truncated)"
    }
}
