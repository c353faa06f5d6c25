//! Raw source-log line builders and log-root layout helpers.
//!
//! Lines match the shape the agent runtime writes: one JSON object per
//! line, tagged by `type`, camelCase fields.

use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn user_line(id: &str, session: &str, timestamp: &str, text: &str) -> String {
    format!(
        r#"{{"type":"user","uuid":"{}","sessionId":"{}","timestamp":"{}","message":{{"role":"user","content":"{}"}}}}"#,
        id, session, timestamp, text
    )
}

pub fn assistant_line(
    id: &str,
    parent: &str,
    session: &str,
    timestamp: &str,
    text: &str,
) -> String {
    format!(
        r#"{{"type":"assistant","uuid":"{}","parentUuid":"{}","sessionId":"{}","timestamp":"{}","costUSD":0.01,"durationMs":800,"message":{{"role":"assistant","model":"sonnet-4","content":[{{"type":"text","text":"{}"}}],"usage":{{"input_tokens":100,"output_tokens":40}}}}}}"#,
        id, parent, session, timestamp, text
    )
}

pub fn summary_line(summary: &str, session: &str) -> String {
    format!(
        r#"{{"type":"summary","summary":"{}","sessionId":"{}"}}"#,
        summary, session
    )
}

pub fn tool_result_line(id: &str, session: &str, timestamp: &str, stdout: &str) -> String {
    format!(
        r#"{{"type":"user","uuid":"{}","sessionId":"{}","timestamp":"{}","message":{{"role":"user","content":[{{"type":"tool_result","tool_use_id":"t-1","content":{{"stdout":"{}"}}}}]}}}}"#,
        id, session, timestamp, stdout
    )
}

pub fn malformed_line() -> String {
    "{this is not json".to_string()
}

/// A short two-turn conversation, the smallest realistic session.
pub fn conversation(session: &str) -> Vec<String> {
    vec![
        user_line("u-1", session, "2025-01-01T10:00:00Z", "hello"),
        assistant_line("a-1", "u-1", session, "2025-01-01T10:00:02Z", "hi there"),
        user_line("u-2", session, "2025-01-01T10:01:00Z", "run the tests"),
        assistant_line("a-2", "u-2", session, "2025-01-01T10:01:05Z", "running now"),
    ]
}

/// Encode a project directory the way the agent runtime does:
/// `/Users/foo/bar` -> `-Users-foo-bar`.
pub fn encode_project_dir(project_dir: &str) -> String {
    let encoded = project_dir
        .replace(['/', '.'], "-")
        .trim_start_matches('-')
        .to_string();
    format!("-{}", encoded)
}

/// Write a session file at `<log_root>/<encoded-project>/<session>.jsonl`.
pub fn write_session(
    log_root: &Path,
    project_dir: &str,
    session: &str,
    lines: &[String],
) -> Result<PathBuf> {
    let dir = log_root.join(encode_project_dir(project_dir));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.jsonl", session));
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Append lines to an existing session file.
pub fn append_session(path: &Path, lines: &[String]) -> Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}
