use chrono::{DateTime, Utc};
use logship_types::{CanonicalMessage, MessageKind, TokenUsage, content_hash, parse_timestamp};
use std::collections::HashMap;

use crate::schema::*;

/// Derive a deterministic id for summary records, which carry no uuid.
/// Hashing keeps re-parses idempotent across runs.
fn derive_summary_id(session_id: &str, summary: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    session_id.hash(&mut hasher);
    summary.hash(&mut hasher);
    format!("summary-{:016x}", hasher.finish())
}

/// Why a record was skipped. Skipping is a first-class outcome: one bad
/// record never aborts the file, it is counted and the parse moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Line was not valid JSON or not an object.
    MalformedJson,
    /// Record lacks the required identifier.
    MissingId,
    /// Record lacks a session identifier and no hint was available.
    MissingSessionId,
    /// Timestamp absent or unparsable.
    InvalidTimestamp,
    /// Record type not recognized by the schema.
    UnrecognizedKind,
}

impl SkipReason {
    /// Stable code surfaced in operator-facing counters.
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::MalformedJson => "malformed_json",
            SkipReason::MissingId => "missing_id",
            SkipReason::MissingSessionId => "missing_session_id",
            SkipReason::InvalidTimestamp => "invalid_timestamp",
            SkipReason::UnrecognizedKind => "unrecognized_kind",
        }
    }
}

/// Result of normalizing one raw record.
#[derive(Debug)]
pub enum ParseOutcome {
    Message(Box<CanonicalMessage>),
    Skip(SkipReason),
}

/// Stateful per-source parser.
///
/// Pure transformation apart from bookkeeping: skip counts per reason and
/// timestamp monotonicity warnings per session. A timestamp that goes
/// backwards within a session is a soft warning, never a failure.
pub struct SourceParser {
    /// Session id probed from the source header, used when a record
    /// (typically a summary) omits its own.
    session_hint: Option<String>,
    last_seen: HashMap<String, DateTime<Utc>>,
    skip_counts: HashMap<SkipReason, u64>,
    timestamp_warnings: u64,
}

impl Default for SourceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser {
    pub fn new() -> Self {
        Self {
            session_hint: None,
            last_seen: HashMap::new(),
            skip_counts: HashMap::new(),
            timestamp_warnings: 0,
        }
    }

    pub fn with_session_hint(session_id: impl Into<String>) -> Self {
        let mut parser = Self::new();
        parser.session_hint = Some(session_id.into());
        parser
    }

    /// Parse one JSONL line. Never errors; malformed input is a skip.
    pub fn parse_line(&mut self, line: &str) -> Option<ParseOutcome> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let outcome = match serde_json::from_str::<RawRecord>(line) {
            Ok(record) => self.parse_record(record),
            Err(_) => ParseOutcome::Skip(SkipReason::MalformedJson),
        };
        Some(outcome)
    }

    /// Normalize one raw record into a canonical message, or skip it.
    pub fn parse_record(&mut self, record: RawRecord) -> ParseOutcome {
        let result = match record {
            RawRecord::User(user) => self.normalize_user(user),
            RawRecord::Assistant(asst) => self.normalize_assistant(asst),
            RawRecord::Summary(summ) => self.normalize_summary(summ),
            RawRecord::ToolResult(result) => self.normalize_tool_result(result),
            RawRecord::Other => Err(SkipReason::UnrecognizedKind),
        };

        match result {
            Ok(message) => {
                self.check_monotonicity(&message);
                ParseOutcome::Message(Box::new(message))
            }
            Err(reason) => {
                *self.skip_counts.entry(reason).or_insert(0) += 1;
                ParseOutcome::Skip(reason)
            }
        }
    }

    /// Skip counts per reason code, for caller-side reporting.
    pub fn skip_counts(&self) -> Vec<(&'static str, u64)> {
        let mut counts: Vec<_> = self
            .skip_counts
            .iter()
            .map(|(reason, count)| (reason.code(), *count))
            .collect();
        counts.sort();
        counts
    }

    pub fn total_skipped(&self) -> u64 {
        self.skip_counts.values().sum()
    }

    /// Number of timestamp-ordering violations observed (soft warnings).
    pub fn timestamp_warnings(&self) -> u64 {
        self.timestamp_warnings
    }

    fn check_monotonicity(&mut self, message: &CanonicalMessage) {
        match self.last_seen.get(&message.session_id) {
            Some(last) if message.timestamp < *last => {
                self.timestamp_warnings += 1;
            }
            _ => {
                self.last_seen
                    .insert(message.session_id.clone(), message.timestamp);
            }
        }
    }

    fn resolve_session(&self, session_id: Option<String>) -> Result<String, SkipReason> {
        session_id
            .or_else(|| self.session_hint.clone())
            .ok_or(SkipReason::MissingSessionId)
    }

    fn resolve_timestamp(&self, ts: Option<&str>) -> Result<DateTime<Utc>, SkipReason> {
        ts.and_then(parse_timestamp)
            .ok_or(SkipReason::InvalidTimestamp)
    }

    fn normalize_user(&self, user: UserRecord) -> Result<CanonicalMessage, SkipReason> {
        let id = user.uuid.ok_or(SkipReason::MissingId)?;
        let session_id = self.resolve_session(user.session_id)?;
        let timestamp = self.resolve_timestamp(user.timestamp.as_deref())?;

        // Text from text blocks; tool results from either the nested
        // tool_use_result field or an embedded tool_result block.
        let mut text_parts = Vec::new();
        let mut tool_payload = user.tool_use_result;
        for content in &user.message.content {
            match content {
                UserContent::Text { text } => text_parts.push(text.as_str()),
                UserContent::ToolResult { content, .. } => {
                    if tool_payload.is_none() {
                        tool_payload = content.clone();
                    }
                }
                UserContent::Unknown => {}
            }
        }
        let text_content = if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join("\n"))
        };

        Ok(self.build_message(
            id,
            MessageKind::User,
            session_id,
            user.parent_uuid,
            timestamp,
            text_content,
            None,
            None,
            None,
            None,
            tool_payload,
        ))
    }

    fn normalize_assistant(&self, asst: AssistantRecord) -> Result<CanonicalMessage, SkipReason> {
        let id = asst.uuid.ok_or(SkipReason::MissingId)?;
        let session_id = self.resolve_session(asst.session_id)?;
        let timestamp = self.resolve_timestamp(asst.timestamp.as_deref())?;

        // Token usage, cost, model, and duration are all optional; absence
        // of any of them is not an error.
        let token_usage = asst.message.usage.as_ref().map(|u| TokenUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
            cache_creation_input_tokens: u.cache_creation_input_tokens,
            cache_read_input_tokens: u.cache_read_input_tokens,
        });

        let text_parts: Vec<&str> = asst
            .message
            .content
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        let text_content = if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join("\n"))
        };

        Ok(self.build_message(
            id,
            MessageKind::Assistant,
            session_id,
            asst.parent_uuid,
            timestamp,
            text_content,
            asst.message.model.clone(),
            token_usage,
            asst.cost_usd,
            asst.duration_ms,
            None,
        ))
    }

    fn normalize_summary(&self, summ: SummaryRecord) -> Result<CanonicalMessage, SkipReason> {
        let session_id = self.resolve_session(summ.session_id)?;
        let id = summ
            .leaf_uuid
            .clone()
            .unwrap_or_else(|| derive_summary_id(&session_id, &summ.summary));
        // Summary records may omit a timestamp; an absent one is tolerated
        // (the marker is content, not chronology), an unparsable one is not.
        let timestamp = match summ.timestamp.as_deref() {
            Some(ts) => parse_timestamp(ts).ok_or(SkipReason::InvalidTimestamp)?,
            None => Utc::now(),
        };

        Ok(self.build_message(
            id,
            MessageKind::Summary,
            session_id,
            None,
            timestamp,
            Some(summ.summary),
            None,
            None,
            None,
            None,
            None,
        ))
    }

    fn normalize_tool_result(
        &self,
        result: ToolResultRecord,
    ) -> Result<CanonicalMessage, SkipReason> {
        let id = result
            .uuid
            .or(result.tool_use_id)
            .ok_or(SkipReason::MissingId)?;
        let session_id = self.resolve_session(result.session_id)?;
        let timestamp = self.resolve_timestamp(result.timestamp.as_deref())?;

        Ok(self.build_message(
            id,
            MessageKind::ToolResult,
            session_id,
            result.parent_uuid,
            timestamp,
            None,
            None,
            None,
            None,
            None,
            result.result,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_message(
        &self,
        id: String,
        kind: MessageKind,
        session_id: String,
        parent_id: Option<String>,
        timestamp: DateTime<Utc>,
        text_content: Option<String>,
        model_name: Option<String>,
        token_usage: Option<TokenUsage>,
        cost_estimate: Option<f64>,
        duration_ms: Option<u64>,
        tool_payload: Option<serde_json::Value>,
    ) -> CanonicalMessage {
        let hash = content_hash(
            kind.as_str(),
            &session_id,
            parent_id.as_deref(),
            text_content.as_deref(),
            tool_payload.as_ref(),
        );

        CanonicalMessage {
            id,
            kind,
            session_id,
            parent_id,
            timestamp,
            text_content,
            model_name,
            token_usage,
            cost_estimate,
            duration_ms,
            tool_payload,
            content_hash: hash,
        }
    }
}
