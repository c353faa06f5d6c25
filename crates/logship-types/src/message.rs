use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// NOTE: Schema Design Goals
//
// 1. Normalization: Raw provider log records are heterogeneous and loosely
//    typed; CanonicalMessage is the single shape both the client pipeline
//    and the server store agree on.
// 2. Idempotency: every message carries a content_hash alongside its id so
//    the server can deduplicate even when ids are reused ambiguously.
// 3. Tolerance: optional fields stay optional. A record that lacks token
//    usage or cost is a perfectly good message, not an error.

/// Record kind of a canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    User,
    Assistant,
    /// Lightweight session summary marker (no conversational content).
    Summary,
    ToolResult,
}

impl MessageKind {
    /// Stable string form used in storage and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Assistant => "assistant",
            MessageKind::Summary => "summary",
            MessageKind::ToolResult => "tool_result",
        }
    }
}

/// Token usage extracted from an assistant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
}

/// Normalized message as produced by the parser and persisted by the server.
///
/// `id` is unique per source; `content_hash` is the dedup fallback when id
/// reuse is ambiguous. Within a session timestamps are expected to be
/// non-decreasing under a well-formed source, but violations are a soft
/// warning, never a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMessage {
    /// Globally unique message id (source-assigned).
    pub id: String,

    pub kind: MessageKind,

    /// Session this message belongs to.
    pub session_id: String,

    /// Parent message in the conversation chain. None for root messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Record timestamp (UTC).
    pub timestamp: DateTime<Utc>,

    /// Extracted text content, if the record carried any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Model name (assistant records only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,

    /// Estimated cost in USD (assistant records only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,

    /// Generation duration in milliseconds, when the record carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Nested tool result payload, preserved verbatim (arbitrary shape).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_payload: Option<Value>,

    /// Deterministic digest of the normalized payload (see `content_hash`).
    pub content_hash: String,
}

impl CanonicalMessage {
    /// Serialized size of this message on the wire, used by batch planning.
    pub fn wire_size(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}
