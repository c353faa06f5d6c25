use logship_types::OwnerId;

/// Project row: the root of an owner's hierarchy.
///
/// `id` is the SHA-256 of the project path, so concurrent creates from
/// overlapping client retries converge on the same row.
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub id: String,
    pub owner_id: OwnerId,
    pub path: String,
    /// Incrementally maintained; reconcilable by full recomputation.
    pub message_count: i64,
    pub total_cost: f64,
    pub created_at: String,
}

/// Session row. Owner id equals the owning project's, always.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub owner_id: OwnerId,
    pub id: String,
    pub project_id: String,
    pub message_count: i64,
    pub total_cost: f64,
    pub created_at: String,
}

/// Quota window a usage record counts against. Distinct types are
/// independent windows; exhausting one never blocks another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitType {
    Export,
    Import,
    Backup,
    Restore,
    Api,
}

impl LimitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::Export => "export",
            LimitType::Import => "import",
            LimitType::Backup => "backup",
            LimitType::Restore => "restore",
            LimitType::Api => "api",
        }
    }
}

/// Phase of an in-flight cascading delete. The cascade always runs
/// sessions, then messages, then the project record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPhase {
    SessionsPending,
    MessagesPending,
    Done,
}

impl DeletionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionPhase::SessionsPending => "sessions_pending",
            DeletionPhase::MessagesPending => "messages_pending",
            DeletionPhase::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sessions_pending" => Some(DeletionPhase::SessionsPending),
            "messages_pending" => Some(DeletionPhase::MessagesPending),
            "done" => Some(DeletionPhase::Done),
            _ => None,
        }
    }
}

/// Marker for an in-flight cascading delete. Exists only while a deletion
/// is incomplete; its presence is what makes reclamation resumable by any
/// process instance.
#[derive(Debug, Clone)]
pub struct DeletionMarker {
    pub project_id: String,
    pub owner_id: OwnerId,
    pub phase: DeletionPhase,
    pub started_at: String,
}
