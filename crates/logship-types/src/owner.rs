use serde::{Deserialize, Serialize};

/// Resolved owner identity scoping every ingestion and deletion call.
///
/// Authentication is an external collaborator; by the time a request reaches
/// the core, the owner id is already resolved and trusted. Every persisted
/// row carries this id denormalized down to the leaf so authorization is
/// always a single-field filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
