// Owner-scoped ingestion store
// Idempotent writes, sliding-window quotas, and resumable cascading deletes
// over SQLite. No in-process locks: correctness rests on the storage
// engine's conditional writes and atomic increments.

mod db;
mod error;
pub mod ingest;
mod queries;
pub mod rate;
pub mod reclaim;
pub mod reconcile;
mod records;
mod schema;

// Public API
pub use db::Database;
pub use error::{Error, Result};
pub use ingest::{IngestPolicy, IngestService};
pub use rate::RateLimiter;
pub use reclaim::{CascadeReport, Reclaimer, SweepReport};
pub use reconcile::{CounterDrift, reconcile};
pub use records::{DeletionMarker, DeletionPhase, LimitType, ProjectRecord, SessionRecord};
pub use schema::SCHEMA_VERSION;
