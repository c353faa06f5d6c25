// Client-side sync pipeline
// Discovers source logs, parses past durable cursors, and delivers
// batches to an ingestion endpoint with retry and idempotent replay.

pub mod config;
pub mod cursor;
mod error;
pub mod http;
pub mod sync;
pub mod transmit;

pub use config::{SyncConfig, resolve_workspace_path};
pub use cursor::{CursorStore, SyncCursor};
pub use error::{Error, Result};
pub use http::HttpEndpoint;
pub use sync::{SyncProgress, SyncService, SyncSummary};
pub use transmit::{
    AttemptState, BatchOutcome, DeliveryError, IngestEndpoint, TransmitOptions, Transmitter,
    backoff_delay, plan_batches,
};
