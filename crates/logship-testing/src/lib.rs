//! Testing infrastructure for logship integration tests.
//!
//! - `fixtures`: raw source-log line builders and log-root layout helpers
//! - `endpoint`: in-process endpoints wiring the client to a real server
//! - `world`: isolated temp environment for full-pipeline tests

pub mod endpoint;
pub mod fixtures;
pub mod world;

pub use endpoint::{FlakyEndpoint, LocalEndpoint};
pub use world::TestWorld;
