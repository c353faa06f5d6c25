pub mod batch;
pub mod deletion;
pub mod message;
pub mod project;
pub mod rate_limit;
pub mod session;
