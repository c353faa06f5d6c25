pub mod delete_project;
pub mod init;
pub mod reclaim;
pub mod reconcile;
pub mod status;
pub mod sync;
