/// automation-recall library
///
/// Remembers automation configurations that worked so similar projects can
/// reuse them, and records file changes so an automation run can be undone.

pub mod backup;
pub mod config;
pub mod core;
pub mod error;
pub mod intelligence;
pub mod store;

// Re-exports for convenience
pub use backup::BackupSession;
pub use config::StorageConfig;
pub use error::{RecallError, Result};
pub use store::ConfigurationStore;
