/// Error types for automation-recall
///
/// This module defines all possible errors that can occur in the application.
/// Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for automation-recall operations
#[derive(Error, Debug)]
pub enum RecallError {
    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error outside of a stored document
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No configuration with this id exists in the store
    #[error("Configuration not found: {0}")]
    ConfigurationNotFound(String),

    /// No backup manifest exists for this session
    #[error("No backup found for session: {0}")]
    ManifestNotFound(String),

    /// A stored document exists but cannot be parsed
    #[error("Corrupt document at {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    /// Rollback was already performed for this session
    #[error("Rollback already performed for session: {0}")]
    AlreadyRolledBack(String),

    /// Rollback finished but some paths could not be restored or deleted
    #[error("Rollback finished with {} error(s)", .0.len())]
    PartialRestore(Vec<String>),

    /// A document could not be durably written
    #[error("Could not write {path}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index and the full records disagree about a configuration
    #[error("Configuration index out of sync for: {0}")]
    IndexMismatch(String),

    /// Configuration payload failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Similarity query that cannot be scored against
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Tracked path is not usable inside the workspace
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for automation-recall operations
pub type Result<T> = std::result::Result<T, RecallError>;

/// Convert RecallError to a user-friendly error message
impl RecallError {
    pub fn user_message(&self) -> String {
        match self {
            RecallError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            RecallError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
            RecallError::ConfigurationNotFound(id) => {
                format!("Configuration '{}' not found", id)
            }
            RecallError::ManifestNotFound(session) => {
                format!("No backup found for session '{}'", session)
            }
            RecallError::CorruptRecord { path, .. } => {
                format!(
                    "Stored data at {} is damaged. It was left untouched; inspect or remove it manually.",
                    path.display()
                )
            }
            RecallError::AlreadyRolledBack(session) => {
                format!("Session '{}' was already rolled back", session)
            }
            RecallError::PartialRestore(errors) => {
                format!(
                    "Rollback finished with {} problem(s):\n  {}",
                    errors.len(),
                    errors.join("\n  ")
                )
            }
            RecallError::StorageWrite { path, source } => {
                format!("Could not save {}. Details: {}", path.display(), source)
            }
            RecallError::IndexMismatch(id) => {
                format!(
                    "Configuration index is out of sync for '{}'. Check the configurations directory.",
                    id
                )
            }
            RecallError::InvalidConfiguration(reason) => {
                format!("Invalid configuration: {}", reason)
            }
            RecallError::InvalidQuery(reason) => {
                format!("Invalid query: {}", reason)
            }
            RecallError::InvalidPath(reason) => {
                format!("Invalid path: {}", reason)
            }
            RecallError::Config(msg) => {
                format!("Configuration issue: {}", msg)
            }
        }
    }

    /// True for the "no such thing" family of errors
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RecallError::ConfigurationNotFound(_) | RecallError::ManifestNotFound(_)
        )
    }
}
