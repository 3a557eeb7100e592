/// Backup manifest document and its lifecycle states
///
/// A manifest lists the files whose original content was snapshotted and the
/// files that were newly created during one automation session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state derived from the manifest contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestState {
    Created,
    Tracking,
    RolledBack,
}

impl std::fmt::Display for ManifestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ManifestState::Created => "created",
            ManifestState::Tracking => "tracking",
            ManifestState::RolledBack => "rolled_back",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub session_id: String,
    pub backup_id: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    /// Workspace-relative paths with a snapshot under the backup directory
    pub backed_up_files: Vec<String>,
    /// Workspace-relative paths that did not exist before the session
    pub created_files: Vec<String>,
    pub can_rollback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_at: Option<DateTime<Utc>>,
}

impl BackupManifest {
    pub fn new(session_id: &str, backup_id: &str, description: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            backup_id: backup_id.to_string(),
            created_at: Utc::now(),
            description: description.to_string(),
            backed_up_files: Vec::new(),
            created_files: Vec::new(),
            can_rollback: true,
            rolled_back_at: None,
        }
    }

    pub fn state(&self) -> ManifestState {
        if !self.can_rollback {
            ManifestState::RolledBack
        } else if self.backed_up_files.is_empty() && self.created_files.is_empty() {
            ManifestState::Created
        } else {
            ManifestState::Tracking
        }
    }

    pub fn is_backed_up(&self, path: &str) -> bool {
        self.backed_up_files.iter().any(|p| p == path)
    }

    pub fn is_created(&self, path: &str) -> bool {
        self.created_files.iter().any(|p| p == path)
    }

    pub fn total_changes(&self) -> usize {
        self.backed_up_files.len() + self.created_files.len()
    }

    /// Terminal transition. Only `RollbackEngine` calls this.
    pub(crate) fn mark_rolled_back(&mut self) {
        self.can_rollback = false;
        self.rolled_back_at = Some(Utc::now());
    }
}

/// What a rollback would do, without doing it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackPreview {
    pub can_rollback: bool,
    pub will_restore: Vec<String>,
    pub will_delete: Vec<String>,
    pub total_changes: usize,
    pub created_at: DateTime<Utc>,
    pub description: String,
}

/// Summary of the current backup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub backup_id: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub backed_up_files_count: usize,
    pub created_files_count: usize,
    pub can_rollback: bool,
    pub total_changes: usize,
}

impl From<&BackupManifest> for RollbackPreview {
    fn from(manifest: &BackupManifest) -> Self {
        Self {
            can_rollback: manifest.can_rollback,
            will_restore: manifest.backed_up_files.clone(),
            will_delete: manifest.created_files.clone(),
            total_changes: manifest.total_changes(),
            created_at: manifest.created_at,
            description: manifest.description.clone(),
        }
    }
}

impl From<&BackupManifest> for BackupInfo {
    fn from(manifest: &BackupManifest) -> Self {
        Self {
            backup_id: manifest.backup_id.clone(),
            created_at: manifest.created_at,
            description: manifest.description.clone(),
            backed_up_files_count: manifest.backed_up_files.len(),
            created_files_count: manifest.created_files.len(),
            can_rollback: manifest.can_rollback,
            total_changes: manifest.total_changes(),
        }
    }
}
