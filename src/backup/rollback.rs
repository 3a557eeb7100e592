/// Rollback engine
///
/// Restores snapshotted files and deletes created ones. Every path is
/// attempted; failures are collected into the report instead of aborting.
/// The manifest is marked rolled back afterwards even if some paths failed.

use crate::backup::manifest::BackupManifest;
use crate::error::{RecallError, Result};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// Outcome of one rollback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackReport {
    pub success: bool,
    pub files_restored: Vec<String>,
    pub files_deleted: Vec<String>,
    pub errors: Vec<String>,
}

impl RollbackReport {
    pub fn summary(&self) -> String {
        format!(
            "Restored {} files, deleted {} files",
            self.files_restored.len(),
            self.files_deleted.len()
        )
    }

    /// Turn a report with errors into `RecallError::PartialRestore`
    pub fn into_result(self) -> Result<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(RecallError::PartialRestore(self.errors))
        }
    }
}

pub struct RollbackEngine<'a> {
    snapshot_dir: &'a Path,
    workspace_root: &'a Path,
}

impl<'a> RollbackEngine<'a> {
    /// # Arguments
    /// * `snapshot_dir` - Backup-id directory mirroring the workspace layout
    /// * `workspace_root` - Directory the manifest's relative paths live in
    pub fn new(snapshot_dir: &'a Path, workspace_root: &'a Path) -> Self {
        Self {
            snapshot_dir,
            workspace_root,
        }
    }

    /// Undo everything the manifest tracked. One shot.
    ///
    /// # Returns
    /// * `Ok(RollbackReport)` - All paths attempted; `success` is false if any failed
    /// * `Err(RecallError::AlreadyRolledBack)` - The manifest was already consumed;
    ///   nothing is touched
    pub fn run(&self, manifest: &mut BackupManifest) -> Result<RollbackReport> {
        if !manifest.can_rollback {
            return Err(RecallError::AlreadyRolledBack(manifest.session_id.clone()));
        }

        let mut files_restored = Vec::new();
        let mut files_deleted = Vec::new();
        let mut errors = Vec::new();

        for path in &manifest.backed_up_files {
            match self.restore(path) {
                Ok(true) => files_restored.push(path.clone()),
                Ok(false) => errors.push(format!("Backup not found: {}", path)),
                Err(e) => errors.push(format!("Error restoring {}: {}", path, e)),
            }
        }

        for path in &manifest.created_files {
            match self.delete(path) {
                Ok(true) => files_deleted.push(path.clone()),
                Ok(false) => {} // already gone
                Err(e) => errors.push(format!("Error deleting {}: {}", path, e)),
            }
        }

        for error in &errors {
            tracing::warn!("Rollback of session {}: {}", manifest.session_id, error);
        }

        manifest.mark_rolled_back();

        let report = RollbackReport {
            success: errors.is_empty(),
            files_restored,
            files_deleted,
            errors,
        };
        tracing::info!(
            "Rolled back session {}: {}",
            manifest.session_id,
            report.summary()
        );

        Ok(report)
    }

    /// Copy the snapshot back. `Ok(false)` if there is no snapshot.
    fn restore(&self, path: &str) -> io::Result<bool> {
        let source = self.snapshot_dir.join(path);
        if !source.is_file() {
            return Ok(false);
        }

        let dest = self.workspace_root.join(path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &dest)?;

        Ok(true)
    }

    /// Remove a created file. `Ok(false)` if it doesn't exist anymore.
    fn delete(&self, path: &str) -> io::Result<bool> {
        match fs::remove_file(self.workspace_root.join(path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
