/// Backup session
///
/// Owns one session's manifest on disk and its snapshot tree:
///
/// ```text
/// <backups_dir>/<session_id>/manifest.json
/// <backups_dir>/<session_id>/<backup_id>/<relative path of each snapshot>
/// ```
///
/// Callers must call `track_modification` before writing to a file; the
/// session has no way to see writes that already happened.

use crate::backup::manifest::{BackupInfo, BackupManifest, ManifestState, RollbackPreview};
use crate::backup::rollback::{RollbackEngine, RollbackReport};
use crate::config::StorageConfig;
use crate::error::{RecallError, Result};
use crate::store::document;
use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";

pub struct BackupSession {
    session_dir: PathBuf,
    workspace_root: PathBuf,
    manifest: BackupManifest,
}

impl BackupSession {
    /// Start a new backup for `session_id`
    ///
    /// Replaces any manifest the session already had.
    pub fn create(config: &StorageConfig, session_id: &str, description: &str) -> Result<Self> {
        let session_dir = Self::session_dir(config, session_id)?;
        let backup_id = format!(
            "{}_{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );

        let session = Self {
            session_dir,
            workspace_root: config.workspace_root.clone(),
            manifest: BackupManifest::new(session_id, &backup_id, description),
        };
        session.persist(&session.manifest)?;

        tracing::info!(
            "Created backup {} for session {} ({})",
            backup_id,
            session_id,
            description
        );

        Ok(session)
    }

    /// Reopen the manifest of an existing session
    ///
    /// # Returns
    /// * `Err(RecallError::ManifestNotFound)` - The session has no manifest
    /// * `Err(RecallError::CorruptRecord)` - The manifest exists but is unreadable
    pub fn open(config: &StorageConfig, session_id: &str) -> Result<Self> {
        let session_dir = Self::session_dir(config, session_id)?;
        let manifest: BackupManifest = document::read_json(&session_dir.join(MANIFEST_FILE))?
            .ok_or_else(|| RecallError::ManifestNotFound(session_id.to_string()))?;

        Ok(Self {
            session_dir,
            workspace_root: config.workspace_root.clone(),
            manifest,
        })
    }

    pub fn manifest(&self) -> &BackupManifest {
        &self.manifest
    }

    pub fn state(&self) -> ManifestState {
        self.manifest.state()
    }

    /// Directory holding this backup's snapshots
    pub fn snapshot_dir(&self) -> PathBuf {
        self.session_dir.join(&self.manifest.backup_id)
    }

    /// Record that `path` was created by the automation
    ///
    /// Tracking the same path twice is a no-op.
    pub fn track_creation<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.ensure_open()?;
        let rel = self.relativize(path.as_ref())?;

        if self.manifest.is_created(&rel) {
            return Ok(());
        }

        tracing::debug!("Session {}: tracking new file {}", self.manifest.session_id, rel);
        self.commit(|m| m.created_files.push(rel))
    }

    /// Snapshot `path` before it is changed
    ///
    /// Only the first call per path captures content; later calls keep that
    /// snapshot. A path that doesn't exist yet is tracked as created instead,
    /// so rollback removes it.
    pub fn track_modification<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.ensure_open()?;
        let rel = self.relativize(path.as_ref())?;

        if self.manifest.is_backed_up(&rel) || self.manifest.is_created(&rel) {
            return Ok(());
        }

        let source = self.workspace_root.join(&rel);
        match fs::metadata(&source) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(
                    "Session {}: {} does not exist yet, tracking as created",
                    self.manifest.session_id,
                    rel
                );
                return self.commit(|m| m.created_files.push(rel));
            }
            Err(e) => return Err(e.into()),
            Ok(meta) if !meta.is_file() => {
                return Err(RecallError::InvalidPath(format!("{} is not a file", rel)));
            }
            Ok(_) => {}
        }

        let dest = self.snapshot_dir().join(&rel);
        copy_snapshot(&source, &dest).map_err(|source| RecallError::StorageWrite {
            path: dest.clone(),
            source,
        })?;

        tracing::debug!("Session {}: snapshotted {}", self.manifest.session_id, rel);
        self.commit(|m| m.backed_up_files.push(rel))
    }

    /// What `rollback` would do
    pub fn preview(&self) -> RollbackPreview {
        RollbackPreview::from(&self.manifest)
    }

    pub fn info(&self) -> BackupInfo {
        BackupInfo::from(&self.manifest)
    }

    /// Restore snapshots, delete created files, and retire the manifest
    ///
    /// The manifest is marked rolled back and saved even when some paths fail;
    /// check `RollbackReport::success` or call `into_result`.
    ///
    /// The consumed manifest (`can_rollback: false`) reaches disk before any
    /// file is touched. If that write fails nothing is changed.
    pub fn rollback(&mut self) -> Result<RollbackReport> {
        self.ensure_open()?;

        let mut consumed = self.manifest.clone();
        consumed.can_rollback = false;
        self.persist(&consumed)?;

        let snapshot_dir = self.snapshot_dir();
        let report =
            RollbackEngine::new(&snapshot_dir, &self.workspace_root).run(&mut self.manifest)?;

        // Disk already says consumed; only the timestamp is missing if this fails
        if let Err(e) = self.persist(&self.manifest) {
            tracing::warn!(
                "Session {}: could not record rollback time: {}",
                self.manifest.session_id,
                e
            );
        }

        Ok(report)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.manifest.can_rollback {
            Ok(())
        } else {
            Err(RecallError::AlreadyRolledBack(self.manifest.session_id.clone()))
        }
    }

    /// Apply a change and save it; memory only changes once disk has it
    fn commit<F: FnOnce(&mut BackupManifest)>(&mut self, update: F) -> Result<()> {
        let mut next = self.manifest.clone();
        update(&mut next);
        self.persist(&next)?;
        self.manifest = next;
        Ok(())
    }

    fn persist(&self, manifest: &BackupManifest) -> Result<()> {
        document::write_json(&self.session_dir.join(MANIFEST_FILE), manifest)
    }

    fn session_dir(config: &StorageConfig, session_id: &str) -> Result<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && session_id != "."
            && session_id != "..";

        if !valid {
            return Err(RecallError::InvalidPath(format!(
                "invalid session id '{}'",
                session_id
            )));
        }

        Ok(config.backups_dir.join(session_id))
    }

    /// Workspace-relative, `/`-separated form of `path`
    fn relativize(&self, path: &Path) -> Result<String> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.workspace_root).map_err(|_| {
                RecallError::InvalidPath(format!(
                    "{} is outside {}",
                    path.display(),
                    self.workspace_root.display()
                ))
            })?
        } else {
            path
        };

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| {
                        RecallError::InvalidPath(format!("{} is not UTF-8", path.display()))
                    })?;
                    parts.push(part);
                }
                Component::CurDir => {}
                _ => {
                    return Err(RecallError::InvalidPath(format!(
                        "{} escapes the workspace",
                        path.display()
                    )))
                }
            }
        }

        if parts.is_empty() {
            return Err(RecallError::InvalidPath(format!(
                "{} does not name a file",
                path.display()
            )));
        }

        Ok(parts.join("/"))
    }
}

fn copy_snapshot(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (StorageConfig, TempDir) {
        let temp = TempDir::new().unwrap();
        (StorageConfig::for_workspace(temp.path()), temp)
    }

    #[test]
    fn test_end_to_end_rollback() {
        let (config, temp) = setup();
        let root = temp.path();
        fs::write(root.join("a.txt"), "orig").unwrap();

        let mut session = BackupSession::create(&config, "session-1", "Automation setup").unwrap();
        assert_eq!(session.state(), ManifestState::Created);

        session.track_modification("a.txt").unwrap();
        fs::write(root.join("a.txt"), "new").unwrap();

        session.track_creation("b.txt").unwrap();
        fs::write(root.join("b.txt"), "# New Skill").unwrap();
        assert_eq!(session.state(), ManifestState::Tracking);

        let report = session.rollback().unwrap();

        assert!(report.success);
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "orig");
        assert!(!root.join("b.txt").exists());
        assert!(!session.manifest().can_rollback);
        assert_eq!(session.state(), ManifestState::RolledBack);
    }

    #[test]
    fn test_first_snapshot_wins() {
        let (config, temp) = setup();
        let root = temp.path();
        fs::write(root.join("a.txt"), "first").unwrap();

        let mut session = BackupSession::create(&config, "s", "test").unwrap();
        session.track_modification("a.txt").unwrap();
        fs::write(root.join("a.txt"), "second").unwrap();
        session.track_modification("a.txt").unwrap();
        fs::write(root.join("a.txt"), "third").unwrap();

        assert_eq!(session.manifest().backed_up_files, vec!["a.txt".to_string()]);

        session.rollback().unwrap();
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "first");
    }

    #[test]
    fn test_second_rollback_rejected() {
        let (config, temp) = setup();
        fs::write(temp.path().join("a.txt"), "orig").unwrap();

        let mut session = BackupSession::create(&config, "s", "test").unwrap();
        session.track_modification("a.txt").unwrap();
        session.rollback().unwrap();

        fs::write(temp.path().join("a.txt"), "changed after rollback").unwrap();
        let before = session.manifest().clone();

        assert!(matches!(
            session.rollback(),
            Err(RecallError::AlreadyRolledBack(_))
        ));
        assert_eq!(session.manifest(), &before);
        assert_eq!(
            fs::read_to_string(temp.path().join("a.txt")).unwrap(),
            "changed after rollback"
        );

        // Also rejected after reopening from disk
        let mut reopened = BackupSession::open(&config, "s").unwrap();
        assert!(matches!(
            reopened.rollback(),
            Err(RecallError::AlreadyRolledBack(_))
        ));
    }

    #[test]
    fn test_tracking_after_rollback_rejected() {
        let (config, _temp) = setup();
        let mut session = BackupSession::create(&config, "s", "test").unwrap();
        session.rollback().unwrap();

        assert!(matches!(
            session.track_creation("x.md"),
            Err(RecallError::AlreadyRolledBack(_))
        ));
        assert!(matches!(
            session.track_modification("x.md"),
            Err(RecallError::AlreadyRolledBack(_))
        ));
    }

    #[test]
    fn test_track_creation_idempotent() {
        let (config, _temp) = setup();
        let mut session = BackupSession::create(&config, "s", "test").unwrap();

        session.track_creation("skills/new.md").unwrap();
        session.track_creation("./skills/new.md").unwrap();

        assert_eq!(session.manifest().created_files, vec!["skills/new.md".to_string()]);
    }

    #[test]
    fn test_modification_of_missing_file_tracks_creation() {
        let (config, temp) = setup();
        let mut session = BackupSession::create(&config, "s", "test").unwrap();

        session.track_modification("fresh.md").unwrap();
        fs::write(temp.path().join("fresh.md"), "content").unwrap();

        assert_eq!(session.manifest().created_files, vec!["fresh.md".to_string()]);
        assert!(session.manifest().backed_up_files.is_empty());

        session.rollback().unwrap();
        assert!(!temp.path().join("fresh.md").exists());
    }

    #[test]
    fn test_snapshot_mirrors_relative_path() {
        let (config, temp) = setup();
        fs::create_dir_all(temp.path().join("docs/guides")).unwrap();
        fs::write(temp.path().join("docs/guides/intro.md"), "hello").unwrap();

        let mut session = BackupSession::create(&config, "s", "test").unwrap();
        session
            .track_modification(temp.path().join("docs/guides/intro.md"))
            .unwrap();

        let snapshot = session.snapshot_dir().join("docs/guides/intro.md");
        assert_eq!(fs::read_to_string(snapshot).unwrap(), "hello");
        assert_eq!(
            session.manifest().backed_up_files,
            vec!["docs/guides/intro.md".to_string()]
        );
    }

    #[test]
    fn test_paths_outside_workspace_rejected() {
        let (config, _temp) = setup();
        let mut session = BackupSession::create(&config, "s", "test").unwrap();

        assert!(matches!(
            session.track_creation("../elsewhere.txt"),
            Err(RecallError::InvalidPath(_))
        ));
        assert!(matches!(
            session.track_modification("/definitely/not/in/workspace.txt"),
            Err(RecallError::InvalidPath(_))
        ));
        assert!(matches!(
            session.track_creation("."),
            Err(RecallError::InvalidPath(_))
        ));
        assert_eq!(session.state(), ManifestState::Created);
    }

    #[test]
    fn test_reopen_persists_tracking() {
        let (config, temp) = setup();
        fs::write(temp.path().join("a.txt"), "orig").unwrap();

        {
            let mut session = BackupSession::create(&config, "s", "Adding hooks").unwrap();
            session.track_modification("a.txt").unwrap();
            session.track_creation("b.txt").unwrap();
        }
        fs::write(temp.path().join("a.txt"), "new").unwrap();
        fs::write(temp.path().join("b.txt"), "new").unwrap();

        let mut session = BackupSession::open(&config, "s").unwrap();
        let preview = session.preview();
        assert_eq!(preview.will_restore, vec!["a.txt".to_string()]);
        assert_eq!(preview.will_delete, vec!["b.txt".to_string()]);
        assert!(preview.can_rollback);
        assert_eq!(session.info().total_changes, 2);
        assert_eq!(session.info().description, "Adding hooks");

        let report = session.rollback().unwrap();
        assert!(report.success);
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "orig");

        let reloaded = BackupSession::open(&config, "s").unwrap();
        assert!(!reloaded.manifest().can_rollback);
        assert!(reloaded.manifest().rolled_back_at.is_some());
    }

    #[test]
    fn test_partial_failure_still_retires_manifest() {
        let (config, temp) = setup();
        fs::write(temp.path().join("a.txt"), "orig").unwrap();

        let mut session = BackupSession::create(&config, "s", "test").unwrap();
        session.track_modification("a.txt").unwrap();
        fs::remove_dir_all(session.snapshot_dir()).unwrap();

        let report = session.rollback().unwrap();
        assert!(!report.success);
        assert_eq!(report.errors, vec!["Backup not found: a.txt".to_string()]);

        let reloaded = BackupSession::open(&config, "s").unwrap();
        assert_eq!(reloaded.state(), ManifestState::RolledBack);
    }

    fn manifest_temp_path(session: &BackupSession) -> PathBuf {
        session
            .session_dir
            .join(format!(".{}.tmp.{}", MANIFEST_FILE, std::process::id()))
    }

    #[test]
    fn test_unwritable_manifest_blocks_rollback_before_touching_files() {
        let (config, temp) = setup();
        fs::write(temp.path().join("a.txt"), "orig").unwrap();

        let mut session = BackupSession::create(&config, "s", "test").unwrap();
        session.track_modification("a.txt").unwrap();
        fs::write(temp.path().join("a.txt"), "new").unwrap();

        // A directory where the atomic writer wants its temp file
        let blocker = manifest_temp_path(&session);
        fs::create_dir_all(&blocker).unwrap();

        assert!(matches!(
            session.rollback(),
            Err(RecallError::StorageWrite { .. })
        ));
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "new");
        assert!(session.manifest().can_rollback);

        fs::remove_dir_all(&blocker).unwrap();
        let report = session.rollback().unwrap();
        assert!(report.success);
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "orig");
    }

    #[test]
    fn test_manifest_consumed_on_disk_even_if_final_write_fails() {
        let (config, temp) = setup();
        fs::write(temp.path().join("a.txt"), "orig").unwrap();

        let mut session = BackupSession::create(&config, "s", "test").unwrap();
        session.track_modification("a.txt").unwrap();

        // Restoring this snapshot creates a directory at the manifest temp
        // path, so the write after the restore fails
        let blocker = manifest_temp_path(&session);
        let blocker_rel = blocker
            .join("x.txt")
            .strip_prefix(temp.path())
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        let snapshot = session.snapshot_dir().join(&blocker_rel);
        fs::create_dir_all(snapshot.parent().unwrap()).unwrap();
        fs::write(&snapshot, "x").unwrap();

        let mut manifest = session.manifest().clone();
        manifest.backed_up_files.push(blocker_rel);
        document::write_json(&session.session_dir.join(MANIFEST_FILE), &manifest).unwrap();

        let mut session = BackupSession::open(&config, "s").unwrap();
        fs::write(temp.path().join("a.txt"), "new").unwrap();

        let report = session.rollback().unwrap();
        assert!(report.success);
        assert!(blocker.is_dir());
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "orig");

        // The user edits again; a reopened session must not undo that
        fs::write(temp.path().join("a.txt"), "edited later").unwrap();
        let mut reopened = BackupSession::open(&config, "s").unwrap();
        assert!(!reopened.manifest().can_rollback);
        assert!(matches!(
            reopened.rollback(),
            Err(RecallError::AlreadyRolledBack(_))
        ));
        assert_eq!(
            fs::read_to_string(temp.path().join("a.txt")).unwrap(),
            "edited later"
        );
    }

    #[test]
    fn test_open_missing_and_corrupt() {
        let (config, _temp) = setup();
        assert!(matches!(
            BackupSession::open(&config, "nobody"),
            Err(RecallError::ManifestNotFound(_))
        ));

        let dir = config.backups_dir.join("broken");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), "{\"session_id\":").unwrap();
        assert!(matches!(
            BackupSession::open(&config, "broken"),
            Err(RecallError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_invalid_session_id() {
        let (config, _temp) = setup();
        assert!(matches!(
            BackupSession::create(&config, "../escape", "x"),
            Err(RecallError::InvalidPath(_))
        ));
        assert!(BackupSession::create(&config, "", "x").is_err());
    }
}
