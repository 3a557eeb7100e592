/// Backup and rollback
///
/// Snapshots files before an automation run touches them and can undo the
/// run exactly once.

pub mod manifest;
pub mod rollback;
pub mod session;

pub use manifest::{BackupInfo, BackupManifest, ManifestState, RollbackPreview};
pub use rollback::{RollbackEngine, RollbackReport};
pub use session::BackupSession;
