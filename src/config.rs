/// Storage configuration
///
/// Every component takes a `StorageConfig` in its constructor. Nothing here is
/// global: two configs pointing at different roots never see each other's data.

use crate::error::{RecallError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory (relative to the workspace root) holding all automation state
pub const STATE_DIR: &str = ".claude/meta-automation";

/// Optional override file inside `STATE_DIR`
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Tracked paths are resolved against this directory
    pub workspace_root: PathBuf,
    /// Index document plus one JSON document per configuration
    pub configurations_dir: PathBuf,
    /// One subdirectory per backup session
    pub backups_dir: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    storage: StorageSection,
}

#[derive(Debug, Deserialize, Default)]
struct StorageSection {
    configurations_dir: Option<PathBuf>,
    backups_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Default layout under `<root>/.claude/meta-automation`
    pub fn for_workspace<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let state = root.join(STATE_DIR);

        Self {
            configurations_dir: state.join("configurations"),
            backups_dir: state.join("backups"),
            workspace_root: root,
        }
    }

    /// Defaults plus overrides from `<root>/.claude/meta-automation/config.toml`
    ///
    /// A missing file means defaults. A file that exists but cannot be read or
    /// parsed is an error.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let mut config = Self::for_workspace(root);
        let path = config.workspace_root.join(STATE_DIR).join(CONFIG_FILE);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(config),
            Err(e) => {
                return Err(RecallError::Config(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| RecallError::Config(format!("{}: {}", path.display(), e)))?;

        if let Some(dir) = file.storage.configurations_dir {
            config.configurations_dir = config.resolve(dir);
        }
        if let Some(dir) = file.storage.backups_dir {
            config.backups_dir = config.resolve(dir);
        }

        tracing::debug!(
            "Loaded storage config from {}: configurations={}, backups={}",
            path.display(),
            config.configurations_dir.display(),
            config.backups_dir.display()
        );

        Ok(config)
    }

    /// Per-user layout under the home directory, for use outside a project
    pub fn user_default() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| RecallError::Config("could not find home directory".to_string()))?;
        let state = home.join(".meta-automation");

        Ok(Self {
            configurations_dir: state.join("configurations"),
            backups_dir: state.join("backups"),
            workspace_root: home,
        })
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.workspace_root.join(path)
        }
    }
}
