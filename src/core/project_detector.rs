/// Workspace root detection
///
/// Finds the directory automation state belongs to: the nearest ancestor that
/// already has a `.claude/meta-automation` directory, otherwise the nearest one
/// with a common project marker (.git, Cargo.toml, package.json, ...).

use crate::config::STATE_DIR;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Project root detection markers
const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "Cargo.toml",
    "package.json",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "pyproject.toml",
    "requirements.txt",
    "Gemfile",
    "composer.json",
];

pub struct ProjectDetector;

impl ProjectDetector {
    /// Detect the workspace root from a given path
    ///
    /// Falls back to `start_path` itself when nothing is found.
    ///
    /// # Examples
    /// ```no_run
    /// use automation_recall_lib::core::ProjectDetector;
    /// use std::env;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let root = ProjectDetector::detect(env::current_dir()?)?;
    /// println!("Workspace root: {}", root.display());
    /// # Ok(())
    /// # }
    /// ```
    pub fn detect<P: AsRef<Path>>(start_path: P) -> Result<PathBuf> {
        let absolute_path = Self::absolute(start_path.as_ref())?;
        Ok(Self::find_within(&absolute_path, None).unwrap_or(absolute_path))
    }

    /// Like [`detect`](Self::detect), but `None` when no ancestor has
    /// automation state or a project marker
    pub fn find<P: AsRef<Path>>(start_path: P) -> Result<Option<PathBuf>> {
        let absolute_path = Self::absolute(start_path.as_ref())?;
        Ok(Self::find_within(&absolute_path, None))
    }

    fn absolute(start_path: &Path) -> Result<PathBuf> {
        if start_path.is_absolute() {
            Ok(start_path.to_path_buf())
        } else {
            Ok(std::env::current_dir()?.join(start_path))
        }
    }

    /// Search from `start` up to and including `ceiling`
    fn find_within(start: &Path, ceiling: Option<&Path>) -> Option<PathBuf> {
        // Existing automation state wins over plain project markers
        Self::find_upwards(start, ceiling, |dir| dir.join(STATE_DIR).is_dir())
            .or_else(|| Self::find_upwards(start, ceiling, |dir| !Self::get_markers(dir).is_empty()))
    }

    /// Use the directory name as the project name
    pub fn get_project_name<P: AsRef<Path>>(project_root: P) -> Option<String> {
        project_root
            .as_ref()
            .file_name()
            .and_then(|name| name.to_str())
            .map(|s| s.to_string())
    }

    /// All project markers present directly in `path`
    pub fn get_markers<P: AsRef<Path>>(path: P) -> Vec<String> {
        let path = path.as_ref();

        PROJECT_MARKERS
            .iter()
            .filter(|marker| path.join(marker).exists())
            .map(|marker| marker.to_string())
            .collect()
    }

    fn find_upwards<F: Fn(&Path) -> bool>(
        start: &Path,
        ceiling: Option<&Path>,
        found: F,
    ) -> Option<PathBuf> {
        for dir in start.ancestors() {
            if found(dir) {
                return Some(dir.to_path_buf());
            }
            if Some(dir) == ceiling {
                break;
            }
        }
        None
    }
}
