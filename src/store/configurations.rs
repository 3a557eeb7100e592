/// Configuration store
///
/// One JSON document per configuration plus an `index.json` that mirrors a
/// projection of every record. Both are written through the atomic writer in
/// `store::document`. The store assumes a single writer per directory.

use crate::config::StorageConfig;
use crate::error::{RecallError, Result};
use crate::store::document;
use crate::store::models::*;
use chrono::Utc;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// The index shares the directory with records, so its stem is not an id
const INDEX_NAME: &str = "index";
const INDEX_FILE: &str = "index.json";

// Ids become file names, so keep them boring
const ID_PATTERN: &str = r"^[A-Za-z0-9_-]+$";

/// How many entries `statistics` reports as most reused
const MOST_REUSED_LIMIT: usize = 3;

pub struct ConfigurationStore {
    dir: PathBuf,
    index_path: PathBuf,
    id_pattern: Regex,
}

impl ConfigurationStore {
    /// Open (and create if needed) the store described by `config`
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let dir = config.configurations_dir.clone();
        std::fs::create_dir_all(&dir).map_err(|source| RecallError::StorageWrite {
            path: dir.clone(),
            source,
        })?;

        let id_pattern = Regex::new(ID_PATTERN)
            .map_err(|e| RecallError::Config(format!("invalid id pattern: {}", e)))?;

        Ok(Self {
            index_path: dir.join(INDEX_FILE),
            dir,
            id_pattern,
        })
    }

    /// Directory holding the documents
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Save a new configuration
    ///
    /// # Returns
    /// * `Ok(String)` - The id assigned to the configuration
    /// * `Err(RecallError::InvalidConfiguration)` - If the payload fails validation
    /// * `Err(RecallError::StorageWrite)` - If either document cannot be written
    pub fn save(&self, input: ConfigurationInput) -> Result<String> {
        input.validate()?;

        let mut index = self.read_index()?;
        let id = self.generate_id(&index);

        let record = ConfigurationRecord {
            id: id.clone(),
            config: input,
            created_at: Utc::now(),
            reuse_count: 0,
        };

        document::write_json(&self.record_path(&id), &record)?;

        index.configurations.push(record.index_entry());
        if let Err(e) = document::write_json(&self.index_path, &index) {
            // The record isn't reachable without its index entry
            let _ = std::fs::remove_file(self.record_path(&id));
            return Err(e);
        }

        tracing::info!(
            "Saved configuration {} ({} / {})",
            id,
            record.config.project_type,
            record.config.project_name
        );

        Ok(id)
    }

    /// Load a full configuration record
    ///
    /// # Returns
    /// * `Err(RecallError::ConfigurationNotFound)` - No document for this id
    /// * `Err(RecallError::CorruptRecord)` - The document exists but is unreadable
    pub fn load(&self, id: &str) -> Result<ConfigurationRecord> {
        if !self.is_valid_id(id) {
            return Err(RecallError::ConfigurationNotFound(id.to_string()));
        }

        document::read_json(&self.record_path(id))?
            .ok_or_else(|| RecallError::ConfigurationNotFound(id.to_string()))
    }

    /// Increment `reuse_count` on the record and its index entry
    ///
    /// Every call counts. The index entry is set from the record's new count,
    /// and if the index cannot be written the record is put back as it was.
    ///
    /// # Returns
    /// * `Ok(ConfigurationRecord)` - The record after the increment
    pub fn increment_reuse(&self, id: &str) -> Result<ConfigurationRecord> {
        let previous = self.load(id)?;
        let mut index = self.read_index()?;

        let mut updated = previous.clone();
        updated.reuse_count = previous.reuse_count.saturating_add(1);

        let entry = index
            .find_mut(id)
            .ok_or_else(|| RecallError::IndexMismatch(id.to_string()))?;
        entry.reuse_count = updated.reuse_count;

        let record_path = self.record_path(id);
        document::write_json(&record_path, &updated)?;

        if let Err(e) = document::write_json(&self.index_path, &index) {
            if let Err(restore) = document::write_json(&record_path, &previous) {
                tracing::error!(
                    "Could not restore {} after failed index write: {}",
                    id,
                    restore
                );
            }
            return Err(e);
        }

        tracing::debug!("Configuration {} reuse_count -> {}", id, updated.reuse_count);

        Ok(updated)
    }

    /// All index entries in insertion order
    pub fn list_index(&self) -> Result<Vec<IndexEntry>> {
        Ok(self.read_index()?.configurations)
    }

    /// Reuse statistics over the whole index
    pub fn statistics(&self) -> Result<ReuseStatistics> {
        let entries = self.list_index()?;

        let total_configurations = entries.len();
        let total_reuses: u64 = entries.iter().map(|e| u64::from(e.reuse_count)).sum();
        let average_reuses = if total_configurations == 0 {
            0.0
        } else {
            (total_reuses as f64 / total_configurations as f64 * 10.0).round() / 10.0
        };

        let mut project_types = BTreeMap::new();
        for entry in &entries {
            *project_types.entry(entry.project_type.clone()).or_insert(0) += 1;
        }

        // Stable sort: ties stay in insertion order
        let mut most_reused = entries;
        most_reused.sort_by(|a, b| b.reuse_count.cmp(&a.reuse_count));
        most_reused.truncate(MOST_REUSED_LIMIT);

        Ok(ReuseStatistics {
            total_configurations,
            total_reuses,
            average_reuses,
            project_types,
            most_reused,
        })
    }

    /// Read the index document. Absent means empty; corrupt is an error.
    fn read_index(&self) -> Result<ConfigurationIndex> {
        Ok(document::read_json(&self.index_path)?.unwrap_or_default())
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn is_valid_id(&self, id: &str) -> bool {
        self.id_pattern.is_match(id) && !id.eq_ignore_ascii_case(INDEX_NAME)
    }

    /// Timestamp plus random suffix, retried until no document or index entry uses it
    fn generate_id(&self, index: &ConfigurationIndex) -> String {
        loop {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            let id = format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8]);

            let taken = self.record_path(&id).exists()
                || index.configurations.iter().any(|entry| entry.id == id);
            if !taken {
                return id;
            }
        }
    }
}
