/// Data models for stored configurations
///
/// Full records live in one JSON document each; the index keeps a compact
/// projection of every record in insertion order.

use crate::error::{RecallError, Result};
use crate::intelligence::ProjectProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Input for saving a new configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationInput {
    pub project_type: String,
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default)]
    pub tech_stack: BTreeSet<String>,
    #[serde(default)]
    pub agents_used: Vec<String>,
    #[serde(default)]
    pub skills_generated: Vec<String>,
    #[serde(default)]
    pub commands_generated: Vec<String>,
    #[serde(default)]
    pub hooks_generated: Vec<String>,
    #[serde(default)]
    pub success_metrics: BTreeMap<String, f64>,
    pub user_satisfaction: u8,
}

fn default_project_name() -> String {
    "unknown".to_string()
}

impl ConfigurationInput {
    /// Check the fields a record must satisfy before it is stored
    pub fn validate(&self) -> Result<()> {
        if self.project_type.trim().is_empty() {
            return Err(RecallError::InvalidConfiguration(
                "project_type must not be empty".to_string(),
            ));
        }

        if !(1..=5).contains(&self.user_satisfaction) {
            return Err(RecallError::InvalidConfiguration(format!(
                "user_satisfaction must be between 1 and 5, got {}",
                self.user_satisfaction
            )));
        }

        Ok(())
    }
}

/// A saved configuration
///
/// Everything except `reuse_count` is fixed at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    pub id: String,
    #[serde(flatten)]
    pub config: ConfigurationInput,
    pub created_at: DateTime<Utc>,
    pub reuse_count: u32,
}

impl ConfigurationRecord {
    /// Projection kept in the index
    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry {
            id: self.id.clone(),
            project_type: self.config.project_type.clone(),
            project_name: self.config.project_name.clone(),
            tech_stack: self.config.tech_stack.clone(),
            created_at: self.created_at,
            reuse_count: self.reuse_count,
        }
    }
}

/// Compact index entry for listing and similarity scans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub project_type: String,
    pub project_name: String,
    pub tech_stack: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub reuse_count: u32,
}

/// The index document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationIndex {
    pub configurations: Vec<IndexEntry>,
}

impl ConfigurationIndex {
    pub fn find_mut(&mut self, id: &str) -> Option<&mut IndexEntry> {
        self.configurations.iter_mut().find(|entry| entry.id == id)
    }
}

impl ProjectProfile for ConfigurationRecord {
    fn project_type(&self) -> Option<&str> {
        Some(&self.config.project_type)
    }

    fn tech_stack(&self) -> &BTreeSet<String> {
        &self.config.tech_stack
    }
}

impl ProjectProfile for IndexEntry {
    fn project_type(&self) -> Option<&str> {
        Some(&self.project_type)
    }

    fn tech_stack(&self) -> &BTreeSet<String> {
        &self.tech_stack
    }
}

/// Aggregate reuse statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReuseStatistics {
    pub total_configurations: usize,
    pub total_reuses: u64,
    pub average_reuses: f64,
    pub project_types: BTreeMap<String, usize>,
    pub most_reused: Vec<IndexEntry>,
}
