/// Configuration reuse recommender
///
/// Scans the index, scores every entry against a project query, and hands
/// back stored configurations worth reapplying.

use crate::error::{RecallError, Result};
use crate::intelligence::{ProjectQuery, SimilarityMatcher};
use crate::store::{ConfigurationRecord, ConfigurationStore, IndexEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Threshold used by `find_similar` callers that have no opinion
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.7;

/// Threshold a match must reach before `recommend` suggests it
pub const RECOMMENDATION_THRESHOLD: f64 = 0.75;

const TIME_SAVED: &str = "5-10 minutes (no need to regenerate)";

/// A stored configuration that scored above the threshold
#[derive(Debug, Clone, Serialize)]
pub struct SimilarConfiguration {
    pub entry: IndexEntry,
    pub score: f64,
    pub record: ConfigurationRecord,
}

/// Recommendation to reuse a stored configuration
#[derive(Debug, Clone, Serialize)]
pub struct ReuseRecommendation {
    pub config_id: String,
    pub similarity: f64,
    pub project_name: String,
    pub project_type: String,
    pub created_at: DateTime<Utc>,
    pub reuse_count: u32,
    pub agents: Vec<String>,
    pub skills: Vec<String>,
    pub time_saved: String,
    pub reason: String,
}

pub struct ReuseRecommender {
    store: Arc<ConfigurationStore>,
}

impl ReuseRecommender {
    /// Create a new recommender instance
    pub fn new(store: Arc<ConfigurationStore>) -> Self {
        Self { store }
    }

    /// Find stored configurations similar to `query`
    ///
    /// # Arguments
    /// * `query` - The project looking for a configuration
    /// * `min_similarity` - Entries scoring below this are dropped
    ///
    /// # Returns
    /// * `Ok(Vec<SimilarConfiguration>)` - Sorted by score, highest first;
    ///   equal scores keep index order
    /// * `Err(RecallError::IndexMismatch)` - An indexed record has no document
    /// * `Err(RecallError::InvalidQuery)` - `min_similarity` is NaN or infinite
    pub fn find_similar(
        &self,
        query: &ProjectQuery,
        min_similarity: f64,
    ) -> Result<Vec<SimilarConfiguration>> {
        // NaN compares false with everything and would let every entry through
        if !min_similarity.is_finite() {
            return Err(RecallError::InvalidQuery(format!(
                "min similarity must be a finite number, got {}",
                min_similarity
            )));
        }

        let entries = self.store.list_index()?;
        tracing::debug!(
            "Scoring {} stored configuration(s) against {:?}",
            entries.len(),
            query.project_type
        );

        let mut matches = Vec::new();
        for entry in entries {
            let score = SimilarityMatcher::score(query, &entry);
            if score < min_similarity {
                continue;
            }

            let record = self.store.load(&entry.id).map_err(|e| match e {
                RecallError::ConfigurationNotFound(id) => RecallError::IndexMismatch(id),
                other => other,
            })?;

            matches.push(SimilarConfiguration {
                entry,
                score,
                record,
            });
        }

        // sort_by is stable, so ties keep index order
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(matches)
    }

    /// Recommend the best stored configuration, if one is close enough
    pub fn recommend(&self, query: &ProjectQuery) -> Result<Option<ReuseRecommendation>> {
        let best = match self
            .find_similar(query, RECOMMENDATION_THRESHOLD)?
            .into_iter()
            .next()
        {
            Some(best) => best,
            None => return Ok(None),
        };

        let SimilarConfiguration {
            entry,
            score,
            record,
        } = best;

        Ok(Some(ReuseRecommendation {
            reason: format!(
                "This configuration was successful for a similar {} project",
                entry.project_type
            ),
            config_id: entry.id,
            similarity: score,
            project_name: entry.project_name,
            project_type: entry.project_type,
            created_at: entry.created_at,
            reuse_count: entry.reuse_count,
            agents: record.config.agents_used,
            skills: record.config.skills_generated,
            time_saved: TIME_SAVED.to_string(),
        }))
    }

    /// Fetch a configuration for reapplication and count the reuse
    ///
    /// # Returns
    /// * `Ok(ConfigurationRecord)` - The record with its updated `reuse_count`
    pub fn reuse(&self, id: &str) -> Result<ConfigurationRecord> {
        let record = self.store.increment_reuse(id)?;
        tracing::info!(
            "Reusing configuration {} (now used {} times)",
            id,
            record.reuse_count
        );
        Ok(record)
    }
}
