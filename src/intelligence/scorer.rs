/// Similarity scoring between a project query and stored configurations
///
/// Score = 0.4 for an exact project-type match + 0.4 * Jaccard(tech stacks).
/// The 0.2 size weight is reserved and never awarded, so the best possible
/// score is 0.8.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const PROJECT_TYPE_WEIGHT: f64 = 0.4;
pub const TECH_STACK_WEIGHT: f64 = 0.4;
/// Reserved for project size. Not scored yet.
pub const SIZE_WEIGHT: f64 = 0.2;

/// Anything that can be compared against a query
pub trait ProjectProfile {
    fn project_type(&self) -> Option<&str>;
    fn tech_stack(&self) -> &BTreeSet<String>;
}

/// Description of the project looking for a reusable configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectQuery {
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub tech_stack: BTreeSet<String>,
    /// Tools already present in the project. Carried along, not scored.
    #[serde(default)]
    pub existing_tools: Vec<String>,
}

impl ProjectQuery {
    pub fn new<S: Into<String>>(project_type: S) -> Self {
        Self {
            project_type: Some(project_type.into()),
            ..Default::default()
        }
    }

    pub fn with_tech<I, S>(mut self, tech: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tech_stack.extend(tech.into_iter().map(Into::into));
        self
    }
}

impl ProjectProfile for ProjectQuery {
    fn project_type(&self) -> Option<&str> {
        self.project_type.as_deref()
    }

    fn tech_stack(&self) -> &BTreeSet<String> {
        &self.tech_stack
    }
}

/// Pure scoring functions, no state
pub struct SimilarityMatcher;

impl SimilarityMatcher {
    /// Score a candidate against a query
    ///
    /// # Returns
    /// * Score between 0.0 and 0.8 (clamped into 0.0..=1.0)
    pub fn score<Q, C>(query: &Q, candidate: &C) -> f64
    where
        Q: ProjectProfile + ?Sized,
        C: ProjectProfile + ?Sized,
    {
        let mut score: f64 = 0.0;

        if let (Some(wanted), Some(have)) = (query.project_type(), candidate.project_type()) {
            if wanted == have {
                score += PROJECT_TYPE_WEIGHT;
            }
        }

        let (wanted, have) = (query.tech_stack(), candidate.tech_stack());
        if !wanted.is_empty() && !have.is_empty() {
            score += TECH_STACK_WEIGHT * Self::jaccard(wanted, have);
        }

        score.clamp(0.0, 1.0)
    }

    /// |A ∩ B| / |A ∪ B|, 0.0 when both are empty
    pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
        let union = a.union(b).count();
        if union == 0 {
            return 0.0;
        }

        a.intersection(b).count() as f64 / union as f64
    }
}
