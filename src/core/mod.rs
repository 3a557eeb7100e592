/// Core functionality modules
///
/// Contains the main business logic for configuration reuse
/// and workspace detection.

pub mod project_detector;
pub mod recommender;

pub use project_detector::ProjectDetector;
pub use recommender::{
    ReuseRecommendation, ReuseRecommender, SimilarConfiguration, DEFAULT_MIN_SIMILARITY,
    RECOMMENDATION_THRESHOLD,
};
