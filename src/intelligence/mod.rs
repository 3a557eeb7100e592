/// Intelligence module
///
/// Handles similarity scoring between projects and stored configurations.

pub mod scorer;

pub use scorer::{ProjectProfile, ProjectQuery, SimilarityMatcher};
