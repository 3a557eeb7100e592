/// Storage module for automation-recall
///
/// Handles persistence of configuration records as JSON documents.
/// All writes use write-to-temp-then-rename.

pub mod configurations;
pub mod document;
pub mod models;

pub use configurations::ConfigurationStore;
pub use models::*;
