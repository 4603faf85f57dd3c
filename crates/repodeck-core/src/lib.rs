// Core logic: models, configuration, filtering, and the fetch pipeline
// that turns two remote services plus the local filesystem into one
// consistent repository collection.
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod providers;

pub use config::Config;
pub use error::Error;
pub use fetch::{FetchCoordinator, FetchProgress, FetchReport, QualitySource, RepoSource};
pub use filter::FilterRules;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
