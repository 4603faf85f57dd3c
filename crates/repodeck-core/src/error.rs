use thiserror::Error;

/// All the ways things can go wrong in repodeck
///
/// thiserror generates the Display and Error boilerplate; the variants map
/// onto the layers a failure can come from.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Quality gate lookup failed: {0}")]
    QualityError(String),

    #[error("Git probe failed: {0}")]
    GitError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
