//! Error types for slugline.

use miette::Diagnostic;

/// Main error type for slugline operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SluglineError {
    /// IO error
    #[error(transparent)]
    #[diagnostic(code(slugline::io))]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error(transparent)]
    #[diagnostic(code(slugline::json))]
    Json(#[from] serde_json::Error),

    /// Configuration was readable but unusable
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(slugline::config), help("check the configuration file against the documented fields"))]
    Config(String),

    /// Metadata cache was used before it could be initialized
    #[error("metadata store unavailable: {0}")]
    #[diagnostic(code(slugline::metadata))]
    Metadata(String),
}

pub type Result<T, E = SluglineError> = std::result::Result<T, E>;
