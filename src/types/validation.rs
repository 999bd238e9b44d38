// ABOUTME: Validation errors for user-supplied deployment input.
// ABOUTME: Raised before any pipeline stage runs, so nothing is persisted.

use thiserror::Error;

/// Rejected deployment input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("repository url cannot be empty")]
    EmptyRepoUrl,

    #[error("invalid repository url '{url}': {reason}")]
    InvalidRepoUrl { url: String, reason: String },

    #[error("unsupported repository url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("local repository urls are disabled: {0}")]
    LocalRepoNotAllowed(String),

    #[error("branch name cannot be empty")]
    EmptyBranch,

    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranch { name: String, reason: &'static str },

    #[error("environment variable name cannot be empty")]
    EmptyEnvKey,

    #[error("invalid environment variable name '{0}'")]
    InvalidEnvKey(String),

    #[error("{0} must be a single line")]
    MultilineCommand(&'static str),
}
