//! Error types for the relsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and
//! [`ReconcileError`] unifies them for the reconciliation run. There is no
//! retry anywhere: every error that reaches [`ReconcileError`] is fatal to the
//! run.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Fatal error for a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A remote API call failed.
    #[error(transparent)]
    Remote(#[from] GitHubError),

    /// Required configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A local artifact could not be read.
    #[error("failed to read artifact '{path}': {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from GitHub REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The requested resource does not exist (HTTP 404).
    #[error("GitHub resource not found: {resource}")]
    NotFound { resource: String },

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Authentication token is missing or invalid.
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    /// An API or upload URL could not be turned into a request URL.
    #[error("invalid GitHub URL '{0}'")]
    InvalidUrl(String),

    /// JSON deserialization failure.
    #[error("GitHub response parse error: {0}")]
    ParseError(String),
}

impl GitHubError {
    /// `true` for the HTTP 404 condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GitHubError::NotFound {
            resource: "release tag 'nightly'".into(),
        };
        assert_eq!(
            err.to_string(),
            "GitHub resource not found: release tag 'nightly'"
        );
        assert!(err.is_not_found());

        let err = GitHubError::ApiError {
            status: 500,
            body: "boom".into(),
        };
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("HTTP 500"));

        let err = ConfigError::EnvVarMissing {
            var: "GH_TOKEN".into(),
            field: "github.token_env".into(),
        };
        assert!(err.to_string().contains("GH_TOKEN"));
    }

    #[test]
    fn test_reconcile_error_from_subsystem() {
        let err: ReconcileError = GitHubError::RateLimited {
            reset_at: "1700000000".into(),
        }
        .into();
        assert!(matches!(err, ReconcileError::Remote(_)));
        assert!(err.to_string().contains("rate limit"));

        let err: ReconcileError = ConfigError::FileNotFound("relsync.toml".into()).into();
        assert!(matches!(err, ReconcileError::Config(_)));
    }
}
