//! Configuration for relsync.
//!
//! Loaded from a TOML file, then `*_env` fields are resolved from the process
//! environment. The resulting [`Config`] is immutable for the rest of the run;
//! the reconciler never reads environment variables itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Complete relsync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// GitHub repository and API settings.
    pub github: GitHubConfig,

    /// The release to reconcile.
    pub release: ReleaseConfig,

    /// Local artifacts to attach.
    pub assets: AssetsConfig,

    /// CI gating.
    #[serde(default)]
    pub ci: CiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// GitHub repository and API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API base URL (default `https://api.github.com`).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Repository in `owner/repo` format.
    pub repo: String,

    /// Environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}

fn default_token_env() -> String {
    "GH_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

/// What to do when a release already exists for the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingReleasePolicy {
    /// Delete the release and create it again, keeping its name and body.
    #[default]
    Replace,
    /// Keep the release and replace its assets one by one.
    Reuse,
}

impl std::fmt::Display for ExistingReleasePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Reuse => write!(f, "reuse"),
        }
    }
}

/// The release being reconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Tag identifying the release.
    pub tag: String,

    /// Branch name or commit SHA the tag is created from.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Display name for a newly created release.
    #[serde(default = "default_release_text")]
    pub name: String,

    /// Body text for a newly created release.
    #[serde(default = "default_release_text")]
    pub body: String,

    #[serde(default)]
    pub on_existing: ExistingReleasePolicy,
}

fn default_branch() -> String {
    "master".into()
}

fn default_release_text() -> String {
    "nightly builds".into()
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Local artifacts to attach to the release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory patterns are resolved against.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Explicit relative paths or glob patterns, in upload order.
    pub patterns: Vec<String>,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

// ---------------------------------------------------------------------------
// CI
// ---------------------------------------------------------------------------

/// Which CI environment variables gate publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiConfig {
    /// When false, publishing is never gated.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Variable holding the pull-request number, or `false` outside PR builds.
    #[serde(default = "default_pull_request_env")]
    pub pull_request_env: String,

    /// Variable holding the branch being built.
    #[serde(default = "default_branch_env")]
    pub branch_env: String,

    /// Branch whose builds publish. Unset means `release.branch`, unless
    /// that is a commit SHA, in which case the branch is not checked.
    #[serde(default)]
    pub branch: Option<String>,

    /// Variable holding the `owner/repo` slug being built.
    #[serde(default = "default_repo_slug_env")]
    pub repo_slug_env: String,

    /// Resolved values (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub context: CiContext,
}

/// CI values as read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    pub pull_request: Option<String>,
    pub branch: Option<String>,
    pub repo_slug: Option<String>,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pull_request_env: default_pull_request_env(),
            branch_env: default_branch_env(),
            branch: None,
            repo_slug_env: default_repo_slug_env(),
            context: CiContext::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_pull_request_env() -> String {
    "TRAVIS_PULL_REQUEST".into()
}

fn default_branch_env() -> String {
    "TRAVIS_BRANCH".into()
}

fn default_repo_slug_env() -> String {
    "TRAVIS_REPO_SLUG".into()
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl Config {
    /// Load a [`Config`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the token and CI context from the environment variables the
    /// config names. Missing variables are not an error here; the token is
    /// enforced by [`Config::require_token`].
    pub fn resolve_env_vars(&mut self) {
        self.resolve_with(|name| std::env::var(name).ok());
    }

    /// Resolve `*_env` fields through `lookup` instead of the process
    /// environment.
    pub fn resolve_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("resolving environment variable references");

        self.github.token = resolve_optional(&lookup, &self.github.token_env, "github.token_env");
        self.ci.context = CiContext {
            pull_request: resolve_optional(&lookup, &self.ci.pull_request_env, "ci.pull_request_env"),
            branch: resolve_optional(&lookup, &self.ci.branch_env, "ci.branch_env"),
            repo_slug: resolve_optional(&lookup, &self.ci.repo_slug_env, "ci.repo_slug_env"),
        };

        debug!("environment variable resolution complete");
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.api_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.api_url".into(),
                detail: "API URL must not be empty".into(),
            });
        }
        if self.github.repo.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.repo".into(),
                detail: "GitHub repo must not be empty".into(),
            });
        }
        match self.github.repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "github.repo".into(),
                    detail: "GitHub repo must be in 'owner/repo' format".into(),
                });
            }
        }
        if self.release.tag.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "release.tag".into(),
                detail: "release tag must not be empty".into(),
            });
        }
        if self.release.branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "release.branch".into(),
                detail: "target branch or commit must not be empty".into(),
            });
        }
        if matches!(self.ci.branch.as_deref(), Some(b) if b.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "ci.branch".into(),
                detail: "CI branch must not be empty when set".into(),
            });
        }
        if self.assets.patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "assets.patterns".into(),
                detail: "at least one file name or glob pattern is required".into(),
            });
        }
        Ok(())
    }

    /// The resolved API token, or the error naming the variable to set.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.github
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: self.github.token_env.clone(),
                field: "github.token_env".into(),
            })
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# relsync configuration

[github]
api_url = "https://api.github.com"
repo = "owner/repo"
token_env = "GH_TOKEN"

[release]
tag = "nightly"
branch = "master"
name = "nightly builds"
body = "nightly builds"
# "replace" deletes and recreates the release; "reuse" keeps it and swaps assets.
on_existing = "replace"

[assets]
base_dir = "."
patterns = ["dist/*.tar.gz", "dist/*.zip"]

[ci]
enabled = true
pull_request_env = "TRAVIS_PULL_REQUEST"
branch_env = "TRAVIS_BRANCH"
repo_slug_env = "TRAVIS_REPO_SLUG"
# Branch whose builds publish; defaults to release.branch. Set this when
# release.branch is a commit SHA.
# branch = "master"

[logging]
level = "info"
"#
    }
}

fn resolve_optional<F>(lookup: &F, env_name: &str, field: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(env_name) {
        Some(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Some(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        None => {
            debug!(field, env_name, "env var not set");
            None
        }
    }
}
