//! CI gating: decide whether this build is allowed to publish.
//!
//! Only pushes to the configured branch of the configured repository publish.
//! Pull-request builds and forks are skipped, since they must never touch the
//! release.

use tracing::info;

use crate::config::Config;

/// Outcome of the CI gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Publish,
    Skip(SkipReason),
}

/// Why a build was not allowed to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    PullRequest(String),
    Branch { expected: String, actual: String },
    Repository { expected: String, actual: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PullRequest(pr) => write!(f, "pull request build ({pr})"),
            Self::Branch { expected, actual } => {
                write!(f, "branch '{actual}' is not the release branch '{expected}'")
            }
            Self::Repository { expected, actual } => {
                write!(f, "repository '{actual}' is not '{expected}'")
            }
        }
    }
}

/// Evaluate the resolved CI context against the config.
///
/// Values the CI did not set are not checked, so local runs publish.
pub fn gate(config: &Config) -> GateDecision {
    if !config.ci.enabled {
        return GateDecision::Publish;
    }
    let ctx = &config.ci.context;

    if let Some(pr) = ctx.pull_request.as_deref() {
        if is_pull_request(pr) {
            return skip(SkipReason::PullRequest(pr.to_string()));
        }
    }
    if let (Some(branch), Some(expected)) = (ctx.branch.as_deref(), publish_branch(config)) {
        if branch != expected {
            return skip(SkipReason::Branch {
                expected: expected.to_string(),
                actual: branch.to_string(),
            });
        }
    }
    if let Some(slug) = ctx.repo_slug.as_deref() {
        if !slug.eq_ignore_ascii_case(&config.github.repo) {
            return skip(SkipReason::Repository {
                expected: config.github.repo.clone(),
                actual: slug.to_string(),
            });
        }
    }
    GateDecision::Publish
}

/// `ci.branch`, else `release.branch` when it names a branch. A commit SHA
/// target leaves nothing to compare the built branch against.
fn publish_branch(config: &Config) -> Option<&str> {
    match config.ci.branch.as_deref() {
        Some(branch) => Some(branch),
        None if looks_like_commit(&config.release.branch) => None,
        None => Some(config.release.branch.as_str()),
    }
}

fn looks_like_commit(target: &str) -> bool {
    (7..=40).contains(&target.len()) && target.bytes().all(|b| b.is_ascii_hexdigit())
}

fn skip(reason: SkipReason) -> GateDecision {
    info!(%reason, "CI gate: not publishing");
    GateDecision::Skip(reason)
}

/// Travis sets `false` outside PR builds; other CIs leave it empty or `0`.
fn is_pull_request(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "false" | "0")
}
