//! Release and asset reconciliation.
//!
//! One run is a strictly linear chain of remote calls:
//!
//! ```text
//! locate ─┬─ NotFound ──────────────► create ─┐
//!         ├─ Found ─ replace: delete ► create ─┼─► synchronize assets
//!         ├─ Found ─ reuse: list assets ───────┘
//!         └─ Error ─► abort
//! ```
//!
//! Each call is awaited before the next one is issued and the first failure
//! aborts the run. Nothing is retried and nothing is rolled back.

mod assets;
mod release;

use tracing::info;

use crate::config::{Config, ExistingReleasePolicy};
use crate::errors::ReconcileError;
use crate::github::ReleaseApi;
use crate::models::{LocalArtifact, ReconcileStats, ReconciliationState, ReleaseAction};

pub use assets::SyncOutcome;
pub use release::LocateResult;

/// Page size used when listing the assets of an existing release.
pub const ASSET_PAGE_SIZE: u32 = 100;

/// The release a run converges to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    /// Repository in `owner/repo` format.
    pub repo: String,
    pub tag: String,
    /// Branch name or commit SHA for `target_commitish`.
    pub target: String,
    /// Name and body used when no previous release supplies them.
    pub name: String,
    pub body: String,
    pub on_existing: ExistingReleasePolicy,
}

impl From<&Config> for ReleaseTarget {
    fn from(config: &Config) -> Self {
        Self {
            repo: config.github.repo.clone(),
            tag: config.release.tag.clone(),
            target: config.release.branch.clone(),
            name: config.release.name.clone(),
            body: config.release.body.clone(),
            on_existing: config.release.on_existing,
        }
    }
}

/// Drives one reconciliation run against a [`ReleaseApi`].
pub struct Reconciler<A> {
    api: A,
    target: ReleaseTarget,
}

impl<A: ReleaseApi> Reconciler<A> {
    pub fn new(api: A, target: ReleaseTarget) -> Self {
        Self { api, target }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Make the remote release and its assets match `artifacts`.
    ///
    /// An empty artifact list is a no-op: no remote call is made at all.
    pub async fn run(&self, artifacts: &[LocalArtifact]) -> Result<ReconcileStats, ReconcileError> {
        let mut stats = ReconcileStats::begin();

        if artifacts.is_empty() {
            info!(tag = %self.target.tag, "no artifacts to publish, nothing to do");
            return Ok(stats.finish());
        }

        info!(
            repo = %self.target.repo,
            tag = %self.target.tag,
            artifacts = artifacts.len(),
            policy = %self.target.on_existing,
            "reconciling release"
        );

        let (state, action) = match self.locate().await {
            LocateResult::NotFound => {
                let release = self
                    .create(&self.target.name, &self.target.body)
                    .await?;
                (ReconciliationState::fresh(release), ReleaseAction::Created)
            }
            LocateResult::Found(existing) => match self.target.on_existing {
                ExistingReleasePolicy::Replace => {
                    let release = self.replace(existing).await?;
                    (ReconciliationState::fresh(release), ReleaseAction::Replaced)
                }
                ExistingReleasePolicy::Reuse => (self.reuse(existing).await?, ReleaseAction::Reused),
            },
            LocateResult::Error(e) => return Err(e.into()),
        };

        stats.release_action = action;
        stats.release_id = Some(state.release.id);

        let outcome = self.synchronize(state, artifacts).await?;
        stats.uploaded = outcome.uploaded;
        stats.replaced_assets = outcome.replaced;
        stats.pruned_assets = outcome.pruned;

        let stats = stats.finish();
        info!(
            release_id = ?stats.release_id,
            action = %stats.release_action,
            uploaded = stats.uploaded,
            replaced = stats.replaced_assets,
            pruned = stats.pruned_assets,
            "release reconciled"
        );
        Ok(stats)
    }
}
