//! Release lifecycle: locate, replace, create, reuse.

use tracing::{debug, error, info, warn};

use super::{Reconciler, ASSET_PAGE_SIZE};
use crate::errors::{GitHubError, ReconcileError};
use crate::github::ReleaseApi;
use crate::models::{NewRelease, ReconciliationState, Release};

/// Outcome of looking up the release for the configured tag.
#[derive(Debug)]
pub enum LocateResult {
    Found(Release),
    NotFound,
    /// Any failure other than not-found. Fatal to the run.
    Error(GitHubError),
}

impl<A: ReleaseApi> Reconciler<A> {
    /// Look up the release for the tag. Only HTTP 404 counts as not found.
    pub async fn locate(&self) -> LocateResult {
        let tag = &self.target.tag;
        info!(tag = %tag, "looking up release");
        match self.api.get_release_by_tag(&self.target.repo, tag).await {
            Ok(release) => {
                info!(release_id = release.id, tag = %tag, "release exists");
                LocateResult::Found(release)
            }
            Err(e) if e.is_not_found() => {
                info!(tag = %tag, "no release for tag");
                LocateResult::NotFound
            }
            Err(e) => {
                error!(tag = %tag, error = %e, "release lookup failed");
                LocateResult::Error(e)
            }
        }
    }

    /// Delete `existing` and create it again with its name and body.
    ///
    /// If the delete fails nothing is created, so the tag never ends up with
    /// two releases.
    pub async fn replace(&self, existing: Release) -> Result<Release, ReconcileError> {
        info!(release_id = existing.id, "replacing existing release");
        self.api
            .delete_release(&self.target.repo, existing.id)
            .await?;

        let name = non_empty(existing.name).unwrap_or_else(|| self.target.name.clone());
        let body = non_empty(existing.body).unwrap_or_else(|| self.target.body.clone());
        self.create(&name, &body).await
    }

    /// Create a published prerelease for the tag on the configured target.
    pub async fn create(&self, name: &str, body: &str) -> Result<Release, ReconcileError> {
        info!(tag = %self.target.tag, target = %self.target.target, "creating release");
        let payload = NewRelease::prerelease(
            self.target.tag.as_str(),
            name,
            body,
            self.target.target.as_str(),
        );
        let release = self
            .api
            .create_release(&self.target.repo, &payload)
            .await?;
        if release.draft || !release.prerelease {
            warn!(
                release_id = release.id,
                draft = release.draft,
                prerelease = release.prerelease,
                "created release flags differ from request"
            );
        }
        Ok(release)
    }

    /// Keep `existing` and read its full asset list into the shadow.
    pub async fn reuse(&self, existing: Release) -> Result<ReconciliationState, ReconcileError> {
        info!(release_id = existing.id, "reusing existing release");
        let mut assets = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .api
                .list_assets(&self.target.repo, existing.id, ASSET_PAGE_SIZE, page)
                .await?;
            let short_page = batch.len() < ASSET_PAGE_SIZE as usize;
            assets.extend(batch);
            if short_page {
                break;
            }
            page += 1;
        }
        debug!(count = assets.len(), pages = page, "listed existing assets");
        Ok(ReconciliationState::existing(existing, assets))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
