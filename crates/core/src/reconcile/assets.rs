//! Asset synchronization against the current release.

use tracing::{debug, info};

use super::Reconciler;
use crate::errors::ReconcileError;
use crate::github::ReleaseApi;
use crate::models::{LocalArtifact, ReconciliationState};

/// Counts from one synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub uploaded: usize,
    /// Remote assets deleted before re-uploading under the same name.
    pub replaced: usize,
    /// Remote assets deleted because no artifact had their name.
    pub pruned: usize,
}

impl<A: ReleaseApi> Reconciler<A> {
    /// Upload `artifacts` one at a time, in order.
    ///
    /// A name already in the shadow is deleted remotely (and dropped from the
    /// shadow) before the upload. Whatever is left in the shadow afterwards
    /// has no local counterpart and is deleted too.
    pub async fn synchronize(
        &self,
        state: ReconciliationState,
        artifacts: &[LocalArtifact],
    ) -> Result<SyncOutcome, ReconcileError> {
        let ReconciliationState {
            release,
            mut shadow,
        } = state;
        let mut outcome = SyncOutcome::default();
        let total = artifacts.len();

        for (index, artifact) in artifacts.iter().enumerate() {
            info!(
                name = %artifact.name,
                index = index + 1,
                total,
                "uploading asset"
            );

            if let Some(asset_id) = shadow.remove(&artifact.name) {
                info!(name = %artifact.name, asset_id, "asset exists, deleting it first");
                self.api
                    .delete_asset(&self.target.repo, asset_id)
                    .await?;
                outcome.replaced += 1;
            }

            let bytes = tokio::fs::read(&artifact.path)
                .await
                .map_err(|source| ReconcileError::Artifact {
                    path: artifact.path.clone(),
                    source,
                })?;
            debug!(
                name = %artifact.name,
                size = bytes.len(),
                content_type = artifact.content_type,
                "read artifact"
            );

            let asset = self
                .api
                .upload_asset(&release.upload_url, &artifact.name, artifact.content_type, bytes)
                .await?;
            debug!(name = %asset.name, asset_id = asset.id, "upload complete");
            outcome.uploaded += 1;
        }

        let mut stale: Vec<_> = shadow.into_iter().collect();
        stale.sort();
        for (name, asset_id) in stale {
            info!(name = %name, asset_id, "deleting stale asset");
            self.api
                .delete_asset(&self.target.repo, asset_id)
                .await?;
            outcome.pruned += 1;
        }

        Ok(outcome)
    }
}
