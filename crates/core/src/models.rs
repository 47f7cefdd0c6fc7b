//! Domain model types used throughout relsync.
//!
//! The remote types carry only the fields the reconciliation reads; serde
//! ignores everything else GitHub sends back.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Remote entities
// ---------------------------------------------------------------------------

/// A release as returned by the GitHub releases API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub name: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub target_commitish: String,
    /// URI template, e.g. `https://uploads.github.com/.../assets{?name,label}`.
    /// Only valid while this release object exists.
    pub upload_url: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

/// Payload for `POST /repos/{repo}/releases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub target_commitish: String,
    pub draft: bool,
    pub prerelease: bool,
}

impl NewRelease {
    /// A published (non-draft) prerelease, the only kind relsync creates.
    pub fn prerelease(
        tag_name: impl Into<String>,
        name: impl Into<String>,
        body: impl Into<String>,
        target_commitish: impl Into<String>,
    ) -> Self {
        Self {
            tag_name: tag_name.into(),
            name: name.into(),
            body: body.into(),
            target_commitish: target_commitish.into(),
            draft: false,
            prerelease: true,
        }
    }
}

/// An asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Local artifacts
// ---------------------------------------------------------------------------

/// A build output on disk that should end up as a release asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    /// Asset name on the release (the file name component of `path`).
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: &'static str,
}

// ---------------------------------------------------------------------------
// Reconciliation state
// ---------------------------------------------------------------------------

/// Asset name to remote asset id, for the release currently being synced.
pub type AssetShadow = HashMap<String, u64>;

/// The release handle plus the synchronizer's view of its assets.
///
/// Threaded by value through the reconciliation steps; nothing else holds it.
#[derive(Debug, Clone)]
pub struct ReconciliationState {
    pub release: Release,
    pub shadow: AssetShadow,
}

impl ReconciliationState {
    /// State for a release that was just created: it cannot have assets yet.
    pub fn fresh(release: Release) -> Self {
        Self {
            release,
            shadow: AssetShadow::new(),
        }
    }

    /// State for an existing release whose assets were just listed.
    pub fn existing(release: Release, assets: Vec<RemoteAsset>) -> Self {
        let shadow = assets.into_iter().map(|a| (a.name, a.id)).collect();
        Self { release, shadow }
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// What happened to the release during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseAction {
    /// No release existed for the tag; a new one was created.
    Created,
    /// The existing release was deleted and recreated.
    Replaced,
    /// The existing release was kept and its assets synchronized.
    Reused,
    /// Nothing to publish; no remote call was made.
    Skipped,
}

impl std::fmt::Display for ReleaseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Replaced => write!(f, "replaced"),
            Self::Reused => write!(f, "reused"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Statistics from a single reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub release_action: ReleaseAction,
    pub release_id: Option<u64>,
    pub uploaded: usize,
    /// Remote assets deleted because a local artifact had the same name.
    pub replaced_assets: usize,
    /// Remote assets deleted because no local artifact had their name.
    pub pruned_assets: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ReconcileStats {
    pub(crate) fn begin() -> Self {
        Self {
            release_action: ReleaseAction::Skipped,
            release_id: None,
            uploaded: 0,
            replaced_assets: 0,
            pruned_assets: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}
