//! relsync core library.
//!
//! Reconciles one GitHub release and its assets with a set of local build
//! artifacts: configuration, CI gating, artifact resolution, the GitHub
//! releases client, and the reconciliation protocol itself.

pub mod artifacts;
pub mod ci;
pub mod config;
pub mod errors;
pub mod github;
pub mod models;
pub mod reconcile;

// Re-exports for convenience.
pub use config::Config;
pub use errors::ReconcileError;
pub use github::{GitHubClient, ReleaseApi};
pub use reconcile::{Reconciler, ReleaseTarget};
