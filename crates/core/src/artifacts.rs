//! Artifact set resolution.
//!
//! Expands the configured patterns against a base directory into the ordered
//! list of files to upload. Output order is pattern order, then walk order
//! within a pattern; the walk is sorted by file name so repeated runs upload
//! in the same order.
//!
//! | Pattern | Meaning |
//! |---------|---------|
//! | `dist.txt` | that exact relative path, if it exists |
//! | `dist/*.zip` | every `.zip` directly under `dist/` |
//! | `**/*.tar.gz` | every `.tar.gz` anywhere under the base directory |

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::ReconcileError;
use crate::models::LocalArtifact;

/// Resolve `patterns` against `base_dir`, keeping only existing files.
///
/// Patterns that match nothing are skipped. A missing `base_dir` resolves to
/// the empty set.
pub fn resolve(base_dir: &Path, patterns: &[String]) -> Result<Vec<LocalArtifact>, ReconcileError> {
    let mut artifacts = Vec::new();

    if !base_dir.is_dir() {
        warn!(base_dir = %base_dir.display(), "artifact directory does not exist");
        return Ok(artifacts);
    }

    for pattern in patterns.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        let before = artifacts.len();
        if is_glob(pattern) {
            expand_glob(base_dir, pattern, &mut artifacts)?;
        } else {
            let path = base_dir.join(pattern);
            if path.is_file() {
                artifacts.push(local_artifact(&path)?);
            }
        }
        let matched = artifacts.len() - before;
        if matched == 0 {
            debug!(pattern, "pattern matched no files");
        } else {
            debug!(pattern, matched, "pattern resolved");
        }
    }

    warn_duplicate_names(&artifacts);
    info!(count = artifacts.len(), base_dir = %base_dir.display(), "resolved artifacts");
    Ok(artifacts)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn expand_glob(
    base_dir: &Path,
    pattern: &str,
    out: &mut Vec<LocalArtifact>,
) -> Result<(), ReconcileError> {
    let pattern = pattern.replace('\\', "/");
    let pattern = pattern.trim_start_matches("./");

    let walker = WalkDir::new(base_dir)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(base_dir) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if glob_match::glob_match(pattern, &rel) {
            out.push(local_artifact(entry.path())?);
        }
    }
    Ok(())
}

fn local_artifact(path: &Path) -> Result<LocalArtifact, ReconcileError> {
    let metadata = std::fs::metadata(path).map_err(|source| ReconcileError::Artifact {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(LocalArtifact {
        content_type: content_type_for(&name),
        name,
        path: path.to_path_buf(),
        size: metadata.len(),
    })
}

fn warn_duplicate_names(artifacts: &[LocalArtifact]) {
    let mut seen = HashSet::new();
    for artifact in artifacts {
        if !seen.insert(artifact.name.as_str()) {
            warn!(
                name = %artifact.name,
                path = %artifact.path.display(),
                "duplicate asset name; the second upload will be rejected"
            );
        }
    }
}

/// MIME type for an asset name, from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        return "application/gzip";
    }
    if lower.ends_with(".tar.xz") {
        return "application/x-xz";
    }
    let ext = match lower.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => return "application/octet-stream",
    };
    match ext {
        "txt" | "log" | "sha256" | "sha512" | "md5" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "xz" => "application/x-xz",
        "bz2" => "application/x-bzip2",
        "zst" => "application/zstd",
        "7z" => "application/x-7z-compressed",
        "jar" => "application/java-archive",
        "wasm" => "application/wasm",
        "deb" => "application/vnd.debian.binary-package",
        "rpm" => "application/x-rpm",
        "dmg" => "application/x-apple-diskimage",
        "msi" => "application/x-msi",
        "exe" | "dll" => "application/vnd.microsoft.portable-executable",
        "apk" => "application/vnd.android.package-archive",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "asc" | "sig" => "application/pgp-signature",
        _ => "application/octet-stream",
    }
}
