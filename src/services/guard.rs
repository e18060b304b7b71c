//! Lexical checks keeping paths and external URIs inside their roots.
use std::path::{Component, Path, PathBuf};

use crate::domain::ExternalUri;
use crate::services::{ServiceError, ServiceResult};

/// Resolve `.` and `..` components without touching the file system.
///
/// A `..` that would climb above the start of a relative path is kept; above
/// the root of an absolute path it is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str())
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let last = normalized.components().next_back();
                let climbs_into_parent = matches!(last, Some(Component::Normal(_)));
                let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));
                if climbs_into_parent {
                    normalized.pop();
                } else if !at_root {
                    normalized.push("..");
                }
            }
        }
    }
    normalized
}

/// Whether `candidate`, once normalized, lies inside the normalized `root`.
pub fn is_within_root(candidate: &Path, root: &Path) -> bool {
    normalize_path(candidate).starts_with(normalize_path(root))
}

/// Fail unless `candidate`, once normalized, lies inside the normalized `root`.
pub fn assert_within_root(candidate: &Path, root: &Path) -> ServiceResult<()> {
    if is_within_root(candidate, root) {
        return Ok(());
    }

    log::warn!(
        "Rejected path {} (normalized to {}): expected to start with {}",
        candidate.display(),
        normalize_path(candidate).display(),
        normalize_path(root).display()
    );
    Err(ServiceError::Security(format!(
        "path {} escapes {}",
        candidate.display(),
        root.display()
    )))
}

/// Fail if the URI path is not already in normal form.
///
/// Untrusted URIs containing `.` or `..` segments, empty segments or
/// backslashes are rejected outright instead of being normalized.
pub fn assert_no_traversal(uri: &ExternalUri) -> ServiceResult<()> {
    let path = uri.path();
    let relative = path.strip_prefix('/').unwrap_or(path);

    let offending = relative.split('/').find(|segment| {
        segment.is_empty()
            || *segment == "."
            || *segment == ".."
            || segment.contains(['\\', '\0'])
    });

    match offending {
        None => Ok(()),
        Some(segment) => {
            log::warn!("Rejected external URI {uri}: offending segment {segment:?}");
            Err(ServiceError::Security(format!("URI {uri} is not in normal form")))
        }
    }
}
