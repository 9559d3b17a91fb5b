//! Platform-independent path handling.
//!
//! Virtual paths always use `/`. They are purely lexical and never allowed to
//! climb out of the root they are resolved against.

use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

/// Normalise a virtual path to `a/b/c` form (no leading, trailing or
/// doubled separators, no `.` components).
///
/// # Errors
///
/// `BadFilename` if a component is `..` or contains `:` or `\`.
pub fn sanitize(path: &str) -> Result<String, ErrorCode> {
    let mut parts = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => return Err(ErrorCode::BadFilename),
            c if c.contains(':') || c.contains('\\') => return Err(ErrorCode::BadFilename),
            c => parts.push(c),
        }
    }
    Ok(parts.join("/"))
}

/// Strip a sanitized mount point prefix from a sanitized path.
///
/// Returns the path relative to the mount, or `None` when the path lies
/// outside it.
pub fn strip_mount_point<'a>(path: &'a str, point: &str) -> Option<&'a str> {
    if point.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(point)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

/// Join a sanitized virtual path onto a host directory
pub fn to_host(root: &Path, path: &str) -> PathBuf {
    let mut host = root.to_path_buf();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        host.push(part);
    }
    host
}

/// Render a mount point for display: `/` for the root, `/a/b/` otherwise
pub fn display_mount_point(point: &str) -> String {
    if point.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", point)
    }
}
