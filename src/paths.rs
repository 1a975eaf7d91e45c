//! Safe resolution of remote asset paths inside the export root
//!
//! A listing response is remote input: a descriptor's logical path could be
//! absolute or try to climb out with `..` segments. Resolution neutralizes
//! both so every write lands strictly inside the export root.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Map an asset's logical path to a filesystem path inside `root`
///
/// Normalization rules:
/// - root and prefix components are stripped (an absolute path becomes relative)
/// - `.` segments are dropped
/// - `..` pops at most the segments accumulated so far, never past the root
///
/// A path with no remaining segments after normalization is rejected.
///
/// # Examples
///
/// ```
/// use artifact_mirror::paths::resolve_asset_path;
/// use std::path::Path;
///
/// let root = Path::new("/exports/libs-release");
/// let safe = resolve_asset_path(root, "org/demo/lib-1.0.jar").unwrap();
/// assert_eq!(safe, root.join("org/demo/lib-1.0.jar"));
///
/// // Escaping segments are neutralized, not honored
/// let escaped = resolve_asset_path(root, "../../escape.jar").unwrap();
/// assert_eq!(escaped, root.join("escape.jar"));
/// ```
pub fn resolve_asset_path(root: &Path, logical: &str) -> Result<PathBuf> {
    let mut segments: Vec<&std::ffi::OsStr> = Vec::new();

    for component in Path::new(logical).components() {
        match component {
            Component::Normal(seg) => segments.push(seg),
            Component::ParentDir => {
                // Pops within the collected segments only; at the top it is
                // simply dropped so the path cannot climb out of the root
                segments.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if segments.is_empty() {
        return Err(Error::UnsafePath {
            path: logical.to_string(),
        });
    }

    let mut resolved = root.to_path_buf();
    for seg in segments {
        resolved.push(seg);
    }
    Ok(resolved)
}
