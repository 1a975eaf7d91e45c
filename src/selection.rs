//! Latest-version selection for discovered assets.
//!
//! Repository listings contain every stored version of every artifact plus
//! format metadata files (checksum sidecars, index documents, signatures).
//! The latest-only export mode keeps one asset per artifact: the most
//! recently updated primary file.

use crate::types::AssetDescriptor;
use std::collections::HashMap;

/// Read a string field out of a format's attribute block
fn attr<'a>(asset: &'a AssetDescriptor, block: &str, field: &str) -> Option<&'a str> {
    asset.attributes.get(block)?.get(field)?.as_str()
}

impl AssetDescriptor {
    /// Grouping key identifying an artifact across its versions
    ///
    /// Format metadata is used when present (maven2 `group:artifact`, npm
    /// package name, nuget package id); otherwise versions of an artifact
    /// are approximated by their shared directory prefix.
    pub fn artifact_key(&self) -> String {
        match self.format.as_str() {
            "maven2" => {
                if let (Some(group), Some(artifact)) = (
                    attr(self, "maven2", "groupId"),
                    attr(self, "maven2", "artifactId"),
                ) {
                    return format!("{group}:{artifact}");
                }
            }
            "npm" => {
                if let Some(name) = attr(self, "npm", "name") {
                    return name.to_string();
                }
            }
            "nuget" => {
                if let Some(id) = attr(self, "nuget", "id") {
                    return id.to_string();
                }
            }
            _ => {}
        }

        // Fallback: group by the path without its final (versioned) segment
        match self.path.rsplit_once('/') {
            Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
            _ if !self.path.is_empty() => self.path.clone(),
            _ => self.id.to_string(),
        }
    }

    /// Best-effort version string, for logs and reports
    pub fn version(&self) -> String {
        let from_attrs = match self.format.as_str() {
            "maven2" => attr(self, "maven2", "version"),
            "npm" => attr(self, "npm", "version"),
            "nuget" => attr(self, "nuget", "version"),
            _ => None,
        };
        if let Some(version) = from_attrs {
            return version.to_string();
        }

        // Fallback: a filename that looks versioned, else the update stamp
        if let Some(filename) = self.path.rsplit('/').next()
            && looks_versioned(filename)
        {
            return filename.to_string();
        }
        self.last_updated.to_string()
    }
}

/// Whether a filename contains a `<digit>.<digit>` version-ish sequence
fn looks_versioned(filename: &str) -> bool {
    let bytes = filename.as_bytes();
    bytes.windows(3).any(|w| {
        w[0].is_ascii_digit() && w[1] == b'.' && w[2].is_ascii_digit()
    })
}

/// Whether an asset is a primary artifact rather than format plumbing
///
/// Filters the checksum/signature sidecars and index documents each format
/// stores next to its real content.
pub fn is_primary_artifact(asset: &AssetDescriptor) -> bool {
    if asset.path.is_empty() {
        return false;
    }
    let lower = asset.path.to_ascii_lowercase();

    match asset.format.as_str() {
        "maven2" => {
            !(lower.ends_with(".md5")
                || lower.ends_with(".sha1")
                || lower.ends_with(".sha256")
                || lower.ends_with(".sha512")
                || lower.ends_with(".asc")
                || lower.contains("maven-metadata"))
        }
        "npm" => {
            !(lower.ends_with(".md5") || lower.ends_with(".sha1") || asset.path.contains("/-/"))
        }
        "nuget" => {
            !(lower.ends_with(".md5") || lower.ends_with(".sha1") || lower.ends_with(".nuspec"))
        }
        "docker" => !(asset.path.contains("/manifests/") || asset.path.contains("/blobs/")),
        _ => true,
    }
}

/// Reduce a full listing to the most recently updated primary asset per artifact
///
/// Output is sorted by path so repeated runs schedule work in a stable order.
pub fn select_latest(assets: Vec<AssetDescriptor>) -> Vec<AssetDescriptor> {
    let total = assets.len();
    let mut latest: HashMap<String, AssetDescriptor> = HashMap::new();

    for asset in assets.into_iter().filter(is_primary_artifact) {
        let key = asset.artifact_key();
        match latest.get(&key) {
            Some(current) if current.last_updated >= asset.last_updated => {}
            _ => {
                latest.insert(key, asset);
            }
        }
    }

    let mut selected: Vec<AssetDescriptor> = latest.into_values().collect();
    selected.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::info!(
        total,
        selected = selected.len(),
        "Selected latest primary artifacts"
    );
    selected
}
