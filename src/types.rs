//! Core types for artifact-mirror

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Unique identifier for a remote asset
///
/// The remote service assigns each asset an opaque identifier. Two descriptors
/// with the same id denote the same asset regardless of which listing source
/// reported them, so the id is the dedup key for the whole export.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    /// View the inner identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checksums reported by the remote for one asset (lowercase hex)
///
/// The listing endpoints report whichever digests the repository stores.
/// SHA-1 is always present on the formats this crate targets; the others are
/// best-effort extras.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetChecksum {
    /// SHA-1 hex digest
    #[serde(default)]
    pub sha1: Option<String>,

    /// SHA-256 hex digest
    #[serde(default)]
    pub sha256: Option<String>,

    /// MD5 hex digest
    #[serde(default)]
    pub md5: Option<String>,
}

impl AssetChecksum {
    /// True when the remote reported no digest at all
    pub fn is_empty(&self) -> bool {
        self.sha1.is_none() && self.sha256.is_none() && self.md5.is_none()
    }

    /// The strongest digest available for verification, with its algorithm
    pub fn preferred(&self) -> Option<(crate::checksum::ChecksumAlgo, &str)> {
        use crate::checksum::ChecksumAlgo;
        if let Some(d) = &self.sha256 {
            return Some((ChecksumAlgo::Sha256, d));
        }
        if let Some(d) = &self.sha1 {
            return Some((ChecksumAlgo::Sha1, d));
        }
        self.md5.as_deref().map(|d| (ChecksumAlgo::Md5, d))
    }
}

/// One discovered remote artifact, as returned by the listing endpoints
///
/// Fields the remote may omit default to empty/zero so a page parses even when
/// a format does not populate them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetDescriptor {
    /// Opaque unique identifier (the dedup key)
    pub id: AssetId,

    /// Repository-relative logical path
    pub path: String,

    /// URL the raw content is fetched from
    pub download_url: String,

    /// Digests to verify the fetched content against
    pub checksum: AssetChecksum,

    /// Content size in bytes (0 when the remote does not report it)
    #[serde(rename = "fileSize")]
    pub size_bytes: u64,

    /// Monotonic update timestamp (epoch millis), used for latest-version selection
    pub last_updated: i64,

    /// Repository format (`maven2`, `npm`, `nuget`, `docker`, ...)
    pub format: String,

    /// Name of the repository the asset lives in
    pub repository: String,

    /// Format-specific metadata (maven2 coordinates, npm name/version, ...)
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// One page of listing results plus the cursor for the next page
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetPage {
    /// Asset descriptors on this page (may be empty)
    pub items: Vec<AssetDescriptor>,

    /// Cursor for the next page; `None` means end of listing
    pub continuation_token: Option<String>,
}

/// Repository kind as reported by the repository-list endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Locally hosted content
    Hosted,
    /// Cached remote content
    Proxy,
    /// Aggregation of other repositories (no content of its own)
    Group,
}

impl RepositoryType {
    /// Whether repositories of this type contain downloadable artifacts
    pub fn holds_content(&self) -> bool {
        matches!(self, RepositoryType::Hosted | RepositoryType::Proxy)
    }
}

/// One repository record from the repository-list endpoint (driver-level only)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Repository name, used as the repository id in listing calls
    pub name: String,

    /// Repository format (`maven2`, `npm`, ...)
    pub format: String,

    /// Hosted / proxy / group
    #[serde(rename = "type")]
    pub repo_type: RepositoryType,

    /// Public URL of the repository, when reported
    #[serde(default)]
    pub url: Option<String>,

    /// Whether the repository is currently serving requests
    pub online: bool,
}

/// One remote listing endpoint the engine can discover assets through
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSource {
    /// The exhaustive assets endpoint (`/service/rest/v1/assets`)
    Assets,
    /// The faster, approximate search endpoint (`/service/rest/v1/search/assets`)
    Search,
}

impl ListingSource {
    /// Stable key used to namespace continuation cursors in checkpoints
    pub fn key(&self) -> &'static str {
        match self {
            ListingSource::Assets => "assets",
            ListingSource::Search => "search",
        }
    }

    /// URL path segments of the endpoint, relative to the service base
    pub(crate) fn path_segments(&self) -> &'static [&'static str] {
        match self {
            ListingSource::Assets => &["service", "rest", "v1", "assets"],
            ListingSource::Search => &["service", "rest", "v1", "search", "assets"],
        }
    }
}

/// Which listing source(s) seed discovery for an export
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingMode {
    /// Walk the exhaustive assets endpoint only (default)
    #[default]
    Exhaustive,
    /// Walk the fast search endpoint only
    Quick,
    /// Walk both endpoints and deduplicate by asset id, for maximum coverage
    Combined,
}

impl ListingMode {
    /// The listing sources this mode seeds, one discovery chain per source
    pub fn sources(&self) -> &'static [ListingSource] {
        match self {
            ListingMode::Exhaustive => &[ListingSource::Assets],
            ListingMode::Quick => &[ListingSource::Search],
            ListingMode::Combined => &[ListingSource::Assets, ListingSource::Search],
        }
    }
}

/// Which discovered assets are downloaded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetSelection {
    /// Every discovered asset (default)
    #[default]
    All,
    /// Only the most recently updated version of each artifact,
    /// skipping metadata/signature sidecar files
    LatestOnly,
}

/// What to do about abandoned pages and failed assets when the run drains
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Write the completion marker only when every found asset was processed;
    /// otherwise keep the checkpoint so a rerun retries the gap (default)
    #[default]
    RequireComplete,
    /// Always write the marker once quiescent, gaps or not
    MarkAlways,
}

/// Terminal state of one repository export
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportOutcome {
    /// Every found asset was verified locally; marker written, checkpoint removed
    Completed,
    /// The run drained but some assets or pages were abandoned;
    /// the checkpoint was kept for a retry run
    CompletedWithGaps {
        /// Found assets that were never successfully processed
        missing_assets: u64,
        /// Listing pages abandoned after exhausting retries
        abandoned_pages: u64,
    },
    /// A completion marker already existed; nothing was fetched
    AlreadyComplete,
}

impl ExportOutcome {
    /// Whether the repository needs no further export work
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            ExportOutcome::Completed | ExportOutcome::AlreadyComplete
        )
    }
}

/// Final statistics of one repository export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportReport {
    /// Repository that was exported
    pub repository: String,

    /// Total assets discovered (after dedup)
    pub assets_found: u64,

    /// Assets verified on disk (downloaded this run or already valid)
    pub assets_processed: u64,

    /// Assets that exhausted their retry budget
    pub assets_failed: u64,

    /// Listing pages abandoned after exhausting retries
    pub pages_abandoned: u64,

    /// Wall-clock duration of the run
    pub elapsed: Duration,

    /// Terminal state of the run
    pub outcome: ExportOutcome,
}

/// Durable record proving an export fully finished
///
/// Serialized as human-readable `key = value` lines by the checkpoint store;
/// its mere presence tells the driver to skip the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionMarker {
    /// When the export drained
    pub completed_at: DateTime<Utc>,

    /// Repository that was exported
    pub repository: String,

    /// Base URL of the remote service
    pub source_url: String,

    /// Final found counter
    pub assets_found: u64,

    /// Final processed counter
    pub assets_processed: u64,

    /// Directory the repository was exported into
    pub export_path: PathBuf,
}

/// Event emitted during an export's lifecycle
///
/// Subscribe through [`crate::engine::RepositoryExporter::subscribe`]. Events
/// are broadcast; if nobody listens they are silently dropped.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A listing page was fetched and its assets enqueued
    PageFetched {
        /// Listing source the page came from
        source: ListingSource,
        /// Number of descriptors on the page
        items: usize,
        /// Number of those that were new (not seen from another source or run)
        new_assets: usize,
    },

    /// A listing page was abandoned after exhausting its retry budget
    PageAbandoned {
        /// Listing source the page belonged to
        source: ListingSource,
        /// Cursor of the abandoned page (`None` for the first page)
        cursor: Option<String>,
    },

    /// One asset reached a verified local file
    AssetCompleted {
        /// Repository-relative path of the asset
        path: String,
        /// True when the existing file already matched and nothing was fetched
        already_valid: bool,
    },

    /// One asset exhausted its retry budget and was skipped
    AssetFailed {
        /// Repository-relative path of the asset
        path: String,
        /// Description of the final error
        error: String,
    },

    /// Periodic progress snapshot (bounded frequency)
    Progress {
        /// Assets discovered so far
        found: u64,
        /// Assets verified so far
        processed: u64,
        /// Tasks currently in flight
        active: usize,
    },

    /// A checkpoint was written
    CheckpointSaved {
        /// Processed counter at the time of the snapshot
        processed: u64,
    },

    /// The export drained and finalized
    ExportFinished {
        /// Repository that finished
        repository: String,
        /// Terminal state
        outcome: ExportOutcome,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_page_parses_remote_json() {
        let body = r#"{
            "items": [
                {
                    "downloadUrl": "http://nexus.local/repository/libs/org/demo/lib/1.0/lib-1.0.jar",
                    "path": "org/demo/lib/1.0/lib-1.0.jar",
                    "id": "bGlicy1yZWxlYXNlOjE",
                    "repository": "libs-release",
                    "format": "maven2",
                    "checksum": {
                        "sha1": "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed",
                        "md5": "5eb63bbbe01eeed093cb22bb8f5acdc3"
                    },
                    "fileSize": 4096,
                    "lastUpdated": 1718000000000,
                    "attributes": {"maven2": {"groupId": "org.demo", "artifactId": "lib", "version": "1.0"}}
                }
            ],
            "continuationToken": "88491cd1d185dd136f143f20c4e7d50c"
        }"#;

        let page: AssetPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.continuation_token.as_deref(),
            Some("88491cd1d185dd136f143f20c4e7d50c")
        );

        let asset = &page.items[0];
        assert_eq!(asset.id.as_str(), "bGlicy1yZWxlYXNlOjE");
        assert_eq!(asset.size_bytes, 4096);
        assert_eq!(asset.last_updated, 1_718_000_000_000);
        assert!(asset.checksum.sha256.is_none());
        assert!(asset.attributes.contains_key("maven2"));
    }

    #[test]
    fn asset_page_tolerates_missing_fields() {
        let body = r#"{"items": [{"id": "x", "path": "a/b", "downloadUrl": "http://h/a/b"}]}"#;
        let page: AssetPage = serde_json::from_str(body).unwrap();
        assert!(page.continuation_token.is_none());
        let asset = &page.items[0];
        assert!(asset.checksum.is_empty());
        assert_eq!(asset.size_bytes, 0);
    }

    #[test]
    fn repository_descriptor_maps_type_field() {
        let body = r#"[
            {"name": "libs-release", "format": "maven2", "type": "hosted", "online": true},
            {"name": "npm-all", "format": "npm", "type": "group", "online": true}
        ]"#;
        let repos: Vec<RepositoryDescriptor> = serde_json::from_str(body).unwrap();
        assert_eq!(repos[0].repo_type, RepositoryType::Hosted);
        assert!(repos[0].repo_type.holds_content());
        assert!(!repos[1].repo_type.holds_content());
    }

    #[test]
    fn preferred_checksum_prefers_strongest() {
        let all = AssetChecksum {
            sha1: Some("s1".into()),
            sha256: Some("s256".into()),
            md5: Some("m".into()),
        };
        let (algo, digest) = all.preferred().unwrap();
        assert_eq!(algo, crate::checksum::ChecksumAlgo::Sha256);
        assert_eq!(digest, "s256");

        let sha1_only = AssetChecksum {
            sha1: Some("s1".into()),
            ..Default::default()
        };
        assert_eq!(
            sha1_only.preferred().unwrap().0,
            crate::checksum::ChecksumAlgo::Sha1
        );

        assert!(AssetChecksum::default().preferred().is_none());
    }

    #[test]
    fn listing_mode_sources() {
        assert_eq!(ListingMode::Exhaustive.sources(), &[ListingSource::Assets]);
        assert_eq!(ListingMode::Quick.sources(), &[ListingSource::Search]);
        assert_eq!(
            ListingMode::Combined.sources(),
            &[ListingSource::Assets, ListingSource::Search]
        );
    }

    #[test]
    fn outcome_completeness() {
        assert!(ExportOutcome::Completed.is_complete());
        assert!(ExportOutcome::AlreadyComplete.is_complete());
        assert!(
            !ExportOutcome::CompletedWithGaps {
                missing_assets: 3,
                abandoned_pages: 0
            }
            .is_complete()
        );
    }
}
