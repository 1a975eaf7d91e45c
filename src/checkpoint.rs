//! Durable export state: the checkpoint sidecar and the completion marker.
//!
//! Both files live inside the export root, dot-prefixed so they never collide
//! with mirrored content. The checkpoint is a JSON snapshot of in-progress
//! state, rewritten throughout the run and deleted only on full completion.
//! The marker is a small human-readable record whose mere presence means
//! "fully done"; the driver reads nothing else to skip a repository.

use crate::error::{Error, Result};
use crate::types::CompletionMarker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Checkpoint sidecar filename inside the export root
pub const CHECKPOINT_FILE: &str = ".artifact-export-state.json";

/// Completion marker filename inside the export root
pub const MARKER_FILE: &str = ".artifact-export-complete";

/// Durable projection of in-progress engine state
///
/// Loaded before any network call on startup so both discovery (completed
/// cursors) and downloads (finished paths) skip work a previous run finished.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Assets discovered so far
    pub assets_found: u64,

    /// Assets verified on disk so far
    pub assets_processed: u64,

    /// Continuation cursor keys already fully consumed
    #[serde(default)]
    pub completed_tokens: BTreeSet<String>,

    /// Logical paths confirmed written and verified
    #[serde(default)]
    pub downloaded_paths: BTreeSet<String>,

    /// When this snapshot was taken
    pub last_update: DateTime<Utc>,
}

/// Reads and writes the sidecar files of one export root
pub struct CheckpointStore {
    checkpoint_path: PathBuf,
    marker_path: PathBuf,
}

impl CheckpointStore {
    /// Bind a store to an export root directory
    pub fn new(export_root: &Path) -> Self {
        Self {
            checkpoint_path: export_root.join(CHECKPOINT_FILE),
            marker_path: export_root.join(MARKER_FILE),
        }
    }

    /// Load the checkpoint, if one exists
    ///
    /// A missing file is a fresh export (`Ok(None)`); an unreadable or
    /// unparsable file is an [`Error::State`] the caller may log and treat
    /// as fresh.
    pub async fn load(&self) -> Result<Option<Checkpoint>> {
        let bytes = match tokio::fs::read(&self.checkpoint_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::State(format!(
                    "failed to read checkpoint {}: {e}",
                    self.checkpoint_path.display()
                )));
            }
        };

        let checkpoint = serde_json::from_slice(&bytes).map_err(|e| {
            Error::State(format!(
                "failed to parse checkpoint {}: {e}",
                self.checkpoint_path.display()
            ))
        })?;
        Ok(Some(checkpoint))
    }

    /// Write the checkpoint atomically (temp file + rename)
    ///
    /// A crash mid-write must never destroy the previous snapshot: the
    /// rename replaces it only once the new one is fully on disk.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let json = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| Error::State(format!("failed to serialize checkpoint: {e}")))?;

        let tmp_path = self.checkpoint_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json).await.map_err(|e| {
            Error::State(format!(
                "failed to write checkpoint {}: {e}",
                tmp_path.display()
            ))
        })?;
        tokio::fs::rename(&tmp_path, &self.checkpoint_path)
            .await
            .map_err(|e| {
                Error::State(format!(
                    "failed to replace checkpoint {}: {e}",
                    self.checkpoint_path.display()
                ))
            })?;

        tracing::debug!(
            processed = checkpoint.assets_processed,
            found = checkpoint.assets_found,
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Delete the checkpoint after full completion (missing file is fine)
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.checkpoint_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::State(format!(
                "failed to remove checkpoint {}: {e}",
                self.checkpoint_path.display()
            ))),
        }
    }

    /// Whether a completion marker is present
    pub fn marker_exists(&self) -> bool {
        self.marker_path.exists()
    }

    /// Write the completion marker
    pub async fn write_marker(&self, marker: &CompletionMarker) -> Result<()> {
        let rendered = render_marker(marker);
        tokio::fs::write(&self.marker_path, rendered)
            .await
            .map_err(|e| {
                Error::State(format!(
                    "failed to write completion marker {}: {e}",
                    self.marker_path.display()
                ))
            })?;
        tracing::info!(marker = %self.marker_path.display(), "Completion marker written");
        Ok(())
    }

    /// Read the completion marker back, if present
    pub async fn read_marker(&self) -> Result<Option<CompletionMarker>> {
        let text = match tokio::fs::read_to_string(&self.marker_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::State(format!(
                    "failed to read completion marker {}: {e}",
                    self.marker_path.display()
                )));
            }
        };
        parse_marker(&text).map(Some)
    }
}

/// Render a marker as `key = value` lines
fn render_marker(marker: &CompletionMarker) -> String {
    format!(
        "completed_at = {}\n\
         repository = {}\n\
         source_url = {}\n\
         assets_found = {}\n\
         assets_processed = {}\n\
         export_path = {}\n",
        marker.completed_at.to_rfc3339(),
        marker.repository,
        marker.source_url,
        marker.assets_found,
        marker.assets_processed,
        marker.export_path.display(),
    )
}

/// Parse the `key = value` lines of a marker file
fn parse_marker(text: &str) -> Result<CompletionMarker> {
    let mut fields = std::collections::HashMap::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once('=') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let get = |key: &str| {
        fields
            .get(key)
            .cloned()
            .ok_or_else(|| Error::State(format!("completion marker is missing '{key}'")))
    };

    let completed_at = DateTime::parse_from_rfc3339(&get("completed_at")?)
        .map_err(|e| Error::State(format!("bad completed_at in marker: {e}")))?
        .with_timezone(&Utc);
    let parse_count = |key: &str| -> Result<u64> {
        get(key)?
            .parse()
            .map_err(|e| Error::State(format!("bad {key} in marker: {e}")))
    };

    Ok(CompletionMarker {
        completed_at,
        repository: get("repository")?,
        source_url: get("source_url")?,
        assets_found: parse_count("assets_found")?,
        assets_processed: parse_count("assets_processed")?,
        export_path: PathBuf::from(get("export_path")?),
    })
}
