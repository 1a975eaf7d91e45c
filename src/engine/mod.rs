//! Export engine split into focused submodules.
//!
//! The [`RepositoryExporter`] and its collaborators are organized by concern:
//! - [`state`] - shared counters, dedup sets, and the drain signal
//! - [`worker`] - the tagged task queue and the fixed worker pool
//! - [`discovery`] - listing-page consumption and fan-out
//! - [`download`] - the per-asset check/fetch/verify state machine

mod discovery;
mod download;
mod state;
mod worker;


use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};

use crate::checkpoint::CheckpointStore;
use crate::client::RemoteClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::selection;
use crate::types::{
    AssetSelection, CompletionMarker, CompletionPolicy, Event, ExportOutcome, ExportReport,
};

use state::EngineState;
use worker::{Task, TaskQueue, WorkerContext, spawn_workers};

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Coordinator for one repository export
///
/// Owns the engine state, the worker pool, and the checkpoint store of a
/// single repository. Exports are resumable: interrupt the process at any
/// point and a later run picks up from the last checkpoint.
///
/// # Example
///
/// ```no_run
/// use artifact_mirror::{Config, RepositoryExporter};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::new("http://nexus.example.com:8081", "./exports");
///     let exporter = RepositoryExporter::new(config, "libs-release")?;
///     let report = exporter.export().await?;
///     println!(
///         "{}: {}/{} assets",
///         report.repository, report.assets_processed, report.assets_found
///     );
///     Ok(())
/// }
/// ```
pub struct RepositoryExporter {
    /// Repository id being exported
    repository: String,
    /// Configuration (shared with every task)
    config: Arc<Config>,
    /// HTTP client (shared with every task)
    client: Arc<RemoteClient>,
    /// Directory this repository is exported into: `<output_dir>/<repository>`
    export_root: PathBuf,
    /// Sidecar persistence for this export root
    store: CheckpointStore,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
}

impl RepositoryExporter {
    /// Create an exporter for one repository
    ///
    /// # Errors
    ///
    /// Returns an error when the remote base URL does not parse or the HTTP
    /// client cannot be built. The output directory is validated later, at
    /// the start of [`export`](Self::export).
    pub fn new(config: Config, repository: impl Into<String>) -> Result<Self> {
        let repository = repository.into();
        let client = Arc::new(RemoteClient::new(&config.remote)?);
        let export_root = config.export.output_dir.join(&repository);
        let store = CheckpointStore::new(&export_root);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            repository,
            config: Arc::new(config),
            client,
            export_root,
            store,
            event_tx,
        })
    }

    /// Subscribe to export events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. A subscriber that falls far behind sees a
    /// `RecvError::Lagged` and continues from the current position.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The directory this repository is exported into
    pub fn export_root(&self) -> &Path {
        &self.export_root
    }

    /// Whether a completion marker from a previous run is present
    ///
    /// The driver uses this to skip finished repositories without touching
    /// the network.
    pub fn is_complete(&self) -> bool {
        self.store.marker_exists()
    }

    /// Run the export to completion
    ///
    /// Discovers every asset through the configured listing source(s),
    /// downloads and verifies each exactly once, checkpoints progress
    /// throughout, and finalizes per the configured [`CompletionPolicy`].
    ///
    /// # Errors
    ///
    /// Only setup problems (unwritable output directory, bad URL) and marker
    /// persistence failures surface as `Err`. Per-page and per-asset failures
    /// are absorbed into the report's counters.
    pub async fn export(&self) -> Result<ExportReport> {
        let started = Instant::now();

        tracing::info!(
            repository = %self.repository,
            url = %self.client.base_url(),
            export_path = %self.export_root.display(),
            listing_mode = ?self.config.export.listing_mode,
            workers = self.config.export.worker_count,
            "Starting repository export"
        );

        // The marker is the single source of truth for "nothing left to do"
        if self.store.marker_exists() {
            return self.already_complete_report(started).await;
        }

        self.prepare_export_root().await?;

        let state = Arc::new(EngineState::new());
        match self.store.load().await {
            Ok(Some(checkpoint)) => {
                tracing::info!(
                    processed = checkpoint.assets_processed,
                    found = checkpoint.assets_found,
                    completed_tokens = checkpoint.completed_tokens.len(),
                    downloaded_paths = checkpoint.downloaded_paths.len(),
                    "Resuming from checkpoint"
                );
                state.restore(&checkpoint);
            }
            Ok(None) => {
                tracing::debug!("No checkpoint found, starting fresh");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load previous checkpoint, starting fresh");
            }
        }

        let (queue, task_rx) = TaskQueue::new(state.clone());
        let (checkpoint_tx, checkpoint_rx) = mpsc::unbounded_channel();

        let ctx = Arc::new(WorkerContext {
            repository: self.repository.clone(),
            client: self.client.clone(),
            config: self.config.clone(),
            export_root: self.export_root.clone(),
            state: state.clone(),
            queue: queue.clone(),
            event_tx: self.event_tx.clone(),
            checkpoint_tx,
        });

        let workers = spawn_workers(ctx, task_rx, self.config.export.worker_count.max(1));

        // Seed one discovery chain per listing source
        for source in self.config.export.listing_mode.sources() {
            queue.schedule(Task::Discover {
                source: *source,
                cursor: None,
            });
        }

        self.wait_until_drained(&state, &queue, checkpoint_rx).await;

        queue.close();
        for worker in workers {
            worker.await.ok();
        }

        self.finalize(&state, started).await
    }

    /// Block until no task is scheduled or running, checkpointing on the
    /// poll cadence and on threshold requests from download tasks
    async fn wait_until_drained(
        &self,
        state: &Arc<EngineState>,
        queue: &TaskQueue,
        mut checkpoint_rx: mpsc::UnboundedReceiver<()>,
    ) {
        let mut active_rx = state.watch_active();
        let mut poll = tokio::time::interval(self.config.export.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // An interval's first tick completes immediately; consume it so the
        // first checkpoint lands one full poll after startup
        poll.tick().await;

        let latest_only = matches!(self.config.export.selection, AssetSelection::LatestOnly);
        let mut selection_done = !latest_only;

        loop {
            if state.is_quiescent() {
                if !selection_done {
                    // Latest-only second phase: discovery has drained with
                    // every descriptor collected; pick winners and enqueue
                    // their downloads
                    selection_done = true;
                    let collected = state.take_collected().await;
                    let selected = selection::select_latest(collected);
                    for asset in selected {
                        state.record_found();
                        queue.schedule(Task::Download { asset });
                    }
                    if !state.is_quiescent() {
                        continue;
                    }
                }
                break;
            }

            tokio::select! {
                _ = poll.tick() => {
                    self.save_checkpoint(state).await;
                    self.report_progress(state);
                }
                Some(()) = checkpoint_rx.recv() => {
                    self.save_checkpoint(state).await;
                }
                _ = active_rx.changed() => {}
            }
        }
    }

    /// Validate and create the export root: must end up an existing,
    /// writable directory before any task is allowed to start
    async fn prepare_export_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.export_root)
            .await
            .map_err(|e| {
                Error::setup(
                    format!("cannot create export directory: {e}"),
                    &self.export_root,
                )
            })?;

        let metadata = tokio::fs::metadata(&self.export_root).await.map_err(|e| {
            Error::setup(
                format!("cannot stat export directory: {e}"),
                &self.export_root,
            )
        })?;
        if !metadata.is_dir() {
            return Err(Error::setup(
                "export path exists but is not a directory",
                &self.export_root,
            ));
        }

        // An actual write probe: permission bits lie on some mounts
        let probe = self.export_root.join(".artifact-export-probe");
        tokio::fs::write(&probe, b"probe").await.map_err(|e| {
            Error::setup(
                format!("export directory is not writable: {e}"),
                &self.export_root,
            )
        })?;
        tokio::fs::remove_file(&probe).await.ok();

        Ok(())
    }

    /// Write a checkpoint; persistence failures are logged, never fatal
    async fn save_checkpoint(&self, state: &EngineState) {
        match self.store.save(&state.snapshot()).await {
            Ok(()) => {
                state.checkpoint_written();
                self.emit(Event::CheckpointSaved {
                    processed: state.processed(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Checkpoint write failed, continuing");
            }
        }
    }

    /// Bounded-frequency progress line, from the poll loop only
    fn report_progress(&self, state: &EngineState) {
        let found = state.found();
        let processed = state.processed();
        let percent = if found > 0 { processed * 100 / found } else { 0 };
        tracing::info!(
            repository = %self.repository,
            processed,
            found,
            percent,
            active = state.active_tasks(),
            pending_discovery = state.pending_discovery(),
            "Progress: processed {processed} of {found} found"
        );
        self.emit(Event::Progress {
            found,
            processed,
            active: state.active_tasks(),
        });
    }

    /// Decide the outcome per the completion policy and persist accordingly
    async fn finalize(&self, state: &EngineState, started: Instant) -> Result<ExportReport> {
        let found = state.found();
        let processed = state.processed();
        let missing = found.saturating_sub(processed);
        let abandoned = state.abandoned_pages();

        let outcome = if (missing > 0 || abandoned > 0)
            && self.config.export.completion == CompletionPolicy::RequireComplete
        {
            if let Err(e) = self.store.save(&state.snapshot()).await {
                tracing::warn!(error = %e, "Failed to write final checkpoint");
            }
            tracing::warn!(
                repository = %self.repository,
                missing,
                failed = state.failed(),
                pages_abandoned = abandoned,
                "Export drained with gaps, keeping checkpoint for retry"
            );
            ExportOutcome::CompletedWithGaps {
                missing_assets: missing,
                abandoned_pages: abandoned,
            }
        } else {
            let marker = CompletionMarker {
                completed_at: Utc::now(),
                repository: self.repository.clone(),
                source_url: self.client.base_url().to_string(),
                assets_found: found,
                assets_processed: processed,
                export_path: self.export_root.clone(),
            };
            if let Err(e) = self.store.write_marker(&marker).await {
                // Best-effort checkpoint before surfacing the failure, so the
                // finished work is not re-discovered from scratch
                if let Err(save_err) = self.store.save(&state.snapshot()).await {
                    tracing::error!(error = %save_err, "Best-effort checkpoint also failed");
                }
                return Err(e);
            }
            if let Err(e) = self.store.clear().await {
                tracing::warn!(error = %e, "Could not remove checkpoint after completion");
            }
            ExportOutcome::Completed
        };

        let elapsed = started.elapsed();
        tracing::info!(
            repository = %self.repository,
            processed,
            found,
            failed = state.failed(),
            pages_abandoned = state.abandoned_pages(),
            elapsed_secs = elapsed.as_secs(),
            outcome = ?outcome,
            "Export finished"
        );
        self.emit(Event::ExportFinished {
            repository: self.repository.clone(),
            outcome,
        });

        Ok(ExportReport {
            repository: self.repository.clone(),
            assets_found: found,
            assets_processed: processed,
            assets_failed: state.failed(),
            pages_abandoned: state.abandoned_pages(),
            elapsed,
            outcome,
        })
    }

    /// Report for a repository whose marker already proves completion
    async fn already_complete_report(&self, started: Instant) -> Result<ExportReport> {
        let (found, processed) = match self.store.read_marker().await {
            Ok(Some(marker)) => (marker.assets_found, marker.assets_processed),
            _ => (0, 0),
        };
        tracing::info!(
            repository = %self.repository,
            "Completion marker present, skipping export"
        );
        Ok(ExportReport {
            repository: self.repository.clone(),
            assets_found: found,
            assets_processed: processed,
            assets_failed: 0,
            pages_abandoned: 0,
            elapsed: started.elapsed(),
            outcome: ExportOutcome::AlreadyComplete,
        })
    }

    /// Emit an event; silently dropped when nobody subscribes
    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
