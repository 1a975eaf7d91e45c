//! Shared mutable state of one export run.
//!
//! One `EngineState` exists per coordinator; tasks receive it by `Arc` and
//! mutate it only through its counters and insert-if-absent sets. The
//! active-task count doubles as the quiescence signal: the export is drained
//! exactly when it reaches zero.

use crate::checkpoint::Checkpoint;
use crate::types::{AssetDescriptor, AssetId};
use chrono::Utc;
use dashmap::DashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::watch;

/// Kind of queue task, for the counters that distinguish discovery work
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskKind {
    /// Listing-page discovery
    Discovery,
    /// Single-asset download
    Download,
}

/// Counters, dedup sets, and the drain signal shared by all tasks of a run
pub(crate) struct EngineState {
    /// Assets discovered (monotonic)
    assets_found: AtomicU64,
    /// Assets verified on disk (monotonic)
    assets_processed: AtomicU64,
    /// Assets that exhausted their retry budget (monotonic)
    assets_failed: AtomicU64,
    /// Listing pages abandoned after exhausting retries (monotonic)
    pages_abandoned: AtomicU64,
    /// Tasks of any kind currently scheduled or running; never negative
    active_tasks: AtomicUsize,
    /// Discovery tasks currently scheduled or running
    pending_discovery: AtomicUsize,
    /// Assets processed since the last checkpoint snapshot
    processed_since_checkpoint: AtomicU64,

    /// Asset ids already enqueued for download (insert-if-absent dedup)
    pub(crate) seen_asset_ids: DashSet<AssetId>,
    /// Continuation cursor keys already fully consumed
    pub(crate) completed_tokens: DashSet<String>,
    /// Logical paths confirmed written and verified
    pub(crate) downloaded_paths: DashSet<String>,

    /// Descriptors collected during the latest-only discovery phase
    collected: tokio::sync::Mutex<Vec<AssetDescriptor>>,

    /// Publishes the active-task count so the coordinator can block on drain
    /// instead of busy-waiting
    active_watch: watch::Sender<usize>,
}

impl EngineState {
    pub(crate) fn new() -> Self {
        let (active_watch, _) = watch::channel(0);
        Self {
            assets_found: AtomicU64::new(0),
            assets_processed: AtomicU64::new(0),
            assets_failed: AtomicU64::new(0),
            pages_abandoned: AtomicU64::new(0),
            active_tasks: AtomicUsize::new(0),
            pending_discovery: AtomicUsize::new(0),
            processed_since_checkpoint: AtomicU64::new(0),
            seen_asset_ids: DashSet::new(),
            completed_tokens: DashSet::new(),
            downloaded_paths: DashSet::new(),
            collected: tokio::sync::Mutex::new(Vec::new()),
            active_watch,
        }
    }

    /// Restore counters and sets from a loaded checkpoint.
    /// Must run before any task is scheduled.
    ///
    /// Only verified work carries across runs: the found counter restarts
    /// from the processed counter, because seen ids are not persisted and an
    /// unfinished asset re-discovered after resume would otherwise be counted
    /// found twice. The checkpoint's own found value stays on disk for
    /// inspection.
    pub(crate) fn restore(&self, checkpoint: &Checkpoint) {
        self.assets_found
            .store(checkpoint.assets_processed, Ordering::SeqCst);
        self.assets_processed
            .store(checkpoint.assets_processed, Ordering::SeqCst);
        for token in &checkpoint.completed_tokens {
            self.completed_tokens.insert(token.clone());
        }
        for path in &checkpoint.downloaded_paths {
            self.downloaded_paths.insert(path.clone());
        }
    }

    /// Project the current state into a durable checkpoint
    pub(crate) fn snapshot(&self) -> Checkpoint {
        Checkpoint {
            assets_found: self.found(),
            assets_processed: self.processed(),
            completed_tokens: self
                .completed_tokens
                .iter()
                .map(|t| t.key().clone())
                .collect(),
            downloaded_paths: self
                .downloaded_paths
                .iter()
                .map(|p| p.key().clone())
                .collect(),
            last_update: Utc::now(),
        }
    }

    /// Account for a task entering the queue
    pub(crate) fn task_scheduled(&self, kind: TaskKind) {
        let active = self.active_tasks.fetch_add(1, Ordering::SeqCst) + 1;
        if kind == TaskKind::Discovery {
            self.pending_discovery.fetch_add(1, Ordering::SeqCst);
        }
        self.active_watch.send_replace(active);
    }

    /// Account for a task reaching any terminal outcome
    pub(crate) fn task_finished(&self, kind: TaskKind) {
        let previous = self.active_tasks.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "active task count went negative");
        if kind == TaskKind::Discovery {
            self.pending_discovery.fetch_sub(1, Ordering::SeqCst);
        }
        self.active_watch.send_replace(previous.saturating_sub(1));
    }

    /// Quiescent: nothing scheduled, nothing running
    pub(crate) fn is_quiescent(&self) -> bool {
        self.active_tasks.load(Ordering::SeqCst) == 0
    }

    /// A receiver over the active-task count; the watched value hitting zero
    /// is the drain signal (the atomic count stays authoritative)
    pub(crate) fn watch_active(&self) -> watch::Receiver<usize> {
        self.active_watch.subscribe()
    }

    pub(crate) fn record_found(&self) {
        self.assets_found.fetch_add(1, Ordering::SeqCst);
    }

    /// Count one verified asset. Returns true when `checkpoint_every`
    /// processed assets have accumulated since the last snapshot.
    pub(crate) fn record_processed(&self, checkpoint_every: u64) -> bool {
        self.assets_processed.fetch_add(1, Ordering::SeqCst);
        let since = self
            .processed_since_checkpoint
            .fetch_add(1, Ordering::SeqCst)
            + 1;
        if checkpoint_every > 0 && since >= checkpoint_every {
            self.processed_since_checkpoint.store(0, Ordering::SeqCst);
            return true;
        }
        false
    }

    /// Reset the threshold counter after a checkpoint was written
    pub(crate) fn checkpoint_written(&self) {
        self.processed_since_checkpoint.store(0, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.assets_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_page_abandoned(&self) {
        self.pages_abandoned.fetch_add(1, Ordering::SeqCst);
    }

    /// Stash a descriptor during the latest-only collect phase
    pub(crate) async fn collect(&self, asset: AssetDescriptor) {
        self.collected.lock().await.push(asset);
    }

    /// Drain the collected descriptors for selection
    pub(crate) async fn take_collected(&self) -> Vec<AssetDescriptor> {
        std::mem::take(&mut *self.collected.lock().await)
    }

    pub(crate) fn found(&self) -> u64 {
        self.assets_found.load(Ordering::SeqCst)
    }

    pub(crate) fn processed(&self) -> u64 {
        self.assets_processed.load(Ordering::SeqCst)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.assets_failed.load(Ordering::SeqCst)
    }

    pub(crate) fn abandoned_pages(&self) -> u64 {
        self.pages_abandoned.load(Ordering::SeqCst)
    }

    pub(crate) fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::SeqCst)
    }

    pub(crate) fn pending_discovery(&self) -> usize {
        self.pending_discovery.load(Ordering::SeqCst)
    }
}
