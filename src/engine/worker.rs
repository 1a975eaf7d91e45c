//! The task queue and the fixed worker pool.
//!
//! Discovery used to be expressed as tasks resubmitting themselves into a
//! thread pool; here the same shape is an explicit unbounded queue of tagged
//! tasks drained by a fixed number of workers. Discovery and download entries
//! share the queue with no priority distinction, so the two kinds of work
//! interleave freely.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

use crate::client::RemoteClient;
use crate::config::Config;
use crate::types::{AssetDescriptor, Event, ListingSource};

use super::state::{EngineState, TaskKind};
use super::{discovery, download};

/// One unit of work in the export queue
#[derive(Debug)]
pub(crate) enum Task {
    /// Fetch one listing page and fan out its results
    Discover {
        /// Listing endpoint this discovery chain walks
        source: ListingSource,
        /// Cursor of the page to fetch (`None` for the first page)
        cursor: Option<String>,
    },
    /// Fetch and verify one asset
    Download {
        /// The asset to materialize locally
        asset: AssetDescriptor,
    },
}

impl Task {
    pub(crate) fn kind(&self) -> TaskKind {
        match self {
            Task::Discover { .. } => TaskKind::Discovery,
            Task::Download { .. } => TaskKind::Download,
        }
    }
}

/// Handle for scheduling tasks; cloneable, closable by the coordinator
///
/// Scheduling increments the active-task count *before* the task enters the
/// queue, so the count can never read zero while work is still queued.
#[derive(Clone)]
pub(crate) struct TaskQueue {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Task>>>>,
    state: Arc<EngineState>,
}

impl TaskQueue {
    pub(crate) fn new(state: Arc<EngineState>) -> (Self, mpsc::UnboundedReceiver<Task>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
                state,
            },
            rx,
        )
    }

    /// Enqueue a task, accounting for it in the active counters
    pub(crate) fn schedule(&self, task: Task) {
        let kind = task.kind();
        self.state.task_scheduled(kind);

        let delivered = match self.tx.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(tx) => tx.send(task).is_ok(),
                None => false,
            },
            Err(_) => false,
        };

        if !delivered {
            // Queue already closed; undo the accounting so drain still fires
            self.state.task_finished(kind);
            tracing::warn!("Task dropped, queue is closed");
        }
    }

    /// Close the queue; workers exit once the backlog is drained
    pub(crate) fn close(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }
}

/// Everything a task needs, shared across the whole worker pool
pub(crate) struct WorkerContext {
    /// Repository being exported
    pub(crate) repository: String,
    /// Shared HTTP client
    pub(crate) client: Arc<RemoteClient>,
    /// Full configuration (retry policies, cadence, selection)
    pub(crate) config: Arc<Config>,
    /// Root directory files are written under
    pub(crate) export_root: PathBuf,
    /// Shared counters and dedup sets
    pub(crate) state: Arc<EngineState>,
    /// Queue handle for fan-out (follow-up discovery, downloads)
    pub(crate) queue: TaskQueue,
    /// Event broadcast channel
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Signals the coordinator that a threshold checkpoint is due
    pub(crate) checkpoint_tx: mpsc::UnboundedSender<()>,
}

impl WorkerContext {
    /// Emit an event; silently dropped when nobody subscribes
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

/// Spawn the fixed worker pool over a shared queue receiver
///
/// Workers pull tasks one at a time; the receiver lock is held only across
/// the `recv`, never while a task runs, so pool concurrency equals the
/// worker count.
pub(crate) fn spawn_workers(
    ctx: Arc<WorkerContext>,
    rx: mpsc::UnboundedReceiver<Task>,
    worker_count: usize,
) -> Vec<tokio::task::JoinHandle<()>> {
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    (0..worker_count)
        .map(|worker_id| {
            let ctx = ctx.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                worker_loop(ctx, rx, worker_id).await;
            })
        })
        .collect()
}

async fn worker_loop(
    ctx: Arc<WorkerContext>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Task>>>,
    worker_id: usize,
) {
    loop {
        let task = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };

        let Some(task) = task else {
            tracing::debug!(worker_id, "Queue closed, worker exiting");
            break;
        };

        let kind = task.kind();
        match task {
            Task::Discover { source, cursor } => {
                discovery::run_discovery(&ctx, source, cursor).await;
            }
            Task::Download { asset } => {
                download::run_download(&ctx, asset).await;
            }
        }
        ctx.state.task_finished(kind);
    }
}
