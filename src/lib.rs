//! # artifact-mirror
//!
//! Concurrent, resumable bulk exporter for binary artifact repositories.
//!
//! Points at a Nexus-style repository service, discovers every asset through
//! the paginated listing API, downloads each one through a bounded worker
//! pool, verifies it against the reported checksum, and checkpoints progress
//! so an interrupted export resumes without re-downloading finished work.
//!
//! ## Design Philosophy
//!
//! - **Resumable by default** - progress is checkpointed throughout; killing
//!   the process is a supported way to stop
//! - **Partial-failure isolation** - one bad asset or listing page never
//!   aborts the run
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use artifact_mirror::{Config, RepositoryExporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("http://nexus.example.com:8081", "./exports");
//!     let exporter = RepositoryExporter::new(config, "libs-release")?;
//!
//!     // Subscribe to events
//!     let mut events = exporter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = exporter.export().await?;
//!     println!(
//!         "Exported {} of {} assets",
//!         report.assets_processed, report.assets_found
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Durable checkpoint and completion marker persistence
pub mod checkpoint;
/// Checksum computation and verification
pub mod checksum;
/// HTTP access to the remote repository service
pub mod client;
/// Configuration types
pub mod config;
/// Export-all driver looping over every eligible repository
pub mod driver;
/// The export engine (coordinator, worker pool, discovery and download tasks)
pub mod engine;
/// Error types
pub mod error;
/// Safe resolution of remote asset paths
pub mod paths;
/// Retry logic with exponential backoff
pub mod retry;
/// Latest-version selection
pub mod selection;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use client::RemoteClient;
pub use config::{Config, DriverConfig, ExportConfig, RemoteConfig, RetryConfig};
pub use driver::{ExportAllSummary, export_all};
pub use engine::RepositoryExporter;
pub use error::{Error, Result};
pub use types::{
    AssetChecksum, AssetDescriptor, AssetId, AssetSelection, CompletionMarker, CompletionPolicy,
    Event, ExportOutcome, ExportReport, ListingMode, ListingSource, RepositoryDescriptor,
};
