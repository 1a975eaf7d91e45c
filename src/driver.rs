//! Export-all driver: a thin sequential wrapper that runs one engine
//! invocation per repository.
//!
//! The driver discovers repositories, filters them down to the ones worth
//! exporting, and walks the list with bounded per-repository retries. Its own
//! durable state is one JSON status file in the base output directory; the
//! per-repository completion markers remain the source of truth for
//! "needs no further work".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::client::RemoteClient;
use crate::config::{Config, DriverConfig, RetryConfig};
use crate::engine::RepositoryExporter;
use crate::error::{Error, Result};
use crate::retry::retry_with_backoff;
use crate::types::{RepositoryDescriptor, RepositoryType};

/// Driver status filename inside the base output directory
pub const STATUS_FILE: &str = ".artifact-export-all-status.json";

/// Durable driver progress across repositories
#[derive(Clone, Debug, Serialize, Deserialize)]
struct DriverStatus {
    /// Repositories whose export completed
    #[serde(default)]
    completed: BTreeSet<String>,

    /// Repositories whose export failed or finished with gaps
    #[serde(default)]
    failed: BTreeSet<String>,

    /// When this status was written
    last_update: DateTime<Utc>,
}

impl DriverStatus {
    fn empty() -> Self {
        Self {
            completed: BTreeSet::new(),
            failed: BTreeSet::new(),
            last_update: Utc::now(),
        }
    }
}

/// Final tally of an export-all run
#[derive(Clone, Debug, Default)]
pub struct ExportAllSummary {
    /// Repositories exported successfully (this run or a previous one)
    pub completed: Vec<String>,

    /// Repositories that still need work after all attempts
    pub failed: Vec<String>,

    /// Repositories filtered out before any export attempt
    pub skipped: Vec<String>,
}

/// Export every eligible repository of the remote service
///
/// Eligible means: online, of a content-holding type (hosted, plus proxy when
/// configured), not excluded by name, and not already recorded as completed.
/// Repositories are exported sequentially; one failing repository never stops
/// the loop.
///
/// # Errors
///
/// Returns an error when the base output directory cannot be prepared or the
/// repository list cannot be fetched within the retry budget. Per-repository
/// failures are reported through the summary instead.
pub async fn export_all(config: Config, driver: DriverConfig) -> Result<ExportAllSummary> {
    let started = std::time::Instant::now();
    let client = RemoteClient::new(&config.remote)?;

    let base_dir = config.export.output_dir.clone();
    tokio::fs::create_dir_all(&base_dir)
        .await
        .map_err(|e| Error::setup(format!("cannot create base output directory: {e}"), &base_dir))?;

    let status_path = base_dir.join(STATUS_FILE);
    let mut status = load_status(&status_path).await;
    if !status.completed.is_empty() {
        tracing::info!(
            completed = status.completed.len(),
            "Resuming export-all, skipping repositories already completed"
        );
    }
    if !status.failed.is_empty() {
        tracing::info!(
            failed = status.failed.len(),
            "Previous failures recorded, those repositories will be retried"
        );
    }

    let repositories = fetch_repository_list(&client, &driver).await?;
    let (eligible, skipped) = partition_repositories(repositories, &driver, &status);
    tracing::info!(
        eligible = eligible.len(),
        skipped = skipped.len(),
        "Repository list filtered"
    );

    let total = eligible.len();
    for (index, repo) in eligible.iter().enumerate() {
        tracing::info!(
            repository = %repo.name,
            format = %repo.format,
            repo_type = ?repo.repo_type,
            position = index + 1,
            total,
            "Exporting repository"
        );

        let success = export_one_repository(&config, &driver, &repo.name).await;
        if success {
            status.failed.remove(&repo.name);
            status.completed.insert(repo.name.clone());
        } else {
            status.failed.insert(repo.name.clone());
        }

        status.last_update = Utc::now();
        save_status(&status_path, &status).await;

        if index + 1 < total && !driver.repository_pause.is_zero() {
            tokio::time::sleep(driver.repository_pause).await;
        }
    }

    if status.failed.is_empty() {
        if let Err(e) = tokio::fs::remove_file(&status_path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(error = %e, "Could not remove driver status file");
        }
    }

    tracing::info!(
        completed = status.completed.len(),
        failed = status.failed.len(),
        elapsed_secs = started.elapsed().as_secs(),
        "Export-all finished"
    );

    Ok(ExportAllSummary {
        completed: status.completed.into_iter().collect(),
        failed: status.failed.into_iter().collect(),
        skipped,
    })
}

/// Fetch the repository list within the driver's retry budget
async fn fetch_repository_list(
    client: &RemoteClient,
    driver: &DriverConfig,
) -> Result<Vec<RepositoryDescriptor>> {
    let retry = RetryConfig {
        max_attempts: driver.repository_attempts.saturating_sub(1),
        initial_delay: driver.repository_retry_delay,
        max_delay: driver.repository_retry_delay * 4,
        backoff_multiplier: 2.0,
        jitter: false,
    };
    retry_with_backoff(&retry, || client.list_repositories()).await
}

/// Split the repository list into (eligible, skipped-names)
fn partition_repositories(
    repositories: Vec<RepositoryDescriptor>,
    driver: &DriverConfig,
    status: &DriverStatus,
) -> (Vec<RepositoryDescriptor>, Vec<String>) {
    let mut eligible = Vec::new();
    let mut skipped = Vec::new();

    for repo in repositories {
        let wanted_type = repo.repo_type == RepositoryType::Hosted
            || (driver.include_proxy && repo.repo_type == RepositoryType::Proxy);
        let excluded = driver.excluded_repositories.contains(&repo.name);
        let already_done = status.completed.contains(&repo.name);

        if repo.online && wanted_type && !excluded && !already_done {
            eligible.push(repo);
        } else {
            tracing::info!(
                repository = %repo.name,
                online = repo.online,
                repo_type = ?repo.repo_type,
                excluded,
                already_done,
                "Skipping repository"
            );
            skipped.push(repo.name);
        }
    }

    (eligible, skipped)
}

/// Export one repository with bounded attempts; true means fully complete
async fn export_one_repository(config: &Config, driver: &DriverConfig, repository: &str) -> bool {
    let exporter = match RepositoryExporter::new(config.clone(), repository) {
        Ok(exporter) => exporter,
        Err(e) => {
            tracing::error!(repository, error = %e, "Could not construct exporter");
            return false;
        }
    };

    if exporter.is_complete() {
        tracing::info!(repository, "Completion marker present, nothing to do");
        return true;
    }

    let attempts = driver.repository_attempts.max(1);
    for attempt in 1..=attempts {
        match exporter.export().await {
            Ok(report) if report.outcome.is_complete() => {
                tracing::info!(
                    repository,
                    processed = report.assets_processed,
                    found = report.assets_found,
                    "Repository export complete"
                );
                return true;
            }
            Ok(report) => {
                tracing::warn!(
                    repository,
                    attempt,
                    attempts,
                    processed = report.assets_processed,
                    found = report.assets_found,
                    "Repository export finished with gaps"
                );
            }
            Err(e) => {
                tracing::error!(repository, attempt, attempts, error = %e, "Repository export failed");
            }
        }

        if attempt < attempts {
            // Linearly growing pause between attempts on the same repository
            let delay = driver.repository_retry_delay * attempt;
            tracing::info!(repository, delay_secs = delay.as_secs(), "Retrying repository");
            tokio::time::sleep(delay).await;
        }
    }

    false
}

/// Load the driver status, treating any problem as a fresh start
async fn load_status(path: &Path) -> DriverStatus {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "Could not parse driver status, starting fresh");
                DriverStatus::empty()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DriverStatus::empty(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read driver status, starting fresh");
            DriverStatus::empty()
        }
    }
}

/// Persist the driver status; failures are logged, never fatal
async fn save_status(path: &Path, status: &DriverStatus) {
    let json = match serde_json::to_vec_pretty(status) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Could not serialize driver status");
            return;
        }
    };
    if let Err(e) = tokio::fs::write(path, json).await {
        tracing::error!(error = %e, path = %path.display(), "Could not write driver status");
    }
}
