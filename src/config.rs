//! Configuration types for artifact-mirror

use crate::types::{AssetSelection, CompletionPolicy, ListingMode};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Remote service connection settings
///
/// Credentials are attached as HTTP basic auth to every request the crate
/// makes (listing, repository discovery, and raw content fetches alike)
/// whenever `authenticate` is set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the repository service (e.g. `http://nexus.example.com:8081`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whether to attach HTTP basic credentials to requests
    #[serde(default)]
    pub authenticate: bool,

    /// Username for basic auth (ignored unless `authenticate` is set)
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic auth (ignored unless `authenticate` is set)
    #[serde(default)]
    pub password: Option<String>,

    /// TCP connect timeout (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Whole-request timeout, covering slow listing queries (default: 180 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            authenticate: false,
            username: None,
            password: None,
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl RemoteConfig {
    /// Basic-auth credentials when authentication is enabled and a username is set
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        if !self.authenticate {
            return None;
        }
        self.username
            .as_deref()
            .map(|user| (user, self.password.as_deref()))
    }
}

/// Export behavior settings (output layout, concurrency, cadence, policies)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Base output directory; each repository is exported into
    /// `<output_dir>/<repository>` (default: "./exports")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Number of pool workers processing discovery and download tasks (default: 4)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Which listing endpoint(s) seed discovery
    #[serde(default)]
    pub listing_mode: ListingMode,

    /// Which discovered assets are downloaded
    #[serde(default)]
    pub selection: AssetSelection,

    /// Whether abandoned work blocks the completion marker
    #[serde(default)]
    pub completion: CompletionPolicy,

    /// Pause before following a continuation cursor, to go easy on the remote
    /// (default: none)
    #[serde(default, with = "duration_serde")]
    pub page_delay: Duration,

    /// Interval between coordinator polls; every poll writes a checkpoint and
    /// reports progress (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Additionally checkpoint after this many assets processed since the last
    /// snapshot (default: 10)
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            worker_count: default_worker_count(),
            listing_mode: ListingMode::default(),
            selection: AssetSelection::default(),
            completion: CompletionPolicy::default(),
            page_delay: Duration::ZERO,
            poll_interval: default_poll_interval(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

/// Retry configuration for transient failures
///
/// `max_attempts` counts retries after the first try: `max_attempts: 2` means
/// up to three tries in total.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before the first retry
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (backoff cap)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Defaults for listing pages: a remote busy enough to time out its own
    /// query engine needs long, patient backoff (30s doubling up to 5 minutes,
    /// five tries in total).
    pub fn listing_default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Defaults for content fetches: short growing delays, three tries in
    /// total, so one bad asset does not hold a worker for long.
    pub fn download_default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

/// Settings for the export-all driver
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Repository names to skip entirely (mirrors of public registries, etc.)
    #[serde(default)]
    pub excluded_repositories: Vec<String>,

    /// Also export proxy repositories (default: hosted only)
    #[serde(default)]
    pub include_proxy: bool,

    /// Tries per repository before recording it as failed (default: 3)
    #[serde(default = "default_repository_attempts")]
    pub repository_attempts: u32,

    /// Base delay between tries of one repository; grows linearly with the
    /// attempt number (default: 10 seconds)
    #[serde(default = "default_repository_retry_delay", with = "duration_serde")]
    pub repository_retry_delay: Duration,

    /// Pause between repositories to reduce server load (default: 2 seconds)
    #[serde(default = "default_repository_pause", with = "duration_serde")]
    pub repository_pause: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            excluded_repositories: Vec::new(),
            include_proxy: false,
            repository_attempts: default_repository_attempts(),
            repository_retry_delay: default_repository_retry_delay(),
            repository_pause: default_repository_pause(),
        }
    }
}

/// Main configuration for an export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Remote service connection settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Export behavior settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Retry policy for listing pages
    #[serde(default = "RetryConfig::listing_default")]
    pub listing_retry: RetryConfig,

    /// Retry policy for content fetches and verification
    #[serde(default = "RetryConfig::download_default")]
    pub download_retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            export: ExportConfig::default(),
            listing_retry: RetryConfig::listing_default(),
            download_retry: RetryConfig::download_default(),
        }
    }
}

impl Config {
    /// Convenience constructor for the common case: remote base URL plus
    /// output directory, everything else at defaults.
    pub fn new(base_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote: RemoteConfig {
                base_url: base_url.into(),
                ..Default::default()
            },
            export: ExportConfig {
                output_dir: output_dir.into(),
                ..Default::default()
            },
            listing_retry: RetryConfig::listing_default(),
            download_retry: RetryConfig::download_default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(180)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./exports")
}

fn default_worker_count() -> usize {
    4
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_checkpoint_every() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_repository_attempts() -> u32 {
    3
}

fn default_repository_retry_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_repository_pause() -> Duration {
    Duration::from_secs(2)
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = Config::default();
        assert_eq!(config.remote.base_url, "http://localhost:8081");
        assert_eq!(config.export.worker_count, 4);
        assert_eq!(config.export.listing_mode, ListingMode::Exhaustive);
        assert_eq!(config.export.completion, CompletionPolicy::RequireComplete);
        assert!(config.remote.credentials().is_none());
    }

    #[test]
    fn credentials_require_authenticate_flag() {
        let mut remote = RemoteConfig {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(remote.credentials().is_none());

        remote.authenticate = true;
        let (user, pass) = remote.credentials().unwrap();
        assert_eq!(user, "admin");
        assert_eq!(pass, Some("secret"));
    }

    #[test]
    fn retry_defaults_match_documented_totals() {
        let listing = RetryConfig::listing_default();
        assert_eq!(listing.max_attempts, 4, "five tries in total");
        assert_eq!(listing.initial_delay, Duration::from_secs(30));
        assert_eq!(listing.max_delay, Duration::from_secs(300));

        let download = RetryConfig::download_default();
        assert_eq!(download.max_attempts, 2, "three tries in total");
        assert!(!download.jitter);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = Config::new("http://nexus.local:8081", "/tmp/exports");
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.remote.base_url, "http://nexus.local:8081");
        assert_eq!(back.export.output_dir, PathBuf::from("/tmp/exports"));
        assert_eq!(back.listing_retry.max_attempts, 4);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{"remote": {"base_url": "http://h"}}"#).unwrap();
        assert_eq!(config.remote.base_url, "http://h");
        assert_eq!(config.export.checkpoint_every, 10);
        assert_eq!(config.export.poll_interval, Duration::from_secs(5));
        assert_eq!(config.download_retry.max_attempts, 2);
    }
}
