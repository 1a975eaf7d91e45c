//! Error types for artifact-mirror
//!
//! This module provides the error taxonomy for the library:
//! - Setup errors that abort an export before any task runs
//! - Remote errors, split into transient (retried with backoff) and fatal
//! - Integrity errors for checksum mismatches (retried within a small budget)
//! - State errors for checkpoint persistence (logged, never fatal to a run)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for artifact-mirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for artifact-mirror
///
/// Each variant carries enough context to diagnose the failure. Whether a
/// variant is retried is decided centrally by the `IsRetryable` impl in
/// [`crate::retry`], not at the error sites.
#[derive(Debug, Error)]
pub enum Error {
    /// Export setup failed (missing/unwritable output directory, bad configuration).
    /// Always fatal: surfaced before any task has started.
    #[error("setup error: {message}")]
    Setup {
        /// Human-readable description of the setup problem
        message: String,
        /// The path involved, when the problem is directory-related
        path: Option<PathBuf>,
    },

    /// Network-level error from the HTTP client (connect failure, timeout, protocol error)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-success HTTP status
    #[error("remote returned {status} for {url}")]
    RemoteStatus {
        /// HTTP status code returned by the remote service
        status: u16,
        /// The request URL that produced the status
        url: String,
    },

    /// Downloaded content did not match the expected checksum
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Integrity {
        /// Repository-relative path of the asset
        path: String,
        /// Expected hex digest from the asset descriptor
        expected: String,
        /// Hex digest actually computed over the fetched bytes
        actual: String,
    },

    /// An asset's logical path cannot be placed inside the export root
    #[error("unsafe asset path: {path}")]
    UnsafePath {
        /// The offending logical path as reported by the remote
        path: String,
    },

    /// Checkpoint or marker persistence failed.
    /// Callers log this and continue with best-effort persistence.
    #[error("state persistence error: {0}")]
    State(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configured URL could not be parsed or extended with path segments
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The export was asked to stop and is no longer scheduling work
    #[error("shutdown in progress: not scheduling new tasks")]
    ShuttingDown,
}

impl Error {
    /// Build a setup error with a path attached.
    pub fn setup(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Error::Setup {
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = Error::RemoteStatus {
            status: 503,
            url: "http://nexus.local/service/rest/v1/assets".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("/service/rest/v1/assets"));
    }

    #[test]
    fn integrity_display_names_both_digests() {
        let err = Error::Integrity {
            path: "org/demo/lib-1.0.jar".to_string(),
            expected: "aaaa".to_string(),
            actual: "bbbb".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aaaa") && msg.contains("bbbb"));
    }

    #[test]
    fn setup_helper_attaches_path() {
        let err = Error::setup("not a directory", "/tmp/somewhere");
        match err {
            Error::Setup { path, .. } => {
                assert_eq!(path.unwrap(), PathBuf::from("/tmp/somewhere"))
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
