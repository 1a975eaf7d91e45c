//! Checksum computation and verification
//!
//! Pure digest plumbing: which algorithm to use, incremental hashing while a
//! download streams to disk, and digesting an already-present file for the
//! skip-if-valid check. Policy (what to do on a mismatch) lives in the
//! download task, not here.

use crate::error::Result;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read buffer size for digesting files already on disk
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Digest algorithm used to verify an asset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumAlgo {
    /// SHA-1 (the digest every supported repository format reports)
    Sha1,
    /// SHA-256
    Sha256,
    /// MD5
    Md5,
}

impl ChecksumAlgo {
    /// Lowercase algorithm name for logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            ChecksumAlgo::Sha1 => "sha1",
            ChecksumAlgo::Sha256 => "sha256",
            ChecksumAlgo::Md5 => "md5",
        }
    }
}

impl std::fmt::Display for ChecksumAlgo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Incremental hasher fed chunk-by-chunk while content streams to disk
pub enum ContentHasher {
    /// SHA-1 state
    Sha1(Sha1),
    /// SHA-256 state
    Sha256(Sha256),
    /// MD5 state
    Md5(md5::Context),
}

impl ContentHasher {
    /// Start a hasher for the given algorithm
    pub fn new(algo: ChecksumAlgo) -> Self {
        match algo {
            ChecksumAlgo::Sha1 => ContentHasher::Sha1(Sha1::new()),
            ChecksumAlgo::Sha256 => ContentHasher::Sha256(Sha256::new()),
            ChecksumAlgo::Md5 => ContentHasher::Md5(md5::Context::new()),
        }
    }

    /// Feed one chunk of content
    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            ContentHasher::Sha1(h) => h.update(chunk),
            ContentHasher::Sha256(h) => h.update(chunk),
            ContentHasher::Md5(ctx) => ctx.consume(chunk),
        }
    }

    /// Finish and return the lowercase hex digest
    pub fn finalize_hex(self) -> String {
        match self {
            ContentHasher::Sha1(h) => hex::encode(h.finalize()),
            ContentHasher::Sha256(h) => hex::encode(h.finalize()),
            ContentHasher::Md5(ctx) => format!("{:x}", ctx.compute()),
        }
    }
}

/// Compare two hex digests, ignoring case
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}

/// Compute the hex digest of a file on disk
///
/// Reads in fixed-size chunks so large artifacts never load fully into memory.
pub async fn hash_file(path: &Path, algo: ChecksumAlgo) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = ContentHasher::new(algo);
    let mut buf = vec![0u8; HASH_BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize_hex())
}

/// Check whether an existing file matches the expected checksum
///
/// Returns `false` when the file cannot be read or no digest was reported;
/// either way the caller should (re-)download.
pub async fn file_matches(path: &Path, expected: &crate::types::AssetChecksum) -> bool {
    let Some((algo, digest)) = expected.preferred() else {
        return false;
    };

    match hash_file(path, algo).await {
        Ok(actual) => digest_matches(digest, &actual),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Could not digest existing file, will re-download");
            false
        }
    }
}
