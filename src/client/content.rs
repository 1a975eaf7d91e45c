//! Raw content fetch for a single asset.

use crate::checksum::{ChecksumAlgo, ContentHasher};
use crate::error::{Error, Result};
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::RemoteClient;

impl RemoteClient {
    /// Stream an asset's content to `dest`, overwriting any previous file
    ///
    /// The body is written chunk by chunk and fed to a digest at the same
    /// time, so verification never re-reads the file and large artifacts
    /// never sit fully in memory.
    ///
    /// # Arguments
    ///
    /// * `download_url` - absolute content URL from the asset descriptor
    /// * `dest` - resolved local target path (parents are created)
    /// * `algo` - digest to compute inline, `None` when nothing will be verified
    ///
    /// # Returns
    ///
    /// The lowercase hex digest of the written bytes, when `algo` was given.
    pub async fn download_to_file(
        &self,
        download_url: &str,
        dest: &Path,
        algo: Option<ChecksumAlgo>,
    ) -> Result<Option<String>> {
        let url = Url::parse(download_url)
            .map_err(|e| Error::InvalidUrl(format!("{download_url}: {e}")))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.get(url).await?;
        let mut stream = response.bytes_stream();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut hasher = algo.map(ContentHasher::new);
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            if let Some(h) = &mut hasher {
                h.update(&chunk);
            }
            written += chunk.len() as u64;
        }

        file.flush().await?;
        tracing::trace!(dest = %dest.display(), bytes = written, "Content written");

        Ok(hasher.map(ContentHasher::finalize_hex))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTENT: &[u8] = b"hello world";
    const SHA1_HEX: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    async fn client(server: &MockServer) -> RemoteClient {
        RemoteClient::new(&RemoteConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn downloads_and_digests_in_one_pass() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repository/libs/org/demo/a.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(CONTENT))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("org/demo/a.jar");
        let url = format!("{}/repository/libs/org/demo/a.jar", server.uri());

        let digest = client(&server)
            .await
            .download_to_file(&url, &dest, Some(ChecksumAlgo::Sha1))
            .await
            .unwrap();

        assert_eq!(digest.as_deref(), Some(SHA1_HEX));
        assert_eq!(std::fs::read(&dest).unwrap(), CONTENT);
    }

    #[tokio::test]
    async fn overwrites_previous_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(CONTENT))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.bin");
        std::fs::write(&dest, b"stale bytes from an interrupted run, longer than the new body")
            .unwrap();

        client(&server)
            .await
            .download_to_file(&format!("{}/a.bin", server.uri()), &dest, None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), CONTENT);
    }

    #[tokio::test]
    async fn remote_failure_surfaces_before_any_write() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.bin"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("gone.bin");

        let err = client(&server)
            .await
            .download_to_file(&format!("{}/gone.bin", server.uri()), &dest, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::error::Error::RemoteStatus { status: 500, .. }
        ));
        assert!(!dest.exists(), "failed fetch must not leave a file behind");
    }
}
