//! HTTP access to the remote repository service, split by endpoint:
//! - [`listing`] - paginated asset listing (assets and search variants)
//! - [`content`] - raw content fetch for a single asset
//! - [`repositories`] - repository-list endpoint used by the driver
//!
//! One [`RemoteClient`] is shared across every request of an export. Basic
//! credentials, when enabled, are attached uniformly: the listing endpoints
//! and the raw content URLs are served by the same host and the same
//! authentication realm.

mod content;
mod listing;
mod repositories;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use url::Url;

/// Shared HTTP client for one remote repository service
#[derive(Clone)]
pub struct RemoteClient {
    /// Underlying reqwest client with connect/request timeouts applied
    http: reqwest::Client,
    /// Parsed service base URL
    base_url: Url,
    /// Basic-auth credentials, when authentication is enabled
    credentials: Option<(String, Option<String>)>,
}

impl RemoteClient {
    /// Build a client from remote connection settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] when the configured base URL does not
    /// parse, or a network error when the HTTP client cannot be constructed.
    pub fn new(remote: &RemoteConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(remote.connect_timeout)
            .timeout(remote.request_timeout)
            .build()?;

        let base_url = Url::parse(&remote.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", remote.base_url)))?;

        let credentials = remote
            .credentials()
            .map(|(user, pass)| (user.to_string(), pass.map(str::to_string)));

        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// The configured base URL as a string (for reports and markers)
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build a service endpoint URL from path segments under the base URL
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue a GET with credentials attached, mapping non-success statuses
    /// to [`Error::RemoteStatus`]
    pub(crate) async fn get(&self, url: Url) -> Result<reqwest::Response> {
        let mut request = self.http.get(url.clone());
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, pass.as_deref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}
