//! Repository-list endpoint, consumed by the export-all driver.

use crate::error::Result;
use crate::types::RepositoryDescriptor;

use super::RemoteClient;

impl RemoteClient {
    /// List every repository the remote service exposes
    ///
    /// The driver filters the result (online, content-holding type, not
    /// excluded) before handing individual repositories to the engine.
    pub async fn list_repositories(&self) -> Result<Vec<RepositoryDescriptor>> {
        let url = self.endpoint(&["service", "rest", "v1", "repositories"])?;
        tracing::info!(url = %url, "Discovering repositories");

        let response = self.get(url).await?;
        let repositories: Vec<RepositoryDescriptor> = response.json().await?;

        tracing::info!(count = repositories.len(), "Repositories discovered");
        Ok(repositories)
    }
}
