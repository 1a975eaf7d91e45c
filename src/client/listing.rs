//! Paginated asset listing.
//!
//! Both endpoint variants (the exhaustive assets walk and the faster search
//! index) return the same page shape, so one fetch path serves both.

use crate::error::Result;
use crate::types::{AssetPage, ListingSource};

use super::RemoteClient;

/// Query parameter carrying the repository id
const REPOSITORY_PARAM: &str = "repository";
/// Query parameter carrying the pagination cursor
const CONTINUATION_PARAM: &str = "continuationToken";

impl RemoteClient {
    /// Fetch one page of asset descriptors for a repository
    ///
    /// # Arguments
    ///
    /// * `repository` - repository id to list
    /// * `source` - which listing endpoint to hit
    /// * `cursor` - continuation cursor from the previous page, `None` for the first
    ///
    /// # Errors
    ///
    /// 5xx responses and timeouts come back as retryable errors (the discovery
    /// task wraps this call in backoff); anything else is fatal for the page.
    pub async fn fetch_page(
        &self,
        repository: &str,
        source: ListingSource,
        cursor: Option<&str>,
    ) -> Result<AssetPage> {
        let mut url = self.endpoint(source.path_segments())?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(REPOSITORY_PARAM, repository);
            if let Some(token) = cursor {
                query.append_pair(CONTINUATION_PARAM, token);
            }
        }

        tracing::debug!(
            repository,
            source = source.key(),
            cursor = cursor.unwrap_or("initial"),
            "Fetching listing page"
        );

        let response = self.get(url).await?;
        let page: AssetPage = response.json().await?;

        tracing::debug!(
            repository,
            source = source.key(),
            items = page.items.len(),
            has_next = page.continuation_token.is_some(),
            "Listing page received"
        );

        Ok(page)
    }
}
