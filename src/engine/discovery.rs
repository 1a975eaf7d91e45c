//! Discovery task: consume one listing page, fan out the work it reveals.

use crate::retry::retry_with_backoff;
use crate::types::{AssetPage, AssetSelection, Event, ListingSource};

use super::worker::{Task, WorkerContext};

/// Key under which a cursor is recorded as consumed.
///
/// Cursors are opaque per endpoint, so keys are namespaced by source; the
/// first page of a chain (no cursor) gets the stable pseudo-cursor "initial".
pub(crate) fn cursor_key(source: ListingSource, cursor: Option<&str>) -> String {
    format!("{}:{}", source.key(), cursor.unwrap_or("initial"))
}

/// Process one listing page: dedup its assets, schedule downloads, follow the
/// continuation cursor, and absorb transient listing failures with backoff.
pub(crate) async fn run_discovery(
    ctx: &WorkerContext,
    source: ListingSource,
    cursor: Option<String>,
) {
    let token_key = cursor_key(source, cursor.as_deref());

    // Resume case: a previous run already fully consumed this page
    if ctx.state.completed_tokens.contains(&token_key) {
        tracing::debug!(
            repository = %ctx.repository,
            token = %token_key,
            "Skipping already processed listing page"
        );
        return;
    }

    let fetched = retry_with_backoff(&ctx.config.listing_retry, || {
        ctx.client
            .fetch_page(&ctx.repository, source, cursor.as_deref())
    })
    .await;

    match fetched {
        Ok(page) => handle_page(ctx, source, &token_key, page).await,
        Err(e) => {
            // The assets on this page are missed for this run; siblings continue
            ctx.state.record_page_abandoned();
            tracing::error!(
                repository = %ctx.repository,
                source = source.key(),
                cursor = cursor.as_deref().unwrap_or("initial"),
                error = %e,
                "Listing page abandoned after exhausting retries"
            );
            ctx.emit(Event::PageAbandoned { source, cursor });
        }
    }
}

async fn handle_page(ctx: &WorkerContext, source: ListingSource, token_key: &str, page: AssetPage) {
    let latest_only = matches!(ctx.config.export.selection, AssetSelection::LatestOnly);
    let items = page.items.len();
    let mut new_assets = 0usize;

    for asset in page.items {
        // Cross-run resume: already written and verified, and already
        // accounted for in the restored counters
        if ctx.state.downloaded_paths.contains(&asset.path) {
            tracing::trace!(path = %asset.path, "Asset already exported, skipping");
            continue;
        }

        // Dedup across listing sources and against retried pages
        if !ctx.state.seen_asset_ids.insert(asset.id.clone()) {
            continue;
        }
        new_assets += 1;

        if latest_only {
            ctx.state.collect(asset).await;
        } else {
            ctx.state.record_found();
            ctx.queue.schedule(Task::Download { asset });
        }
    }

    // In latest-only mode a page's descriptors are only collected, not yet
    // downloaded, so the cursor must not be considered consumed by a resume
    if !latest_only {
        ctx.state.completed_tokens.insert(token_key.to_string());
    }

    tracing::info!(
        repository = %ctx.repository,
        source = source.key(),
        items,
        new_assets,
        "Listing page processed"
    );
    ctx.emit(Event::PageFetched {
        source,
        items,
        new_assets,
    });

    if let Some(next) = page.continuation_token {
        let next_key = cursor_key(source, Some(&next));
        if ctx.state.completed_tokens.contains(&next_key) {
            tracing::debug!(token = %next_key, "Next page already processed, stopping chain");
            return;
        }

        let delay = ctx.config.export.page_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        ctx.queue.schedule(Task::Discover {
            source,
            cursor: Some(next),
        });
    }
}
