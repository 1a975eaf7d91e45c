//! Download task: turn one asset descriptor into a verified local file.
//!
//! Check, fetch, verify, strictly in that order. A file already present
//! with a matching digest short-circuits the fetch entirely, which is what
//! makes re-running an interrupted export cheap. Failures are absorbed here:
//! one bad asset never aborts the run or any sibling task.

use crate::checksum;
use crate::error::Error;
use crate::paths::resolve_asset_path;
use crate::retry::retry_with_backoff;
use crate::types::{AssetDescriptor, Event};

use super::worker::WorkerContext;

/// Process one asset end to end
pub(crate) async fn run_download(ctx: &WorkerContext, asset: AssetDescriptor) {
    // Another task can never be scheduled for the same path within a run
    // (id dedup guarantees it), so this only trips on pathological listings
    // where two ids map to one path
    if ctx.state.downloaded_paths.contains(&asset.path) {
        tracing::debug!(path = %asset.path, "Path already exported, skipping");
        complete(ctx, &asset, true);
        return;
    }

    let dest = match resolve_asset_path(&ctx.export_root, &asset.path) {
        Ok(dest) => dest,
        Err(e) => {
            give_up(ctx, &asset, &e);
            return;
        }
    };

    // Checking: an existing file with the right digest needs no fetch
    if checksum::file_matches(&dest, &asset.checksum).await {
        tracing::info!(path = %asset.path, "Existing file matches checksum, skipping fetch");
        complete(ctx, &asset, true);
        return;
    }

    // Fetching/Verifying, bounded by the download retry budget. The digest is
    // computed while the body streams to disk; a mismatch surfaces as a
    // retryable integrity error.
    let expected = asset
        .checksum
        .preferred()
        .map(|(algo, digest)| (algo, digest.to_string()));
    if expected.is_none() {
        tracing::debug!(path = %asset.path, "No checksum reported, accepting content unverified");
    }

    let fetched = retry_with_backoff(&ctx.config.download_retry, || {
        let expected = expected.clone();
        let dest = dest.clone();
        let asset = &asset;
        async move {
            let algo = expected.as_ref().map(|(algo, _)| *algo);
            let actual = ctx
                .client
                .download_to_file(&asset.download_url, &dest, algo)
                .await?;

            if let (Some((_, expected_hex)), Some(actual_hex)) = (expected, actual)
                && !checksum::digest_matches(&expected_hex, &actual_hex)
            {
                return Err(Error::Integrity {
                    path: asset.path.clone(),
                    expected: expected_hex,
                    actual: actual_hex,
                });
            }
            Ok(())
        }
    })
    .await;

    match fetched {
        Ok(()) => {
            tracing::info!(path = %asset.path, size = asset.size_bytes, "Asset downloaded and verified");
            complete(ctx, &asset, false);
        }
        Err(e) => give_up(ctx, &asset, &e),
    }
}

/// Terminal success: account for the asset and maybe request a checkpoint
fn complete(ctx: &WorkerContext, asset: &AssetDescriptor, already_valid: bool) {
    ctx.state.downloaded_paths.insert(asset.path.clone());
    let checkpoint_due = ctx
        .state
        .record_processed(ctx.config.export.checkpoint_every);
    if checkpoint_due {
        ctx.checkpoint_tx.send(()).ok();
    }
    ctx.emit(Event::AssetCompleted {
        path: asset.path.clone(),
        already_valid,
    });
}

/// Terminal failure: log, count, move on; siblings are unaffected
fn give_up(ctx: &WorkerContext, asset: &AssetDescriptor, error: &Error) {
    ctx.state.record_failed();
    tracing::error!(
        path = %asset.path,
        url = %asset.download_url,
        error = %error,
        "Asset failed, skipping"
    );
    ctx.emit(Event::AssetFailed {
        path: asset.path.clone(),
        error: error.to_string(),
    });
}
