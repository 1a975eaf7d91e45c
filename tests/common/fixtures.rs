//! Mock remote repository fixtures.
//!
//! Builds a wiremock server that behaves like a small repository service:
//! paginated listing endpoint plus one content endpoint per asset.

use std::path::Path;
use std::time::Duration;

use artifact_mirror::{Config, RetryConfig};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One asset the fixture repository serves
#[derive(Clone, Debug)]
pub struct FixtureAsset {
    pub id: String,
    pub path: String,
    pub content: Vec<u8>,
}

impl FixtureAsset {
    pub fn new(id: &str, asset_path: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.to_string(),
            path: asset_path.to_string(),
            content: content.into(),
        }
    }
}

/// Generate `count` small distinct assets under a common prefix
pub fn generated_assets(prefix: &str, count: usize) -> Vec<FixtureAsset> {
    (0..count)
        .map(|i| {
            FixtureAsset::new(
                &format!("{prefix}-{i}"),
                &format!("{prefix}/dir{}/file-{i}.bin", i % 7),
                format!("{prefix} content {i}").into_bytes(),
            )
        })
        .collect()
}

pub fn sha1_hex(content: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

fn asset_json(server_uri: &str, repo: &str, asset: &FixtureAsset) -> serde_json::Value {
    serde_json::json!({
        "id": asset.id,
        "path": asset.path,
        "downloadUrl": format!("{server_uri}/repository/{repo}/{}", asset.path),
        "repository": repo,
        "format": "raw",
        "checksum": {"sha1": sha1_hex(&asset.content)}
    })
}

/// Mount a repository on the server: paginated listing plus content routes
///
/// Pages are chained with cursors `page-1`, `page-2`, ... so pagination is
/// exercised whenever `assets.len() > page_size`.
pub async fn mount_repository(
    server: &MockServer,
    repo: &str,
    assets: &[FixtureAsset],
    page_size: usize,
) {
    let uri = server.uri();
    let chunks: Vec<&[FixtureAsset]> = if assets.is_empty() {
        vec![&[]]
    } else {
        assets.chunks(page_size.max(1)).collect()
    };
    let last = chunks.len() - 1;

    for (index, chunk) in chunks.iter().enumerate() {
        let items: Vec<serde_json::Value> =
            chunk.iter().map(|a| asset_json(&uri, repo, a)).collect();
        let next = if index < last {
            Some(format!("page-{}", index + 1))
        } else {
            None
        };
        let body = serde_json::json!({"items": items, "continuationToken": next});

        let mock = Mock::given(method("GET"))
            .and(path("/service/rest/v1/assets"))
            .and(query_param("repository", repo));
        let mock = if index == 0 {
            mock.and(query_param_is_missing("continuationToken"))
        } else {
            mock.and(query_param("continuationToken", format!("page-{index}")))
        };
        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    for asset in assets {
        Mock::given(method("GET"))
            .and(path(format!("/repository/{repo}/{}", asset.path)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(asset.content.clone()))
            .mount(server)
            .await;
    }
}

/// Mount the repository-list endpoint
pub async fn mount_repository_list(server: &MockServer, repos: &[(&str, &str, bool)]) {
    let body: Vec<serde_json::Value> = repos
        .iter()
        .map(|(name, repo_type, online)| {
            serde_json::json!({
                "name": name,
                "format": "raw",
                "type": repo_type,
                "online": online
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/service/rest/v1/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Config tuned for tests: tight poll cadence, millisecond retry delays
pub fn test_config(server: &MockServer, output_dir: &Path) -> Config {
    let mut config = Config::new(server.uri(), output_dir);
    config.export.poll_interval = Duration::from_millis(20);
    config.listing_retry = RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config.download_retry = RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}
