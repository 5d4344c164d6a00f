use async_trait::async_trait;
use chrono::{DateTime, Utc};
use selfupdate_utils::{Context, HttpClient, Logger};
use serde::Deserialize;
use std::sync::Arc;

use crate::base_provider::*;
use crate::data::{display_name, Asset, Release};
use crate::error::ProviderError;

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Release payload of `GET /repos/{owner}/{repo}/releases/...`.
#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    name: String,
    size: u64,
    browser_download_url: String,
}

impl From<GitHubRelease> for Release {
    fn from(release: GitHubRelease) -> Self {
        Release {
            name: display_name(release.name, &release.tag_name),
            tag_name: release.tag_name,
            page_url: release.html_url,
            notes: release.body.unwrap_or_default(),
            published_at: release.published_at,
            assets: release
                .assets
                .into_iter()
                .map(|asset| Asset {
                    name: asset.name,
                    size: asset.size,
                    download_url: asset.browser_download_url,
                })
                .collect(),
        }
    }
}

/// GitHub (and GitHub Enterprise, via the base URL override) releases API.
pub struct GitHubProvider {
    api_base_url: String,
    owner: String,
    repo: String,
    filter: String,
    token: Option<String>,
    client: Arc<dyn HttpClient>,
    logger: Logger,
}

impl GitHubProvider {
    pub fn new(config: ProviderConfig) -> Self {
        GitHubProvider {
            api_base_url: config.base_url_or(GITHUB_API_URL),
            token: config.token().map(str::to_string),
            owner: config.owner,
            repo: config.repo,
            filter: config.filter,
            client: config.http_client,
            logger: config.logger,
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn get_token_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {}", token))
    }
}

#[async_trait]
impl ReleaseProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn version_path(&self, version: &str) -> String {
        if version == LATEST {
            format!("/repos/{}/{}/releases/latest", self.owner, self.repo)
        } else {
            format!("/repos/{}/{}/releases/tags/{}", self.owner, self.repo, version)
        }
    }

    async fn fetch_release(&self, ctx: &Context, version: &str) -> Result<Release, ProviderError> {
        let url = format!("{}{}", self.api_base_url, self.version_path(version));
        self.logger.debug(format_args!(
            "Fetching GitHub release {} for asset {}",
            url, self.filter
        ));

        let header_map = json_headers(self.get_token_header());
        let release: GitHubRelease =
            request_json(ctx, self.client.as_ref(), &url, &header_map).await?;
        Ok(release.into())
    }
}
