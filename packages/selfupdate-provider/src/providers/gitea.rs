use async_trait::async_trait;
use chrono::{DateTime, Utc};
use selfupdate_utils::{Context, HttpClient, Logger};
use serde::Deserialize;
use std::sync::Arc;

use crate::base_provider::*;
use crate::data::{display_name, Asset, Release};
use crate::error::ProviderError;

pub const GITEA_URL: &str = "https://gitea.com";
const GITEA_API_PREFIX: &str = "/api/v1";

/// Gitea release payload.
///
/// Drafts carry no `published_at`; the API reports it as the zero time or
/// omits it depending on the server version.
#[derive(Debug, Deserialize)]
struct GiteaRelease {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    #[serde(default, deserialize_with = "deserialize_published_at")]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<GiteaAttachment>,
}

#[derive(Debug, Deserialize)]
struct GiteaAttachment {
    name: String,
    size: u64,
    browser_download_url: String,
}

fn deserialize_published_at<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let published = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(published.filter(|time| time.timestamp() > 0))
}

impl From<GiteaRelease> for Release {
    fn from(release: GiteaRelease) -> Self {
        Release {
            name: display_name(release.name, &release.tag_name),
            tag_name: release.tag_name,
            page_url: release.html_url,
            notes: release.body.unwrap_or_default(),
            published_at: release.published_at,
            assets: release
                .assets
                .into_iter()
                .map(|attachment| Asset {
                    name: attachment.name,
                    size: attachment.size,
                    download_url: attachment.browser_download_url,
                })
                .collect(),
        }
    }
}

/// Gitea (and Forgejo) releases API. The base URL is the instance root, the
/// `/api/v1` prefix is added here.
pub struct GiteaProvider {
    base_url: String,
    owner: String,
    repo: String,
    filter: String,
    token: Option<String>,
    client: Arc<dyn HttpClient>,
    logger: Logger,
}

impl GiteaProvider {
    pub fn new(config: ProviderConfig) -> Self {
        GiteaProvider {
            base_url: config.base_url_or(GITEA_URL),
            token: config.token().map(str::to_string),
            owner: config.owner,
            repo: config.repo,
            filter: config.filter,
            client: config.http_client,
            logger: config.logger,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_token_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("token {}", token))
    }
}

#[async_trait]
impl ReleaseProvider for GiteaProvider {
    fn name(&self) -> &'static str {
        "gitea"
    }

    fn version_path(&self, version: &str) -> String {
        if version == LATEST {
            format!(
                "{}/repos/{}/{}/releases/latest",
                GITEA_API_PREFIX, self.owner, self.repo
            )
        } else {
            format!(
                "{}/repos/{}/{}/releases/tags/{}",
                GITEA_API_PREFIX, self.owner, self.repo, version
            )
        }
    }

    async fn fetch_release(&self, ctx: &Context, version: &str) -> Result<Release, ProviderError> {
        let url = format!("{}{}", self.base_url, self.version_path(version));
        self.logger.debug(format_args!(
            "Fetching Gitea release {} for asset {}",
            url, self.filter
        ));

        let header_map = json_headers(self.get_token_header());
        let release: GiteaRelease =
            request_json(ctx, self.client.as_ref(), &url, &header_map).await?;
        Ok(release.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfupdate_utils::HyperClient;

    fn provider(base_url: Option<&str>, token: Option<&str>) -> GiteaProvider {
        GiteaProvider::new(ProviderConfig {
            api_base_url: base_url.map(str::to_string),
            owner: "tumaykin".to_string(),
            repo: "test-repository".to_string(),
            filter: "test-linux-amd64".to_string(),
            token: token.map(str::to_string),
            http_client: Arc::new(HyperClient::new().unwrap()),
            logger: Logger::global(),
        })
    }

    #[test]
    fn test_gitea_version_path() {
        let provider = provider(None, None);
        assert_eq!(
            provider.version_path(LATEST),
            "/api/v1/repos/tumaykin/test-repository/releases/latest"
        );
        assert_eq!(
            provider.version_path("1.0.0"),
            "/api/v1/repos/tumaykin/test-repository/releases/tags/1.0.0"
        );
    }

    #[test]
    fn test_gitea_base_url() {
        assert_eq!(provider(None, None).base_url(), GITEA_URL);
        assert_eq!(
            provider(Some("https://codeberg.org/"), None).base_url(),
            "https://codeberg.org"
        );
    }

    #[test]
    fn test_gitea_token_header() {
        assert_eq!(
            provider(None, Some("abc")).get_token_header(),
            Some("token abc".to_string())
        );
        assert_eq!(provider(None, None).get_token_header(), None);
    }

    #[test]
    fn test_gitea_zero_published_at() {
        let json = r#"{
            "id": 7,
            "tag_name": "1.1.0",
            "name": "",
            "body": "",
            "html_url": "https://gitea.com/o/r/releases/tag/1.1.0",
            "draft": true,
            "prerelease": false,
            "published_at": "0001-01-01T00:00:00Z",
            "assets": [
                {"id": 1, "name": "r-darwin-arm64", "size": 9, "download_count": 3,
                 "uuid": "b1c2", "browser_download_url": "https://gitea.com/o/r/releases/download/1.1.0/r-darwin-arm64"}
            ]
        }"#;
        let release: Release = serde_json::from_str::<GiteaRelease>(json).unwrap().into();
        assert_eq!(release.name, "1.1.0");
        assert!(release.published_at.is_none());
        assert_eq!(
            release.find_asset("r-darwin-arm64").unwrap().download_url,
            "https://gitea.com/o/r/releases/download/1.1.0/r-darwin-arm64"
        );
    }
}
