use async_trait::async_trait;
use hyper::StatusCode;
use selfupdate_utils::{Context, HttpClient, HttpError, Logger};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::data::Release;
use crate::error::ProviderError;

/// Version selector meaning "the most recent published release".
pub const LATEST: &str = "latest";

pub const USER_AGENT: &str = concat!("selfupdate/", env!("CARGO_PKG_VERSION"));

/// Everything a provider needs to talk to one repository.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Overrides the provider's default API base URL
    pub api_base_url: Option<String>,
    pub owner: String,
    pub repo: String,
    /// Rendered asset name; informational only, matching happens in the caller
    pub filter: String,
    pub token: Option<String>,
    pub http_client: Arc<dyn HttpClient>,
    pub logger: Logger,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_base_url", &self.api_base_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("filter", &self.filter)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Base URL without a trailing slash, or `default` when not overridden.
    pub fn base_url_or(&self, default: &str) -> String {
        self.api_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    /// Token, unless missing or blank.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Capability set every release API family implements.
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    /// Short lowercase provider name, e.g. `"github"`.
    fn name(&self) -> &'static str;

    /// API path for a version selector: [`LATEST`] maps to the most recent
    /// release, anything else to the release with that literal tag.
    fn version_path(&self, version: &str) -> String;

    /// Fetches and decodes one release with a single GET request.
    async fn fetch_release(&self, ctx: &Context, version: &str) -> Result<Release, ProviderError>;
}

pub fn json_headers(authorization: Option<String>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("Accept".to_string(), "application/json".to_string());
    map.insert("User-Agent".to_string(), USER_AGENT.to_string());
    if let Some(value) = authorization {
        map.insert("Authorization".to_string(), value);
    }
    map
}

/// GETs `url` under `ctx` and decodes a `200 OK` JSON body.
pub async fn request_json<T: DeserializeOwned>(
    ctx: &Context,
    client: &dyn HttpClient,
    url: &str,
    header_map: &HashMap<String, String>,
) -> Result<T, ProviderError> {
    let body = ctx
        .run(async {
            let rsp = client.get(url, header_map).await?;
            if rsp.status() != StatusCode::OK {
                return Err(HttpError::remote(url, rsp.status()));
            }
            rsp.bytes().await
        })
        .await??;

    serde_json::from_slice(&body).map_err(|source| ProviderError::Decode {
        url: url.to_string(),
        source,
    })
}
