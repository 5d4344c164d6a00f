use chrono::{DateTime, Utc};
use selfupdate_provider::base_provider::USER_AGENT;
use selfupdate_provider::{create_provider, supported_types, ProviderConfig, Release, LATEST};
use selfupdate_utils::{Context, HttpClient, HttpError, HyperClient, Logger, Version, VersionError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::apply::{Apply, ApplyOptions};
use crate::config::{Config, RepositoryType};
use crate::error::{Error, Result, OP_CHECK_VERSION, OP_DOWNLOAD};
use crate::filter::{Filter, Template};

/// Release resolved for this host, with the matching asset picked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseResult {
    pub version: Version,
    pub tag_name: String,
    pub asset_name: String,
    pub asset_url: String,
    pub asset_byte_size: u64,
    pub page_url: String,
    pub release_notes: String,
    pub name: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl ReleaseResult {
    fn from_release(release: &Release, asset_name: &str) -> Result<Self> {
        let asset = release
            .find_asset(asset_name)
            .ok_or_else(|| Error::AssetNotFound {
                asset: asset_name.to_string(),
                tag: release.tag_name.clone(),
            })?;
        let version = release.version().map_err(|err| Error::Decode {
            operation: OP_CHECK_VERSION,
            source: Box::new(err),
        })?;

        Ok(Self {
            version,
            tag_name: release.tag_name.clone(),
            asset_name: asset.name.clone(),
            asset_url: asset.download_url.clone(),
            asset_byte_size: asset.size,
            page_url: release.page_url.clone(),
            release_notes: release.notes.clone(),
            name: release.name.clone(),
            published_at: release.published_at,
        })
    }

    /// Whether this release is strictly newer than `current`.
    pub fn is_newer_than(&self, current: &str) -> std::result::Result<bool, VersionError> {
        Ok(self.version > Version::parse(current)?)
    }
}

/// Resolves releases for one repository and installs them.
///
/// Holds no mutable state; one instance can serve concurrent calls.
pub struct Updater {
    repository_type: RepositoryType,
    api_base_url: Option<String>,
    owner: String,
    repo: String,
    filter: Filter,
    template: Template,
    token: Option<String>,
    client: Arc<dyn HttpClient>,
    logger: Logger,
    applier: Arc<dyn Apply>,
}

impl Updater {
    pub fn new(config: Config) -> Result<Self> {
        if config.owner.trim().is_empty() {
            return Err(Error::Config("repository owner is empty".to_string()));
        }
        if config.repo.trim().is_empty() {
            return Err(Error::Config("repository name is empty".to_string()));
        }
        let template = config.filter.compile()?;
        let client = match config.http_client {
            Some(client) => client,
            None => Arc::new(
                HyperClient::new()
                    .map_err(|err| Error::Config(format!("failed to set up HTTPS: {err}")))?,
            ),
        };

        Ok(Self {
            repository_type: config.repository_type,
            api_base_url: config.api_base_url,
            owner: config.owner,
            repo: config.repo,
            filter: config.filter,
            template,
            token: config.token,
            client,
            logger: config.logger,
            applier: config.applier,
        })
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn repository_type(&self) -> &RepositoryType {
        &self.repository_type
    }

    /// Asset name this host looks for when resolving `version`.
    pub fn asset_name(&self, version: &str) -> Result<String> {
        let values = self.filter.resolve_values(normalize(version));
        Ok(self.template.render(&values)?)
    }

    /// Looks up the release named by `version` (`latest` when empty) and
    /// picks the asset for this host.
    pub async fn check_version(&self, ctx: &Context, version: &str) -> Result<ReleaseResult> {
        let version = normalize(version);
        let asset_name = self.asset_name(version)?;

        let provider = create_provider(
            self.repository_type.as_str(),
            ProviderConfig {
                api_base_url: self.api_base_url.clone(),
                owner: self.owner.clone(),
                repo: self.repo.clone(),
                filter: asset_name.clone(),
                token: self.token.clone(),
                http_client: self.client.clone(),
                logger: self.logger.clone(),
            },
        )
        .ok_or_else(|| {
            Error::Config(format!(
                "unsupported repository type {:?}, expected one of {:?}",
                self.repository_type.as_str(),
                supported_types()
            ))
        })?;

        let release = provider
            .fetch_release(ctx, version)
            .await
            .map_err(|err| Error::from_provider(OP_CHECK_VERSION, err))?;
        self.logger.debug(format_args!(
            "{} release {} has {} assets",
            provider.name(),
            release.tag_name,
            release.assets.len()
        ));

        ReleaseResult::from_release(&release, &asset_name)
    }

    /// Downloads the release asset and hands it to the configured applier.
    ///
    /// A non-success download status fails before anything is written. `ctx`
    /// covers the download and staging; once the applier starts swapping the
    /// payload in, the call runs to completion and reports the swap's outcome.
    pub async fn update_to(
        &self,
        ctx: &Context,
        release: &ReleaseResult,
        options: Option<ApplyOptions>,
    ) -> Result<()> {
        let options = options.unwrap_or_default();
        let url = release.asset_url.as_str();

        self.logger.info(format_args!(
            "Downloading {} {} from {}",
            release.asset_name, release.version, url
        ));
        let rsp = ctx
            .run(self.client.get(url, &download_headers()))
            .await
            .and_then(|rsp| rsp)
            .and_then(|rsp| {
                if rsp.is_success() {
                    Ok(rsp)
                } else {
                    Err(HttpError::remote(url, rsp.status()))
                }
            })
            .map_err(|err| Error::from_http(OP_DOWNLOAD, err))?;

        let staged = ctx
            .run(self.applier.stage(rsp.into_stream(), &options))
            .await
            .map_err(|err| Error::from_http(OP_DOWNLOAD, err))??;

        // last point where cancellation is honored; the swap is not interruptible
        ctx.check()
            .map_err(|err| Error::from_http(OP_DOWNLOAD, err))?;
        self.logger.info(format_args!("Applying update"));
        staged.commit().await?;
        self.logger.info(format_args!("Update applied"));
        Ok(())
    }
}

fn normalize(version: &str) -> &str {
    let version = version.trim();
    if version.is_empty() {
        LATEST
    } else {
        version
    }
}

fn download_headers() -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("Accept".to_string(), "application/octet-stream".to_string());
    map.insert("User-Agent".to_string(), USER_AGENT.to_string());
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{ApplyError, Staged};
    use async_trait::async_trait;
    use futures::StreamExt;
    use hyper::StatusCode;
    use selfupdate_utils::{ByteStream, Response};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const RELEASE_JSON: &str = r#"{
        "tag_name": "v1.2.0",
        "name": "Second",
        "body": "notes",
        "html_url": "https://github.com/o/r/releases/tag/v1.2.0",
        "published_at": "2024-04-27T09:54:23Z",
        "assets": [
            {"name": "tool-linux-amd64", "size": 4, "browser_download_url": "https://dl.test/tool-linux-amd64"},
            {"name": "tool-darwin-arm64", "size": 5, "browser_download_url": "https://dl.test/tool-darwin-arm64"}
        ]
    }"#;

    /// Answers every request from a fixed table and records what was asked.
    #[derive(Default)]
    struct SpyClient {
        routes: Vec<(&'static str, StatusCode, &'static str)>,
        requests: Mutex<Vec<(String, HashMap<String, String>)>>,
    }

    impl SpyClient {
        fn with_route(mut self, url: &'static str, status: StatusCode, body: &'static str) -> Self {
            self.routes.push((url, status, body));
            self
        }

        fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }
    }

    #[async_trait]
    impl HttpClient for SpyClient {
        async fn get(
            &self,
            url: &str,
            header_map: &HashMap<String, String>,
        ) -> std::result::Result<Response, HttpError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), header_map.clone()));
            let (_, status, body) = self
                .routes
                .iter()
                .find(|(route, _, _)| *route == url)
                .copied()
                .unwrap_or(("", StatusCode::NOT_FOUND, ""));
            Ok(Response::from_bytes(url, status, body))
        }
    }

    #[derive(Default)]
    struct MemoryApply {
        written: Arc<Mutex<Option<Vec<u8>>>>,
        commit_delay: Option<Duration>,
        committed: Arc<AtomicBool>,
    }

    struct MemoryStaged {
        buf: Vec<u8>,
        slot: Arc<Mutex<Option<Vec<u8>>>>,
        delay: Option<Duration>,
        committed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Staged for MemoryStaged {
        async fn commit(self: Box<Self>) -> std::result::Result<(), ApplyError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            *self.slot.lock().unwrap() = Some(self.buf);
            self.committed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl Apply for MemoryApply {
        async fn stage(
            &self,
            mut stream: ByteStream,
            _options: &ApplyOptions,
        ) -> std::result::Result<Box<dyn Staged>, ApplyError> {
            let mut buf = Vec::new();
            while let Some(chunk) = stream.next().await {
                buf.extend_from_slice(&chunk.map_err(ApplyError::Stream)?);
            }
            Ok(Box::new(MemoryStaged {
                buf,
                slot: self.written.clone(),
                delay: self.commit_delay,
                committed: self.committed.clone(),
            }))
        }
    }

    fn updater(client: Arc<SpyClient>, applier: Arc<MemoryApply>) -> Updater {
        let config = Config::new("o", "r")
            .with_api_base_url("https://api.test")
            .with_filter(
                Filter::new("{{.Name}}-{{.OS}}-{{.Arch}}")
                    .with_value("Name", "tool")
                    .with_value("OS", "linux")
                    .with_value("Arch", "amd64"),
            )
            .with_http_client(client)
            .with_applier(applier);
        Updater::new(config).unwrap()
    }

    fn latest_client() -> SpyClient {
        SpyClient::default().with_route(
            "https://api.test/repos/o/r/releases/latest",
            StatusCode::OK,
            RELEASE_JSON,
        )
    }

    #[test]
    fn test_updater_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Updater>();
    }

    #[test]
    fn test_new_rejects_bad_template() {
        let config = Config::new("o", "r").with_filter(Filter::new("{{.Name"));
        assert!(matches!(Updater::new(config), Err(Error::Template(_))));
    }

    #[test]
    fn test_new_rejects_empty_owner() {
        let config = Config::new(" ", "r").with_http_client(Arc::new(SpyClient::default()));
        assert!(matches!(Updater::new(config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_check_version() {
        let client = Arc::new(latest_client());
        let updater = updater(client.clone(), Arc::default());

        let result = updater.check_version(&Context::new(), "").await.unwrap();
        assert_eq!(result.version.to_string(), "1.2.0");
        assert_eq!(result.tag_name, "v1.2.0");
        assert_eq!(result.asset_name, "tool-linux-amd64");
        assert_eq!(result.asset_url, "https://dl.test/tool-linux-amd64");
        assert_eq!(result.asset_byte_size, 4);
        assert_eq!(result.name, "Second");
        assert_eq!(result.release_notes, "notes");
        assert_eq!(client.urls(), ["https://api.test/repos/o/r/releases/latest"]);
    }

    #[tokio::test]
    async fn test_unsupported_repository_type_makes_no_request() {
        let client = Arc::new(latest_client());
        let config = Config::new("o", "r")
            .with_repository_type("bitbucket")
            .with_filter(Filter::new("tool"))
            .with_http_client(client.clone());
        let updater = Updater::new(config).unwrap();

        let err = updater
            .check_version(&Context::new(), LATEST)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("bitbucket"));
        assert!(client.urls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let client = Arc::new(latest_client());
        let config = Config::new("o", "r")
            .with_filter(Filter::new("{{.Name}}-{{.Flavor}}"))
            .with_http_client(client.clone());
        let updater = Updater::new(config).unwrap();

        let err = updater
            .check_version(&Context::new(), LATEST)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Template(_)));
        assert!(client.urls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_tag_is_decode_error() {
        let client = Arc::new(SpyClient::default().with_route(
            "https://api.test/repos/o/r/releases/latest",
            StatusCode::OK,
            r#"{"tag_name":"nightly","html_url":"","assets":[{"name":"tool-linux-amd64","size":1,"browser_download_url":"https://dl.test/x"}]}"#,
        ));
        let updater = updater(client, Arc::default());

        let err = updater
            .check_version(&Context::new(), LATEST)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_update_to_streams_into_applier() {
        let client = Arc::new(latest_client().with_route(
            "https://dl.test/tool-linux-amd64",
            StatusCode::OK,
            "BIN!",
        ));
        let applier = Arc::new(MemoryApply::default());
        let updater = updater(client.clone(), applier.clone());

        let release = updater.check_version(&Context::new(), LATEST).await.unwrap();
        updater
            .update_to(&Context::new(), &release, None)
            .await
            .unwrap();

        assert_eq!(applier.written.lock().unwrap().as_deref(), Some(&b"BIN!"[..]));
        let requests = client.requests.lock().unwrap();
        let (url, headers) = requests.last().unwrap();
        assert_eq!(url, "https://dl.test/tool-linux-amd64");
        assert_eq!(headers["Accept"], "application/octet-stream");
    }

    #[tokio::test]
    async fn test_update_to_rejects_error_status() {
        let client = Arc::new(latest_client().with_route(
            "https://dl.test/tool-linux-amd64",
            StatusCode::FORBIDDEN,
            "denied",
        ));
        let applier = Arc::new(MemoryApply::default());
        let updater = updater(client, applier.clone());

        let release = updater.check_version(&Context::new(), LATEST).await.unwrap();
        let err = updater
            .update_to(&Context::new(), &release, None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert!(applier.written.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_to_finishes_commit_after_cancel() {
        let client = Arc::new(latest_client().with_route(
            "https://dl.test/tool-linux-amd64",
            StatusCode::OK,
            "BIN!",
        ));
        let applier = Arc::new(MemoryApply {
            commit_delay: Some(Duration::from_millis(100)),
            ..MemoryApply::default()
        });
        let updater = updater(client, applier.clone());
        let release = updater.check_version(&Context::new(), LATEST).await.unwrap();

        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let result = updater.update_to(&ctx, &release, None).await;
        assert!(ctx.is_cancelled());
        assert!(result.is_ok(), "swap completed but got {result:?}");
        assert!(applier.committed.load(Ordering::SeqCst));
        assert_eq!(applier.written.lock().unwrap().as_deref(), Some(&b"BIN!"[..]));
    }

    #[tokio::test]
    async fn test_update_to_cancelled_before_commit() {
        let client = Arc::new(latest_client().with_route(
            "https://dl.test/tool-linux-amd64",
            StatusCode::OK,
            "BIN!",
        ));
        let applier = Arc::new(MemoryApply::default());
        let updater = updater(client, applier.clone());
        let release = updater.check_version(&Context::new(), LATEST).await.unwrap();

        let ctx = Context::new();
        ctx.cancel();
        let err = updater.update_to(&ctx, &release, None).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!applier.committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_is_newer_than() {
        let updater = updater(Arc::new(latest_client()), Arc::default());
        let release = updater.check_version(&Context::new(), LATEST).await.unwrap();

        assert!(release.is_newer_than("1.1.9").unwrap());
        assert!(release.is_newer_than("v1.2.0-rc.1").unwrap());
        assert!(!release.is_newer_than("v1.2.0").unwrap());
        assert!(!release.is_newer_than("2.0.0").unwrap());
        assert!(release.is_newer_than("dev").is_err());
    }

    #[test]
    fn test_release_result_serde() {
        let release = ReleaseResult {
            version: Version::parse("v1.0.0").unwrap(),
            tag_name: "v1.0.0".to_string(),
            asset_name: "tool".to_string(),
            asset_url: "https://dl.test/tool".to_string(),
            asset_byte_size: 3,
            page_url: String::new(),
            release_notes: String::new(),
            name: "v1.0.0".to_string(),
            published_at: None,
        };
        let json = serde_json::to_value(&release).unwrap();
        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["asset_byte_size"], 3);
    }
}
