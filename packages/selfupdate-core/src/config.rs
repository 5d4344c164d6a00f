use crate::apply::{Apply, ReplaceExecutable};
use crate::filter::Filter;
use selfupdate_provider::{GITEA, GITHUB};
use selfupdate_utils::{HttpClient, Logger};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Name of the release API family a repository is hosted on.
///
/// Any name is accepted here; names without a provider are rejected when a
/// version is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryType(Cow<'static, str>);

impl RepositoryType {
    pub const GITHUB: Self = Self(Cow::Borrowed(GITHUB));
    pub const GITEA: Self = Self(Cow::Borrowed(GITEA));

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Cow::Owned(name.as_ref().trim().to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RepositoryType {
    fn default() -> Self {
        Self::GITHUB
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepositoryType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Updater configuration.
#[derive(Clone)]
pub struct Config {
    pub repository_type: RepositoryType,
    /// Overrides the provider's default API location
    pub api_base_url: Option<String>,
    pub owner: String,
    pub repo: String,
    pub filter: Filter,
    pub token: Option<String>,
    /// `None` builds a `HyperClient` in `Updater::new`
    pub http_client: Option<Arc<dyn HttpClient>>,
    pub logger: Logger,
    pub applier: Arc<dyn Apply>,
}

impl Config {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            repository_type: RepositoryType::default(),
            api_base_url: None,
            owner: owner.into(),
            repo: repo.into(),
            filter: Filter::default(),
            token: None,
            http_client: None,
            logger: Logger::global(),
            applier: Arc::new(ReplaceExecutable),
        }
    }

    pub fn with_repository_type(mut self, repository_type: impl Into<RepositoryType>) -> Self {
        self.repository_type = repository_type.into();
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_applier(mut self, applier: Arc<dyn Apply>) -> Self {
        self.applier = applier;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("repository_type", &self.repository_type)
            .field("api_base_url", &self.api_base_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("filter", &self.filter)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("http_client", &self.http_client.is_some())
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}
