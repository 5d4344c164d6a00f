//! Self-updating binaries from GitHub and Gitea releases.
//!
//! ```no_run
//! use selfupdate::{Config, Context, Filter, Updater};
//!
//! # async fn run() -> selfupdate::Result<()> {
//! let config = Config::new("owner", "tool").with_filter(Filter::new("tool_{{.OS}}_{{.Arch}}"));
//! let updater = Updater::new(config)?;
//! let ctx = Context::new();
//!
//! let release = updater.check_version(&ctx, "latest").await?;
//! if release.is_newer_than(env!("CARGO_PKG_VERSION")).unwrap_or(false) {
//!     updater.update_to(&ctx, &release, None).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub use selfupdate_core::{
    apply, Apply, ApplyError, ApplyOptions, Config, Error, Filter, ReleaseResult, RepositoryType,
    Result, Staged, Template, TemplateError, Updater, DEFAULT_TEMPLATE,
};
pub use selfupdate_provider::{
    create_provider, supported_types, Asset, GitHubProvider, GiteaProvider, ProviderConfig,
    ProviderError, Release, ReleaseProvider, LATEST,
};
pub use selfupdate_utils::{
    platform, ByteStream, Context, HttpClient, HttpError, HyperClient, Logger, Response, Version,
    VersionError,
};
