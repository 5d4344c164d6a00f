use crate::base_provider::{ProviderConfig, ReleaseProvider};
use crate::providers::{GitHubProvider, GiteaProvider};

pub const GITHUB: &str = "github";
pub const GITEA: &str = "gitea";

/// Names accepted by [`create_provider`].
pub fn supported_types() -> &'static [&'static str] {
    &[GITHUB, GITEA]
}

/// Single dispatch point from a repository type name to its provider.
/// Names are matched case-insensitively; unknown names yield `None`.
pub fn create_provider(
    repository_type: &str,
    config: ProviderConfig,
) -> Option<Box<dyn ReleaseProvider>> {
    match repository_type.trim().to_ascii_lowercase().as_str() {
        GITHUB => Some(Box::new(GitHubProvider::new(config))),
        GITEA => Some(Box::new(GiteaProvider::new(config))),
        _ => None,
    }
}
