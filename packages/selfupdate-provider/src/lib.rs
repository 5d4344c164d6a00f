pub mod base_provider;
pub mod data;
pub mod error;
pub mod providers;
pub mod registry;

// Re-export common types
pub use base_provider::{ProviderConfig, ReleaseProvider, LATEST};
pub use data::{Asset, Release};
pub use error::ProviderError;
pub use providers::{GitHubProvider, GiteaProvider};
pub use registry::{create_provider, supported_types, GITEA, GITHUB};
