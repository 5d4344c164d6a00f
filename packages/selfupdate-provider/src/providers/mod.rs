//! Provider implementations
//!
//! Each provider implements [`ReleaseProvider`](crate::ReleaseProvider) for one
//! release API family and gets an arm in [`create_provider`](crate::create_provider).

pub mod gitea;
pub mod github;

pub use gitea::GiteaProvider;
pub use github::GitHubProvider;
