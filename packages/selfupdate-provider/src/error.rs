use selfupdate_utils::HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("failed to decode release payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProviderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_cancelled())
    }
}
