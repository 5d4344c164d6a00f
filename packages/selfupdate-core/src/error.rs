use crate::apply::ApplyError;
use crate::filter::TemplateError;
use selfupdate_provider::ProviderError;
use selfupdate_utils::{BoxError, HttpError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) const OP_CHECK_VERSION: &str = "check version";
pub(crate) const OP_DOWNLOAD: &str = "download update";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("{operation}: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: HttpError,
    },
    #[error("{operation}: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: HttpError,
    },
    #[error("{operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: HttpError,
    },
    #[error("{operation}: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("no asset named {asset:?} in release {tag}")]
    AssetNotFound { asset: String, tag: String },
    #[error("apply update: {0}")]
    Apply(#[from] ApplyError),
    #[error("{operation}: {source}")]
    Cancelled {
        operation: &'static str,
        #[source]
        source: HttpError,
    },
}

impl Error {
    pub(crate) fn from_http(operation: &'static str, source: HttpError) -> Self {
        match source {
            HttpError::Request { .. } => Self::Request { operation, source },
            HttpError::Remote { .. } => Self::Remote { operation, source },
            HttpError::Cancelled | HttpError::DeadlineExceeded => {
                Self::Cancelled { operation, source }
            }
            HttpError::Transport { .. } | HttpError::TooManyRedirects { .. } => {
                Self::Transport { operation, source }
            }
        }
    }

    pub(crate) fn from_provider(operation: &'static str, source: ProviderError) -> Self {
        match source {
            ProviderError::Http(err) => Self::from_http(operation, err),
            err @ ProviderError::Decode { .. } => Self::Decode {
                operation,
                source: Box::new(err),
            },
        }
    }

    /// True when the operation stopped because the context was cancelled or
    /// its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Apply(ApplyError::Stream(err)) => err.is_cancelled(),
            _ => false,
        }
    }

    /// HTTP status of a `Remote` failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { source, .. } => source.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
