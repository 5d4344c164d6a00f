//! Error type for the HTTP transport layer

use hyper::StatusCode;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single outbound request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request could not be built (bad URL, invalid header)
    #[error("failed to create HTTP request for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: BoxError,
    },
    /// Connection, TLS or body read failure
    #[error("failed to send HTTP request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },
    /// The server answered with a status the caller does not accept
    #[error("{url} responded with {}", status_line(.status))]
    Remote { url: String, status: StatusCode },
    #[error("stopped following redirects from {url} after {limit} hops")]
    TooManyRedirects { url: String, limit: usize },
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl HttpError {
    pub fn request(url: &str, source: impl Into<BoxError>) -> Self {
        Self::Request {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub fn transport(url: &str, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub fn remote(url: &str, status: StatusCode) -> Self {
        Self::Remote {
            url: url.to_string(),
            status,
        }
    }

    /// True for both explicit cancellation and an expired deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// `"404 Not Found"` style rendering of a status code.
pub fn status_line(status: &StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
