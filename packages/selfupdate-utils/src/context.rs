//! Cancellation scope for network-bound operations

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::HttpError;

/// Cancellation token plus an optional deadline.
///
/// Every network-bound call takes a `Context` and runs its I/O through
/// [`Context::run`], so cancelling the token or passing the deadline aborts the
/// in-flight request with [`HttpError::Cancelled`] or
/// [`HttpError::DeadlineExceeded`].
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope bound to an existing token, e.g. one shared with a shutdown handler.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the existing and the new deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn check(&self) -> Result<(), HttpError> {
        if self.token.is_cancelled() {
            return Err(HttpError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Err(HttpError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drives `fut` until it completes, the token is cancelled, or the deadline
    /// passes. The future is not polled at all when the scope is already done.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, HttpError> {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(HttpError::Cancelled),
            _ = deadline => Err(HttpError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
