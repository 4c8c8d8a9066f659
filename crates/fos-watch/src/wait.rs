//! Wait options
//!
//! Every wait primitive takes a [`WaitOptions`]: an optional deadline and an
//! optional cancellation token. Both cover the whole operation, so a path
//! walk through several shadow roots shares one deadline. Without either,
//! a wait for a node that never appears stays pending until dropped.

use std::future::Future;
use std::time::Duration;

use smol::Timer;
use smol::future;
use tokio_util::sync::CancellationToken;

use crate::{WatchError, WatchResult};

#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    /// Fail with [`WatchError::Timeout`] once this much time has passed
    pub timeout: Option<Duration>,
    /// Fail with [`WatchError::Cancelled`] once this token fires
    pub cancel: Option<CancellationToken>,
}

impl WaitOptions {
    /// No deadline, no token
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Race `work` against the deadline and the token.
    ///
    /// `work` is dropped when it loses, which releases whatever it
    /// registered with the DOM.
    pub async fn run<F, T>(&self, work: F) -> WatchResult<T>
    where
        F: Future<Output = WatchResult<T>>,
    {
        if self.is_cancelled() {
            return Err(WatchError::Cancelled);
        }

        let cancelled = async {
            match &self.cancel {
                Some(token) => {
                    token.cancelled().await;
                    Err::<T, _>(WatchError::Cancelled)
                }
                None => future::pending().await,
            }
        };
        let timed_out = async {
            match self.timeout {
                Some(timeout) => {
                    Timer::after(timeout).await;
                    Err::<T, _>(WatchError::Timeout(timeout))
                }
                None => future::pending().await,
            }
        };

        future::or(work, future::or(cancelled, timed_out)).await
    }
}
