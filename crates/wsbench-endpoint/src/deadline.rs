use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;
use wsbench_frame::FrameError;

use crate::error::EndpointError;

/// A child of `parent` that is also cancelled once `timeout` has elapsed.
///
/// Must be called from within a tokio runtime. The timer task exits early
/// when the returned token is cancelled.
pub fn deadline_token(parent: &CancellationToken, timeout: Duration) -> CancellationToken {
    let token = parent.child_token();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                trace!(?timeout, "deadline expired");
                timer.cancel();
            }
            _ = timer.cancelled() => {}
        }
    });
    token
}

/// A running deadline that tells its own expiry apart from the caller's cancellation.
///
/// Dropping it stops the timer.
#[derive(Debug)]
pub struct Deadline {
    parent: CancellationToken,
    token: CancellationToken,
    timeout: Duration,
}

impl Deadline {
    pub fn start(parent: &CancellationToken, timeout: Duration) -> Self {
        Self {
            parent: parent.clone(),
            token: deadline_token(parent, timeout),
            timeout,
        }
    }

    /// Token to pass to operations bounded by this deadline.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Report a cancellation caused by this deadline as a timeout.
    pub fn map_err(&self, err: FrameError) -> EndpointError {
        match err {
            FrameError::Cancelled if !self.parent.is_cancelled() => {
                EndpointError::Timeout(self.timeout)
            }
            other => other.into(),
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
