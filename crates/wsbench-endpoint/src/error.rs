use std::time::Duration;

/// Errors that can occur while running an endpoint workload.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] wsbench_frame::FrameError),

    /// A deadline expired before the operation completed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The peer broke a workload invariant (message size or count).
    #[error("protocol invariant violated: {what} (expected {expected}, observed {observed})")]
    ProtocolInvariantViolation {
        what: &'static str,
        expected: u64,
        observed: u64,
    },
}

impl EndpointError {
    /// Whether the benchmark results can no longer be trusted.
    ///
    /// Drivers terminate the process on a fatal error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EndpointError::ProtocolInvariantViolation { .. })
    }

    pub(crate) fn violation(what: &'static str, expected: usize, observed: usize) -> Self {
        EndpointError::ProtocolInvariantViolation {
            what,
            expected: expected as u64,
            observed: observed as u64,
        }
    }
}

pub type Result<T> = std::result::Result<T, EndpointError>;
