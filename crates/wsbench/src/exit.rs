use std::fmt;
use std::io;

use tracing::error;
use wsbench_endpoint::EndpointError;
use wsbench_frame::FrameError;
use wsbench_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    CliError::new(INTERNAL, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Transport(source) => transport_error(context, source),
        FrameError::MessageTooLarge { .. }
        | FrameError::PayloadTooLarge { .. }
        | FrameError::KindChanged { .. }
        | FrameError::Protocol(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::UnexpectedEndOfChannel | FrameError::Cancelled => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        FrameError::ChannelClosed { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

/// Map an endpoint error to an exit code.
///
/// A fatal error means the measurement is invalid: it is reported and the
/// process aborts without unwinding.
pub fn endpoint_error(context: &str, err: EndpointError) -> CliError {
    if err.is_fatal() {
        error!(error = %err, "{context}");
        eprintln!("fatal: {context}: {err}");
        std::process::abort();
    }
    match err {
        EndpointError::Frame(err) => frame_error(context, err),
        EndpointError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        EndpointError::ProtocolInvariantViolation { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn join_error(context: &str, err: tokio::task::JoinError) -> CliError {
    CliError::new(INTERNAL, format!("{context}: task failed: {err}"))
}
