use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use wsbench_frame::Role;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod broadcast;
pub mod create;
pub mod echo;
pub mod receive;
pub mod send;
pub mod version;

/// In-process pipe capacity between paired endpoints.
pub const DUPLEX_CAPACITY: usize = 64 * 1024;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Echo fixed-size messages between a client and a server.
    Echo(EchoArgs),
    /// Stream messages from a producer to one or more consumers.
    Broadcast(BroadcastArgs),
    /// Reassemble messages replayed from a captured frame.
    Receive(ReceiveArgs),
    /// Frame and write messages into a discarding stream.
    Send(SendArgs),
    /// Measure framed channel construction.
    Create(CreateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args, format),
        Command::Broadcast(args) => broadcast::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Create(args) => create::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Server,
    Client,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Server => Role::Server,
            RoleArg::Client => Role::Client,
        }
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Message sizes to sweep (comma-separated).
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0,100,10000",
        env = "WSBENCH_MESSAGE_SIZE"
    )]
    pub message_size: Vec<usize>,
    /// Round trips per run.
    #[arg(long, default_value = "10000", env = "WSBENCH_MESSAGE_COUNT")]
    pub message_count: usize,
    /// Time to wait for the close acknowledgment (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", env = "WSBENCH_CLOSE_TIMEOUT")]
    pub close_timeout: String,
}

#[derive(Args, Debug)]
pub struct BroadcastArgs {
    /// Message sizes to sweep (comma-separated).
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "50,100,1000",
        env = "WSBENCH_MESSAGE_SIZE"
    )]
    pub message_size: Vec<usize>,
    /// Messages each consumer must receive.
    #[arg(long, default_value = "10000", env = "WSBENCH_MESSAGE_COUNT")]
    pub message_count: usize,
    /// Consumer connections, each with its own producer.
    #[arg(long, default_value = "1", env = "WSBENCH_CONSUMERS")]
    pub consumers: usize,
    /// Deadline for each consumer's receive phase. Default: 1s per 10,000 messages.
    #[arg(long, env = "WSBENCH_RECEIVE_TIMEOUT")]
    pub receive_timeout: Option<String>,
    /// Time to wait for the close acknowledgment (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", env = "WSBENCH_CLOSE_TIMEOUT")]
    pub close_timeout: String,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Message sizes to sweep (comma-separated).
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0,64,128,4096,16384,1048576",
        env = "WSBENCH_MESSAGE_SIZE"
    )]
    pub message_size: Vec<usize>,
    /// Roles to sweep (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "server,client")]
    pub role: Vec<RoleArg>,
    /// Messages received per run.
    #[arg(long, default_value = "10000", env = "WSBENCH_ITERATIONS")]
    pub iterations: usize,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Message sizes to sweep (comma-separated).
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0,64,128,4096,16384,1048576",
        env = "WSBENCH_MESSAGE_SIZE"
    )]
    pub message_size: Vec<usize>,
    /// Roles to sweep (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "server,client")]
    pub role: Vec<RoleArg>,
    /// Messages sent per run.
    #[arg(long, default_value = "10000", env = "WSBENCH_ITERATIONS")]
    pub iterations: usize,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Channels constructed per run.
    #[arg(long, default_value = "10000", env = "WSBENCH_ITERATIONS")]
    pub iterations: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Multi-threaded runtime for the benchmark tasks.
pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
