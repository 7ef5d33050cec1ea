use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsbench_endpoint::{random_payload, EndpointConfig, MessageEndpoint};
use wsbench_frame::{FramedChannel, Role};

use crate::cmd::{parse_duration, runtime, EchoArgs, DUPLEX_CAPACITY};
use crate::exit::{endpoint_error, join_error, CliResult, SUCCESS};
use crate::output::{print_reports, BenchReport, OutputFormat};

pub fn run(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    let close_timeout = parse_duration(&args.close_timeout)?;
    let runtime = runtime()?;

    let mut reports = Vec::with_capacity(args.message_size.len());
    for &message_size in &args.message_size {
        let config = EndpointConfig {
            message_size,
            message_count: args.message_count,
            role: Role::Client,
            close_timeout,
            receive_timeout: None,
        };
        reports.push(runtime.block_on(echo(config))?);
    }

    print_reports(&reports, format);
    Ok(SUCCESS)
}

async fn echo(config: EndpointConfig) -> CliResult<BenchReport> {
    debug!(
        message_size = config.message_size,
        message_count = config.message_count,
        "echo run starting"
    );
    let (client_stream, server_stream) = tokio::io::duplex(DUPLEX_CAPACITY);
    let cancel = CancellationToken::new();

    let mut server = MessageEndpoint::new(
        FramedChannel::new(server_stream, Role::Server),
        config.for_peer(),
    );
    let server_cancel = cancel.clone();
    let server_task = tokio::spawn(async move { server.run_echo(&[], &server_cancel).await });

    let payload = random_payload(config.message_size);
    let mut client = MessageEndpoint::new(FramedChannel::new(client_stream, Role::Client), config);

    let start = Instant::now();
    let result = client.run_echo(&payload, &cancel).await;
    let elapsed = start.elapsed();

    if result.is_err() {
        cancel.cancel();
    }
    let stats = result.map_err(|err| endpoint_error("echo client failed", err))?;
    server_task
        .await
        .map_err(|err| join_error("echo server", err))?
        .map_err(|err| endpoint_error("echo server failed", err))?;

    Ok(BenchReport::new(
        "echo",
        payload.len(),
        stats.round_trips,
        stats.bytes,
        elapsed,
    ))
}
