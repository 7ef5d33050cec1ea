use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsbench_endpoint::{random_payload, EndpointConfig, MessageEndpoint};
use wsbench_frame::{FramedChannel, Role};
use wsbench_transport::DiscardStream;

use crate::cmd::{runtime, SendArgs};
use crate::exit::{endpoint_error, CliResult, SUCCESS};
use crate::output::{print_reports, BenchReport, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let runtime = runtime()?;

    let mut reports = Vec::with_capacity(args.message_size.len() * args.role.len());
    for &message_size in &args.message_size {
        for &role in &args.role {
            let role = Role::from(role);
            reports.push(runtime.block_on(send(message_size, role, args.iterations))?);
        }
    }

    print_reports(&reports, format);
    Ok(SUCCESS)
}

async fn send(message_size: usize, role: Role, iterations: usize) -> CliResult<BenchReport> {
    debug!(message_size, %role, iterations, "send run starting");
    let payload = random_payload(message_size);
    let config = EndpointConfig {
        message_size,
        message_count: iterations,
        role,
        ..EndpointConfig::default()
    };
    let mut endpoint = MessageEndpoint::new(FramedChannel::new(DiscardStream::new(), role), config);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    for _ in 0..iterations {
        endpoint
            .send(&payload, &cancel)
            .await
            .map_err(|err| endpoint_error("send failed", err))?;
    }
    let elapsed = start.elapsed();

    let wire_bytes = endpoint.channel().get_ref().bytes_written();
    Ok(BenchReport::new(
        "send",
        message_size,
        iterations as u64,
        (iterations * message_size) as u64,
        elapsed,
    )
    .with_role(role)
    .with_wire_bytes(wire_bytes))
}
