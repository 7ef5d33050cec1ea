use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsbench_endpoint::{random_payload, EndpointConfig, MessageEndpoint};
use wsbench_frame::{CyclicReplayChannel, FrameKind, Role};

use crate::cmd::{runtime, ReceiveArgs};
use crate::exit::{endpoint_error, frame_error, CliResult, SUCCESS};
use crate::output::{print_reports, BenchReport, OutputFormat};

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let runtime = runtime()?;

    let mut reports = Vec::with_capacity(args.message_size.len() * args.role.len());
    for &message_size in &args.message_size {
        for &role in &args.role {
            let role = Role::from(role);
            reports.push(runtime.block_on(receive(message_size, role, args.iterations))?);
        }
    }

    print_reports(&reports, format);
    Ok(SUCCESS)
}

async fn receive(message_size: usize, role: Role, iterations: usize) -> CliResult<BenchReport> {
    let payload = random_payload(message_size);
    let channel = CyclicReplayChannel::record(&payload, FrameKind::Binary, role)
        .await
        .map_err(|err| frame_error("failed to record replay template", err))?;
    debug!(
        message_size,
        %role,
        template = channel.template().len(),
        "receive run starting"
    );

    let config = EndpointConfig {
        message_size,
        message_count: iterations,
        role,
        ..EndpointConfig::default()
    };
    let mut endpoint = MessageEndpoint::new(channel, config);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    for _ in 0..iterations {
        let len = endpoint
            .receive(&cancel)
            .await
            .map_err(|err| endpoint_error("receive failed", err))?
            .len();
        endpoint
            .check_size(len)
            .map_err(|err| endpoint_error("receive failed", err))?;
    }
    let elapsed = start.elapsed();

    Ok(BenchReport::new(
        "receive",
        message_size,
        iterations as u64,
        (iterations * message_size) as u64,
        elapsed,
    )
    .with_role(role))
}
