use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsbench_endpoint::{
    random_payload, BroadcastStats, EndpointConfig, EndpointError, MessageEndpoint,
};
use wsbench_frame::{FramedChannel, Role};

use crate::cmd::{parse_duration, runtime, BroadcastArgs, DUPLEX_CAPACITY};
use crate::exit::{endpoint_error, join_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_reports, BenchReport, OutputFormat};

/// Consumer receive deadline granted per 10,000 messages when none is given.
const RECEIVE_TIME_PER_10K: Duration = Duration::from_secs(1);

pub fn run(args: BroadcastArgs, format: OutputFormat) -> CliResult<i32> {
    if args.consumers == 0 {
        return Err(CliError::new(USAGE, "--consumers must be at least 1"));
    }
    let close_timeout = parse_duration(&args.close_timeout)?;
    let receive_timeout = match &args.receive_timeout {
        Some(input) => parse_duration(input)?,
        None => default_receive_timeout(args.message_count),
    };
    let runtime = runtime()?;

    let mut reports = Vec::with_capacity(args.message_size.len());
    for &message_size in &args.message_size {
        let config = EndpointConfig {
            message_size,
            message_count: args.message_count,
            role: Role::Client,
            close_timeout,
            receive_timeout: Some(receive_timeout),
        };
        reports.push(runtime.block_on(broadcast(config, args.consumers))?);
    }

    print_reports(&reports, format);
    Ok(SUCCESS)
}

fn default_receive_timeout(message_count: usize) -> Duration {
    let blocks = message_count.div_ceil(10_000).max(1) as u32;
    RECEIVE_TIME_PER_10K * blocks
}

async fn broadcast(config: EndpointConfig, consumers: usize) -> CliResult<BenchReport> {
    debug!(
        message_size = config.message_size,
        message_count = config.message_count,
        consumers,
        "broadcast run starting"
    );
    let cancel = CancellationToken::new();
    let payload = random_payload(config.message_size);

    let mut producers = JoinSet::new();
    let mut receivers = JoinSet::new();
    let start = Instant::now();
    for _ in 0..consumers {
        let (producer_stream, consumer_stream) = tokio::io::duplex(DUPLEX_CAPACITY);

        let mut producer = MessageEndpoint::new(
            FramedChannel::new(producer_stream, Role::Server),
            config.for_peer(),
        );
        let producer_payload = payload.clone();
        let producer_cancel = cancel.clone();
        producers.spawn(async move {
            producer
                .run_broadcast(&producer_payload, &producer_cancel)
                .await
        });

        let mut consumer = MessageEndpoint::new(
            FramedChannel::new(consumer_stream, Role::Client),
            config.clone(),
        );
        let consumer_cancel = cancel.clone();
        receivers.spawn(async move { consumer.run_broadcast(&[], &consumer_cancel).await });
    }

    let received = collect(&mut receivers, &cancel, "broadcast consumer").await?;
    let elapsed = start.elapsed();
    collect(&mut producers, &cancel, "broadcast producer").await?;

    let messages = received.iter().map(|s| s.messages).sum();
    let bytes = received.iter().map(|s| s.bytes).sum();
    Ok(
        BenchReport::new("broadcast", config.message_size, messages, bytes, elapsed)
            .with_consumers(consumers),
    )
}

/// Wait for every task, cancelling the rest of the run on the first failure.
async fn collect(
    tasks: &mut JoinSet<Result<BroadcastStats, EndpointError>>,
    cancel: &CancellationToken,
    context: &str,
) -> CliResult<Vec<BroadcastStats>> {
    let mut stats = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|err| {
            cancel.cancel();
            join_error(context, err)
        })?;
        match result {
            Ok(s) => stats.push(s),
            Err(err) => {
                cancel.cancel();
                return Err(endpoint_error(&format!("{context} failed"), err));
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_deadline_scales_with_count() {
        assert_eq!(default_receive_timeout(0), Duration::from_secs(1));
        assert_eq!(default_receive_timeout(10_000), Duration::from_secs(1));
        assert_eq!(default_receive_timeout(10_001), Duration::from_secs(2));
        assert_eq!(default_receive_timeout(100_000), Duration::from_secs(10));
    }
}
