use std::hint::black_box;
use std::time::Instant;

use wsbench_frame::{ByteChannel, FramedChannel, Role};
use wsbench_transport::DiscardStream;

use crate::cmd::CreateArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_reports, BenchReport, OutputFormat};

pub fn run(args: CreateArgs, format: OutputFormat) -> CliResult<i32> {
    let start = Instant::now();
    for i in 0..args.iterations {
        let role = if i % 2 == 0 { Role::Server } else { Role::Client };
        let channel = FramedChannel::new(DiscardStream::new(), role);
        black_box(channel.state());
        black_box(channel);
    }
    let elapsed = start.elapsed();

    let report = BenchReport::new("create", 0, args.iterations as u64, 0, elapsed);
    print_reports(&[report], format);
    Ok(SUCCESS)
}
