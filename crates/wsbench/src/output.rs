use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One measured parameter combination.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub benchmark: &'static str,
    pub message_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumers: Option<usize>,
    /// Messages, round trips or constructions completed.
    pub operations: u64,
    /// Payload bytes moved.
    pub bytes: u64,
    /// Encoded bytes written, where the benchmark can observe them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire_bytes: Option<u64>,
    pub elapsed_ms: f64,
    pub ops_per_sec: f64,
    pub bytes_per_sec: f64,
}

impl BenchReport {
    pub fn new(
        benchmark: &'static str,
        message_size: usize,
        operations: u64,
        bytes: u64,
        elapsed: Duration,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let rate = |n: u64| if secs > 0.0 { n as f64 / secs } else { 0.0 };
        Self {
            benchmark,
            message_size,
            role: None,
            consumers: None,
            operations,
            bytes,
            wire_bytes: None,
            elapsed_ms: secs * 1000.0,
            ops_per_sec: rate(operations),
            bytes_per_sec: rate(bytes),
        }
    }

    pub fn with_role(mut self, role: impl ToString) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn with_consumers(mut self, consumers: usize) -> Self {
        self.consumers = Some(consumers);
        self
    }

    pub fn with_wire_bytes(mut self, wire_bytes: u64) -> Self {
        self.wire_bytes = Some(wire_bytes);
        self
    }
}

/// Print reports to stdout. JSON output is one object per line.
pub fn print_reports(reports: &[BenchReport], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for report in reports {
                println!(
                    "{}",
                    serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "BENCHMARK",
                    "SIZE",
                    "ROLE",
                    "OPS",
                    "ELAPSED",
                    "OPS/S",
                    "MB/S",
                ]);
            for report in reports {
                table.add_row(vec![
                    report.benchmark.to_string(),
                    report.message_size.to_string(),
                    report.role.clone().unwrap_or_else(|| "-".to_string()),
                    report.operations.to_string(),
                    format!("{:.1} ms", report.elapsed_ms),
                    format!("{:.0}", report.ops_per_sec),
                    format!("{:.2}", report.bytes_per_sec / 1_000_000.0),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for report in reports {
                println!("{}", summary_line(report));
            }
        }
    }
}

fn summary_line(report: &BenchReport) -> String {
    let mut line = format!("{} size={}", report.benchmark, report.message_size);
    if let Some(role) = &report.role {
        line.push_str(&format!(" role={role}"));
    }
    if let Some(consumers) = report.consumers {
        line.push_str(&format!(" consumers={consumers}"));
    }
    line.push_str(&format!(
        " ops={} elapsed={:.1}ms ops/s={:.0}",
        report.operations, report.elapsed_ms, report.ops_per_sec
    ));
    line
}
