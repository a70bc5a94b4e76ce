//! Collect command implementation.
//!
//! Runs one collection cycle and prints the report to stdout.

use anyhow::Context;
use std::time::Instant;
use tracing::debug;

use herakles_platform_collector::config::Config;
use herakles_platform_collector::{render_prometheus, HostIdentity, PlatformCollector, PlatformReport};

use crate::cli::OutputFormat;

/// Collects a platform snapshot and prints it in `format`.
///
/// With `platform_only` the JSON and YAML output carries only the snapshot.
/// The Prometheus format always renders the measurement points.
pub fn command_collect(
    config: &Config,
    format: OutputFormat,
    platform_only: bool,
) -> anyhow::Result<()> {
    let host = HostIdentity::detect().context("Failed to determine hostname")?;
    let collector = PlatformCollector::from_config(config);

    let start = Instant::now();
    let report = collector
        .collect(&host)
        .context("Platform collection failed")?;
    debug!("Collection cycle took {:?}", start.elapsed());

    println!("{}", render_report(&report, format, platform_only)?);
    Ok(())
}

fn render_report(
    report: &PlatformReport,
    format: OutputFormat,
    platform_only: bool,
) -> anyhow::Result<String> {
    let output = match (format, platform_only) {
        (OutputFormat::Json, false) => serde_json::to_string_pretty(report)?,
        (OutputFormat::Json, true) => serde_json::to_string_pretty(&report.platform)?,
        (OutputFormat::Yaml, false) => serde_yaml::to_string(report)?,
        (OutputFormat::Yaml, true) => serde_yaml::to_string(&report.platform)?,
        (OutputFormat::Prometheus, _) => {
            render_prometheus(&report.metrics, &report.labels).context("Prometheus encoding failed")?
        }
    };
    Ok(output)
}
