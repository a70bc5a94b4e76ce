//! CLI arguments and subcommands for herakles-platform-collector.
//!
//! This module defines the command-line interface structure using the clap library.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for a collected report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Prometheus,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Prometheus => "prometheus",
        }
    }
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-platform-collector",
    about = "Collects a snapshot of CPU topology, usage, memory, NUMA and RDT capabilities",
    long_about = "Collects a point-in-time snapshot of the host platform.\n\n\
                  Reads /proc/cpuinfo, /proc/stat, /proc/meminfo, the NUMA node tree in \
                  /sys/devices/system/node and the resctrl filesystem, then prints the \
                  snapshot together with its measurement points and common labels.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides config log_level, default: info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Root of the procfs tree (default: /proc)
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Root of the NUMA node tree (default: /sys/devices/system/node)
    #[arg(long)]
    pub node_root: Option<PathBuf>,

    /// Root of the mounted resctrl filesystem (default: /sys/fs/resctrl)
    #[arg(long)]
    pub resctrl_root: Option<PathBuf>,

    /// Skip RDT capability detection
    #[arg(long)]
    pub disable_rdt: bool,

    /// Run the independent collectors in parallel
    #[arg(long)]
    pub parallel: bool,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one collection cycle and print the report
    Collect {
        /// Report format (overrides config output_format)
        #[arg(short = 'f', long, value_enum)]
        format: Option<OutputFormat>,

        /// Print only the platform snapshot, without metrics and labels
        #[arg(long)]
        platform_only: bool,
    },

    /// Check that every kernel source is readable
    Check {
        /// Probe the resctrl filesystem even when RDT collection is disabled
        #[arg(long)]
        rdt: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_collect() {
        let args = Args::parse_from([
            "herakles-platform-collector",
            "--proc-root",
            "/host/proc",
            "--disable-rdt",
            "collect",
            "--format",
            "prometheus",
        ]);
        assert_eq!(args.proc_root, Some(PathBuf::from("/host/proc")));
        assert!(args.disable_rdt);
        match args.command {
            Some(Commands::Collect { format, .. }) => {
                assert_eq!(format, Some(OutputFormat::Prometheus))
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
