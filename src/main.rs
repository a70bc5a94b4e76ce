//! herakles-platform-collector
//!
//! Collects a snapshot of CPU topology, utilization, memory, NUMA layout and
//! RDT capabilities and prints it as JSON, YAML or Prometheus text.
//! This is the main entry point that resolves configuration and dispatches subcommands.

mod cli;
mod commands;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;

use cli::{Args, Commands, ConfigFormat, LogLevel, OutputFormat};
use commands::{command_check, command_collect};
use herakles_platform_collector::config::{
    load_config, render_config, validate_effective_config, Config,
};

/// Initializes tracing logging subsystem with configured log level.
///
/// Logs go to stderr so that reports on stdout stay machine-readable.
fn setup_logging(config: &Config, args: &Args) -> anyhow::Result<()> {
    let level = args
        .log_level
        .or_else(|| {
            config
                .log_level
                .as_deref()
                .and_then(|s| LogLevel::from_str(s, true).ok())
        })
        .unwrap_or(LogLevel::Info);

    let filter = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    debug!("Logging initialized with level: {:?}", level);
    Ok(())
}

/// Resolve effective configuration (CLI > config file > defaults).
fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Source locations
    if let Some(proc_root) = &args.proc_root {
        config.proc_root = Some(proc_root.clone());
    }
    if let Some(node_root) = &args.node_root {
        config.node_root = Some(node_root.clone());
    }
    if let Some(resctrl_root) = &args.resctrl_root {
        config.resctrl_root = Some(resctrl_root.clone());
    }

    // Collection
    if args.disable_rdt {
        config.enable_rdt = Some(false);
    }
    if args.parallel {
        config.parallel_collection = Some(true);
    }

    if let Some(level) = args.log_level {
        config.log_level = Some(format!("{level:?}").to_lowercase());
    }

    if let Some(Commands::Collect {
        format: Some(format),
        ..
    }) = &args.command
    {
        config.output_format = Some(format.as_str().to_string());
    }

    Ok(config)
}

fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    let format = match format {
        ConfigFormat::Yaml => "yaml",
        ConfigFormat::Json => "json",
        ConfigFormat::Toml => "toml",
    };
    println!("{}", render_config(config, format)?);
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = resolve_config(&args)?;

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    if args.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        return show_config(&config, args.config_format);
    }

    setup_logging(&config, &args)?;

    match &args.command {
        Some(Commands::Check { rdt }) => command_check(*rdt, &config),
        Some(Commands::Collect { platform_only, .. }) => {
            command_collect(&config, output_format(&config), *platform_only)
        }
        None => {
            info!("No subcommand given, running a single collection");
            command_collect(&config, output_format(&config), false)
        }
    }
}

/// Output format from the merged config; validation has already run.
fn output_format(config: &Config) -> OutputFormat {
    config
        .output_format
        .as_deref()
        .and_then(|s| OutputFormat::from_str(s, true).ok())
        .unwrap_or(OutputFormat::Json)
}
