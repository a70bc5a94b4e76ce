//! CLI command implementations for herakles-platform-collector.
//!
//! This module provides implementations for all CLI subcommands:
//! - `collect`: One collection cycle, printed as JSON, YAML or Prometheus text
//! - `check`: Kernel source validation

pub mod check;
pub mod collect;

// Re-export command functions
pub use check::command_check;
pub use collect::command_collect;
