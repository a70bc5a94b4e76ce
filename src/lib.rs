//! Herakles Platform Collector Library
//!
//! Gathers a point-in-time snapshot of the host platform from the Linux
//! kernel's pseudo-filesystems: CPU topology and model, per-CPU busy time,
//! system and per-NUMA-node memory usage, and Intel RDT (resctrl)
//! capabilities. A snapshot is turned into measurement points and a set of
//! common labels that downstream collectors attach to their own metrics.
//!
//! # Features
//!
//! - **Topology**: socket → core → logical processor map from `/proc/cpuinfo`
//! - **Utilization**: per-CPU busy ticks from `/proc/stat`, used memory from `/proc/meminfo`
//! - **NUMA**: per-node free/used memory and CPU lists from `/sys/devices/system/node`
//! - **RDT**: cache/bandwidth monitoring and allocation capabilities from `/sys/fs/resctrl`
//!
//! # Usage
//!
//! ```no_run
//! use herakles_platform_collector::{HostIdentity, PlatformCollector};
//!
//! let host = HostIdentity::detect()?;
//! let report = PlatformCollector::default().collect(&host)?;
//!
//! println!("{} sockets, {} cpus", report.platform.sockets, report.platform.cpus);
//! for metric in &report.metrics {
//!     println!("{} = {}", metric.name.as_str(), metric.value);
//! }
//! # Ok::<(), herakles_platform_collector::PlatformError>(())
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod host;
pub mod listformat;
pub mod metrics;
pub mod paths;
pub mod platform;

/// Logical processor id as reported by the kernel.
pub type CpuId = u32;
/// NUMA node id, taken from the `nodeN` directory name.
pub type NodeId = u32;

// Re-export main types for convenience
pub use collectors::{CpuTopology, NumaInfo, RdtInformation, TopologyMap};
pub use config::Config;
pub use error::PlatformError;
pub use host::HostIdentity;
pub use listformat::ListFormatError;
pub use metrics::{create_labels, create_metrics, render_prometheus, Metric, MetricName, MetricType};
pub use paths::PlatformPaths;
pub use platform::{
    assemble_platform, collect_platform_information, collect_platform_information_from, Platform,
    PlatformCollector, PlatformReport,
};
