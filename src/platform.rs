//! Platform snapshot assembly.
//!
//! Runs the topology, utilization, NUMA and RDT collectors, stamps the
//! wall-clock time and checks that the per-CPU usage agrees with the
//! topology before handing out a [`Platform`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::collectors::{
    read_cpus_usage, read_memory_used, read_numa_info, read_rdt_information, read_topology,
    CpuTopology, NumaInfo, RdtInformation, TopologyMap,
};
use crate::config::Config;
use crate::error::PlatformError;
use crate::host::HostIdentity;
use crate::metrics::{create_labels, create_metrics, Metric};
use crate::paths::PlatformPaths;
use crate::{CpuId, NodeId};

/// One snapshot of host topology and resource usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub sockets: usize,
    /// Physical cores summed over all sockets.
    pub cores: usize,
    /// Logical processors, as reported by `nproc`.
    pub cpus: usize,

    /// Socket id → core id → logical processors, from `/proc/cpuinfo`.
    pub topology: TopologyMap,

    pub cpu_model: String,

    /// Cumulative busy time per CPU from `/proc/stat` (USER_HZ ticks).
    pub cpus_usage: BTreeMap<CpuId, u64>,

    /// Bytes, `MemTotal - MemFree - Buffers - Cached`.
    pub total_memory_used: i64,

    pub node_memory_free: BTreeMap<NodeId, i64>,
    pub node_memory_used: BTreeMap<NodeId, i64>,
    pub node_cpus: BTreeMap<NodeId, BTreeSet<CpuId>>,

    /// When gathering finished.
    pub timestamp: DateTime<Utc>,

    pub rdt_information: Option<RdtInformation>,
}

/// Everything produced by one collection cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformReport {
    pub platform: Platform,
    pub metrics: Vec<Metric>,
    pub labels: BTreeMap<String, String>,
}

/// Builds a [`Platform`] from collector outputs.
///
/// Fails with [`PlatformError::Inconsistent`] when the number of per-CPU
/// usage entries differs from the number of logical processors.
pub fn assemble_platform(
    topology: CpuTopology,
    cpus_usage: BTreeMap<CpuId, u64>,
    total_memory_used: i64,
    numa: NumaInfo,
    rdt_information: Option<RdtInformation>,
    timestamp: DateTime<Utc>,
) -> Result<Platform, PlatformError> {
    if cpus_usage.len() != topology.cpus {
        error!(
            "Inconsistency in cpu data returned by kernel: {} usage entries vs {} processors",
            cpus_usage.len(),
            topology.cpus
        );
        return Err(PlatformError::Inconsistent {
            usage_entries: cpus_usage.len(),
            cpus: topology.cpus,
        });
    }

    Ok(Platform {
        sockets: topology.sockets,
        cores: topology.cores,
        cpus: topology.cpus,
        topology: topology.topology,
        cpu_model: topology.cpu_model,
        cpus_usage,
        total_memory_used,
        node_memory_free: numa.node_memory_free,
        node_memory_used: numa.node_memory_used,
        node_cpus: numa.node_cpus,
        timestamp,
        rdt_information,
    })
}

/// Static side of a cycle: topology and RDT capabilities.
type StaticParts = (
    Result<CpuTopology, PlatformError>,
    Result<Option<RdtInformation>, PlatformError>,
);
/// Dynamic side of a cycle: per-CPU usage, used memory and NUMA state.
type DynamicParts = (
    Result<BTreeMap<CpuId, u64>, PlatformError>,
    Result<i64, PlatformError>,
    Result<NumaInfo, PlatformError>,
);

/// Collects platform snapshots from a set of source paths.
#[derive(Debug, Clone)]
pub struct PlatformCollector {
    paths: PlatformPaths,
    rdt_enabled: bool,
    parallel: bool,
}

impl Default for PlatformCollector {
    fn default() -> Self {
        Self::new(PlatformPaths::default())
    }
}

impl PlatformCollector {
    pub fn new(paths: PlatformPaths) -> Self {
        Self {
            paths,
            rdt_enabled: true,
            parallel: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.platform_paths())
            .with_rdt(config.enable_rdt.unwrap_or(true))
            .with_parallel(config.parallel_collection.unwrap_or(false))
    }

    /// Skip RDT detection; `rdt_information` will be `None`.
    pub fn with_rdt(mut self, enabled: bool) -> Self {
        self.rdt_enabled = enabled;
        self
    }

    /// Run the independent collectors on the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn paths(&self) -> &PlatformPaths {
        &self.paths
    }

    /// Runs one collection cycle and returns the assembled snapshot.
    pub fn collect_platform(&self) -> Result<Platform, PlatformError> {
        let ((topology, rdt), (cpus_usage, memory_used, numa)) = if self.parallel {
            rayon::join(|| self.collect_static(), || self.collect_dynamic())
        } else {
            (self.collect_static(), self.collect_dynamic())
        };

        assemble_platform(topology?, cpus_usage?, memory_used?, numa?, rdt?, Utc::now())
    }

    /// Runs one collection cycle and derives metrics and labels for `host`.
    pub fn collect(&self, host: &HostIdentity) -> Result<PlatformReport, PlatformError> {
        let platform = self.collect_platform()?;
        let metrics = create_metrics(&platform);
        let labels = create_labels(&platform, host);

        info!(
            "Collected platform: {} sockets, {} cores, {} cpus, {} NUMA nodes, rdt={}",
            platform.sockets,
            platform.cores,
            platform.cpus,
            platform.node_cpus.len(),
            platform.rdt_information.is_some()
        );

        Ok(PlatformReport {
            platform,
            metrics,
            labels,
        })
    }

    fn collect_static(&self) -> StaticParts {
        let topology = read_topology(&self.paths.cpuinfo());
        let rdt = if self.rdt_enabled {
            read_rdt_information(self.paths.resctrl_root()).map(Some)
        } else {
            debug!("RDT collection disabled");
            Ok(None)
        };
        (topology, rdt)
    }

    fn collect_dynamic(&self) -> DynamicParts {
        (
            read_cpus_usage(&self.paths.stat()),
            read_memory_used(&self.paths.meminfo()),
            read_numa_info(self.paths.node_root()),
        )
    }
}

/// Collects platform information from the default kernel locations.
///
/// Returns the snapshot, its measurement points and the common labels that
/// downstream consumers attach to every other metric (host, topology counts).
/// With `rdt_enabled == false` resctrl is not read and `rdt_information` is `None`.
///
/// ```no_run
/// use herakles_platform_collector::collect_platform_information;
///
/// let report = collect_platform_information(false)?;
/// assert!(report.platform.rdt_information.is_none());
/// println!("{}", report.labels["cpu_model"]);
/// # Ok::<(), herakles_platform_collector::PlatformError>(())
/// ```
pub fn collect_platform_information(rdt_enabled: bool) -> Result<PlatformReport, PlatformError> {
    collect_platform_information_from(PlatformPaths::default(), rdt_enabled)
}

/// Same as [`collect_platform_information`], reading from `paths`.
pub fn collect_platform_information_from(
    paths: PlatformPaths,
    rdt_enabled: bool,
) -> Result<PlatformReport, PlatformError> {
    let host = HostIdentity::detect()?;
    PlatformCollector::new(paths)
        .with_rdt(rdt_enabled)
        .collect(&host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::topology::parse_cpuinfo;
    use crate::collectors::topology::tests::cpuinfo_fixture;

    fn topology(sockets: u32, cores: u32, threads: u32) -> CpuTopology {
        parse_cpuinfo(&cpuinfo_fixture(sockets, cores, threads), "cpuinfo").unwrap()
    }

    fn usage(n: u32) -> BTreeMap<CpuId, u64> {
        (0..n).map(|cpu| (cpu, u64::from(cpu) * 10)).collect()
    }

    #[test]
    fn test_assemble_platform() {
        let now = Utc::now();
        let platform =
            assemble_platform(topology(2, 2, 2), usage(8), 4096, NumaInfo::default(), None, now)
                .unwrap();
        assert_eq!(platform.sockets, 2);
        assert_eq!(platform.cores, 4);
        assert_eq!(platform.cpus, 8);
        assert_eq!(platform.cpus_usage.len(), platform.cpus);
        assert_eq!(platform.total_memory_used, 4096);
        assert_eq!(platform.timestamp, now);
        assert!(platform.rdt_information.is_none());
    }

    #[test]
    fn test_assemble_platform_count_mismatch() {
        let result = assemble_platform(
            topology(1, 2, 2),
            usage(3),
            0,
            NumaInfo::default(),
            None,
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(PlatformError::Inconsistent {
                usage_entries: 3,
                cpus: 4
            })
        ));
    }

    #[test]
    fn test_collector_defaults() {
        let collector = PlatformCollector::default();
        assert_eq!(collector.paths(), &PlatformPaths::default());
        assert!(collector.rdt_enabled);
        assert!(!collector.parallel);
    }
}
