//! NUMA node collector.
//!
//! Walks `/sys/devices/system/node/node*` and reads, per node:
//! - `meminfo`: free and used memory
//! - `cpulist`: CPUs belonging to the node (list format)

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{read_source, PlatformError};
use crate::listformat;
use crate::{CpuId, NodeId};

/// Per-node memory and CPU membership, keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumaInfo {
    /// Free memory per node in bytes.
    pub node_memory_free: BTreeMap<NodeId, i64>,
    /// Used memory per node in bytes.
    pub node_memory_used: BTreeMap<NodeId, i64>,
    pub node_cpus: BTreeMap<NodeId, BTreeSet<CpuId>>,
}

/// Memory figures parsed from one node's `meminfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeMemory {
    pub free: Option<i64>,
    pub used: Option<i64>,
}

/// Reads every `nodeN` directory under `root`.
///
/// A missing root or a node without `meminfo`/`cpulist` is an error.
pub fn read_numa_info(root: &Path) -> Result<NumaInfo, PlatformError> {
    let mut info = NumaInfo::default();

    let entries = fs::read_dir(root).map_err(|e| PlatformError::io(root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PlatformError::io(root, e))?;
        let dir_name = entry.file_name();
        let Some(node_id) = node_id_from_dir_name(&dir_name.to_string_lossy()) else {
            continue;
        };
        let node_dir = entry.path();

        let meminfo_path = node_dir.join("meminfo");
        let memory = parse_node_meminfo(
            &read_source(&meminfo_path)?,
            &meminfo_path.display().to_string(),
        )?;
        if let Some(free) = memory.free {
            info.node_memory_free.insert(node_id, free);
        }
        if let Some(used) = memory.used {
            info.node_memory_used.insert(node_id, used);
        }

        let cpulist_path = node_dir.join("cpulist");
        let cpus = listformat::decode(&read_source(&cpulist_path)?).map_err(|error| {
            PlatformError::ListFormat {
                source_name: cpulist_path.display().to_string(),
                error,
            }
        })?;
        info.node_cpus.insert(node_id, cpus);
    }

    debug!("Discovered {} NUMA nodes", info.node_cpus.len());
    Ok(info)
}

/// Returns the node id of a `nodeN` directory name.
pub fn node_id_from_dir_name(name: &str) -> Option<NodeId> {
    let suffix = name.strip_prefix("node")?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Parses a node `meminfo` file.
///
/// Lines look like `Node 0 MemFree:  1234 kB`. Only five-field lines are
/// considered; the third field picks free or used, the fourth is KiB.
pub fn parse_node_meminfo(content: &str, source_name: &str) -> Result<NodeMemory, PlatformError> {
    let mut memory = NodeMemory::default();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            continue;
        }
        let slot = match fields[2] {
            "MemFree:" => &mut memory.free,
            "MemUsed:" => &mut memory.used,
            _ => continue,
        };
        let kib = fields[3].parse::<i64>().map_err(|_| {
            PlatformError::parse(
                source_name,
                format!("invalid value '{}' for {}", fields[3], fields[2]),
            )
        })?;
        let bytes = kib.checked_mul(1024).ok_or_else(|| {
            PlatformError::parse(source_name, format!("{} value {} kB overflows", fields[2], kib))
        })?;
        *slot = Some(bytes);
    }

    Ok(memory)
}
