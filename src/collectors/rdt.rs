//! Intel RDT capability detection via the resctrl filesystem.
//!
//! Assumes resctrl is already mounted (normally at `/sys/fs/resctrl`); this
//! module never mounts it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{read_source, PlatformError};

const MON_L3_00: &str = "mon_data/mon_L3_00";
const LLC_OCCUPANCY: &str = "llc_occupancy";
const MBM_TOTAL: &str = "mbm_total_bytes";

/// RDT monitoring and allocation capabilities of the host.
///
/// Control parameters are `Some` only when the matching control is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdtInformation {
    /// `mon_data/mon_L3_00/llc_occupancy` exists.
    pub rdt_cache_monitoring_enabled: bool,
    /// `mon_data/mon_L3_00/mbm_total_bytes` exists.
    pub rdt_mb_monitoring_enabled: bool,

    /// `schemata` mentions `L3`.
    pub rdt_cache_control_enabled: bool,
    /// `schemata` mentions `MB:`.
    pub rdt_mb_control_enabled: bool,

    /// `info/L3/cbm_mask`, kept verbatim.
    pub cbm_mask: Option<String>,
    /// `info/L3/min_cbm_bits`, kept verbatim.
    pub min_cbm_bits: Option<String>,
    /// Usable CLOS ids. With both controls enabled this is the smaller of
    /// `info/L3/num_closids` and `info/MB/num_closids`. Also filled on
    /// bandwidth-only hosts, from `info/MB/num_closids`.
    pub num_closids: Option<u32>,

    /// `info/MB/bandwidth_gran`
    pub mb_bandwidth_gran: Option<u32>,
    /// `info/MB/min_bandwidth`
    pub mb_min_bandwidth: Option<u32>,
}

impl RdtInformation {
    pub fn is_control_enabled(&self) -> bool {
        self.rdt_mb_control_enabled || self.rdt_cache_control_enabled
    }

    pub fn is_monitoring_enabled(&self) -> bool {
        self.rdt_mb_monitoring_enabled || self.rdt_cache_monitoring_enabled
    }
}

struct CacheControl {
    cbm_mask: String,
    min_cbm_bits: String,
    num_closids: u32,
}

struct BandwidthControl {
    bandwidth_gran: u32,
    min_bandwidth: u32,
    num_closids: u32,
}

/// Probes the resctrl tree rooted at `root`.
///
/// Parameter files are required once their control is detected in `schemata`.
pub fn read_rdt_information(root: &Path) -> Result<RdtInformation, PlatformError> {
    let mon_dir = root.join(MON_L3_00);
    let rdt_cache_monitoring_enabled = mon_dir.join(LLC_OCCUPANCY).exists();
    let rdt_mb_monitoring_enabled = mon_dir.join(MBM_TOTAL).exists();

    let schemata = read_value(root, "schemata")?;
    let rdt_cache_control_enabled = schemata.contains("L3");
    let rdt_mb_control_enabled = schemata.contains("MB:");

    let cache = if rdt_cache_control_enabled {
        Some(CacheControl {
            cbm_mask: read_value(root, "info/L3/cbm_mask")?,
            min_cbm_bits: read_value(root, "info/L3/min_cbm_bits")?,
            num_closids: read_number(root, "info/L3/num_closids")?,
        })
    } else {
        None
    };

    let bandwidth = if rdt_mb_control_enabled {
        Some(BandwidthControl {
            bandwidth_gran: read_number(root, "info/MB/bandwidth_gran")?,
            min_bandwidth: read_number(root, "info/MB/min_bandwidth")?,
            num_closids: read_number(root, "info/MB/num_closids")?,
        })
    } else {
        None
    };

    // The smaller resource bounds how many CLOS can be used with both.
    let num_closids = match (&cache, &bandwidth) {
        (Some(c), Some(b)) => Some(c.num_closids.min(b.num_closids)),
        (Some(c), None) => Some(c.num_closids),
        (None, Some(b)) => Some(b.num_closids),
        (None, None) => None,
    };

    let info = RdtInformation {
        rdt_cache_monitoring_enabled,
        rdt_mb_monitoring_enabled,
        rdt_cache_control_enabled,
        rdt_mb_control_enabled,
        num_closids,
        mb_bandwidth_gran: bandwidth.as_ref().map(|b| b.bandwidth_gran),
        mb_min_bandwidth: bandwidth.as_ref().map(|b| b.min_bandwidth),
        cbm_mask: cache.as_ref().map(|c| c.cbm_mask.clone()),
        min_cbm_bits: cache.map(|c| c.min_cbm_bits),
    };

    debug!(
        "RDT: cache monitoring={}, mb monitoring={}, cache control={}, mb control={}",
        info.rdt_cache_monitoring_enabled,
        info.rdt_mb_monitoring_enabled,
        info.rdt_cache_control_enabled,
        info.rdt_mb_control_enabled
    );

    Ok(info)
}

fn read_value(root: &Path, subpath: &str) -> Result<String, PlatformError> {
    Ok(read_source(&root.join(subpath))?.trim().to_string())
}

fn read_number(root: &Path, subpath: &str) -> Result<u32, PlatformError> {
    let value = read_value(root, subpath)?;
    value.parse::<u32>().map_err(|_| {
        PlatformError::parse(
            root.join(subpath).display().to_string(),
            format!("expected an integer, got '{value}'"),
        )
    })
}
