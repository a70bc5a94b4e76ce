//! CPU topology collector.
//!
//! Parses `/proc/cpuinfo` into socket, core and logical processor counts and
//! a socket → core → CPU list mapping. Socket and core ids are not assumed
//! to be contiguous; records are sorted by `(socket, core)` and folded into
//! ordered maps.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{read_source, PlatformError};
use crate::CpuId;

/// Reported when the descriptor carries no `model name` line.
pub const UNKNOWN_CPU_MODEL: &str = "unknown_cpu_model";

static MODEL_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^model name\s*:\s*(.*?)\s*$").expect("model name regex is valid")
});

/// Socket id → core id → logical processors on that core.
pub type TopologyMap = BTreeMap<u32, BTreeMap<u32, Vec<CpuId>>>;

/// Topology derived from the processor descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTopology {
    /// Logical processors (one per descriptor record).
    pub cpus: usize,
    /// Physical cores, summed over all sockets.
    pub cores: usize,
    pub sockets: usize,
    pub topology: TopologyMap,
    pub cpu_model: String,
}

#[derive(Debug, Clone, Copy)]
struct ProcessorRecord {
    processor: CpuId,
    physical_id: u32,
    core_id: u32,
}

/// Reads and parses the processor descriptor at `path`.
pub fn read_topology(path: &Path) -> Result<CpuTopology, PlatformError> {
    let content = read_source(path)?;
    parse_cpuinfo(&content, &path.display().to_string())
}

/// Parses processor descriptor text.
///
/// `source_name` only labels errors.
pub fn parse_cpuinfo(content: &str, source_name: &str) -> Result<CpuTopology, PlatformError> {
    let mut records = split_records(content, source_name)?
        .iter()
        .map(|fields| ProcessorRecord::from_fields(fields, source_name))
        .collect::<Result<Vec<_>, _>>()?;

    if records.is_empty() {
        return Err(PlatformError::parse(source_name, "no processor records found"));
    }

    let mut seen = BTreeSet::new();
    for record in &records {
        if !seen.insert(record.processor) {
            return Err(PlatformError::DuplicateCpu {
                cpu: record.processor,
            });
        }
    }

    records.sort_by_key(|r| (r.physical_id, r.core_id, r.processor));

    let mut topology = TopologyMap::new();
    for record in &records {
        topology
            .entry(record.physical_id)
            .or_default()
            .entry(record.core_id)
            .or_default()
            .push(record.processor);
    }

    let cpus = records.len();
    let cores = topology.values().map(BTreeMap::len).sum();
    let sockets = topology.len();

    debug!(
        "Parsed {} processor records: {} sockets, {} cores",
        cpus, sockets, cores
    );

    Ok(CpuTopology {
        cpus,
        cores,
        sockets,
        topology,
        cpu_model: parse_cpu_model(content),
    })
}

/// Returns the first `model name` value in the descriptor.
pub fn parse_cpu_model(content: &str) -> String {
    content
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| MODEL_NAME_RE.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_CPU_MODEL.to_string())
}

/// Splits descriptor text into one key/value map per blank-line separated record.
fn split_records(
    content: &str,
    source_name: &str,
) -> Result<Vec<BTreeMap<String, String>>, PlatformError> {
    let mut records = Vec::new();
    let mut current = BTreeMap::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            continue;
        }

        let (key, value) = line.split_once(':').ok_or_else(|| {
            PlatformError::parse(
                source_name,
                format!("line {} is not a 'key : value' pair: '{}'", idx + 1, line),
            )
        })?;
        current.insert(key.trim().to_string(), value.trim().to_string());
    }

    if !current.is_empty() {
        records.push(current);
    }

    Ok(records)
}

impl ProcessorRecord {
    fn from_fields(
        fields: &BTreeMap<String, String>,
        source_name: &str,
    ) -> Result<Self, PlatformError> {
        let get = |key: &str| -> Result<u32, PlatformError> {
            let value = fields.get(key).ok_or_else(|| {
                PlatformError::parse(source_name, format!("processor record without '{key}'"))
            })?;
            value.parse::<u32>().map_err(|_| {
                PlatformError::parse(
                    source_name,
                    format!("'{key}' is not an integer: '{value}'"),
                )
            })
        };

        Ok(Self {
            processor: get("processor")?,
            physical_id: get("physical id")?,
            core_id: get("core id")?,
        })
    }
}
