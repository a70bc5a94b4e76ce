//! Collectors for platform topology and utilization.
//!
//! Each collector reads an independent kernel source and returns a
//! self-contained result; the platform assembler merges them.

pub mod numa;
pub mod rdt;
pub mod topology;
pub mod utilization;

pub use numa::{read_numa_info, NumaInfo};
pub use rdt::{read_rdt_information, RdtInformation};
pub use topology::{read_topology, CpuTopology, TopologyMap, UNKNOWN_CPU_MODEL};
pub use utilization::{read_cpus_usage, read_memory_used};
