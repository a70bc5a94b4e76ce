//! Check command implementation.
//!
//! Validates that every kernel source the collectors depend on is present
//! and parses.

use herakles_platform_collector::collectors::{
    read_cpus_usage, read_memory_used, read_numa_info, read_rdt_information, read_topology,
};
use herakles_platform_collector::config::{validate_effective_config, Config};
use herakles_platform_collector::{listformat, HostIdentity};

/// Whether resctrl is probed: whenever a collection cycle would read it, or
/// when explicitly requested.
fn include_rdt(rdt: bool, config: &Config) -> bool {
    rdt || config.enable_rdt.unwrap_or(true)
}

/// Validates kernel sources and configuration.
pub fn command_check(rdt: bool, config: &Config) -> anyhow::Result<()> {
    println!("🔍 Herakles Platform Collector - System Check");
    println!("=============================================");

    let paths = config.platform_paths();
    let mut all_ok = true;

    // Processor descriptor
    println!("\n🧩 Checking {}...", paths.cpuinfo().display());
    let cpus = match read_topology(&paths.cpuinfo()) {
        Ok(topology) => {
            println!(
                "   ✅ {} sockets, {} cores, {} cpus ({})",
                topology.sockets, topology.cores, topology.cpus, topology.cpu_model
            );
            Some(topology.cpus)
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
            None
        }
    };

    // CPU statistics
    println!("\n📈 Checking {}...", paths.stat().display());
    match read_cpus_usage(&paths.stat()) {
        Ok(usage) => match cpus {
            Some(cpus) if cpus != usage.len() => {
                println!(
                    "   ❌ {} per-CPU entries but {} processors in cpuinfo",
                    usage.len(),
                    cpus
                );
                all_ok = false;
            }
            _ => println!("   ✅ {} per-CPU entries", usage.len()),
        },
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    // Memory statistics
    println!("\n💾 Checking {}...", paths.meminfo().display());
    match read_memory_used(&paths.meminfo()) {
        Ok(used) => println!("   ✅ {} MB used", used / 1024 / 1024),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    // NUMA topology
    println!("\n🗺️  Checking {}...", paths.node_root().display());
    match read_numa_info(paths.node_root()) {
        Ok(numa) if numa.node_cpus.is_empty() => {
            println!("   ⚠️  No NUMA nodes found");
        }
        Ok(numa) => {
            for (node, cpus) in &numa.node_cpus {
                println!("   ✅ node{}: cpus {}", node, listformat::encode(cpus.iter().copied()));
            }
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    // RDT
    if include_rdt(rdt, config) {
        println!("\n🧮 Checking {}...", paths.resctrl_root().display());
        match read_rdt_information(paths.resctrl_root()) {
            Ok(info) => {
                println!(
                    "   ✅ monitoring: {}, allocation: {}",
                    info.is_monitoring_enabled(),
                    info.is_control_enabled()
                );
                if let Some(closids) = info.num_closids {
                    println!("   ✅ {} CLOSids available", closids);
                }
            }
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }

    // Hostname
    println!("\n🏷️  Checking hostname...");
    match HostIdentity::detect() {
        Ok(host) => println!("   ✅ {} (collector {})", host.hostname, host.version),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    // Configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - platform sources are readable");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review the errors above");
        std::process::exit(1);
    }
}
