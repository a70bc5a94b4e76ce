//! CPU busy-time and memory usage from `/proc/stat` and `/proc/meminfo`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{read_source, PlatformError};
use crate::CpuId;

/// Reads `/proc/stat` and returns the cumulative busy time of each CPU.
pub fn read_cpus_usage(path: &Path) -> Result<BTreeMap<CpuId, u64>, PlatformError> {
    let content = read_source(path)?;
    parse_proc_stat(&content, &path.display().to_string())
}

/// Parses `/proc/stat` content into per-CPU busy-time counters.
///
/// Only `cpuN` lines are used; the aggregate `cpu` line is skipped. Busy time
/// is `user + nice + system + irq + softirq + steal`. Idle and iowait are not
/// busy, and guest/guest_nice are already accounted inside user/nice.
pub fn parse_proc_stat(
    content: &str,
    source_name: &str,
) -> Result<BTreeMap<CpuId, u64>, PlatformError> {
    let mut usage = BTreeMap::new();

    for line in content.lines() {
        let Some(rest) = line.strip_prefix("cpu") else {
            continue;
        };

        // "cpu  123 ..." is the aggregate line
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            continue;
        }
        let mut fields = rest.split_whitespace();
        let suffix = fields.next().unwrap_or_default();
        if !suffix.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let cpu_id: CpuId = suffix.parse().map_err(|_| {
            PlatformError::parse(source_name, format!("invalid cpu id 'cpu{suffix}'"))
        })?;

        let counters = fields
            .map(|f| {
                f.parse::<u64>().map_err(|_| {
                    PlatformError::parse(
                        source_name,
                        format!("non-numeric counter '{f}' for cpu{cpu_id}"),
                    )
                })
            })
            .collect::<Result<Vec<u64>, _>>()?;

        // user nice system idle iowait irq softirq steal [guest guest_nice]
        if counters.len() < 8 {
            return Err(PlatformError::parse(
                source_name,
                format!(
                    "cpu{cpu_id} has {} counters, expected at least 8",
                    counters.len()
                ),
            ));
        }
        let busy = [0, 1, 2, 5, 6, 7]
            .iter()
            .try_fold(0u64, |sum, &idx| sum.checked_add(counters[idx]))
            .ok_or_else(|| {
                PlatformError::parse(source_name, format!("busy time of cpu{cpu_id} overflows"))
            })?;

        usage.insert(cpu_id, busy);
    }

    debug!("Parsed busy time for {} cpus", usage.len());
    Ok(usage)
}

/// Reads `/proc/meminfo` and returns used memory in bytes.
pub fn read_memory_used(path: &Path) -> Result<i64, PlatformError> {
    let content = read_source(path)?;
    parse_proc_meminfo(&content, &path.display().to_string())
}

/// Parses `/proc/meminfo` content into used memory in bytes.
///
/// Used memory is `MemTotal - MemFree - Buffers - Cached`, the way `free(1)`
/// computes it. Missing keys count as zero. Values are KiB. The result is not
/// clamped, so inconsistent counters show up as a negative value; a result
/// outside the `i64` range is a parse error.
pub fn parse_proc_meminfo(content: &str, source_name: &str) -> Result<i64, PlatformError> {
    let mut total = 0i64;
    let mut free = 0i64;
    let mut buffers = 0i64;
    let mut cached = 0i64;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "MemTotal" => &mut total,
            "MemFree" => &mut free,
            "Buffers" => &mut buffers,
            "Cached" => &mut cached,
            _ => continue,
        };
        let value = rest.split_whitespace().next().unwrap_or_default();
        *slot = value.parse::<i64>().map_err(|_| {
            PlatformError::parse(source_name, format!("invalid value '{value}' for {key}"))
        })?;
    }

    total
        .checked_sub(free)
        .and_then(|v| v.checked_sub(buffers))
        .and_then(|v| v.checked_sub(cached))
        .and_then(|kib| kib.checked_mul(1024))
        .ok_or_else(|| PlatformError::parse(source_name, "used memory overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_STAT: &str = "\
cpu  3357 0 4313 1362393 0 0 0 0 0 0
cpu0 100 10 200 5000 40 3 4 5 60 70
cpu1 1 2 3 4 5 6 7 8 9 10
cpu2 0 0 0 0 0 0 0 0 0 0
cpu3 7 0 0 999 999 0 0 0 0 0
intr 114930548 113199788 3 0 5 263 0 4 [... lots more numbers ...]
ctxt 1990473
btime 1062191376
processes 2915
procs_running 1
procs_blocked 0
softirq 183433 0 21755 12 39 1137 231 21459 2263
";

    #[test]
    fn test_parse_proc_stat() {
        let usage = parse_proc_stat(PROC_STAT, "stat").unwrap();
        assert_eq!(usage.len(), 4);
        assert_eq!(usage.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        // user + nice + system + irq + softirq + steal
        assert_eq!(usage[&0], 100 + 10 + 200 + 3 + 4 + 5);
        assert_eq!(usage[&1], 1 + 2 + 3 + 6 + 7 + 8);
        assert_eq!(usage[&2], 0);
        // idle and iowait never count
        assert_eq!(usage[&3], 7);
    }

    #[test]
    fn test_parse_proc_stat_without_guest_fields() {
        let usage = parse_proc_stat("cpu0 1 1 1 1 1 1 1 1\n", "stat").unwrap();
        assert_eq!(usage[&0], 6);
    }

    #[test]
    fn test_parse_proc_stat_short_line() {
        let err = parse_proc_stat("cpu0 1 2 3\n", "stat").unwrap_err();
        assert!(matches!(err, PlatformError::Parse { .. }));
    }

    #[test]
    fn test_parse_proc_stat_bad_counter() {
        assert!(parse_proc_stat("cpu0 1 2 x 4 5 6 7 8\n", "stat").is_err());
    }

    #[test]
    fn test_parse_proc_stat_ignores_non_numeric_suffix() {
        let content = "cpuX 1 2 3 4 5 6 7 8\ncpu0 1 1 1 1 1 1 1 1\n";
        let usage = parse_proc_stat(content, "stat").unwrap();
        assert_eq!(usage.len(), 1);
    }

    #[test]
    fn test_parse_proc_meminfo() {
        let content = "MemTotal:        1000 kB\n\
                       MemFree:          400 kB\n\
                       MemAvailable:     700 kB\n\
                       Buffers:          100 kB\n\
                       Cached:           100 kB\n\
                       SwapCached:        50 kB\n";
        assert_eq!(parse_proc_meminfo(content, "meminfo").unwrap(), 409600);
    }

    #[test]
    fn test_parse_proc_meminfo_missing_keys_are_zero() {
        let content = "MemTotal: 2048 kB\nMemFree: 1024 kB\n";
        assert_eq!(parse_proc_meminfo(content, "meminfo").unwrap(), 1024 * 1024);
        assert_eq!(parse_proc_meminfo("", "meminfo").unwrap(), 0);
    }

    #[test]
    fn test_parse_proc_meminfo_negative_not_clamped() {
        let content = "MemTotal: 100 kB\nMemFree: 200 kB\n";
        assert_eq!(parse_proc_meminfo(content, "meminfo").unwrap(), -100 * 1024);
    }

    #[test]
    fn test_parse_proc_stat_counter_overflow() {
        let content = "cpu0 18446744073709551615 1 0 0 0 0 0 0\n";
        let err = parse_proc_stat(content, "stat").unwrap_err();
        assert!(matches!(err, PlatformError::Parse { .. }));
    }

    #[test]
    fn test_parse_proc_meminfo_overflow() {
        let content = "MemTotal: 9223372036854775807 kB\nMemFree: -5 kB\n";
        let err = parse_proc_meminfo(content, "meminfo").unwrap_err();
        assert!(matches!(err, PlatformError::Parse { .. }));

        // fits in KiB, not in bytes
        let content = "MemTotal: 9223372036854775 kB\n";
        assert!(parse_proc_meminfo(content, "meminfo").is_err());
    }

    #[test]
    fn test_parse_proc_meminfo_bad_value() {
        assert!(parse_proc_meminfo("MemTotal: lots kB\n", "meminfo").is_err());
    }
}
