//! Locations of the kernel-exposed sources read by the collectors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_NODE_ROOT: &str = "/sys/devices/system/node";
pub const DEFAULT_RESCTRL_ROOT: &str = "/sys/fs/resctrl";

/// Roots of the procfs, NUMA sysfs and resctrl trees.
///
/// The file names below each root are fixed; only the roots move, so the
/// collectors can run against a host `/proc` mounted elsewhere or against a
/// fixture tree in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformPaths {
    pub proc_root: PathBuf,
    pub node_root: PathBuf,
    pub resctrl_root: PathBuf,
}

impl Default for PlatformPaths {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            node_root: PathBuf::from(DEFAULT_NODE_ROOT),
            resctrl_root: PathBuf::from(DEFAULT_RESCTRL_ROOT),
        }
    }
}

impl PlatformPaths {
    pub fn cpuinfo(&self) -> PathBuf {
        self.proc_root.join("cpuinfo")
    }

    pub fn stat(&self) -> PathBuf {
        self.proc_root.join("stat")
    }

    pub fn meminfo(&self) -> PathBuf {
        self.proc_root.join("meminfo")
    }

    pub fn node_root(&self) -> &Path {
        &self.node_root
    }

    pub fn resctrl_root(&self) -> &Path {
        &self.resctrl_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = PlatformPaths::default();
        assert_eq!(paths.cpuinfo(), PathBuf::from("/proc/cpuinfo"));
        assert_eq!(paths.stat(), PathBuf::from("/proc/stat"));
        assert_eq!(paths.meminfo(), PathBuf::from("/proc/meminfo"));
        assert_eq!(paths.node_root(), Path::new("/sys/devices/system/node"));
        assert_eq!(paths.resctrl_root(), Path::new("/sys/fs/resctrl"));
    }
}
