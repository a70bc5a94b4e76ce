//! Error types for platform collection.
//!
//! Every failure is fatal to the current collection cycle. Nothing here is
//! retried or replaced with a default; the caller decides what to do with a
//! failed cycle.

use std::path::{Path, PathBuf};

use crate::listformat::ListFormatError;

/// Errors that can occur while collecting a platform snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// An expected pseudo-file or directory is missing or unreadable.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Text does not match the expected record or field shape.
    #[error("failed to parse {source_name}: {detail}")]
    Parse { source_name: String, detail: String },

    /// A list-format value (e.g. a NUMA `cpulist`) is malformed.
    #[error("invalid list format in {source_name}: {error}")]
    ListFormat {
        source_name: String,
        error: ListFormatError,
    },

    /// The same logical processor id appears in more than one record.
    #[error("processor {cpu} is listed more than once in the processor descriptor")]
    DuplicateCpu { cpu: u32 },

    /// Per-CPU usage and topology disagree on the number of logical processors.
    #[error(
        "inconsistency in cpu data returned by kernel: {usage_entries} per-cpu usage entries, {cpus} logical processors"
    )]
    Inconsistent { usage_entries: usize, cpus: usize },

    /// The host name could not be determined.
    #[error("failed to determine hostname: {0}")]
    Hostname(#[source] nix::errno::Errno),
}

impl PlatformError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PlatformError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        PlatformError::Parse {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}

/// Reads a pseudo-file into a string, attaching the path to any I/O error.
pub(crate) fn read_source(path: &Path) -> Result<String, PlatformError> {
    std::fs::read_to_string(path).map_err(|e| PlatformError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = read_source(Path::new("/nonexistent/platform/cpuinfo")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/nonexistent/platform/cpuinfo"), "{msg}");
        assert!(matches!(err, PlatformError::Io { .. }));
    }

    #[test]
    fn test_inconsistent_message() {
        let err = PlatformError::Inconsistent {
            usage_entries: 3,
            cpus: 4,
        };
        assert!(err.to_string().contains("3 per-cpu usage entries"));
    }
}
