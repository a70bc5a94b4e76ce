//! Host identity facts attached to every snapshot's labels.

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// Version string reported in the `version` label.
pub const COLLECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hostname and software version, resolved once by the caller and passed
/// explicitly into label derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    pub hostname: String,
    pub version: String,
}

impl HostIdentity {
    pub fn new(hostname: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            version: version.into(),
        }
    }

    /// Looks up the hostname of the running system.
    pub fn detect() -> Result<Self, PlatformError> {
        let hostname = nix::unistd::gethostname().map_err(PlatformError::Hostname)?;
        Ok(Self::new(hostname.to_string_lossy(), COLLECTOR_VERSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        let host = HostIdentity::detect().unwrap();
        assert!(!host.hostname.is_empty());
        assert_eq!(host.version, COLLECTOR_VERSION);
    }
}
