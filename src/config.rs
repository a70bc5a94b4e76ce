//! Configuration management for herakles-platform-collector.
//!
//! This module handles loading and validating configuration from YAML, JSON
//! or TOML files. CLI overrides are merged in by the binary.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::paths::{PlatformPaths, DEFAULT_NODE_ROOT, DEFAULT_PROC_ROOT, DEFAULT_RESCTRL_ROOT};

pub const DEFAULT_OUTPUT_FORMAT: &str = "json";
pub const OUTPUT_FORMATS: [&str; 3] = ["json", "yaml", "prometheus"];
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Locations probed when no config path is given.
pub const DEFAULT_CONFIG_LOCATIONS: [&str; 6] = [
    "/etc/herakles/platform-collector.yaml",
    "/etc/herakles/platform-collector.yml",
    "/etc/herakles/platform-collector.json",
    "./herakles-platform-collector.yaml",
    "./herakles-platform-collector.yml",
    "./herakles-platform-collector.json",
];

/// Collector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Source locations
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "node-root")]
    pub node_root: Option<PathBuf>,
    #[serde(alias = "resctrl-root")]
    pub resctrl_root: Option<PathBuf>,

    // Collection
    #[serde(alias = "enable-rdt")]
    pub enable_rdt: Option<bool>,
    #[serde(alias = "parallel-collection")]
    pub parallel_collection: Option<bool>,

    // Output
    /// "json" | "yaml" | "prometheus"
    #[serde(alias = "output-format")]
    pub output_format: Option<String>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            node_root: Some(PathBuf::from(DEFAULT_NODE_ROOT)),
            resctrl_root: Some(PathBuf::from(DEFAULT_RESCTRL_ROOT)),
            enable_rdt: Some(true),
            parallel_collection: Some(false),
            output_format: Some(DEFAULT_OUTPUT_FORMAT.into()),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    /// Source roots with unset fields falling back to the kernel defaults.
    pub fn platform_paths(&self) -> PlatformPaths {
        let defaults = PlatformPaths::default();
        PlatformPaths {
            proc_root: self.proc_root.clone().unwrap_or(defaults.proc_root),
            node_root: self.node_root.clone().unwrap_or(defaults.node_root),
            resctrl_root: self.resctrl_root.clone().unwrap_or(defaults.resctrl_root),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    for (name, root) in [
        ("proc_root", &cfg.proc_root),
        ("node_root", &cfg.node_root),
        ("resctrl_root", &cfg.resctrl_root),
    ] {
        if root.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            bail!("{} must not be empty", name);
        }
    }

    if let Some(format) = cfg.output_format.as_deref() {
        if !OUTPUT_FORMATS.contains(&format) {
            bail!(
                "Invalid output_format '{}', expected one of: {}",
                format,
                OUTPUT_FORMATS.join(", ")
            );
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            bail!(
                "Invalid log_level '{}', expected one of: {}",
                level,
                LOG_LEVELS.join(", ")
            );
        }
    }

    Ok(())
}

/// Loads configuration from `path`, or from the first existing default location.
///
/// Falls back to [`Config::default`] when no file is found.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
        {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;

    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config text; the extension picks the format, YAML by default.
pub fn parse_config(content: &str, extension: Option<&str>) -> anyhow::Result<Config> {
    let config: Config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Serializes the configuration in the requested format ("yaml", "json", "toml").
pub fn render_config(config: &Config, format: &str) -> anyhow::Result<String> {
    let output = match format {
        "json" => serde_json::to_string_pretty(config)?,
        "toml" => toml::to_string_pretty(config)?,
        _ => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.platform_paths(), PlatformPaths::default());
    }

    #[test]
    fn test_parse_yaml_with_aliases() {
        let cfg = parse_config(
            "proc-root: /host/proc\nenable-rdt: false\noutput_format: yaml\n",
            Some("yaml"),
        )
        .unwrap();
        assert_eq!(cfg.proc_root, Some(PathBuf::from("/host/proc")));
        assert_eq!(cfg.enable_rdt, Some(false));
        assert_eq!(cfg.node_root, None);

        let paths = cfg.platform_paths();
        assert_eq!(paths.proc_root, PathBuf::from("/host/proc"));
        assert_eq!(paths.node_root, PathBuf::from(DEFAULT_NODE_ROOT));
    }

    #[test]
    fn test_parse_json_and_toml() {
        let cfg = parse_config(r#"{"parallel_collection": true}"#, Some("json")).unwrap();
        assert_eq!(cfg.parallel_collection, Some(true));

        let cfg = parse_config("resctrl_root = \"/mnt/resctrl\"\n", Some("toml")).unwrap();
        assert_eq!(cfg.resctrl_root, Some(PathBuf::from("/mnt/resctrl")));
    }

    #[test]
    fn test_invalid_output_format_and_log_level() {
        let cfg = Config {
            output_format: Some("xml".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            log_level: Some("verbose".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_empty_root_rejected() {
        let cfg = Config {
            proc_root: Some(PathBuf::new()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.json");
        fs::write(&path, r#"{"enable_rdt": false, "log_level": "debug"}"#).unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.enable_rdt, Some(false));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_render_config_roundtrip() {
        let cfg = Config::default();
        for format in ["yaml", "json", "toml"] {
            let text = render_config(&cfg, format).unwrap();
            let ext = if format == "yaml" { None } else { Some(format) };
            assert_eq!(parse_config(&text, ext).unwrap(), cfg);
        }
    }
}
