//! Configuration management for the flow CLI
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (flow-cli.toml)
//! - Environment variables (FLOW_CLI__*)
//!
//! ## Example config file (flow-cli.toml):
//! ```toml
//! [manifest]
//! path = "flow.json"
//!
//! [dependencies]
//! skip_deployments = false
//! skip_alias = true
//!
//! [networks]
//! testnet = "access.devnet.nodes.onflow.org:9000"
//!
//! [lint]
//! format = "json"
//!
//! [log]
//! filter = "flowkit=debug"
//! ```
//!
//! Gateway hosts declared in `flow.json` always win over `[networks]`.

use config_crate::{Config, ConfigError, Environment, File};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::manifest::{self, MANIFEST_FILE};

/// Main configuration for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Manifest settings
    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Dependency installer defaults
    #[serde(default)]
    pub dependencies: DependenciesConfig,

    /// Default gateway host per network
    #[serde(default = "default_networks")]
    pub networks: IndexMap<String, String>,

    /// Linter settings
    #[serde(default)]
    pub lint: LintConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Path to flow.json
    #[serde(default = "default_manifest_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependenciesConfig {
    /// Never prompt for an emulator deployment account
    #[serde(default)]
    pub skip_deployments: bool,

    /// Never prompt for cross-network aliases
    #[serde(default)]
    pub skip_alias: bool,
}

/// Lint report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LintFormat {
    #[default]
    Text,
    Json,
    /// Summary line only
    Inline,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default)]
    pub format: LintFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default value functions
fn default_manifest_path() -> PathBuf {
    PathBuf::from(MANIFEST_FILE)
}

fn default_networks() -> IndexMap<String, String> {
    [manifest::EMULATOR, manifest::TESTNET, manifest::MAINNET]
        .into_iter()
        .filter_map(|name| manifest::default_host(name).map(|host| (name.to_string(), host.to_string())))
        .collect()
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            manifest: ManifestConfig::default(),
            dependencies: DependenciesConfig::default(),
            networks: default_networks(),
            lint: LintConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl FlowConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, optionally layering an explicit file on top
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["flow-cli.toml", ".flow-cli.toml", "config/flow-cli.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Platform config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "onflow", "flow-cli") {
            let user_config = config_dir.config_dir().join("flow-cli.toml");
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // FLOW_CLI__LINT__FORMAT=json
        builder = builder.add_source(
            Environment::with_prefix("FLOW_CLI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Gateway host for a network when flow.json does not declare one
    pub fn network_host(&self, network: &str) -> Option<&str> {
        self.networks.get(network).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FlowConfig::default();
        assert_eq!(config.manifest.path, PathBuf::from("flow.json"));
        assert!(!config.dependencies.skip_alias);
        assert_eq!(config.lint.format, LintFormat::Text);
        assert_eq!(config.log.filter, "warn");
    }

    #[test]
    fn test_deserialized_defaults_fill_networks() {
        let config: FlowConfig = toml::from_str("[lint]\nformat = \"inline\"\n").unwrap();
        assert_eq!(config.lint.format, LintFormat::Inline);
        assert_eq!(config.network_host("emulator"), Some("127.0.0.1:3569"));
        assert_eq!(
            config.network_host("mainnet"),
            Some("access.mainnet.nodes.onflow.org:9000")
        );
        assert_eq!(config.network_host("testing"), None);
    }

    #[test]
    fn test_serialize_config() {
        let config: FlowConfig = toml::from_str("").unwrap();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[manifest]"));
        assert!(toml_str.contains("[networks]"));
        assert!(toml_str.contains("format = \"text\""));
    }
}
