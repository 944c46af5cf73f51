//! Project manifest (`flow.json`)
//!
//! The manifest describes networks, accounts, contracts, deployments and
//! dependencies of a Flow project. Section and key order is observable in
//! diffs, so every mapping is an `IndexMap` and serialization is stable.
//!
//! ```text
//! project/
//! ├── flow.json
//! ├── cadence/
//! │   └── contracts/
//! │       └── Hello.cdc
//! └── imports/
//!     └── 1654653399040a61/
//!         └── FlowToken.cdc
//! ```

mod json;

use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

use crate::address::Address;
use crate::checksum::Checksum;
use crate::error::{FlowError, Result};
use crate::fs::ReaderWriter;

/// File name of the manifest
pub const MANIFEST_FILE: &str = "flow.json";

/// Directory, relative to the manifest, that holds installed dependencies
pub const IMPORTS_DIR: &str = "imports";

pub const EMULATOR: &str = "emulator";
pub const TESTING: &str = "testing";
pub const TESTNET: &str = "testnet";
pub const MAINNET: &str = "mainnet";

/// Network names that are recognized without a `networks` entry
pub const STANDARD_NETWORKS: [&str; 4] = [EMULATOR, TESTING, TESTNET, MAINNET];

/// Network name -> address
pub type Aliases = IndexMap<String, Address>;

/// Default gateway host of a standard network
pub fn default_host(network: &str) -> Option<&'static str> {
    match network {
        EMULATOR => Some("127.0.0.1:3569"),
        TESTNET => Some("access.testnet.nodes.onflow.org:9000"),
        MAINNET => Some("access.mainnet.nodes.onflow.org:9000"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub host: String,
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub address: Address,
    /// Key descriptor, kept opaque
    pub key: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub name: String,
    /// Path relative to the manifest; `None` for alias-only contracts
    pub location: Option<PathBuf>,
    pub aliases: Aliases,
    /// Created by the dependency installer rather than authored
    pub is_dependency: bool,
}

impl Contract {
    /// The contract record implied by an installed dependency
    pub fn for_dependency(dep: &Dependency) -> Self {
        Self {
            name: dep.name.clone(),
            location: Some(dependency_path(&dep.source.address, &dep.source.contract_name)),
            aliases: dep.aliases.clone(),
            is_dependency: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentContract {
    pub name: String,
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub network: String,
    pub account: String,
    pub contracts: Vec<DeploymentContract>,
}

/// Where a dependency lives on chain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencySource {
    pub network: String,
    pub address: Address,
    pub contract_name: String,
}

impl DependencySource {
    pub fn new(network: impl Into<String>, address: Address, contract_name: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            address,
            contract_name: contract_name.into(),
        }
    }
}

fn source_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_\-]+)://(?:0x)?([0-9a-fA-F]{1,16})\.([A-Za-z_][A-Za-z0-9_]*)$")
            .expect("source pattern is valid")
    })
}

impl FromStr for DependencySource {
    type Err = FlowError;

    /// Parse `<network>://<hexaddress>.<contractName>`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let caps = source_pattern()
            .captures(s.trim())
            .ok_or_else(|| FlowError::InvalidSource(s.to_string()))?;
        let address = Address::from_hex(&caps[2])?;
        Ok(Self::new(&caps[1], address, &caps[3]))
    }
}

impl fmt::Display for DependencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}.{}", self.network, self.address, self.contract_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub source: DependencySource,
    pub hash: Checksum,
    pub aliases: Aliases,
}

/// `imports/<address>/<name>.cdc`, relative to the manifest directory
pub fn dependency_path(address: &Address, name: &str) -> PathBuf {
    Path::new(IMPORTS_DIR)
        .join(address.hex())
        .join(format!("{}.cdc", name))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub networks: IndexMap<String, Network>,
    pub accounts: IndexMap<String, Account>,
    pub contracts: IndexMap<String, Contract>,
    pub deployments: Vec<Deployment>,
    pub dependencies: IndexMap<String, Dependency>,
}

impl Manifest {
    /// Parse a manifest from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let raw: json::ManifestJson = serde_json::from_str(content)?;
        raw.into_manifest()
    }

    /// Render the manifest in its canonical on-disk form
    pub fn to_json(&self) -> Result<String> {
        json::to_pretty_json(&json::ManifestJson::from_manifest(self))
    }

    /// Load the manifest at `path`
    pub fn load(rw: &dyn ReaderWriter, path: &Path) -> Result<Self> {
        let content = rw.read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FlowError::Manifest(format!("{} not found", path.display()))
            } else {
                FlowError::Io(e)
            }
        })?;
        debug!(path = %path.display(), "loaded manifest");
        Self::from_json(&content)
    }

    /// Write the manifest to `path`
    pub fn save(&self, rw: &dyn ReaderWriter, path: &Path) -> Result<()> {
        let content = self.to_json()?;
        rw.write_file(path, content.as_bytes())?;
        debug!(path = %path.display(), "saved manifest");
        Ok(())
    }

    // --- networks ---

    /// Whether `name` is a standard network or declared in `networks`
    pub fn is_known_network(&self, name: &str) -> bool {
        self.networks.contains_key(name) || STANDARD_NETWORKS.contains(&name)
    }

    /// The gateway host for a network, falling back to the standard defaults
    pub fn network_host(&self, name: &str) -> Option<String> {
        self.networks
            .get(name)
            .map(|n| n.host.clone())
            .or_else(|| default_host(name).map(str::to_string))
    }

    pub fn add_network(&mut self, network: Network) {
        self.networks.insert(network.name.clone(), network);
    }

    /// Remove a network unless a contract alias, dependency or deployment uses it
    pub fn remove_network(&mut self, name: &str) -> Result<Network> {
        let aliased = self
            .contracts
            .values()
            .find(|c| c.aliases.contains_key(name))
            .map(|c| format!("contract {} has an alias on it", c.name));
        let deployed = self
            .deployments
            .iter()
            .find(|d| d.network == name)
            .map(|d| format!("account {} deploys to it", d.account));
        let sourced = self
            .dependencies
            .values()
            .find(|d| d.source.network == name || d.aliases.contains_key(name))
            .map(|d| format!("dependency {} references it", d.name));

        if let Some(reason) = aliased.or(deployed).or(sourced) {
            return Err(FlowError::Manifest(format!(
                "cannot remove network {}: {}",
                name, reason
            )));
        }

        self.networks
            .shift_remove(name)
            .ok_or_else(|| FlowError::NetworkUnknown(name.to_string()))
    }

    // --- contracts ---

    pub fn contract(&self, name: &str) -> Option<&Contract> {
        self.contracts.get(name)
    }

    /// Find the contract whose location is `path` (both relative to the manifest)
    pub fn contract_by_location(&self, path: &Path) -> Option<&Contract> {
        let wanted = crate::fs::normalize_path(path);
        self.contracts.values().find(|c| {
            c.location
                .as_deref()
                .map(|loc| crate::fs::normalize_path(loc) == wanted)
                .unwrap_or(false)
        })
    }

    pub fn add_or_update_contract(&mut self, contract: Contract) {
        self.contracts.insert(contract.name.clone(), contract);
    }

    // --- deployments ---

    pub fn deployment(&self, network: &str, account: &str) -> Option<&Deployment> {
        self.deployments
            .iter()
            .find(|d| d.network == network && d.account == account)
    }

    /// Append `contract` to the `(network, account)` deployment, creating it if needed.
    /// Returns `false` if the contract was already listed.
    pub fn add_contract_to_deployment(&mut self, network: &str, account: &str, contract: &str) -> bool {
        let index = match self
            .deployments
            .iter()
            .position(|d| d.network == network && d.account == account)
        {
            Some(index) => index,
            None => {
                self.deployments.push(Deployment {
                    network: network.to_string(),
                    account: account.to_string(),
                    contracts: Vec::new(),
                });
                self.deployments.len() - 1
            }
        };

        let deployment = &mut self.deployments[index];
        if deployment.contracts.iter().any(|c| c.name == contract) {
            return false;
        }
        deployment.contracts.push(DeploymentContract {
            name: contract.to_string(),
            args: Vec::new(),
        });
        true
    }

    // --- dependencies ---

    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.get(name)
    }

    /// Insert or replace a dependency, re-asserting its source alias
    pub fn add_or_update_dependency(&mut self, mut dep: Dependency) {
        dep.aliases
            .insert(dep.source.network.clone(), dep.source.address);
        self.dependencies.insert(dep.name.clone(), dep);
    }

    /// Check the structural invariants of the manifest, reporting every violation
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for deployment in &self.deployments {
            if !self.is_known_network(&deployment.network) {
                problems.push(format!(
                    "deployment for account {} uses unknown network {}",
                    deployment.account, deployment.network
                ));
            }
            for contract in &deployment.contracts {
                if !self.contracts.contains_key(&contract.name) {
                    problems.push(format!(
                        "deployment {}/{} references unknown contract {}",
                        deployment.network, deployment.account, contract.name
                    ));
                }
            }
        }

        for dep in self.dependencies.values() {
            if !self.is_known_network(&dep.source.network) {
                problems.push(format!(
                    "dependency {} uses unknown network {}",
                    dep.name, dep.source.network
                ));
            }
            if dep.aliases.get(&dep.source.network) != Some(&dep.source.address) {
                problems.push(format!(
                    "dependency {} has no {} alias matching its source address {}",
                    dep.name, dep.source.network, dep.source.address
                ));
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    const SAMPLE: &str = r#"{
	"networks": {
		"emulator": "127.0.0.1:3569",
		"testnet": {
			"host": "access.devnet.nodes.onflow.org:9000",
			"key": "ba69f7d2e82b9edf25b103c195cd371cf0cc047ef8884a9bbe331e62982d46daeebf836f7445a2ac16741013b192959d8ad26998aff12f2adc67a99e1eb2988d"
		}
	},
	"accounts": {
		"emulator-account": {
			"address": "f8d6e0586b0a20c7",
			"key": "dd72967fd2bd75234ae9037dd4694c1f00baad63a10c35172bf65fbb8ad74b43"
		}
	},
	"contracts": {
		"Hello": "cadence/contracts/Hello.cdc",
		"Aliased": {
			"source": "cadence/contracts/Aliased.cdc",
			"aliases": {
				"testnet": "7e60df042a9c0868"
			}
		}
	},
	"deployments": {
		"emulator": {
			"emulator-account": [
				"Hello",
				"FlowToken"
			]
		}
	},
	"dependencies": {
		"FlowToken": {
			"source": {
				"network": "mainnet",
				"address": "1654653399040a61",
				"contract": "FlowToken"
			},
			"hash": "cefb25fd19d2fbd1f5e2b7fc0b4a1e2d5fcb7d2f3ef0ba3e3c5c0f4e2b8c7d6a",
			"aliases": {
				"mainnet": "1654653399040a61",
				"testnet": "7e60df042a9c0868"
			}
		}
	}
}
"#;

    #[test]
    fn test_round_trip_is_byte_for_byte() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        assert_eq!(manifest.to_json().unwrap(), SAMPLE);
    }

    #[test]
    fn test_dependency_implies_contract_record() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        let contract = manifest.contract("FlowToken").unwrap();
        assert!(contract.is_dependency);
        assert_eq!(
            contract.location.as_deref(),
            Some(Path::new("imports/1654653399040a61/FlowToken.cdc"))
        );
        assert_eq!(
            contract.aliases.get(TESTNET).map(|a| a.hex()),
            Some("7e60df042a9c0868".to_string())
        );
        assert!(!manifest.contract("Hello").unwrap().is_dependency);
    }

    #[test]
    fn test_compact_source_is_accepted() {
        let manifest = Manifest::from_json(
            r#"{"dependencies": {"Hello": {"source": "testnet://8efde57e98c557fa.Hello", "hash": ""}}}"#,
        )
        .unwrap();
        let dep = manifest.dependency("Hello").unwrap();
        assert_eq!(dep.source.network, TESTNET);
        assert_eq!(dep.source.address.hex(), "8efde57e98c557fa");
        assert!(dep.hash.is_empty());
    }

    #[test]
    fn test_omitted_sections_default_to_empty() {
        let manifest = Manifest::from_json("{}").unwrap();
        assert!(manifest.networks.is_empty());
        assert!(manifest.deployments.is_empty());
        assert_eq!(manifest.to_json().unwrap(), "{}\n");
    }

    #[test]
    fn test_source_string_grammar() {
        let source: DependencySource = "testnet://0x8efde57e98c557fa.Hello".parse().unwrap();
        assert_eq!(source.to_string(), "testnet://8efde57e98c557fa.Hello");

        let short: DependencySource = "emulator://01.Foo".parse().unwrap();
        assert_eq!(short.address.hex(), "0000000000000001");

        assert!("testnet:/8efde57e98c557fa.Hello".parse::<DependencySource>().is_err());
        assert!("testnet://8efde57e98c557fa".parse::<DependencySource>().is_err());
        assert!("testnet://zz.Hello".parse::<DependencySource>().is_err());
    }

    #[test]
    fn test_remove_referenced_network_is_rejected() {
        let mut manifest = Manifest::from_json(SAMPLE).unwrap();
        assert!(manifest.remove_network(EMULATOR).is_err());
        assert!(manifest.remove_network(TESTNET).is_err());
        manifest.add_network(Network {
            name: "previewnet".to_string(),
            host: "access.previewnet.nodes.onflow.org:9000".to_string(),
            key: None,
        });
        assert!(manifest.remove_network("previewnet").is_ok());
        assert!(!manifest.networks.contains_key("previewnet"));
    }

    #[test]
    fn test_deployment_uniqueness() {
        let mut manifest = Manifest::default();
        assert!(manifest.add_contract_to_deployment(EMULATOR, "emulator-account", "A"));
        assert!(manifest.add_contract_to_deployment(EMULATOR, "emulator-account", "B"));
        assert!(!manifest.add_contract_to_deployment(EMULATOR, "emulator-account", "A"));
        assert_eq!(manifest.deployments.len(), 1);
        assert_eq!(manifest.deployments[0].contracts.len(), 2);
    }

    #[test]
    fn test_validate_reports_violations() {
        let mut manifest = Manifest::from_json(SAMPLE).unwrap();
        assert!(manifest.validate().is_empty());

        manifest.add_contract_to_deployment(EMULATOR, "emulator-account", "Missing");
        let mut dep = manifest.dependency("FlowToken").unwrap().clone();
        dep.aliases.shift_remove(MAINNET);
        manifest.dependencies.insert(dep.name.clone(), dep);

        let problems = manifest.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("Missing"));
        assert!(problems[1].contains("FlowToken"));
    }

    #[test]
    fn test_network_host_defaults() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        assert_eq!(
            manifest.network_host(TESTNET).as_deref(),
            Some("access.devnet.nodes.onflow.org:9000")
        );
        assert_eq!(
            manifest.network_host(MAINNET).as_deref(),
            Some("access.mainnet.nodes.onflow.org:9000")
        );
        assert!(manifest.network_host("custom").is_none());
    }

    #[test]
    fn test_load_and_save() {
        let fs = MemoryFs::new().with_file(MANIFEST_FILE, SAMPLE);
        let mut manifest = Manifest::load(&fs, Path::new(MANIFEST_FILE)).unwrap();
        manifest.add_contract_to_deployment(TESTNET, "emulator-account", "Hello");
        manifest.save(&fs, Path::new(MANIFEST_FILE)).unwrap();

        let reloaded = Manifest::load(&fs, Path::new(MANIFEST_FILE)).unwrap();
        assert!(reloaded.deployment(TESTNET, "emulator-account").is_some());
        assert!(Manifest::load(&fs, Path::new("missing.json")).is_err());
    }
}
