//! `flow.json` codec
//!
//! The on-disk shapes are kept separate from the in-memory model so the
//! model stays free of serde quirks. Key order is preserved with
//! `IndexMap` on both read and write.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{
    Account, Aliases, Contract, Dependency, DependencySource, Deployment, DeploymentContract,
    Manifest, Network,
};
use crate::address::Address;
use crate::checksum::Checksum;
use crate::error::{FlowError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct ManifestJson {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    networks: IndexMap<String, NetworkJson>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    accounts: IndexMap<String, AccountJson>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    contracts: IndexMap<String, ContractJson>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    deployments: IndexMap<String, IndexMap<String, Vec<DeploymentContractJson>>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    dependencies: IndexMap<String, DependencyJson>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum NetworkJson {
    Simple(String),
    Advanced {
        host: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountJson {
    address: Address,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    key: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContractJson {
    Simple(PathBuf),
    Advanced {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        aliases: Aliases,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum DeploymentContractJson {
    Simple(String),
    Advanced {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<serde_json::Value>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct DependencyJson {
    source: SourceJson,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    hash: Checksum,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    aliases: Aliases,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum SourceJson {
    Compact(String),
    Object {
        network: String,
        address: Address,
        contract: String,
    },
}

impl ManifestJson {
    pub(super) fn into_manifest(self) -> Result<Manifest> {
        let networks = self
            .networks
            .into_iter()
            .map(|(name, network)| {
                let (host, key) = match network {
                    NetworkJson::Simple(host) => (host, None),
                    NetworkJson::Advanced { host, key } => (host, key),
                };
                (name.clone(), Network { name, host, key })
            })
            .collect();

        let accounts = self
            .accounts
            .into_iter()
            .map(|(name, account)| {
                (
                    name.clone(),
                    Account {
                        name,
                        address: account.address,
                        key: account.key,
                    },
                )
            })
            .collect();

        let mut dependencies: IndexMap<String, Dependency> = IndexMap::new();
        for (name, dep) in self.dependencies {
            let source = match dep.source {
                SourceJson::Compact(raw) => raw.parse::<DependencySource>()?,
                SourceJson::Object {
                    network,
                    address,
                    contract,
                } => DependencySource::new(network, address, contract),
            };
            dependencies.insert(
                name.clone(),
                Dependency {
                    name,
                    source,
                    hash: dep.hash,
                    aliases: dep.aliases,
                },
            );
        }

        let mut contracts: IndexMap<String, Contract> = self
            .contracts
            .into_iter()
            .map(|(name, contract)| {
                let (location, aliases) = match contract {
                    ContractJson::Simple(path) => (Some(path), Aliases::new()),
                    ContractJson::Advanced { source, aliases } => (source, aliases),
                };
                (
                    name.clone(),
                    Contract {
                        name,
                        location,
                        aliases,
                        is_dependency: false,
                    },
                )
            })
            .collect();

        // Dependencies imply a contract record pointing at the import tree,
        // unless the author declared one of the same name.
        for dep in dependencies.values() {
            if !contracts.contains_key(&dep.name) {
                contracts.insert(dep.name.clone(), Contract::for_dependency(dep));
            }
        }

        let mut deployments = Vec::new();
        for (network, by_account) in self.deployments {
            for (account, entries) in by_account {
                let contracts = entries
                    .into_iter()
                    .map(|entry| match entry {
                        DeploymentContractJson::Simple(name) => DeploymentContract {
                            name,
                            args: Vec::new(),
                        },
                        DeploymentContractJson::Advanced { name, args } => {
                            DeploymentContract { name, args }
                        }
                    })
                    .collect();
                deployments.push(Deployment {
                    network: network.clone(),
                    account,
                    contracts,
                });
            }
        }

        Ok(Manifest {
            networks,
            accounts,
            contracts,
            deployments,
            dependencies,
        })
    }

    pub(super) fn from_manifest(manifest: &Manifest) -> Self {
        let networks = manifest
            .networks
            .values()
            .map(|network| {
                let json = match &network.key {
                    None => NetworkJson::Simple(network.host.clone()),
                    Some(key) => NetworkJson::Advanced {
                        host: network.host.clone(),
                        key: Some(key.clone()),
                    },
                };
                (network.name.clone(), json)
            })
            .collect();

        let accounts = manifest
            .accounts
            .values()
            .map(|account| {
                (
                    account.name.clone(),
                    AccountJson {
                        address: account.address,
                        key: account.key.clone(),
                    },
                )
            })
            .collect();

        let contracts = manifest
            .contracts
            .values()
            .filter(|contract| !contract.is_dependency)
            .map(|contract| {
                let json = match (&contract.location, contract.aliases.is_empty()) {
                    (Some(path), true) => ContractJson::Simple(path.clone()),
                    (location, _) => ContractJson::Advanced {
                        source: location.clone(),
                        aliases: contract.aliases.clone(),
                    },
                };
                (contract.name.clone(), json)
            })
            .collect();

        let mut deployments: IndexMap<String, IndexMap<String, Vec<DeploymentContractJson>>> =
            IndexMap::new();
        for deployment in &manifest.deployments {
            let entries = deployment
                .contracts
                .iter()
                .map(|contract| {
                    if contract.args.is_empty() {
                        DeploymentContractJson::Simple(contract.name.clone())
                    } else {
                        DeploymentContractJson::Advanced {
                            name: contract.name.clone(),
                            args: contract.args.clone(),
                        }
                    }
                })
                .collect();
            deployments
                .entry(deployment.network.clone())
                .or_default()
                .insert(deployment.account.clone(), entries);
        }

        let dependencies = manifest
            .dependencies
            .values()
            .map(|dep| {
                (
                    dep.name.clone(),
                    DependencyJson {
                        source: SourceJson::Object {
                            network: dep.source.network.clone(),
                            address: dep.source.address,
                            contract: dep.source.contract_name.clone(),
                        },
                        hash: dep.hash.clone(),
                        aliases: dep.aliases.clone(),
                    },
                )
            })
            .collect();

        Self {
            networks,
            accounts,
            contracts,
            deployments,
            dependencies,
        }
    }
}

/// Render JSON with tab indentation and a trailing newline
pub(super) fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    String::from_utf8(out).map_err(|e| FlowError::Manifest(e.to_string()))
}
