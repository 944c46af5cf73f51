//! Chain gateway
//!
//! The installer only ever asks a gateway for one thing: an account and the
//! contracts deployed to it. [`Gateways`] holds one gateway per network and
//! is selected by a dependency's source network.

mod grpc;
mod memory;

pub use grpc::GrpcGateway;
pub use memory::MemoryGateway;

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;

use crate::address::Address;
use crate::config::FlowConfig;
use crate::error::{FlowError, Result};
use crate::manifest::{self, Manifest};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountKey {
    pub index: u32,
    pub public_key: Vec<u8>,
    pub sign_algo: u32,
    pub hash_algo: u32,
    pub weight: u32,
    pub sequence_number: u64,
    pub revoked: bool,
}

/// An on-chain account as seen by the installer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Account {
    pub address: Address,
    pub balance: u64,
    pub keys: Vec<AccountKey>,
    /// Contract name -> code, in the order the gateway returned them
    pub contracts: IndexMap<String, Vec<u8>>,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch an account at the latest sealed block
    async fn get_account(&self, address: Address) -> Result<Account>;
}

/// Gateways keyed by network name
#[derive(Clone, Default)]
pub struct Gateways {
    by_network: IndexMap<String, Arc<dyn Gateway>>,
}

impl Gateways {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, network: impl Into<String>, gateway: Arc<dyn Gateway>) {
        self.by_network.insert(network.into(), gateway);
    }

    pub fn with(mut self, network: impl Into<String>, gateway: Arc<dyn Gateway>) -> Self {
        self.insert(network, gateway);
        self
    }

    /// Gateway for `network`, or `NetworkUnknown`
    pub fn get(&self, network: &str) -> Result<&dyn Gateway> {
        self.by_network
            .get(network)
            .map(|gateway| gateway.as_ref())
            .ok_or_else(|| FlowError::NetworkUnknown(network.to_string()))
    }

    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.by_network.keys().map(String::as_str)
    }

    /// One gRPC gateway per network that has a host, in manifest then config order.
    ///
    /// Hosts come from the manifest `networks` section first and fall back to
    /// the configured defaults. Must be called inside a tokio runtime.
    pub fn connect(manifest: &Manifest, config: &FlowConfig) -> Result<Self> {
        let mut gateways = Self::new();

        let mut hosts: IndexMap<String, String> = IndexMap::new();
        for (name, host) in &config.networks {
            hosts.insert(name.clone(), host.clone());
        }
        for network in manifest.networks.values() {
            hosts.insert(network.name.clone(), network.host.clone());
        }
        for name in [manifest::EMULATOR, manifest::TESTNET, manifest::MAINNET] {
            if !hosts.contains_key(name) {
                if let Some(host) = manifest::default_host(name) {
                    hosts.insert(name.to_string(), host.to_string());
                }
            }
        }

        for (name, host) in hosts {
            let gateway = GrpcGateway::connect_lazy(&name, &host)?;
            gateways.insert(name, Arc::new(gateway));
        }
        Ok(gateways)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_network() {
        let gateways = Gateways::new().with("testnet", Arc::new(MemoryGateway::new()));
        assert!(gateways.get("testnet").is_ok());
        match gateways.get("previewnet") {
            Err(FlowError::NetworkUnknown(name)) => assert_eq!(name, "previewnet"),
            _ => panic!("expected NetworkUnknown"),
        }
    }

    #[tokio::test]
    async fn test_connect_uses_manifest_hosts() {
        let manifest = Manifest::from_json(
            r#"{"networks": {"previewnet": "access.previewnet.nodes.onflow.org:9000"}}"#,
        )
        .unwrap();
        let gateways = Gateways::connect(&manifest, &FlowConfig::default()).unwrap();
        let networks: Vec<&str> = gateways.networks().collect();
        assert_eq!(networks, vec!["emulator", "testnet", "mainnet", "previewnet"]);
    }
}
