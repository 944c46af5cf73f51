use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Account, Gateway};
use crate::address::Address;
use crate::error::{FlowError, Result};

/// A gateway serving accounts from memory
///
/// Every `get_account` call is recorded so tests can assert fetch order.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    network: String,
    accounts: Mutex<HashMap<Address, Account>>,
    requests: Mutex<Vec<Address>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::for_network("memory")
    }

    pub fn for_network(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            ..Default::default()
        }
    }

    /// Add a contract to an account, creating the account if needed
    pub fn with_contract(self, address: Address, name: &str, code: impl AsRef<[u8]>) -> Self {
        self.set_contract(address, name, code);
        self
    }

    /// Add an account holding no contracts
    pub fn with_empty_account(self, address: Address) -> Self {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.entry(address).or_insert_with(|| Account {
                address,
                ..Default::default()
            });
        }
        self
    }

    /// Replace (or add) a contract's code
    pub fn set_contract(&self, address: Address, name: &str, code: impl AsRef<[u8]>) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts
                .entry(address)
                .or_insert_with(|| Account {
                    address,
                    ..Default::default()
                })
                .contracts
                .insert(name.to_string(), code.as_ref().to_vec());
        }
    }

    /// Addresses requested so far, in order
    pub fn requests(&self) -> Vec<Address> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn get_account(&self, address: Address) -> Result<Account> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(address);
        }
        let accounts = self.accounts.lock().map_err(|_| FlowError::Gateway {
            network: self.network.clone(),
            message: "memory gateway lock poisoned".to_string(),
        })?;
        accounts
            .get(&address)
            .cloned()
            .ok_or_else(|| FlowError::AccountMissing {
                network: self.network.clone(),
                address,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_contracts_and_records_requests() {
        let addr = Address::from_hex("0x01").unwrap();
        let gateway = MemoryGateway::for_network("testnet").with_contract(addr, "Foo", "access(all) contract Foo {}");

        let account = gateway.get_account(addr).await.unwrap();
        assert_eq!(account.contracts.len(), 1);
        assert!(account.contracts.contains_key("Foo"));

        let missing = Address::from_hex("0x02").unwrap();
        assert!(matches!(
            gateway.get_account(missing).await,
            Err(FlowError::AccountMissing { .. })
        ));
        assert_eq!(gateway.requests(), vec![addr, missing]);
    }
}
