//! Flow Access API client
//!
//! Only `GetAccountAtLatestBlock` is needed, so the request and response
//! messages are declared by hand with `prost` instead of generated from the
//! full protobuf tree.

use async_trait::async_trait;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;
use tracing::debug;

use super::{Account, AccountKey, Gateway};
use crate::address::Address;
use crate::error::{FlowError, Result};

const GET_ACCOUNT_PATH: &str = "/flow.access.AccessAPI/GetAccountAtLatestBlock";

// Accounts with many contracts exceed tonic's 4 MiB default.
const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAccountAtLatestBlockRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub address: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountResponse {
    #[prost(message, optional, tag = "1")]
    pub account: Option<AccountMessage>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountMessage {
    #[prost(bytes = "vec", tag = "1")]
    pub address: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub balance: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub code: Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub keys: Vec<AccountKeyMessage>,
    #[prost(map = "string, bytes", tag = "5")]
    pub contracts: std::collections::HashMap<String, Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountKeyMessage {
    #[prost(uint32, tag = "1")]
    pub index: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub public_key: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub sign_algo: u32,
    #[prost(uint32, tag = "4")]
    pub hash_algo: u32,
    #[prost(uint32, tag = "5")]
    pub weight: u32,
    #[prost(uint32, tag = "6")]
    pub sequence_number: u32,
    #[prost(bool, tag = "7")]
    pub revoked: bool,
}

/// A gateway backed by an Access node
#[derive(Debug, Clone)]
pub struct GrpcGateway {
    network: String,
    host: String,
    channel: Channel,
}

impl GrpcGateway {
    /// Build a lazily connecting client; no I/O happens until the first call
    pub fn connect_lazy(network: &str, host: &str) -> Result<Self> {
        let uri = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };
        let channel = Endpoint::from_shared(uri)
            .map_err(|e| FlowError::Gateway {
                network: network.to_string(),
                message: format!("invalid host {}: {}", host, e),
            })?
            .connect_lazy();
        Ok(Self {
            network: network.to_string(),
            host: host.to_string(),
            channel,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn gateway_error(&self, message: impl ToString) -> FlowError {
        FlowError::Gateway {
            network: self.network.clone(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Gateway for GrpcGateway {
    async fn get_account(&self, address: Address) -> Result<Account> {
        debug!(network = %self.network, host = %self.host, %address, "GetAccountAtLatestBlock");

        let mut client = tonic::client::Grpc::new(self.channel.clone())
            .max_decoding_message_size(MAX_MESSAGE_SIZE);
        client
            .ready()
            .await
            .map_err(|e| self.gateway_error(format!("{} unreachable: {}", self.host, e)))?;

        let request = tonic::Request::new(GetAccountAtLatestBlockRequest {
            address: address.as_bytes().to_vec(),
        });
        let path = http::uri::PathAndQuery::from_static(GET_ACCOUNT_PATH);
        let codec: ProstCodec<GetAccountAtLatestBlockRequest, AccountResponse> =
            ProstCodec::default();

        let response = client
            .unary(request, path, codec)
            .await
            .map_err(|status| match status.code() {
                Code::NotFound => FlowError::AccountMissing {
                    network: self.network.clone(),
                    address,
                },
                _ => self.gateway_error(status.message()),
            })?
            .into_inner();

        let account = response.account.ok_or_else(|| FlowError::AccountMissing {
            network: self.network.clone(),
            address,
        })?;

        // Map order is unspecified on the wire; sort for deterministic traversal.
        let mut contracts: Vec<(String, Vec<u8>)> = account.contracts.into_iter().collect();
        contracts.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Account {
            address: Address::from_bytes(&account.address)?,
            balance: account.balance,
            keys: account
                .keys
                .into_iter()
                .map(|key| AccountKey {
                    index: key.index,
                    public_key: key.public_key,
                    sign_algo: key.sign_algo,
                    hash_algo: key.hash_algo,
                    weight: key.weight,
                    sequence_number: u64::from(key.sequence_number),
                    revoked: key.revoked,
                })
                .collect(),
            contracts: contracts.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_account_message_decodes_contracts() {
        let mut message = AccountMessage {
            address: vec![0x8e, 0xfd, 0xe5, 0x7e, 0x98, 0xc5, 0x57, 0xfa],
            balance: 100,
            ..Default::default()
        };
        message
            .contracts
            .insert("Hello".to_string(), b"access(all) contract Hello {}".to_vec());
        let bytes = AccountResponse {
            account: Some(message),
        }
        .encode_to_vec();

        let decoded = AccountResponse::decode(bytes.as_slice()).unwrap();
        let account = decoded.account.unwrap();
        assert_eq!(account.balance, 100);
        assert_eq!(
            account.contracts.get("Hello").map(Vec::as_slice),
            Some(&b"access(all) contract Hello {}"[..])
        );
    }

    #[tokio::test]
    async fn test_invalid_host_is_rejected() {
        assert!(GrpcGateway::connect_lazy("testnet", "not a host").is_err());
        let gateway = GrpcGateway::connect_lazy("testnet", "access.testnet.nodes.onflow.org:9000").unwrap();
        assert_eq!(gateway.host(), "access.testnet.nodes.onflow.org:9000");
    }
}
