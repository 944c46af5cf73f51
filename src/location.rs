//! Cadence locations
//!
//! A location identifies where a program or an imported declaration lives.
//! Locations key every cache in the checker driver and the installer, so
//! equality is structural over all fields.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;

/// Identifier of the built-in `Crypto` contract
pub const CRYPTO: &str = "Crypto";
/// Identifier of the built-in `Test` framework contract
pub const TEST: &str = "Test";
/// Identifier of the built-in `BlockchainHelpers` contract
pub const BLOCKCHAIN_HELPERS: &str = "BlockchainHelpers";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Location {
    /// A contract deployed to an account
    Address { address: Address, name: String },
    /// A file path (contains `.cdc`) or a bare contract name
    String(String),
    /// A built-in pseudo-location such as `Crypto`
    Identifier(String),
}

impl Location {
    pub fn address(address: Address, name: impl Into<String>) -> Self {
        Self::Address {
            address,
            name: name.into(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn identifier(value: impl Into<String>) -> Self {
        Self::Identifier(value.into())
    }

    /// Whether this is a string location that names a file
    pub fn is_path(&self) -> bool {
        matches!(self, Self::String(s) if s.contains(".cdc"))
    }

    /// Whether this is one of the built-in pseudo-contracts
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Identifier(id) if is_builtin_identifier(id))
    }

    /// A short, human readable form used in diagnostics
    pub fn description(&self) -> String {
        match self {
            Self::Address { address, name } => format!("{}.{}", address.hex_with_prefix(), name),
            Self::String(s) => s.clone(),
            Self::Identifier(id) => id.clone(),
        }
    }
}

/// Whether `name` refers to a built-in pseudo-contract
pub fn is_builtin_identifier(name: &str) -> bool {
    matches!(name, CRYPTO | TEST | BLOCKCHAIN_HELPERS)
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address { address, name } => write!(f, "A.{}.{}", address.hex(), name),
            Self::String(s) => write!(f, "S.{}", s),
            Self::Identifier(id) => write!(f, "I.{}", id),
        }
    }
}
