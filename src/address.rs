//! Flow account addresses

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::FlowError;

/// Length of a Flow address in bytes
pub const ADDRESS_LENGTH: usize = 8;

/// An 8-byte Flow account address.
///
/// Parsing accepts an optional `0x` prefix and fewer than 16 hex nibbles,
/// left-padding with zeros. Display is always the 16-nibble lowercase form
/// without prefix, which is also what the manifest stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse a hex address, padding short forms on the left
    pub fn from_hex(input: &str) -> Result<Self, FlowError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty()
            || digits.len() > ADDRESS_LENGTH * 2
            || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(FlowError::InvalidAddress(input.to_string()));
        }

        let padded = format!("{:0>16}", digits);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|_| FlowError::InvalidAddress(input.to_string()))?;
        Ok(Self(bytes))
    }

    /// Build an address from raw bytes of at most 8 bytes, right-aligned
    pub fn from_bytes(raw: &[u8]) -> Result<Self, FlowError> {
        if raw.len() > ADDRESS_LENGTH {
            return Err(FlowError::InvalidAddress(hex::encode(raw)));
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - raw.len()..].copy_from_slice(raw);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase 16-nibble hex without `0x`
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex with the `0x` prefix, as written in Cadence source
    pub fn hex_with_prefix(&self) -> String {
        format!("0x{}", self.hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl FromStr for Address {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
