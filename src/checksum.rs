//! Checksum utilities for pinning dependency code

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum of contract code as returned by the chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn from_source(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An unset checksum, as found on manually declared dependencies
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Verify that code matches this checksum
    pub fn verify(&self, code: &[u8]) -> bool {
        Self::from_bytes(code) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s.to_lowercase())
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Self(s.to_lowercase())
    }
}
