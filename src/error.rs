//! Error types for the dependency manager and manifest store

use thiserror::Error;

use crate::address::Address;

/// Result type for flowkit operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors surfaced to the command layer
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("network '{0}' is not configured; add it to the networks section of flow.json")]
    NetworkUnknown(String),

    #[error("account {address} does not exist on {network}")]
    AccountMissing { network: String, address: Address },

    #[error("account {address} on {network} has no contracts")]
    NoContracts { network: String, address: Address },

    #[error("contract {name} not found at address {address} on {network}")]
    ContractMissing {
        network: String,
        address: Address,
        name: String,
    },

    #[error("failed to parse contract {name}: {message}")]
    Parse { name: String, message: String },

    #[error(
        "dependency {name} already exists with source {existing}, refusing to replace it with {incoming}; reconcile flow.json manually"
    )]
    RemoteSourceConflict {
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("gateway error on {network}: {message}")]
    Gateway { network: String, message: String },

    #[error("invalid dependency source '{0}': expected <network>://<address>.<contract>")]
    InvalidSource(String),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("'{name}' is not a core contract{}", suggestion_suffix(.suggestions))]
    UnknownCoreContract {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("prompt cancelled: {0}")]
    PromptCancelled(String),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_core_contract_message() {
        let err = FlowError::UnknownCoreContract {
            name: "FlowTokn".to_string(),
            suggestions: vec!["FlowToken".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "'FlowTokn' is not a core contract (did you mean FlowToken?)"
        );

        let err = FlowError::UnknownCoreContract {
            name: "Nope".to_string(),
            suggestions: vec![],
        };
        assert_eq!(err.to_string(), "'Nope' is not a core contract");
    }
}
