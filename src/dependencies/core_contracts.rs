//! Well-known system contracts
//!
//! Core contracts live at fixed addresses on every standard network. The
//! installer fills in their aliases itself and never prompts for them.

use crate::address::Address;
use crate::error::{FlowError, Result};
use crate::manifest::{Aliases, DependencySource, EMULATOR, MAINNET, TESTNET};

/// A core contract and its address on each standard network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreContract {
    pub name: &'static str,
    mainnet: &'static str,
    testnet: &'static str,
    emulator: &'static str,
}

const fn core(
    name: &'static str,
    mainnet: &'static str,
    testnet: &'static str,
    emulator: &'static str,
) -> CoreContract {
    CoreContract {
        name,
        mainnet,
        testnet,
        emulator,
    }
}

const FUNGIBLE_TOKEN: [&str; 3] = ["f233dcee88fe0abe", "9a0766d93b6608b7", "ee82856bf20e2aa6"];
const NON_FUNGIBLE_TOKEN: [&str; 3] = ["1d7e57aa55817448", "631e88ae7f1d7c20", "f8d6e0586b0a20c7"];
const SERVICE_ACCOUNT: [&str; 3] = ["e467b9dd11fa00df", "8c5303eaa26202d6", "f8d6e0586b0a20c7"];
const STAKING: [&str; 3] = ["8624b52f9ddcd04a", "9eca2b38b18b5dfe", "f8d6e0586b0a20c7"];
const LOCKED_TOKENS: [&str; 3] = ["8d0e87b65159ae63", "95e019a17d0e23d7", "f8d6e0586b0a20c7"];

const fn at(name: &'static str, addresses: [&'static str; 3]) -> CoreContract {
    core(name, addresses[0], addresses[1], addresses[2])
}

pub const CORE_CONTRACTS: &[CoreContract] = &[
    at("FungibleToken", FUNGIBLE_TOKEN),
    at("FungibleTokenMetadataViews", FUNGIBLE_TOKEN),
    at("FungibleTokenSwitchboard", FUNGIBLE_TOKEN),
    core("FlowToken", "1654653399040a61", "7e60df042a9c0868", "0ae53cb6e3f42a79"),
    core("FlowFees", "f919ee77447b7497", "912d5440f7e3769e", "e5a8b7f23e8b548f"),
    at("NonFungibleToken", NON_FUNGIBLE_TOKEN),
    at("MetadataViews", NON_FUNGIBLE_TOKEN),
    at("ViewResolver", NON_FUNGIBLE_TOKEN),
    core("Burner", "f233dcee88fe0abe", "9a0766d93b6608b7", "f8d6e0586b0a20c7"),
    at("FlowServiceAccount", SERVICE_ACCOUNT),
    at("FlowStorageFees", SERVICE_ACCOUNT),
    at("NodeVersionBeacon", SERVICE_ACCOUNT),
    at("RandomBeaconHistory", SERVICE_ACCOUNT),
    at("EVM", SERVICE_ACCOUNT),
    at("FlowIDTableStaking", STAKING),
    at("FlowEpoch", STAKING),
    at("FlowClusterQC", STAKING),
    at("FlowDKG", STAKING),
    at("LockedTokens", LOCKED_TOKENS),
    at("StakingProxy", LOCKED_TOKENS),
];

impl CoreContract {
    /// Address on a standard network
    pub fn address(&self, network: &str) -> Option<Address> {
        let hex = match network {
            MAINNET => self.mainnet,
            TESTNET => self.testnet,
            EMULATOR => self.emulator,
            _ => return None,
        };
        Address::from_hex(hex).ok()
    }

    /// Aliases on every network the contract has an address on
    pub fn aliases(&self) -> Aliases {
        [MAINNET, TESTNET, EMULATOR]
            .into_iter()
            .filter_map(|network| Some((network.to_string(), self.address(network)?)))
            .collect()
    }

    /// The mainnet source `add` installs it from
    pub fn mainnet_source(&self) -> Result<DependencySource> {
        let address = Address::from_hex(self.mainnet)?;
        Ok(DependencySource::new(MAINNET, address, self.name))
    }
}

/// Look up a core contract by name, ignoring case
pub fn core_contract(name: &str) -> Option<&'static CoreContract> {
    CORE_CONTRACTS
        .iter()
        .find(|contract| contract.name.eq_ignore_ascii_case(name))
}

/// Whether `source` points at a core contract's well-known address
pub fn is_core_source(source: &DependencySource) -> bool {
    core_contract(&source.contract_name)
        .and_then(|contract| contract.address(&source.network))
        .map(|address| address == source.address)
        .unwrap_or(false)
}

/// Resolve `name`, failing with the closest known names
pub fn resolve(name: &str) -> Result<&'static CoreContract> {
    core_contract(name).ok_or_else(|| FlowError::UnknownCoreContract {
        name: name.to_string(),
        suggestions: suggestions(name, 3),
    })
}

/// Core contract names that fuzzily match `query`, best first
pub fn suggestions(query: &str, limit: usize) -> Vec<String> {
    use fuzzy_matcher::skim::SkimMatcherV2;
    use fuzzy_matcher::FuzzyMatcher;

    let matcher = SkimMatcherV2::default().ignore_case();
    let mut scored: Vec<(i64, &str)> = CORE_CONTRACTS
        .iter()
        .filter_map(|contract| {
            matcher
                .fuzzy_match(contract.name, query)
                .map(|score| (score, contract.name))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let contract = core_contract("flowtoken").unwrap();
        assert_eq!(contract.name, "FlowToken");
        assert_eq!(
            contract.address(MAINNET).unwrap().hex(),
            "1654653399040a61"
        );
        assert!(contract.address("previewnet").is_none());
    }

    #[test]
    fn test_aliases_cover_standard_networks() {
        let aliases = core_contract("NonFungibleToken").unwrap().aliases();
        let networks: Vec<&str> = aliases.keys().map(String::as_str).collect();
        assert_eq!(networks, vec![MAINNET, TESTNET, EMULATOR]);
        assert_eq!(aliases[EMULATOR].hex(), "f8d6e0586b0a20c7");
    }

    #[test]
    fn test_core_source_requires_matching_address() {
        let token = core_contract("FlowToken").unwrap();
        assert!(is_core_source(&token.mainnet_source().unwrap()));

        let elsewhere = DependencySource::new(MAINNET, Address::from_hex("0x01").unwrap(), "FlowToken");
        assert!(!is_core_source(&elsewhere));
    }

    #[test]
    fn test_unknown_name_suggests_close_matches() {
        match resolve("FlowTokn") {
            Err(FlowError::UnknownCoreContract { suggestions, .. }) => {
                assert_eq!(suggestions.first().map(String::as_str), Some("FlowToken"));
            }
            other => panic!("expected UnknownCoreContract, got {:?}", other),
        }
    }
}
