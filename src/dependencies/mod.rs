//! Dependency manager
//!
//! Installs on-chain Cadence contracts, and whatever they import by
//! address, into the project's `imports/` tree and records them in
//! `flow.json`.
//!
//! ## Flow
//! 1. Fetch the seed's account from its network's gateway
//! 2. Hash the code, rewrite its address imports to name imports
//! 3. Record the dependency, write the file if missing, ask for aliases
//!    and deployments
//! 4. Recurse into the address imports
//! 5. Save the manifest once

pub mod core_contracts;
pub mod graph;
pub mod installer;
pub mod list;
pub mod logs;
pub mod prompt;

pub use core_contracts::{core_contract, CoreContract, CORE_CONTRACTS};
pub use graph::ImportGraph;
pub use installer::{Installer, InstallerOptions};
pub use list::{list, Listing};
pub use logs::Logs;
pub use prompt::{Answer, Prompter, ScriptedPrompter, TerminalPrompter};
