//! Flowkit
//!
//! Project tooling for the Flow blockchain: a dependency manager that
//! installs on-chain Cadence contracts into a project, and a linter that
//! checks Cadence sources the way the chain does.
//!
//! ## Features
//!
//! - **Transitive installs**: address imports are followed depth-first
//! - **Content pinning**: SHA-256 of the code the chain returned
//! - **Stable manifest**: `flow.json` keeps its key order across saves
//! - **Linting**: parse, check and analyze with import resolution through
//!   the manifest
//!
//! ## Layout
//!
//! ```text
//! project/
//! ├── flow.json
//! ├── cadence/
//! │   └── contracts/
//! └── imports/
//!     └── <address>/
//!         └── <Contract>.cdc
//! ```

pub mod address;
pub mod cadence;
pub mod checksum;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod fs;
pub mod gateway;
pub mod lint;
pub mod location;
pub mod manifest;

pub use address::Address;
pub use checksum::Checksum;
pub use config::FlowConfig;
pub use error::{FlowError, Result};
pub use location::Location;
pub use manifest::Manifest;
