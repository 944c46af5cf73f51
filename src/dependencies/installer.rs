//! Transitive dependency installer
//!
//! Each seed is fetched from its network, its address imports are followed
//! depth-first in source order, and every contract found is pinned by the
//! SHA-256 of the code the chain returned. Files land under
//! `imports/<address>/<name>.cdc` and are only written when missing or when
//! the operator accepts an update. The manifest is saved once, at the end,
//! and only if something changed; a failed run saves nothing.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use similar::{ChangeTag, TextDiff};
use tracing::{debug, info};

use super::core_contracts::{self, CORE_CONTRACTS};
use super::graph::ImportGraph;
use super::logs::Logs;
use super::prompt::Prompter;
use crate::address::Address;
use crate::cadence::imports::{analyze_imports, rewrite_address_imports_to_name};
use crate::checksum::Checksum;
use crate::config::DependenciesConfig;
use crate::error::{FlowError, Result};
use crate::fs::ReaderWriter;
use crate::gateway::{Account, Gateways};
use crate::manifest::{
    dependency_path, Contract, Dependency, DependencySource, Manifest, EMULATOR, MAINNET, TESTNET,
};

/// Prompts the installer may skip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallerOptions {
    pub skip_deployments: bool,
    pub skip_alias: bool,
}

impl From<&DependenciesConfig> for InstallerOptions {
    fn from(config: &DependenciesConfig) -> Self {
        Self {
            skip_deployments: config.skip_deployments,
            skip_alias: config.skip_alias,
        }
    }
}

/// A contract to fetch, under the name it is installed as
#[derive(Debug, Clone)]
struct Seed {
    name: String,
    source: DependencySource,
}

impl Seed {
    fn from_source(source: DependencySource) -> Self {
        Self {
            name: source.contract_name.clone(),
            source,
        }
    }
}

/// The network whose alias is asked for after installing from `network`
fn counterpart(network: &str) -> Option<&'static str> {
    match network {
        MAINNET => Some(TESTNET),
        TESTNET => Some(MAINNET),
        _ => None,
    }
}

/// A cancelled optional prompt counts as a skip
fn optional<T: Default>(answer: Result<T>) -> Result<T> {
    match answer {
        Err(FlowError::PromptCancelled(question)) => {
            debug!(%question, "prompt cancelled, skipping");
            Ok(T::default())
        }
        other => other,
    }
}

fn parse_error(name: &str, message: impl Into<String>) -> FlowError {
    FlowError::Parse {
        name: name.to_string(),
        message: message.into(),
    }
}

pub struct Installer<'a> {
    rw: &'a dyn ReaderWriter,
    gateways: &'a Gateways,
    prompter: &'a dyn Prompter,
    manifest: Manifest,
    /// The manifest as last read or written
    saved: Manifest,
    manifest_path: PathBuf,
    /// Directory of the manifest; import paths are relative to it
    root: PathBuf,
    options: InstallerOptions,
    /// Sources already processed in this run, as `network://address.name`
    installed: HashSet<String>,
    /// network -> (account address -> alias address) supplied this run
    alias_cache: HashMap<String, HashMap<Address, Address>>,
    accounts: HashMap<(String, Address), Account>,
    logs: Logs,
    graph: ImportGraph,
}

impl<'a> Installer<'a> {
    pub fn new(
        rw: &'a dyn ReaderWriter,
        gateways: &'a Gateways,
        prompter: &'a dyn Prompter,
        manifest: Manifest,
        manifest_path: impl Into<PathBuf>,
    ) -> Self {
        let manifest_path = manifest_path.into();
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            rw,
            gateways,
            prompter,
            saved: manifest.clone(),
            manifest,
            manifest_path,
            root,
            options: InstallerOptions::default(),
            installed: HashSet::new(),
            alias_cache: HashMap::new(),
            accounts: HashMap::new(),
            logs: Logs::default(),
            graph: ImportGraph::new(),
        }
    }

    /// An installer over the manifest at `manifest_path`
    pub fn load(
        rw: &'a dyn ReaderWriter,
        gateways: &'a Gateways,
        prompter: &'a dyn Prompter,
        manifest_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let manifest_path = manifest_path.into();
        let manifest = Manifest::load(rw, &manifest_path)?;
        Ok(Self::new(rw, gateways, prompter, manifest, manifest_path))
    }

    pub fn with_options(mut self, options: InstallerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn logs(&self) -> &Logs {
        &self.logs
    }

    pub fn graph(&self) -> &ImportGraph {
        &self.graph
    }

    /// Fetch every dependency declared in the manifest, in manifest order
    pub async fn install(&mut self) -> Result<()> {
        let seeds = self
            .manifest
            .dependencies
            .values()
            .map(|dep| Seed {
                name: dep.name.clone(),
                source: dep.source.clone(),
            })
            .collect();
        self.run(seeds).await
    }

    pub async fn add(&mut self, source: DependencySource) -> Result<()> {
        self.add_many(vec![source]).await
    }

    /// Add `<network>://<address>.<contract>`
    pub async fn add_by_source_string(&mut self, source: &str) -> Result<()> {
        let source: DependencySource = source.parse()?;
        self.add(source).await
    }

    /// Add a core contract from its mainnet address
    pub async fn add_by_core_contract_name(&mut self, name: &str) -> Result<()> {
        let contract = core_contracts::resolve(name)?;
        self.add(contract.mainnet_source()?).await
    }

    /// Add every contract deployed to `address` on `network`
    pub async fn add_all_by_network_address(&mut self, network: &str, address: Address) -> Result<()> {
        let account = self.account(network, address).await?;
        let sources = account
            .contracts
            .keys()
            .map(|name| DependencySource::new(network, address, name.as_str()))
            .collect();
        self.add_many(sources).await
    }

    pub async fn add_many(&mut self, sources: Vec<DependencySource>) -> Result<()> {
        let seeds = sources.into_iter().map(Seed::from_source).collect();
        self.run(seeds).await
    }

    /// Let the operator pick core contracts that are not installed yet
    pub async fn discover(&mut self) -> Result<()> {
        let candidates: Vec<_> = CORE_CONTRACTS
            .iter()
            .filter(|contract| !self.manifest.dependencies.contains_key(contract.name))
            .collect();
        if candidates.is_empty() {
            debug!("every core contract is already installed");
            return Ok(());
        }

        let options: Vec<String> = candidates.iter().map(|c| c.name.to_string()).collect();
        let picked = self
            .prompter
            .select_many("Select the core contracts to install", &options)?;
        let sources = picked
            .into_iter()
            .filter_map(|index| candidates.get(index))
            .map(|contract| contract.mainnet_source())
            .collect::<Result<Vec<_>>>()?;
        self.add_many(sources).await
    }

    async fn run(&mut self, seeds: Vec<Seed>) -> Result<()> {
        for seed in seeds {
            self.fetch_dependency(seed).await?;
        }
        self.save_if_changed()
    }

    /// Process `seed` and everything it imports by address, depth-first
    async fn fetch_dependency(&mut self, seed: Seed) -> Result<()> {
        let mut stack: Vec<(Option<String>, Seed)> = vec![(None, seed)];

        while let Some((parent, item)) = stack.pop() {
            match &parent {
                Some(parent) => self.graph.add_edge(parent, &item.name),
                None => {
                    self.graph.add_node(&item.name);
                }
            }
            if !self.installed.insert(item.source.to_string()) {
                debug!(source = %item.source, "already processed");
                continue;
            }

            let code = self.contract_code(&item.source).await?;
            let hash = Checksum::from_bytes(&code);
            let code = String::from_utf8(code)
                .map_err(|_| parse_error(&item.name, "contract code is not valid UTF-8"))?;
            let analysis = analyze_imports(&code).map_err(|e| parse_error(&item.name, e.message))?;
            let rewritten =
                rewrite_address_imports_to_name(&code).map_err(|e| parse_error(&item.name, e.message))?;

            self.handle_found_contract(&item, &rewritten, hash)?;

            let children: Vec<Seed> = analysis
                .address_import_names()
                .map(|(address, name)| Seed {
                    name: name.to_string(),
                    source: DependencySource::new(item.source.network.as_str(), address, name),
                })
                .collect();
            for child in children.into_iter().rev() {
                stack.push((Some(item.name.clone()), child));
            }
        }
        Ok(())
    }

    async fn account(&mut self, network: &str, address: Address) -> Result<Account> {
        let key = (network.to_string(), address);
        if let Some(account) = self.accounts.get(&key) {
            return Ok(account.clone());
        }

        let gateway = self.gateways.get(network)?;
        debug!(%network, %address, "fetching account");
        let account = gateway.get_account(address).await?;
        if account.contracts.is_empty() {
            return Err(FlowError::NoContracts {
                network: network.to_string(),
                address,
            });
        }
        self.accounts.insert(key, account.clone());
        Ok(account)
    }

    async fn contract_code(&mut self, source: &DependencySource) -> Result<Vec<u8>> {
        let account = self.account(&source.network, source.address).await?;
        account
            .contracts
            .get(&source.contract_name)
            .cloned()
            .ok_or_else(|| FlowError::ContractMissing {
                network: source.network.clone(),
                address: source.address,
                name: source.contract_name.clone(),
            })
    }

    fn handle_found_contract(&mut self, item: &Seed, code: &str, hash: Checksum) -> Result<()> {
        let name = item.name.as_str();
        let existing = self.manifest.dependency(name).cloned();

        if let Some(existing) = &existing {
            if existing.source.network != item.source.network
                || existing.source.address != item.source.address
            {
                return Err(FlowError::RemoteSourceConflict {
                    name: name.to_string(),
                    existing: existing.source.to_string(),
                    incoming: item.source.to_string(),
                });
            }
        }

        let path = dependency_path(&item.source.address, &item.source.contract_name);
        let file = self.root.join(&path);

        let changed = existing
            .as_ref()
            .map(|dep| !dep.hash.is_empty() && dep.hash != hash)
            .unwrap_or(false);
        if changed {
            let question = format!(
                "The latest version of {} differs from the one installed locally:\n{}\nDo you want to update it?",
                name,
                self.update_diff(&file, code)
            );
            if !optional(self.prompter.confirm(&question))? {
                debug!(%name, "update declined");
                return Ok(());
            }
        }

        let is_new = existing.is_none();
        let hash_updated = existing.as_ref().map(|dep| dep.hash != hash).unwrap_or(false);
        let mut dependency = Dependency {
            name: name.to_string(),
            source: item.source.clone(),
            hash,
            aliases: existing.map(|dep| dep.aliases).unwrap_or_default(),
        };
        let core = core_contracts::is_core_source(&item.source);
        if core {
            if let Some(contract) = core_contracts::core_contract(&item.source.contract_name) {
                for (network, address) in contract.aliases() {
                    dependency.aliases.entry(network).or_insert(address);
                }
            }
        }
        self.manifest.add_or_update_dependency(dependency);

        if is_new {
            info!(%name, source = %item.source, "dependency added");
            self.logs.state_update(format!("{} added to flow.json", name));
        } else if hash_updated {
            info!(%name, source = %item.source, "dependency updated");
            self.logs.state_update(format!("{} updated in flow.json", name));
        }

        if !self.sync_contract(name) {
            self.logs.issue(format!(
                "contract {} is declared in flow.json by the project and was not replaced by the dependency; rename one of them",
                name
            ));
        }

        if changed || !self.rw.exists(&file) {
            if let Some(parent) = file.parent() {
                self.rw.mkdir_all(parent)?;
            }
            self.rw.write_file(&file, code.as_bytes())?;
            debug!(path = %file.display(), "wrote dependency");
            let verb = if changed { "updated" } else { "installed" };
            self.logs.file_system_action(format!(
                "Contract {} from {} on {} {}",
                item.source.contract_name, item.source.address, item.source.network, verb
            ));
        }

        if is_new && !core {
            if !self.options.skip_deployments {
                self.prompt_deployment(name)?;
            }
            if !self.options.skip_alias {
                self.prompt_alias(name, &item.source)?;
            }
        }
        Ok(())
    }

    /// Point the contract record at the installed dependency. Returns
    /// `false` when a project-owned contract holds the name.
    fn sync_contract(&mut self, name: &str) -> bool {
        if let Some(contract) = self.manifest.contract(name) {
            if !contract.is_dependency {
                return false;
            }
        }
        if let Some(dependency) = self.manifest.dependency(name) {
            let contract = Contract::for_dependency(dependency);
            self.manifest.add_or_update_contract(contract);
        }
        true
    }

    fn prompt_deployment(&mut self, name: &str) -> Result<()> {
        let accounts: Vec<String> = self.manifest.accounts.keys().cloned().collect();
        if accounts.is_empty() {
            debug!(%name, "no accounts to deploy to");
            return Ok(());
        }

        let question = format!("Choose an account to deploy {} to on the emulator", name);
        let Some(account) = optional(self.prompter.select(&question, &accounts))?
            .and_then(|index| accounts.get(index))
        else {
            return Ok(());
        };
        if self.manifest.add_contract_to_deployment(EMULATOR, account, name) {
            self.logs
                .state_update(format!("{} added to emulator deployments of {}", name, account));
        }
        Ok(())
    }

    fn prompt_alias(&mut self, name: &str, source: &DependencySource) -> Result<()> {
        let Some(network) = counterpart(&source.network) else {
            return Ok(());
        };

        let cached = self
            .alias_cache
            .get(network)
            .and_then(|aliases| aliases.get(&source.address))
            .copied();
        let alias = match cached {
            Some(alias) => Some(alias),
            None => {
                let question = format!("Enter the {} address of {}", network, name);
                let answer = optional(self.prompter.address(&question))?;
                if let Some(alias) = answer {
                    self.alias_cache
                        .entry(network.to_string())
                        .or_default()
                        .insert(source.address, alias);
                }
                answer
            }
        };

        let Some(alias) = alias else {
            return Ok(());
        };
        if let Some(dependency) = self.manifest.dependencies.get_mut(name) {
            dependency.aliases.insert(network.to_string(), alias);
        }
        self.sync_contract(name);
        self.logs
            .state_update(format!("{} alias of {} set to {}", network, name, alias));
        Ok(())
    }

    /// Line diff between the installed file and the incoming code
    fn update_diff(&self, file: &Path, incoming: &str) -> String {
        let current = self.rw.read_to_string(file).unwrap_or_default();
        let diff = TextDiff::from_lines(current.as_str(), incoming);
        let mut out = String::new();
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => continue,
            };
            out.push_str(sign);
            out.push_str(change.value());
            if change.missing_newline() {
                out.push('\n');
            }
        }
        out
    }

    fn save_if_changed(&mut self) -> Result<()> {
        if self.manifest == self.saved {
            debug!("manifest unchanged");
            return Ok(());
        }
        self.manifest.save(self.rw, &self.manifest_path)?;
        self.saved = self.manifest.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::prompt::{Answer, ScriptedPrompter};
    use crate::fs::MemoryFs;
    use crate::gateway::MemoryGateway;
    use std::sync::Arc;

    fn address(hex: &str) -> Address {
        Address::from_hex(hex).unwrap()
    }

    #[test]
    fn test_counterpart_networks() {
        assert_eq!(counterpart(MAINNET), Some(TESTNET));
        assert_eq!(counterpart(TESTNET), Some(MAINNET));
        assert_eq!(counterpart(EMULATOR), None);
    }

    #[tokio::test]
    async fn test_alias_reused_for_same_account() {
        let fs = MemoryFs::new();
        let gateway = MemoryGateway::for_network(TESTNET)
            .with_contract(address("0x01"), "A", "access(all) contract A {}")
            .with_contract(address("0x01"), "B", "access(all) contract B {}");
        let gateways = Gateways::new().with(TESTNET, Arc::new(gateway));
        let prompter = ScriptedPrompter::new([Answer::Address(Some(address("0x0a")))]);

        let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");
        installer
            .add_all_by_network_address(TESTNET, address("0x01"))
            .await
            .unwrap();

        assert_eq!(prompter.questions().len(), 1);
        for name in ["A", "B"] {
            let dep = installer.manifest().dependency(name).unwrap();
            assert_eq!(dep.aliases[MAINNET], address("0x0a"));
            assert_eq!(dep.aliases[TESTNET], address("0x01"));
            assert_eq!(installer.manifest().contract(name).unwrap().aliases[MAINNET], address("0x0a"));
        }
    }

    #[tokio::test]
    async fn test_deployment_prompt_uses_manifest_accounts() {
        let manifest = Manifest::from_json(
            r#"{"accounts": {"emulator-account": {"address": "f8d6e0586b0a20c7", "key": "00"}}}"#,
        )
        .unwrap();
        let fs = MemoryFs::new();
        let gateway = MemoryGateway::for_network(EMULATOR)
            .with_contract(address("0x05"), "Hello", "access(all) contract Hello {}");
        let gateways = Gateways::new().with(EMULATOR, Arc::new(gateway));
        let prompter = ScriptedPrompter::new([Answer::Select(Some(0))]);

        let mut installer = Installer::new(&fs, &gateways, &prompter, manifest, "flow.json");
        installer
            .add_by_source_string("emulator://0000000000000005.Hello")
            .await
            .unwrap();

        let deployment = installer
            .manifest()
            .deployment(EMULATOR, "emulator-account")
            .unwrap();
        assert_eq!(deployment.contracts[0].name, "Hello");
        assert!(installer.manifest().validate().is_empty());
    }

    #[tokio::test]
    async fn test_core_contract_gets_all_aliases_without_prompts() {
        let fs = MemoryFs::new();
        let mainnet = address("1654653399040a61");
        let gateway = MemoryGateway::for_network(MAINNET)
            .with_contract(mainnet, "FlowToken", "access(all) contract FlowToken {}");
        let gateways = Gateways::new().with(MAINNET, Arc::new(gateway));
        let prompter = ScriptedPrompter::new([]);

        let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");
        installer.add_by_core_contract_name("flowtoken").await.unwrap();

        assert!(prompter.questions().is_empty());
        let dep = installer.manifest().dependency("FlowToken").unwrap();
        assert_eq!(dep.aliases[MAINNET], mainnet);
        assert_eq!(dep.aliases[TESTNET], address("7e60df042a9c0868"));
        assert_eq!(dep.aliases[EMULATOR], address("0ae53cb6e3f42a79"));
    }

    #[tokio::test]
    async fn test_unknown_network_fails_without_saving() {
        let fs = MemoryFs::new();
        let gateways = Gateways::new();
        let prompter = ScriptedPrompter::new([]);

        let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");
        let error = installer
            .add_by_source_string("previewnet://01.Foo")
            .await
            .unwrap_err();
        assert!(matches!(error, FlowError::NetworkUnknown(_)));
        assert!(fs.paths().is_empty());
    }

    #[tokio::test]
    async fn test_missing_contract_and_empty_account() {
        let fs = MemoryFs::new();
        let gateway = MemoryGateway::for_network(TESTNET)
            .with_contract(address("0x01"), "A", "access(all) contract A {}")
            .with_empty_account(address("0x02"));
        let gateways = Gateways::new().with(TESTNET, Arc::new(gateway));
        let prompter = ScriptedPrompter::new([]);

        let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");
        assert!(matches!(
            installer.add_by_source_string("testnet://01.Nope").await,
            Err(FlowError::ContractMissing { .. })
        ));
        assert!(matches!(
            installer.add_by_source_string("testnet://02.A").await,
            Err(FlowError::NoContracts { .. })
        ));
    }

    #[tokio::test]
    async fn test_unparsable_code_is_a_parse_error() {
        let fs = MemoryFs::new();
        let gateway = MemoryGateway::for_network(TESTNET)
            .with_contract(address("0x01"), "Bad", "import Foo from\n");
        let gateways = Gateways::new().with(TESTNET, Arc::new(gateway));
        let prompter = ScriptedPrompter::new([]);

        let mut installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");
        match installer.add_by_source_string("testnet://01.Bad").await {
            Err(FlowError::Parse { name, .. }) => assert_eq!(name, "Bad"),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_update_diff_lists_changed_lines() {
        let fs = MemoryFs::new().with_file("imports/0000000000000001/A.cdc", "a\nb\nc\n");
        let gateways = Gateways::new();
        let prompter = ScriptedPrompter::new([]);
        let installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");

        let diff = installer.update_diff(Path::new("imports/0000000000000001/A.cdc"), "a\nB\nc\n");
        assert_eq!(diff, "-b\n+B\n");
    }

    #[test]
    fn test_update_diff_against_missing_file() {
        let fs = MemoryFs::new();
        let gateways = Gateways::new();
        let prompter = ScriptedPrompter::new([]);
        let installer = Installer::new(&fs, &gateways, &prompter, Manifest::default(), "flow.json");

        assert_eq!(installer.update_diff(Path::new("gone.cdc"), "x\n"), "+x\n");
    }
}
