//! Import resolution and account-access policy for the linter
//!
//! Imports resolve the way the dependency installer lays files out: a
//! contract name goes through the manifest, a `.cdc` string is a path
//! relative to the importing file. Address imports are rejected, the
//! linter never talks to the chain.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::address::Address;
use crate::cadence::checker::{
    check_program, AccountAccess, CheckerConfig, Elaboration, ImportError, ImportHandler,
};
use crate::cadence::stdlib::{self, Environment};
use crate::cadence::parse_program;
use crate::fs::{absolute_path, normalize_path, ReaderWriter};
use crate::location::Location;
use crate::manifest::Manifest;

/// Location of a source file, as used for cache keys and checker locations
pub fn file_location(path: &Path) -> Location {
    Location::string(normalize_path(path).to_string_lossy().into_owned())
}

pub struct Resolver<'a> {
    rw: &'a dyn ReaderWriter,
    manifest: Option<&'a Manifest>,
    /// Directory contract locations in the manifest are relative to
    root: PathBuf,
    cache: RefCell<HashMap<Location, Rc<Elaboration>>>,
    in_progress: RefCell<HashSet<Location>>,
}

impl<'a> Resolver<'a> {
    pub fn new(rw: &'a dyn ReaderWriter, manifest: Option<&'a Manifest>, root: impl Into<PathBuf>) -> Self {
        Self {
            rw,
            manifest,
            root: root.into(),
            cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// Mark a top-level file as being checked, so imports cycling back to
    /// it are reported instead of re-checked
    pub fn enter(&self, location: &Location) {
        self.in_progress.borrow_mut().insert(location.clone());
    }

    pub fn leave(&self, location: &Location) {
        self.in_progress.borrow_mut().remove(location);
    }

    /// The file an import refers to
    fn import_path(&self, importing: &Location, name: &str, is_path: bool) -> Result<PathBuf, ImportError> {
        if is_path {
            let parent = match importing {
                Location::String(path) => Path::new(path).parent().map(Path::to_path_buf),
                _ => None,
            }
            .unwrap_or_default();
            return Ok(normalize_path(&parent.join(name)));
        }

        let manifest = self
            .manifest
            .ok_or_else(|| ImportError::new("no flow.json to resolve contract names"))?;
        let contract = manifest
            .contract(name)
            .ok_or_else(|| ImportError::new(format!("contract `{}` is not declared in flow.json", name)))?;
        let location = contract
            .location
            .as_ref()
            .ok_or_else(|| ImportError::new(format!("contract `{}` has no source location", name)))?;
        Ok(normalize_path(&self.root.join(location)))
    }

    fn check_file(&self, path: &Path) -> Result<Rc<Elaboration>, ImportError> {
        let key = file_location(path);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Ok(cached.clone());
        }
        if self.in_progress.borrow().contains(&key) {
            return Ok(Rc::new(Elaboration::cyclic(key)));
        }

        let source = self
            .rw
            .read_to_string(path)
            .map_err(|e| ImportError::new(format!("cannot read {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "checking imported program");

        self.enter(&key);
        let (program, parse_errors) = parse_program(&source);
        let config = CheckerConfig::new(Environment::for_program(&program))
            .with_import_handler(self)
            .with_account_access(self);
        let (mut elaboration, _) = check_program(&program, key.clone(), config);
        self.leave(&key);

        elaboration.has_errors |= !parse_errors.is_empty();
        let elaboration = Rc::new(elaboration);
        self.cache.borrow_mut().insert(key, elaboration.clone());
        Ok(elaboration)
    }

    /// The manifest contract a location refers to
    fn contract_name(&self, location: &Location) -> Option<String> {
        let manifest = self.manifest?;
        match location {
            Location::String(value) if location.is_path() => {
                let path = absolute_path(Path::new(value));
                let root = absolute_path(&self.root);
                let relative = path.strip_prefix(&root).unwrap_or(path.as_path());
                manifest
                    .contract_by_location(relative)
                    .map(|contract| contract.name.clone())
            }
            Location::String(name) | Location::Identifier(name) => {
                manifest.contract(name).map(|contract| contract.name.clone())
            }
            Location::Address { name, .. } => Some(name.clone()),
        }
    }

    /// Where `contract` lives on `network`: contract aliases first, then
    /// dependency aliases, then the dependency source
    fn effective_address(&self, contract: &str, network: &str) -> Option<Address> {
        let manifest = self.manifest?;
        if let Some(address) = manifest
            .contract(contract)
            .and_then(|c| c.aliases.get(network))
        {
            return Some(*address);
        }
        let dependency = manifest.dependency(contract)?;
        dependency.aliases.get(network).copied().or_else(|| {
            (dependency.source.network == network).then_some(dependency.source.address)
        })
    }

    /// Every network either contract has an address on
    fn networks_of(&self, contract: &str) -> Vec<String> {
        let Some(manifest) = self.manifest else {
            return Vec::new();
        };
        let mut networks: Vec<String> = Vec::new();
        if let Some(record) = manifest.contract(contract) {
            networks.extend(record.aliases.keys().cloned());
        }
        if let Some(dependency) = manifest.dependency(contract) {
            networks.extend(dependency.aliases.keys().cloned());
            networks.push(dependency.source.network.clone());
        }
        networks
    }
}

impl ImportHandler for Resolver<'_> {
    fn resolve_import(
        &self,
        importing: &Location,
        imported: &Location,
    ) -> Result<Rc<Elaboration>, ImportError> {
        if let Some(builtin) = stdlib::builtin_elaboration(imported) {
            return Ok(Rc::new(builtin));
        }
        let path = match imported {
            Location::Address { .. } => {
                return Err(ImportError::new(
                    "address imports are not supported when linting; import by contract name",
                ))
            }
            Location::String(value) => self.import_path(importing, value, imported.is_path())?,
            Location::Identifier(name) => self.import_path(importing, name, false)?,
        };
        self.check_file(&path)
    }
}

impl AccountAccess for Resolver<'_> {
    fn same_account(&self, accessing: &Location, declaring: &Location) -> bool {
        let (Some(accessing), Some(declaring)) =
            (self.contract_name(accessing), self.contract_name(declaring))
        else {
            return false;
        };

        let mut networks = self.networks_of(&accessing);
        networks.extend(self.networks_of(&declaring));
        networks.iter().any(|network| {
            match (
                self.effective_address(&accessing, network),
                self.effective_address(&declaring, network),
            ) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::manifest::Manifest;

    const MANIFEST: &str = r#"{
  "contracts": {
    "A": { "source": "contracts/A.cdc", "aliases": { "testnet": "0000000000000001" } },
    "B": { "source": "contracts/B.cdc", "aliases": { "testnet": "0000000000000001" } },
    "C": { "source": "contracts/C.cdc", "aliases": { "testnet": "0000000000000002" } }
  },
  "dependencies": {
    "D": {
      "source": "testnet://0000000000000002.D",
      "hash": "",
      "aliases": {}
    }
  }
}"#;

    fn manifest() -> Manifest {
        Manifest::from_json(MANIFEST).unwrap()
    }

    #[test]
    fn test_same_account_by_contract_aliases() {
        let fs = MemoryFs::new();
        let manifest = manifest();
        let resolver = Resolver::new(&fs, Some(&manifest), "");
        let a = Location::string("contracts/A.cdc");
        let b = Location::string("B");
        let c = Location::string("contracts/C.cdc");
        assert!(resolver.same_account(&a, &b));
        assert!(!resolver.same_account(&a, &c));
    }

    #[test]
    fn test_absolute_file_paths_match_manifest_locations() {
        let fs = MemoryFs::new();
        let manifest = manifest();
        let cwd = std::env::current_dir().unwrap();
        let a = Location::string(cwd.join("contracts/A.cdc").to_string_lossy().into_owned());
        let b = Location::string("B");

        assert!(Resolver::new(&fs, Some(&manifest), "").same_account(&a, &b));
        assert!(Resolver::new(&fs, Some(&manifest), cwd.clone()).same_account(&a, &b));
        let relative = Location::string("contracts/A.cdc");
        assert!(Resolver::new(&fs, Some(&manifest), cwd).same_account(&relative, &b));
    }

    #[test]
    fn test_dependency_source_counts_as_address() {
        let fs = MemoryFs::new();
        let manifest = manifest();
        let resolver = Resolver::new(&fs, Some(&manifest), "");
        assert!(resolver.same_account(&Location::string("C"), &Location::string("D")));
        assert!(!resolver.same_account(&Location::string("A"), &Location::string("D")));
    }

    #[test]
    fn test_address_imports_are_rejected() {
        let fs = MemoryFs::new();
        let resolver = Resolver::new(&fs, None, "");
        let imported = Location::address(Address::from_hex("0x01").unwrap(), "A");
        let error = resolver
            .resolve_import(&Location::string("main.cdc"), &imported)
            .unwrap_err();
        assert!(error.message.contains("address imports"));
    }

    #[test]
    fn test_imports_are_memoized() {
        let fs = MemoryFs::new()
            .with_file("contracts/A.cdc", "access(all) contract A {}")
            .with_file("contracts/main.cdc", "import A from \"./A.cdc\"");
        let resolver = Resolver::new(&fs, None, "");
        let importing = Location::string("contracts/main.cdc");
        let first = resolver
            .resolve_import(&importing, &Location::string("./A.cdc"))
            .unwrap();
        let second = resolver
            .resolve_import(&importing, &Location::string("A.cdc"))
            .unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(first.exports.contains_key("A"));
    }

    #[test]
    fn test_name_imports_go_through_the_manifest() {
        let fs = MemoryFs::new().with_file("contracts/B.cdc", "access(all) contract B {}");
        let manifest = manifest();
        let resolver = Resolver::new(&fs, Some(&manifest), "");
        let elaboration = resolver
            .resolve_import(&Location::string("x.cdc"), &Location::string("B"))
            .unwrap();
        assert_eq!(elaboration.location, Location::string("contracts/B.cdc"));

        let error = resolver
            .resolve_import(&Location::string("x.cdc"), &Location::string("Nope"))
            .unwrap_err();
        assert!(error.message.contains("not declared in flow.json"));
    }

    #[test]
    fn test_builtins_resolve_without_files() {
        let fs = MemoryFs::new();
        let resolver = Resolver::new(&fs, None, "");
        let elaboration = resolver
            .resolve_import(&Location::string("x.cdc"), &Location::identifier("Test"))
            .unwrap();
        assert!(elaboration.is_open);
    }
}
