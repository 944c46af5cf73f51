//! `dependencies list`: what is installed, what it imports, and what in
//! `imports/` nothing refers to

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::graph::ImportGraph;
use crate::cadence::imports::analyze_imports;
use crate::fs::{normalize_path, ReaderWriter};
use crate::manifest::{dependency_path, Aliases, DependencySource, Manifest, IMPORTS_DIR};

#[derive(Debug, Clone)]
pub struct ListEntry {
    pub name: String,
    pub source: DependencySource,
    pub hash: String,
    pub aliases: Aliases,
    /// Contracts the installed file imports, in source order
    pub imports: Vec<String>,
    pub installed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub entries: Vec<ListEntry>,
    /// Files under `imports/` that no dependency or contract refers to
    pub unreferenced: Vec<PathBuf>,
    pub graph: ImportGraph,
}

/// List the dependencies of `manifest`; paths are relative to `root`
pub fn list(rw: &dyn ReaderWriter, manifest: &Manifest, root: &Path) -> Listing {
    let mut listing = Listing::default();

    for dep in manifest.dependencies.values() {
        listing.graph.add_node(&dep.name);
        let file = root.join(dependency_path(&dep.source.address, &dep.source.contract_name));
        let code = rw.read_to_string(&file).ok();
        let imports = code
            .as_deref()
            .and_then(|code| analyze_imports(code).ok())
            .map(|analysis| {
                let mut names: Vec<String> = analysis
                    .address_import_names()
                    .map(|(_, name)| name.to_string())
                    .collect();
                names.extend(
                    analysis
                        .string_imports
                        .iter()
                        .filter(|import| !import.is_path())
                        .map(|import| import.location.clone()),
                );
                names
            })
            .unwrap_or_default();
        for import in &imports {
            listing.graph.add_edge(&dep.name, import);
        }

        listing.entries.push(ListEntry {
            name: dep.name.clone(),
            source: dep.source.clone(),
            hash: dep.hash.to_string(),
            aliases: dep.aliases.clone(),
            imports,
            installed: code.is_some(),
        });
    }

    listing.unreferenced = unreferenced_imports(rw, manifest, root);
    listing
}

/// `.cdc` files under `root/imports` that are not the location of any
/// contract or dependency, sorted
pub fn unreferenced_imports(rw: &dyn ReaderWriter, manifest: &Manifest, root: &Path) -> Vec<PathBuf> {
    let referenced: HashSet<PathBuf> = manifest
        .dependencies
        .values()
        .map(|dep| dependency_path(&dep.source.address, &dep.source.contract_name))
        .chain(manifest.contracts.values().filter_map(|c| c.location.clone()))
        .map(|path| normalize_path(&path))
        .collect();

    let files = match rw.walk_files(&root.join(IMPORTS_DIR)) {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, "cannot walk {}", IMPORTS_DIR);
            return Vec::new();
        }
    };
    let mut unreferenced: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| path.extension().map(|ext| ext == "cdc").unwrap_or(false))
        .filter_map(|path| {
            let relative = path.strip_prefix(root).ok()?.to_path_buf();
            (!referenced.contains(&normalize_path(&relative))).then_some(relative)
        })
        .collect();
    unreferenced.sort();
    unreferenced
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            writeln!(f, "No dependencies found in flow.json")?;
        }
        for entry in &self.entries {
            let marker = if entry.installed { "📦" } else { "❓" };
            writeln!(f, "{} {} ({})", marker, entry.name, entry.source)?;
            if !entry.hash.is_empty() {
                writeln!(f, "    hash: {}", entry.hash)?;
            }
            for (network, address) in &entry.aliases {
                writeln!(f, "    {}: {}", network, address)?;
            }
            if !entry.imports.is_empty() {
                writeln!(f, "    imports: {}", entry.imports.join(", "))?;
            }
            if !entry.installed {
                writeln!(f, "    not installed; run `flow dependencies install`")?;
            }
        }
        if self.graph.has_cycle() {
            writeln!(f, "\n🔁 The dependencies import each other in a cycle")?;
        }
        if !self.unreferenced.is_empty() {
            writeln!(f, "\n⚠️  Files in {}/ not referenced by flow.json:", IMPORTS_DIR)?;
            for path in &self.unreferenced {
                writeln!(f, "    {}", path.display())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MemoryFs, OsFs};

    const MANIFEST: &str = r#"{
  "dependencies": {
    "Foo": {
      "source": "testnet://0000000000000001.Foo",
      "hash": "abc",
      "aliases": { "testnet": "0000000000000001" }
    },
    "Bar": {
      "source": "testnet://0000000000000002.Bar",
      "hash": "",
      "aliases": {}
    }
  }
}"#;

    #[test]
    fn test_entries_report_imports_and_install_state() {
        let manifest = Manifest::from_json(MANIFEST).unwrap();
        let fs = MemoryFs::new().with_file(
            "imports/0000000000000001/Foo.cdc",
            "import \"Bar\"\naccess(all) contract Foo {}",
        );
        let listing = list(&fs, &manifest, Path::new(""));

        assert_eq!(listing.entries.len(), 2);
        assert_eq!(listing.entries[0].imports, vec!["Bar"]);
        assert!(listing.entries[0].installed);
        assert!(!listing.entries[1].installed);
        assert_eq!(listing.graph.imports_of("Foo"), vec!["Bar"]);

        let text = listing.to_string();
        assert!(text.contains("📦 Foo (testnet://0000000000000001.Foo)"));
        assert!(text.contains("imports: Bar"));
        assert!(text.contains("❓ Bar"));
    }

    #[test]
    fn test_unreferenced_files() {
        let manifest = Manifest::from_json(MANIFEST).unwrap();
        let fs = MemoryFs::new()
            .with_file("project/imports/0000000000000001/Foo.cdc", "access(all) contract Foo {}")
            .with_file("project/imports/0000000000000003/Stale.cdc", "access(all) contract Stale {}")
            .with_file("project/imports/0000000000000003/notes.txt", "");

        let unreferenced = unreferenced_imports(&fs, &manifest, Path::new("project"));
        assert_eq!(
            unreferenced,
            vec![PathBuf::from("imports/0000000000000003/Stale.cdc")]
        );

        let listing = list(&fs, &manifest, Path::new("project"));
        assert!(listing
            .to_string()
            .contains("imports/0000000000000003/Stale.cdc"));
    }

    #[test]
    fn test_unreferenced_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_json(MANIFEST).unwrap();
        for path in [
            "imports/0000000000000001/Foo.cdc",
            "imports/0000000000000003/Stale.cdc",
        ] {
            let file = dir.path().join(path);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, "access(all) contract X {}").unwrap();
        }

        let unreferenced = unreferenced_imports(&OsFs, &manifest, dir.path());
        assert_eq!(
            unreferenced,
            vec![PathBuf::from("imports/0000000000000003/Stale.cdc")]
        );
    }
}
