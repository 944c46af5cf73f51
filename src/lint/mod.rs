//! Cadence linting
//!
//! For each file: parse, pick the standard-library environment, check with
//! imports resolved through the manifest, run the analyzers and collect
//! sorted diagnostics.
//!
//! ## Categories
//! 1. **syntax-error**: the parser rejected the file
//! 2. **semantic-error**: the checker rejected the file
//! 3. **error**: anything else, including failures to read the file
//! 4. analyzer categories such as **removal-hint**, which are warnings

pub mod diagnostic;
pub mod render;
pub mod resolver;

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cadence::analysis::{self, Analyzer};
use crate::cadence::checker::{check_program, CheckerConfig};
use crate::cadence::position::LineIndex;
use crate::cadence::stdlib::Environment;
use crate::cadence::parse_program;
use crate::fs::ReaderWriter;
use crate::manifest::Manifest;

pub use diagnostic::{severity, sort_diagnostics, Diagnostic, Severity};
pub use resolver::Resolver;

/// Diagnostics of one linted file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileResult {
    pub file_path: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of linting a set of files
#[derive(Debug, Default)]
pub struct LintResult {
    pub results: Vec<FileResult>,
    /// A file could not be processed at all
    pub had_failure: bool,
}

impl LintResult {
    fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.results.iter().flat_map(|r| r.diagnostics.iter())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics().filter(|d| !d.is_error()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.error_count() == 0 && !self.had_failure
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// 1 if any diagnostic is an error or a file failed, else 0
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }
}

/// The Cadence linter
pub struct Linter<'a> {
    rw: &'a dyn ReaderWriter,
    manifest: Option<&'a Manifest>,
    /// Directory of the manifest
    root: PathBuf,
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl<'a> Linter<'a> {
    pub fn new(rw: &'a dyn ReaderWriter) -> Self {
        Self {
            rw,
            manifest: None,
            root: PathBuf::new(),
            analyzers: analysis::default_analyzers(),
        }
    }

    /// Resolve contract-name imports and account access through `manifest`,
    /// whose contract paths are relative to `root`
    pub fn with_manifest(mut self, manifest: &'a Manifest, root: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest);
        self.root = root.into();
        self
    }

    /// Lint `paths`, in order. Per-file failures become diagnostics.
    pub fn lint_files(&self, paths: &[PathBuf]) -> LintResult {
        let resolver = Resolver::new(self.rw, self.manifest, self.root.clone());
        let mut result = LintResult::default();
        for path in paths {
            let (file, failed) = self.lint_file(&resolver, path);
            result.had_failure |= failed;
            result.results.push(file);
        }
        result
    }

    /// Lint one file; the flag reports a failure that is not a diagnostic
    fn lint_file(&self, resolver: &Resolver<'_>, path: &Path) -> (FileResult, bool) {
        let location = resolver::file_location(path);
        let file_path = path.display().to_string();
        debug!(file = %file_path, "linting");

        let source = match self.rw.read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                let diagnostic = Diagnostic::internal(&location, format!("failed to read {}: {}", file_path, e));
                return (
                    FileResult {
                        file_path,
                        diagnostics: vec![diagnostic],
                    },
                    true,
                );
            }
        };

        let index = LineIndex::new(&source);
        let (program, parse_errors) = parse_program(&source);
        let mut diagnostics: Vec<Diagnostic> = parse_errors
            .iter()
            .map(|e| Diagnostic::from_parse_error(&location, &index, e))
            .collect();

        if diagnostics.is_empty() {
            let config = CheckerConfig::new(Environment::for_program(&program))
                .with_import_handler(resolver)
                .with_account_access(resolver);

            resolver.enter(&location);
            let (elaboration, errors) = check_program(&program, location.clone(), config);
            resolver.leave(&location);

            diagnostics.extend(
                errors
                    .iter()
                    .map(|e| Diagnostic::from_checker_error(&location, &index, e)),
            );

            for analyzer in &self.analyzers {
                debug!(analyzer = analyzer.name(), file = %file_path, "running analyzer");
                analyzer.analyze(&program, &elaboration, &mut |finding| {
                    diagnostics.push(Diagnostic::from_finding(&location, &index, finding));
                });
            }
        }

        sort_diagnostics(&mut diagnostics);
        (
            FileResult {
                file_path,
                diagnostics,
            },
            false,
        )
    }
}

/// All `.cdc` files under `root`, honoring ignore files, in sorted order
pub fn discover_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = ignore::WalkBuilder::new(root)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map(|ext| ext == "cdc").unwrap_or(false))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    #[test]
    fn test_missing_file_is_an_error() {
        let fs = MemoryFs::new();
        let result = Linter::new(&fs).lint_files(&[PathBuf::from("missing.cdc")]);
        assert_eq!(result.exit_code(), 1);
        assert_eq!(result.results[0].diagnostics[0].category, diagnostic::ERROR);
    }

    #[test]
    fn test_syntax_errors_stop_checking() {
        let fs = MemoryFs::new().with_file("bad.cdc", "access(all) fun main( {\n  qqq\n}");
        let result = Linter::new(&fs).lint_files(&[PathBuf::from("bad.cdc")]);
        let categories: Vec<_> = result.results[0]
            .diagnostics
            .iter()
            .map(|d| d.category.as_str())
            .collect();
        assert!(!categories.is_empty());
        assert!(categories.iter().all(|c| *c == diagnostic::SYNTAX_ERROR));
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn test_warnings_only_exit_zero() {
        let fs = MemoryFs::new().with_file("w.cdc", "access(all) fun main() {\n  let x = 1!\n}");
        let result = Linter::new(&fs).lint_files(&[PathBuf::from("w.cdc")]);
        assert_eq!(result.warning_count(), 1);
        assert!(result.has_warnings());
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn test_discover_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("contracts")).unwrap();
        std::fs::write(dir.path().join("contracts/A.cdc"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let files = discover_files(dir.path());
        assert_eq!(files, vec![dir.path().join("contracts/A.cdc")]);
    }
}
