//! Import analysis
//!
//! Only the leading import section is parsed, so contracts using syntax the
//! full parser does not understand can still be installed.

use crate::address::Address;

use super::ast::{ImportDecl, ImportLocation};
use super::parser::Parser;
use super::position::Span;
use super::ParseError;

/// `import A, B from 0x01`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressImport {
    pub address: Address,
    pub identifiers: Vec<String>,
    pub span: Span,
}

/// `import "A"`, `import "./A.cdc"` or `import A from "./A.cdc"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringImport {
    pub location: String,
    pub identifiers: Vec<String>,
}

impl StringImport {
    /// Whether the location names a file rather than a contract
    pub fn is_path(&self) -> bool {
        self.location.contains(".cdc")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportAnalysis {
    pub address_imports: Vec<AddressImport>,
    pub string_imports: Vec<StringImport>,
    /// Built-in imports such as `import Crypto`
    pub identifier_imports: Vec<String>,
}

impl ImportAnalysis {
    /// Contract names imported by address, in source order
    pub fn address_import_names(&self) -> impl Iterator<Item = (Address, &str)> {
        self.address_imports.iter().flat_map(|import| {
            import
                .identifiers
                .iter()
                .map(move |name| (import.address, name.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.address_imports.is_empty()
            && self.string_imports.is_empty()
            && self.identifier_imports.is_empty()
    }
}

/// Classify the imports of `code`
pub fn analyze_imports(code: &str) -> Result<ImportAnalysis, ParseError> {
    let imports = Parser::new(code).parse_import_section()?;
    Ok(classify(&imports))
}

fn classify(imports: &[ImportDecl]) -> ImportAnalysis {
    let mut analysis = ImportAnalysis::default();
    for import in imports {
        let identifiers: Vec<String> = import.identifiers.iter().map(|i| i.name.clone()).collect();
        match &import.location {
            ImportLocation::Address(address) => analysis.address_imports.push(AddressImport {
                address: *address,
                identifiers,
                span: import.span,
            }),
            ImportLocation::String(location) => analysis.string_imports.push(StringImport {
                location: location.clone(),
                identifiers,
            }),
            ImportLocation::Identifier(name) => analysis.identifier_imports.push(name.clone()),
        }
    }
    analysis
}

/// Replace every `import X from 0x…` with `import "X"`.
///
/// An import of several identifiers becomes one line per identifier. The
/// rest of the source is left byte-for-byte intact.
pub fn rewrite_address_imports_to_name(code: &str) -> Result<String, ParseError> {
    let analysis = analyze_imports(code)?;
    if analysis.address_imports.is_empty() {
        return Ok(code.to_string());
    }

    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    for import in &analysis.address_imports {
        out.push_str(&code[cursor..import.span.start]);
        let indent = line_indent(code, import.span.start);
        let replacement = import
            .identifiers
            .iter()
            .map(|name| format!("import \"{}\"", name))
            .collect::<Vec<_>>()
            .join(&format!("\n{}", indent));
        out.push_str(&replacement);
        cursor = import.span.end;
    }
    out.push_str(&code[cursor..]);
    Ok(out)
}

/// Leading whitespace of the line containing `offset`
fn line_indent(code: &str, offset: usize) -> &str {
    let line_start = code[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &code[line_start..offset];
    let line = line.strip_prefix('\u{feff}').unwrap_or(line);
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = r#"import FungibleToken from 0xf233dcee88fe0abe
import "MetadataViews"
import Crypto
import Foo, Bar from 0x02
import Local from "./Local.cdc"

access(all) contract Example {
    access(all) fun broken( {
}
"#;

    #[test]
    fn test_classifies_imports_without_parsing_the_body() {
        let analysis = analyze_imports(CONTRACT).unwrap();
        assert_eq!(analysis.address_imports.len(), 2);
        assert_eq!(
            analysis.address_import_names().map(|(_, n)| n).collect::<Vec<_>>(),
            vec!["FungibleToken", "Foo", "Bar"]
        );
        assert_eq!(analysis.string_imports.len(), 2);
        assert!(!analysis.string_imports[0].is_path());
        assert!(analysis.string_imports[1].is_path());
        assert_eq!(analysis.identifier_imports, vec!["Crypto".to_string()]);
    }

    #[test]
    fn test_rewrite_address_imports() {
        let rewritten = rewrite_address_imports_to_name(CONTRACT).unwrap();
        assert!(rewritten.starts_with(
            "import \"FungibleToken\"\nimport \"MetadataViews\"\nimport Crypto\nimport \"Foo\"\nimport \"Bar\"\n"
        ));
        assert!(rewritten.ends_with("access(all) fun broken( {\n}\n"));
        assert!(analyze_imports(&rewritten).unwrap().address_imports.is_empty());
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let once = rewrite_address_imports_to_name(CONTRACT).unwrap();
        let twice = rewrite_address_imports_to_name(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rewrite_keeps_indentation_and_crlf() {
        let code = "\u{feff}  import A, B from 0x01\r\naccess(all) contract C {}\r\n";
        let rewritten = rewrite_address_imports_to_name(code).unwrap();
        assert_eq!(
            rewritten,
            "\u{feff}  import \"A\"\n  import \"B\"\r\naccess(all) contract C {}\r\n"
        );
    }

    #[test]
    fn test_malformed_import_fails() {
        assert!(analyze_imports("import A, B\naccess(all) contract C {}\n").is_err());
        assert!(rewrite_address_imports_to_name("import A from\n").is_err());
    }
}
