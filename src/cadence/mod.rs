//! Cadence front-end
//!
//! A lexer and recursive-descent parser producing [`ast::Program`], the
//! import analyzer used by the dependency installer, and a semantic checker
//! that resolves identifiers, types, members and imports well enough to
//! drive the linter.
//!
//! Language-level failures are values ([`ParseError`],
//! [`checker::CheckerError`]), never [`crate::FlowError`], so callers can
//! turn them into diagnostics.

pub mod analysis;
pub mod ast;
pub mod checker;
pub mod imports;
pub(crate) mod lexer;
pub(crate) mod parser;
pub mod position;
pub mod stdlib;
pub mod token;
pub mod visit;

use std::fmt;

use position::Span;

/// A syntax error with the byte span it applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.span.start)
    }
}

impl std::error::Error for ParseError {}

/// Parse a whole program. The program is returned even when errors were
/// reported; declarations that failed to parse are missing from it.
pub fn parse_program(source: &str) -> (ast::Program, Vec<ParseError>) {
    parser::Parser::new(source).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_returns_partial_program_on_error() {
        let (program, errors) = parse_program("access(all) contract C {\n  let\n}\n");
        assert!(!errors.is_empty());
        assert!(program.sole_contract().is_none());
    }

    #[test]
    fn test_parse_error_display() {
        let error = ParseError::new("expected expression", Span::new(7, 8));
        assert_eq!(error.to_string(), "expected expression at offset 7");
    }
}
