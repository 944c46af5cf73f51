//! Diagnostic model shared by the checker driver and the renderers

use serde::Serialize;

use crate::cadence::analysis::Finding;
use crate::cadence::checker::CheckerError;
use crate::cadence::position::{LineIndex, Range};
use crate::cadence::ParseError;
use crate::location::Location;

pub const SYNTAX_ERROR: &str = "syntax-error";
pub const SEMANTIC_ERROR: &str = "semantic-error";
/// Failures that are neither syntax nor semantic, including internal ones
pub const ERROR: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Severity is derived from the category; unknown categories are warnings
pub fn severity(category: &str) -> Severity {
    match category {
        SYNTAX_ERROR | SEMANTIC_ERROR | ERROR => Severity::Error,
        _ => Severity::Warning,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Diagnostic {
    #[serde(serialize_with = "serialize_location")]
    pub location: Location,
    pub category: String,
    pub message: String,
    pub secondary_message: String,
    pub range: Range,
}

fn serialize_location<S: serde::Serializer>(location: &Location, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&location.description())
}

impl Diagnostic {
    pub fn new(
        location: Location,
        category: impl Into<String>,
        message: impl Into<String>,
        range: Range,
    ) -> Self {
        Self {
            location,
            category: category.into(),
            message: message.into(),
            secondary_message: String::new(),
            range,
        }
    }

    pub fn with_secondary(mut self, secondary: Option<String>) -> Self {
        self.secondary_message = secondary.unwrap_or_default();
        self
    }

    pub fn severity(&self) -> Severity {
        severity(&self.category)
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn from_parse_error(location: &Location, index: &LineIndex<'_>, error: &ParseError) -> Self {
        Self::new(location.clone(), SYNTAX_ERROR, &error.message, index.range(error.span))
    }

    pub fn from_checker_error(location: &Location, index: &LineIndex<'_>, error: &CheckerError) -> Self {
        Self::new(location.clone(), SEMANTIC_ERROR, &error.message, index.range(error.span))
            .with_secondary(error.secondary.clone())
    }

    pub fn from_finding(location: &Location, index: &LineIndex<'_>, finding: Finding) -> Self {
        Self::new(location.clone(), finding.category, finding.message, index.range(finding.span))
            .with_secondary(finding.secondary)
    }

    /// A failure that is not tied to a source position
    pub fn internal(location: &Location, message: impl Into<String>) -> Self {
        Self::new(location.clone(), ERROR, message, Range::default())
    }
}

/// Order diagnostics by start offset, then category, then message
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.range
            .start
            .offset
            .cmp(&b.range.start.offset)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.message.cmp(&b.message))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::position::Span;

    fn diagnostic(offset: usize, category: &str, message: &str) -> Diagnostic {
        let mut range = Range::default();
        range.start.offset = offset;
        Diagnostic::new(Location::string("a.cdc"), category, message, range)
    }

    #[test]
    fn test_severity_defaults_to_warning() {
        assert_eq!(severity(SYNTAX_ERROR), Severity::Error);
        assert_eq!(severity(SEMANTIC_ERROR), Severity::Error);
        assert_eq!(severity(ERROR), Severity::Error);
        assert_eq!(severity("removal-hint"), Severity::Warning);
        assert_eq!(severity("some-new-analyzer"), Severity::Warning);
    }

    #[test]
    fn test_sort_order() {
        let mut diagnostics = vec![
            diagnostic(10, "semantic-error", "b"),
            diagnostic(10, "removal-hint", "z"),
            diagnostic(2, "semantic-error", "x"),
            diagnostic(10, "removal-hint", "a"),
        ];
        sort_diagnostics(&mut diagnostics);
        let order: Vec<_> = diagnostics
            .iter()
            .map(|d| (d.range.start.offset, d.category.as_str(), d.message.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (2, "semantic-error", "x"),
                (10, "removal-hint", "a"),
                (10, "removal-hint", "z"),
                (10, "semantic-error", "b"),
            ]
        );
    }

    #[test]
    fn test_json_shape() {
        let source = "let x = 1!";
        let d = Diagnostic::new(
            Location::string("a.cdc"),
            "removal-hint",
            "unnecessary force operator",
            LineIndex::new(source).range(Span::new(8, 10)),
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["Location"], "a.cdc");
        assert_eq!(json["Category"], "removal-hint");
        assert_eq!(json["SecondaryMessage"], "");
        assert_eq!(json["Range"]["Start"]["Column"], 8);
        assert_eq!(json["Range"]["End"]["Offset"], 9);
    }
}
