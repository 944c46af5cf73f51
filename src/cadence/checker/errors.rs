use std::fmt;

use crate::cadence::position::Span;

/// A semantic error found by the checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerError {
    pub message: String,
    pub secondary: Option<String>,
    pub span: Span,
}

impl CheckerError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            secondary: None,
            span,
        }
    }

    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    pub fn not_declared_variable(name: &str, span: Span) -> Self {
        Self::new(format!("cannot find variable in this scope: `{}`", name), span)
            .with_secondary("not found in this scope")
    }

    pub fn not_declared_type(name: &str, span: Span) -> Self {
        Self::new(format!("cannot find type in this scope: `{}`", name), span)
            .with_secondary("not found in this scope")
    }

    pub fn redeclaration(kind: &str, name: &str, span: Span) -> Self {
        Self::new(
            format!("cannot redeclare {}: `{}` is already declared", kind, name),
            span,
        )
        .with_secondary("redeclaration")
    }

    pub fn assignment_to_constant(name: &str, span: Span) -> Self {
        Self::new(format!("cannot assign to constant: `{}`", name), span)
            .with_secondary("consider changing the declaration to be variable")
    }

    pub fn assignment_to_constant_member(name: &str, span: Span) -> Self {
        Self::new(format!("cannot assign to constant member: `{}`", name), span)
    }

    pub fn not_declared_member(ty: &str, name: &str, span: Span) -> Self {
        Self::new(format!("value of type `{}` has no member `{}`", ty, name), span)
            .with_secondary("unknown member")
    }

    pub fn access_denied(name: &str, kind: &str, access: &str, span: Span) -> Self {
        Self::new(
            format!(
                "cannot access `{}`: {} has `{}` access (access denied)",
                name, kind, access
            ),
            span,
        )
    }

    pub fn missing_import_declaration(name: &str, location: &str, span: Span) -> Self {
        Self::new(
            format!("cannot find declaration `{}` in `{}`", name, location),
            span,
        )
    }

    pub fn unresolved_import(location: &str, reason: &str, span: Span) -> Self {
        Self::new(format!("cannot import `{}`: {}", location, reason), span)
    }

    pub fn cyclic_import(location: &str, span: Span) -> Self {
        Self::new(format!("cyclic import of `{}`", location), span)
    }

    pub fn imported_program_failed(location: &str, span: Span) -> Self {
        Self::new(
            format!("checking of imported program `{}` failed", location),
            span,
        )
    }
}

impl fmt::Display for CheckerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CheckerError {}
