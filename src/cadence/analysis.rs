//! Static analyzers over checked programs
//!
//! Analyzers see the syntax tree together with the checker's elaboration
//! and report through a callback. They only report when the checker
//! inferred every type involved.

use super::ast::{CastKind, Expr, ExprKind, Program};
use super::checker::Elaboration;
use super::position::Span;
use super::visit::{self, Visitor};

/// Category of analyzer findings that suggest removing code
pub const REMOVAL_HINT: &str = "removal-hint";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub category: String,
    pub message: String,
    pub secondary: Option<String>,
    pub span: Span,
}

impl Finding {
    pub fn removal_hint(message: impl Into<String>, span: Span) -> Self {
        Self {
            category: REMOVAL_HINT.to_string(),
            message: message.into(),
            secondary: None,
            span,
        }
    }
}

pub trait Analyzer {
    fn name(&self) -> &'static str;

    fn analyze(
        &self,
        program: &Program,
        elaboration: &Elaboration,
        report: &mut dyn FnMut(Finding),
    );
}

/// The analyzers the linter runs, in order
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![Box::new(UnnecessaryForce), Box::new(RedundantCast)]
}

/// Collects the expressions matching a predicate
struct Collect<F> {
    matches: F,
    found: Vec<Span>,
}

impl<F: Fn(&Expr) -> bool> Visitor for Collect<F> {
    fn visit_expr(&mut self, expr: &Expr) {
        if (self.matches)(expr) {
            self.found.push(expr.span);
        }
        visit::walk_expr(self, expr);
    }
}

fn collect(program: &Program, matches: impl Fn(&Expr) -> bool) -> Vec<Span> {
    let mut collector = Collect {
        matches,
        found: Vec::new(),
    };
    visit::walk_program(&mut collector, program);
    collector.found
}

/// `x!` where `x` is not optional
pub struct UnnecessaryForce;

impl Analyzer for UnnecessaryForce {
    fn name(&self) -> &'static str {
        "unnecessary-force"
    }

    fn analyze(
        &self,
        program: &Program,
        elaboration: &Elaboration,
        report: &mut dyn FnMut(Finding),
    ) {
        for span in collect(program, |e| matches!(e.kind, ExprKind::Force(_))) {
            let Some(operand) = elaboration.force_operand(span) else {
                continue;
            };
            if operand.is_known() && !operand.is_optional() {
                report(Finding::removal_hint("unnecessary force operator", span));
            }
        }
    }
}

/// `x as T` where `x` already has type `T`
pub struct RedundantCast;

impl Analyzer for RedundantCast {
    fn name(&self) -> &'static str {
        "redundant-cast"
    }

    fn analyze(
        &self,
        program: &Program,
        elaboration: &Elaboration,
        report: &mut dyn FnMut(Finding),
    ) {
        let casts = collect(program, |e| {
            matches!(
                e.kind,
                ExprKind::Cast {
                    kind: CastKind::Static,
                    ..
                }
            )
        });
        for span in casts {
            let Some(cast) = elaboration.static_cast(span) else {
                continue;
            };
            if !cast.operand_is_literal && cast.operand.is_known() && cast.operand == cast.target {
                report(Finding::removal_hint(
                    format!("cast to `{}` is redundant", cast.target),
                    span,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::checker::{check_program, CheckerConfig};
    use crate::cadence::parse_program;
    use crate::cadence::stdlib::Environment;
    use crate::location::Location;

    fn analyze(source: &str) -> Vec<Finding> {
        let (program, errors) = parse_program(source);
        assert!(errors.is_empty(), "{:?}", errors);
        let config = CheckerConfig::new(Environment::for_program(&program));
        let (elaboration, _) = check_program(&program, Location::string("Test.cdc"), config);

        let mut findings = Vec::new();
        for analyzer in default_analyzers() {
            analyzer.analyze(&program, &elaboration, &mut |f| findings.push(f));
        }
        findings
    }

    #[test]
    fn test_unnecessary_force_on_non_optional() {
        let source = "access(all) fun main() {\n  let x = 1!\n}";
        let findings = analyze(source);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, REMOVAL_HINT);
        assert_eq!(findings[0].message, "unnecessary force operator");
        assert_eq!(findings[0].span.start, source.find("1!").unwrap());
    }

    #[test]
    fn test_force_on_optional_is_fine() {
        let source = "access(all) fun main(x: Int?): Int {\n  return x!\n}";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_force_on_unknown_is_not_reported() {
        let source = "access(all) fun main() {\n  let x = undefinedThing!\n}";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_redundant_cast() {
        let source = "access(all) fun main(x: UInt8) {\n  let y = x as UInt8\n  let z = 1 as UInt8\n}";
        let findings = analyze(source);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "cast to `UInt8` is redundant");
    }

    #[test]
    fn test_widening_cast_is_fine() {
        let source = "access(all) fun main(x: UInt8) {\n  let y = x as AnyStruct\n}";
        assert!(analyze(source).is_empty());
    }
}
