//! Lint report renderers

use colored::Colorize;

use super::diagnostic::Severity;
use super::LintResult;
use crate::config::LintFormat;

/// Render `result` in `format`
pub fn render(result: &LintResult, format: LintFormat) -> serde_json::Result<String> {
    match format {
        LintFormat::Text => Ok(render_text(result)),
        LintFormat::Inline => Ok(render_summary(result)),
        LintFormat::Json => render_json(result),
    }
}

/// One line per diagnostic followed by the summary
pub fn render_text(result: &LintResult) -> String {
    let mut out = String::new();
    for file in &result.results {
        for diagnostic in &file.diagnostics {
            let category = match diagnostic.severity() {
                Severity::Error => diagnostic.category.red(),
                Severity::Warning => diagnostic.category.yellow(),
            };
            out.push_str(&format!(
                "{}:{}:{}: {}: {}\n",
                file.file_path,
                diagnostic.range.start.line,
                diagnostic.range.start.column,
                category,
                diagnostic.message
            ));
        }
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&render_summary(result));
    out
}

/// `N problems (E errors, W warnings)`
pub fn render_summary(result: &LintResult) -> String {
    let errors = result.error_count();
    let warnings = result.warning_count();
    let total = format!("{} problems", errors + warnings);
    let total = if errors > 0 {
        total.red().bold()
    } else if warnings > 0 {
        total.yellow().bold()
    } else {
        total.green().bold()
    };
    format!("{} ({} errors, {} warnings)", total, errors, warnings)
}

pub fn render_json(result: &LintResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&result.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::position::{Position, Range};
    use crate::lint::diagnostic::Diagnostic;
    use crate::lint::FileResult;
    use crate::location::Location;

    fn result() -> LintResult {
        let range = Range {
            start: Position {
                line: 4,
                column: 11,
                offset: 40,
            },
            end: Position {
                line: 4,
                column: 12,
                offset: 41,
            },
        };
        LintResult {
            results: vec![FileResult {
                file_path: "LintWarning.cdc".to_string(),
                diagnostics: vec![Diagnostic::new(
                    Location::string("LintWarning.cdc"),
                    "removal-hint",
                    "unnecessary force operator",
                    range,
                )],
            }],
            had_failure: false,
        }
    }

    #[test]
    fn test_text_lines() {
        let text = render_text(&result());
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("LintWarning.cdc:4:11: "));
        assert!(first.ends_with(": unnecessary force operator"));
        assert!(first.contains("removal-hint"));
        assert!(text.contains("(0 errors, 1 warnings)"));
    }

    #[test]
    fn test_inline_is_summary_only() {
        let inline = render(&result(), LintFormat::Inline).unwrap();
        assert_eq!(inline.lines().count(), 1);
        assert!(inline.contains("1 problems"));
    }

    #[test]
    fn test_json_is_array_of_file_results() {
        let json = render(&result(), LintFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["FilePath"], "LintWarning.cdc");
        assert_eq!(value[0]["Diagnostics"][0]["Category"], "removal-hint");
        assert_eq!(value[0]["Diagnostics"][0]["Range"]["Start"]["Line"], 4);
    }
}
