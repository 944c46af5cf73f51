//! Source positions
//!
//! Spans are byte ranges into the original source (end exclusive). They are
//! converted to line/column positions only when a diagnostic is produced.
//! Lines are 1-based, columns are 0-based and count characters.

use serde::{Deserialize, Serialize};

/// A byte range into source text, end exclusive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// An inclusive start/end pair, as reported in diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Maps byte offsets to line/column positions
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    /// Byte offset at which each line starts
    line_starts: Vec<usize>,
}

const BOM: &str = "\u{feff}";

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let first = if source.starts_with(BOM) { BOM.len() } else { 0 };
        let mut line_starts = vec![first];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts[line].min(offset);
        let column = self
            .source
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(offset - line_start);
        Position {
            line: line + 1,
            column,
            offset,
        }
    }

    /// The inclusive range covered by `span`: the end is the last character
    pub fn range(&self, span: Span) -> Range {
        let start = self.position(span.start);
        if span.end <= span.start {
            return Range { start, end: start };
        }
        let mut last = span.end - 1;
        while last > span.start && !self.source.is_char_boundary(last) {
            last -= 1;
        }
        Range {
            start,
            end: self.position(last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_one_based_lines_zero_based_columns() {
        let source = "let a = 1\n\t\tlet x = 1!";
        let index = LineIndex::new(source);
        let offset = source.find("1!").unwrap();
        let pos = index.position(offset);
        assert_eq!((pos.line, pos.column, pos.offset), (2, 10, offset));
    }

    #[test]
    fn test_crlf_and_bom() {
        let source = "\u{feff}a\r\nbc";
        let index = LineIndex::new(source);
        let b = source.find('b').unwrap();
        assert_eq!(index.position(b), Position { line: 2, column: 0, offset: b });
        assert_eq!(index.position(3), Position { line: 1, column: 0, offset: 3 });
    }

    #[test]
    fn test_range_end_is_inclusive() {
        let source = "x = 1!";
        let index = LineIndex::new(source);
        let range = index.range(Span::new(4, 6));
        assert_eq!(range.start.column, 4);
        assert_eq!(range.end.column, 5);
        assert_eq!(range.end.offset, 5);
    }

    #[test]
    fn test_multibyte_columns_count_chars() {
        let source = "\"é\" x";
        let index = LineIndex::new(source);
        let x = source.find('x').unwrap();
        assert_eq!(index.position(x).column, 4);
        assert_eq!(index.position(x).offset, 5);
    }
}
