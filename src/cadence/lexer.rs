use super::position::Span;
use super::token::{Token, TokenKind};
use super::ParseError;

pub(crate) struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    errors: Vec<ParseError>,
    newline_before: bool,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        let pos = if source.starts_with('\u{feff}') { 3 } else { 0 };
        Self {
            source: source.as_bytes(),
            pos,
            errors: Vec::new(),
            newline_before: false,
        }
    }

    pub(crate) fn tokenize(mut self) -> (Vec<Token>, Vec<ParseError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        (tokens, self.errors)
    }

    fn next_token(&mut self) -> Token {
        loop {
            self.newline_before |= self.skip_trivia();
            let start = self.pos;

            let Some(&ch) = self.source.get(self.pos) else {
                return self.make(TokenKind::Eof, start);
            };

            if is_ident_start(ch) {
                return self.scan_identifier();
            }
            if ch.is_ascii_digit() {
                return self.scan_number();
            }
            if ch == b'"' {
                if let Some(token) = self.scan_string() {
                    return token;
                }
                continue;
            }
            if let Some(token) = self.scan_symbol() {
                return token;
            }
        }
    }

    fn make(&mut self, kind: TokenKind, start: usize) -> Token {
        let token = Token {
            kind,
            span: Span::new(start, self.pos),
            newline_before: self.newline_before,
        };
        self.newline_before = false;
        token
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.source.get(self.pos + ahead).copied()
    }

    fn text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.source[start..self.pos]).into_owned()
    }

    /// Skip whitespace and comments; returns whether a line break was seen
    fn skip_trivia(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek_byte(0) {
                Some(b'\n') => {
                    newline = true;
                    self.pos += 1;
                }
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.peek_byte(1) == Some(b'/') => {
                    while let Some(b) = self.peek_byte(0) {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_byte(1) == Some(b'*') => {
                    newline |= self.skip_block_comment();
                }
                _ => return newline,
            }
        }
    }

    /// Block comments nest
    fn skip_block_comment(&mut self) -> bool {
        let start = self.pos;
        let mut depth = 0usize;
        let mut newline = false;
        while self.pos < self.source.len() {
            match (self.source[self.pos], self.peek_byte(1)) {
                (b'/', Some(b'*')) => {
                    depth += 1;
                    self.pos += 2;
                }
                (b'*', Some(b'/')) => {
                    depth -= 1;
                    self.pos += 2;
                    if depth == 0 {
                        return newline;
                    }
                }
                (b'\n', _) => {
                    newline = true;
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        self.errors.push(ParseError::new(
            "missing comment end `*/`",
            Span::new(start, self.pos),
        ));
        newline
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self.peek_byte(0).map(is_ident_continue).unwrap_or(false) {
            self.pos += 1;
        }
        let text = self.text(start);
        self.make(TokenKind::Identifier(text), start)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        if self.peek_byte(0) == Some(b'0') {
            if let Some(radix) = self.peek_byte(1).filter(|b| matches!(b, b'x' | b'b' | b'o')) {
                self.pos += 2;
                let digits_start = self.pos;
                while self
                    .peek_byte(0)
                    .map(|b| b.is_ascii_alphanumeric() || b == b'_')
                    .unwrap_or(false)
                {
                    self.pos += 1;
                }
                let valid = self.source[digits_start..self.pos].iter().all(|b| {
                    *b == b'_'
                        || match radix {
                            b'x' => b.is_ascii_hexdigit(),
                            b'b' => matches!(b, b'0' | b'1'),
                            _ => matches!(b, b'0'..=b'7'),
                        }
                });
                if !valid || digits_start == self.pos {
                    self.errors.push(ParseError::new(
                        format!("invalid integer literal `{}`", self.text(start)),
                        Span::new(start, self.pos),
                    ));
                }
                let text = self.text(start);
                return self.make(TokenKind::Integer(text), start);
            }
        }

        self.skip_decimal_digits();
        if self.peek_byte(0) == Some(b'.')
            && self.peek_byte(1).map(|b| b.is_ascii_digit()).unwrap_or(false)
        {
            self.pos += 1;
            self.skip_decimal_digits();
            let text = self.text(start);
            return self.make(TokenKind::FixedPoint(text), start);
        }
        let text = self.text(start);
        self.make(TokenKind::Integer(text), start)
    }

    fn skip_decimal_digits(&mut self) {
        while self
            .peek_byte(0)
            .map(|b| b.is_ascii_digit() || b == b'_')
            .unwrap_or(false)
        {
            self.pos += 1;
        }
    }

    fn scan_string(&mut self) -> Option<Token> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek_byte(0) {
                None | Some(b'\n') => {
                    self.errors.push(ParseError::new(
                        "missing end of string literal: expected `\"`",
                        Span::new(start, self.pos),
                    ));
                    return None;
                }
                Some(b'"') => {
                    self.pos += 1;
                    return Some(self.make(TokenKind::String(value), start));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.scan_escape(&mut value);
                }
                Some(_) => {
                    let rest = std::str::from_utf8(&self.source[self.pos..]).unwrap_or_default();
                    match rest.chars().next() {
                        Some(c) => {
                            value.push(c);
                            self.pos += c.len_utf8();
                        }
                        None => self.pos += 1,
                    }
                }
            }
        }
    }

    fn scan_escape(&mut self, value: &mut String) {
        let escape_start = self.pos - 1;
        let Some(b) = self.peek_byte(0) else {
            return;
        };
        self.pos += 1;
        match b {
            b'0' => value.push('\0'),
            b'n' => value.push('\n'),
            b'r' => value.push('\r'),
            b't' => value.push('\t'),
            b'"' => value.push('"'),
            b'\'' => value.push('\''),
            b'\\' => value.push('\\'),
            b'u' if self.peek_byte(0) == Some(b'{') => {
                self.pos += 1;
                let digits_start = self.pos;
                while self.peek_byte(0).map(|b| b.is_ascii_hexdigit()).unwrap_or(false) {
                    self.pos += 1;
                }
                let digits = self.text(digits_start);
                if self.peek_byte(0) == Some(b'}') {
                    self.pos += 1;
                }
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(c) => value.push(c),
                    None => self.errors.push(ParseError::new(
                        "invalid unicode escape sequence",
                        Span::new(escape_start, self.pos),
                    )),
                }
            }
            // string template: kept verbatim
            b'(' => value.push_str("\\("),
            _ => self.errors.push(ParseError::new(
                format!("invalid escape character `{}`", b as char),
                Span::new(escape_start, self.pos),
            )),
        }
    }

    fn scan_symbol(&mut self) -> Option<Token> {
        use TokenKind::*;

        let start = self.pos;
        let ch = self.source[self.pos];
        let next = self.peek_byte(1);
        let third = self.peek_byte(2);

        let (kind, len) = match (ch, next) {
            (b'<', Some(b'-')) if third == Some(b'!') => (ForceMove, 3),
            (b'<', Some(b'-')) if third == Some(b'>') => (Swap, 3),
            (b'<', Some(b'-')) => (Move, 2),
            (b'<', Some(b'=')) => (Le, 2),
            (b'<', _) => (Lt, 1),
            (b'>', Some(b'=')) => (Ge, 2),
            (b'>', _) => (Gt, 1),
            (b'-', Some(b'>')) => (Arrow, 2),
            (b'-', _) => (Minus, 1),
            (b'=', Some(b'=')) => (EqEq, 2),
            (b'=', _) => (Eq, 1),
            (b'!', Some(b'=')) => (BangEq, 2),
            (b'!', _) => (Bang, 1),
            (b'?', Some(b'?')) => (DoubleQuestion, 2),
            (b'?', Some(b'.')) => (QuestionDot, 2),
            (b'?', _) => (Question, 1),
            (b'&', Some(b'&')) => (AmpAmp, 2),
            (b'&', _) => (Amp, 1),
            (b'|', Some(b'|')) => (PipePipe, 2),
            (b'|', _) => (Pipe, 1),
            (b'(', _) => (LParen, 1),
            (b')', _) => (RParen, 1),
            (b'{', _) => (LBrace, 1),
            (b'}', _) => (RBrace, 1),
            (b'[', _) => (LBracket, 1),
            (b']', _) => (RBracket, 1),
            (b',', _) => (Comma, 1),
            (b':', _) => (Colon, 1),
            (b';', _) => (Semicolon, 1),
            (b'.', _) => (Dot, 1),
            (b'+', _) => (Plus, 1),
            (b'*', _) => (Star, 1),
            (b'/', _) => (Slash, 1),
            (b'%', _) => (Percent, 1),
            (b'^', _) => (Caret, 1),
            (b'@', _) => (At, 1),
            (b'#', _) => (Hash, 1),
            _ => {
                let rest = std::str::from_utf8(&self.source[self.pos..]).unwrap_or_default();
                let width = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                self.pos += width;
                self.errors.push(ParseError::new(
                    format!("unexpected character `{}`", self.text(start)),
                    Span::new(start, self.pos),
                ));
                return None;
            }
        };

        self.pos += len;
        Some(self.make(kind, start))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_move_operators() {
        assert_eq!(
            kinds("a <- b <-! c <-> d -> e"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Move,
                TokenKind::Identifier("b".into()),
                TokenKind::ForceMove,
                TokenKind::Identifier("c".into()),
                TokenKind::Swap,
                TokenKind::Identifier("d".into()),
                TokenKind::Arrow,
                TokenKind::Identifier("e".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1_000 0x01 1.5"),
            vec![
                TokenKind::Integer("1_000".into()),
                TokenKind::Integer("0x01".into()),
                TokenKind::FixedPoint("1.5".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newline_tracking_and_comments() {
        let (tokens, _) = Lexer::new("a // x\n/* nested /* c */ */ b c").tokenize();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(!tokens[2].newline_before);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\n\u{1F600}""#),
            vec![TokenKind::String("a\n\u{1F600}".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_bom_offsets_are_raw_bytes() {
        let (tokens, _) = Lexer::new("\u{feff}x").tokenize();
        assert_eq!(tokens[0].span, Span::new(3, 4));
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let (_, errors) = Lexer::new("\"abc").tokenize();
        assert_eq!(errors.len(), 1);
    }
}
