use std::fmt;

use super::position::Span;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifiers and keywords; keywords are contextual
    Identifier(String),
    /// Integer literal text, underscores and radix prefix included
    Integer(String),
    FixedPoint(String),
    /// Unescaped string literal contents
    String(String),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    QuestionDot,
    Question,
    DoubleQuestion,
    Bang,
    BangEq,
    Eq,
    EqEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    /// `<-`
    Move,
    /// `<-!`
    ForceMove,
    /// `<->`
    Swap,
    /// `->`
    Arrow,
    At,
    Hash,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Identifier(name) => return write!(f, "`{}`", name),
            TokenKind::Integer(text) | TokenKind::FixedPoint(text) => {
                return write!(f, "`{}`", text)
            }
            TokenKind::String(_) => "string",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Dot => "`.`",
            TokenKind::QuestionDot => "`?.`",
            TokenKind::Question => "`?`",
            TokenKind::DoubleQuestion => "`??`",
            TokenKind::Bang => "`!`",
            TokenKind::BangEq => "`!=`",
            TokenKind::Eq => "`=`",
            TokenKind::EqEq => "`==`",
            TokenKind::Lt => "`<`",
            TokenKind::Le => "`<=`",
            TokenKind::Gt => "`>`",
            TokenKind::Ge => "`>=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Amp => "`&`",
            TokenKind::AmpAmp => "`&&`",
            TokenKind::Pipe => "`|`",
            TokenKind::PipePipe => "`||`",
            TokenKind::Caret => "`^`",
            TokenKind::Move => "`<-`",
            TokenKind::ForceMove => "`<-!`",
            TokenKind::Swap => "`<->`",
            TokenKind::Arrow => "`->`",
            TokenKind::At => "`@`",
            TokenKind::Hash => "`#`",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line break separates this token from the previous one
    pub newline_before: bool,
}

impl Token {
    pub fn is_ident(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(name) if name == keyword)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}
