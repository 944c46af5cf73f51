//! Recursive-descent parser for Cadence
//!
//! Keywords are contextual: the lexer only produces identifiers, and the
//! parser decides by position whether `access`, `view` or `from` is a
//! keyword. Declarations recover at the next line that starts a new
//! declaration, so one syntax error does not hide the rest of the file.

mod decl;
mod expr;
mod stmt;
mod types;

use super::ast::{ImportDecl, Program};
use super::lexer::Lexer;
use super::position::Span;
use super::token::{Token, TokenKind};
use super::ParseError;

const MAX_NESTING_DEPTH: u32 = 256;

pub(crate) type PResult<T> = Result<T, ParseError>;

/// Keywords that begin a top-level declaration; used for error recovery
const DECLARATION_STARTS: &[&str] = &[
    "access",
    "pub",
    "priv",
    "import",
    "contract",
    "resource",
    "struct",
    "event",
    "enum",
    "attachment",
    "entitlement",
    "transaction",
    "fun",
    "let",
    "var",
];

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    depth: u32,
}

impl Parser {
    pub(crate) fn new(source: &str) -> Self {
        let (tokens, errors) = Lexer::new(source).tokenize();
        Self {
            tokens,
            pos: 0,
            errors,
            depth: 0,
        }
    }

    /// Parse a whole program, recovering after errors
    pub(crate) fn parse_program(mut self) -> (Program, Vec<ParseError>) {
        let mut program = Program::default();

        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.at(&TokenKind::Eof) {
                break;
            }

            let before = self.pos;
            let result = if self.at_keyword("import") {
                self.parse_import().map(|import| program.imports.push(import))
            } else {
                self.parse_top_level_declaration()
                    .map(|decl| program.declarations.push(decl))
            };

            if let Err(error) = result {
                self.errors.push(error);
                self.recover(before);
            }
        }

        self.errors.sort_by_key(|e| e.span.start);
        (program, self.errors)
    }

    /// Parse only the leading import declarations, ignoring the rest of the file.
    ///
    /// Lexer errors past the import section are not reported.
    pub(crate) fn parse_import_section(mut self) -> Result<Vec<ImportDecl>, ParseError> {
        let mut imports = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.at_keyword("import") {
                imports.push(self.parse_import()?);
            } else if self.at(&TokenKind::Hash) {
                self.parse_pragma()?;
            } else {
                break;
            }
        }

        let end = self.prev_span().end;
        if let Some(error) = self.errors.iter().find(|e| e.span.start < end) {
            return Err(error.clone());
        }
        Ok(imports)
    }

    /// Skip to the next line that begins a declaration
    fn recover(&mut self, before: usize) {
        if self.pos == before {
            self.advance();
        }
        while !self.at(&TokenKind::Eof) {
            let token = self.peek();
            let starts_declaration = token
                .ident()
                .map(|name| DECLARATION_STARTS.contains(&name))
                .unwrap_or(false);
            if token.newline_before && starts_declaration {
                break;
            }
            self.advance();
        }
    }

    // --- token helpers ---

    fn peek(&self) -> &Token {
        self.nth(0)
    }

    fn nth(&self, n: usize) -> &Token {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_ident(keyword)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> PResult<Token> {
        if self.at_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("keyword `{}`", keyword)))
        }
    }

    fn expect_ident(&mut self) -> PResult<super::ast::Ident> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(super::ast::Ident::new(name, token.span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::new(
            format!("expected {}, got {}", expected, token.kind),
            token.span,
        )
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            Span::default()
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn enter_nesting(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                "program too deeply nested",
                self.current_span(),
            ));
        }
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Speculatively run `f`, rewinding on failure
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> Option<T> {
        let pos = self.pos;
        let errors = self.errors.len();
        let depth = self.depth;
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = pos;
                self.errors.truncate(errors);
                self.depth = depth;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::ast::*;
    use super::*;

    fn parse(source: &str) -> Program {
        let (program, errors) = Parser::new(source).parse_program();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        program
    }

    #[test]
    fn test_contract_with_members() {
        let program = parse(
            r#"
            import FungibleToken from 0xf233dcee88fe0abe
            import "NonFungibleToken"

            access(all) contract Example: FungibleToken {
                access(all) var totalSupply: UFix64
                access(all) event TokensInitialized(initialSupply: UFix64)

                access(all) resource Vault: FungibleToken.Vault {
                    access(all) var balance: UFix64

                    init(balance: UFix64) {
                        self.balance = balance
                    }

                    access(FungibleToken.Withdraw) fun withdraw(amount: UFix64): @{FungibleToken.Vault} {
                        self.balance = self.balance - amount
                        return <-create Vault(balance: amount)
                    }
                }

                access(all) fun createEmptyVault(vaultType: Type): @Example.Vault {
                    return <-create Vault(balance: 0.0)
                }

                init() {
                    self.totalSupply = 1000.0
                    emit TokensInitialized(initialSupply: self.totalSupply)
                }
            }
            "#,
        );

        assert_eq!(program.imports.len(), 2);
        let contract = program.sole_contract().unwrap();
        assert_eq!(contract.ident.name, "Example");
        assert_eq!(contract.members.fields.len(), 1);
        assert_eq!(contract.members.functions.len(), 1);
        assert_eq!(contract.members.special_functions.len(), 1);
        assert_eq!(contract.members.composites.len(), 2);
        let vault = &contract.members.composites[1];
        assert_eq!(vault.kind, CompositeKind::Resource);
        assert_eq!(
            vault.members.functions[0].access,
            Access::Entitlements(vec!["FungibleToken.Withdraw".to_string()])
        );
    }

    #[test]
    fn test_transaction() {
        let program = parse(
            r#"
            transaction(amount: UFix64, to: Address) {
                let sentVault: @{FungibleToken.Vault}

                prepare(signer: auth(BorrowValue) &Account) {
                    let vaultRef = signer.storage.borrow<auth(FungibleToken.Withdraw) &FlowToken.Vault>(from: /storage/flowTokenVault)
                        ?? panic("missing vault")
                    self.sentVault <- vaultRef.withdraw(amount: amount)
                }

                execute {
                    let receiver = getAccount(to).capabilities.borrow<&{FungibleToken.Receiver}>(/public/flowTokenReceiver)!
                    receiver.deposit(from: <-self.sentVault)
                }
            }
            "#,
        );
        let tx = program.sole_transaction().unwrap();
        assert_eq!(tx.parameters.len(), 2);
        assert_eq!(tx.fields.len(), 1);
        assert!(tx.prepare.is_some());
        assert!(tx.execute.is_some());
    }

    #[test]
    fn test_syntax_error_is_reported_and_parsing_continues() {
        let (program, errors) = Parser::new(
            "access(all) fun broken() { let x = }\naccess(all) fun ok() {}\n",
        )
        .parse_program();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("expected"));
        assert!(program
            .declarations
            .iter()
            .any(|d| matches!(d, Declaration::Function(f) if f.ident.name == "ok")));
    }

    #[test]
    fn test_import_section_ignores_rest_of_file() {
        let imports = Parser::new("import A from 0x01\nimport \"B\"\nthis is not cadence {{{ \"")
            .parse_import_section()
            .unwrap();
        assert_eq!(imports.len(), 2);
    }
}
