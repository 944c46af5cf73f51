use crate::address::Address;

use super::super::ast::*;
use super::super::position::Span;
use super::super::token::TokenKind;
use super::super::ParseError;
use super::{PResult, Parser};

/// Where a declaration appears; decides what `let` and `init` mean
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum DeclContext {
    Program,
    Composite(CompositeKind),
    Interface,
    Transaction,
    Function,
}

impl DeclContext {
    fn has_fields(self) -> bool {
        matches!(
            self,
            DeclContext::Composite(_) | DeclContext::Interface | DeclContext::Transaction
        )
    }
}

#[derive(Debug, Default)]
struct Modifiers {
    access: Access,
    is_view: bool,
    is_static: bool,
    start: Option<Span>,
}

/// Any declaration a member list or program can hold
pub(super) enum Parsed {
    Declaration(Declaration),
    Field(FieldDecl),
    Special(FunctionDecl),
    EnumCase(EnumCase),
}

impl Parser {
    pub(super) fn parse_import(&mut self) -> PResult<ImportDecl> {
        let start = self.expect_keyword("import")?.span;

        // import "Name"
        if let TokenKind::String(value) = self.peek().kind.clone() {
            let token = self.advance();
            return Ok(ImportDecl {
                identifiers: Vec::new(),
                location: ImportLocation::String(value),
                location_span: token.span,
                span: start.merge(token.span),
            });
        }

        let mut identifiers = vec![self.expect_ident()?];
        while self.eat(&TokenKind::Comma) {
            identifiers.push(self.expect_ident()?);
        }

        if !self.eat_keyword("from") {
            // import Crypto
            if identifiers.len() == 1 {
                let ident = identifiers.remove(0);
                return Ok(ImportDecl {
                    identifiers: Vec::new(),
                    location: ImportLocation::Identifier(ident.name),
                    location_span: ident.span,
                    span: start.merge(ident.span),
                });
            }
            return Err(self.unexpected("keyword `from`"));
        }

        let token = self.advance();
        let location = match &token.kind {
            TokenKind::String(value) => ImportLocation::String(value.clone()),
            TokenKind::Integer(text) if text.starts_with("0x") => {
                let address = Address::from_hex(&text.replace('_', "")).map_err(|_| {
                    ParseError::new(format!("invalid address `{}`", text), token.span)
                })?;
                ImportLocation::Address(address)
            }
            TokenKind::Identifier(name) => ImportLocation::Identifier(name.clone()),
            other => {
                return Err(ParseError::new(
                    format!(
                        "expected address, string or identifier in import, got {}",
                        other
                    ),
                    token.span,
                ))
            }
        };

        Ok(ImportDecl {
            identifiers,
            location,
            location_span: token.span,
            span: start.merge(token.span),
        })
    }

    pub(super) fn parse_pragma(&mut self) -> PResult<PragmaDecl> {
        let hash = self.expect(&TokenKind::Hash)?;
        let mut expression = self.parse_expr()?;
        expression.span = hash.span.merge(expression.span);
        Ok(PragmaDecl { expression })
    }

    pub(super) fn parse_top_level_declaration(&mut self) -> PResult<Declaration> {
        if self.at(&TokenKind::Hash) {
            return Ok(Declaration::Pragma(self.parse_pragma()?));
        }
        match self.parse_declaration(DeclContext::Program)? {
            Parsed::Declaration(decl) => Ok(decl),
            _ => Err(self.unexpected("declaration")),
        }
    }

    /// Whether the current token begins a declaration inside a function body
    pub(super) fn at_local_declaration(&self) -> bool {
        let next_is = |kind: TokenKind| self.nth(1).kind == kind;
        let next_is_ident = matches!(self.nth(1).kind, TokenKind::Identifier(_));
        match self.peek().ident() {
            Some("let") | Some("var") => true,
            Some("fun") => next_is_ident,
            Some("view") => self.nth(1).is_ident("fun") && matches!(self.nth(2).kind, TokenKind::Identifier(_)),
            Some("access") => next_is(TokenKind::LParen),
            _ => false,
        }
    }

    pub(super) fn parse_declaration(&mut self, context: DeclContext) -> PResult<Parsed> {
        let modifiers = self.parse_modifiers()?;
        let start = modifiers.start.unwrap_or_else(|| self.current_span());

        let keyword = match self.peek().ident() {
            Some(keyword) => keyword.to_string(),
            None => return Err(self.unexpected("declaration")),
        };

        match keyword.as_str() {
            "let" | "var" if context.has_fields() => {
                Ok(Parsed::Field(self.parse_field(modifiers, start)?))
            }
            "let" | "var" => Ok(Parsed::Declaration(Declaration::Variable(
                self.parse_variable(modifiers.access, start)?,
            ))),
            "fun" => Ok(Parsed::Declaration(Declaration::Function(
                self.parse_function(modifiers, start, true)?,
            ))),
            "init" | "destroy" | "prepare"
                if context.has_fields() && self.nth(1).kind == TokenKind::LParen =>
            {
                Ok(Parsed::Special(self.parse_function(modifiers, start, false)?))
            }
            "case" if context == DeclContext::Composite(CompositeKind::Enum) => {
                self.advance();
                let ident = self.expect_ident()?;
                Ok(Parsed::EnumCase(EnumCase {
                    access: modifiers.access,
                    ident,
                }))
            }
            "entitlement" => Ok(Parsed::Declaration(Declaration::Entitlement(
                self.parse_entitlement(modifiers.access, start)?,
            ))),
            "transaction" if context == DeclContext::Program => Ok(Parsed::Declaration(
                Declaration::Transaction(self.parse_transaction()?),
            )),
            other => match CompositeKind::from_keyword(other) {
                Some(kind) => self.parse_composite_or_interface(kind, modifiers.access, start),
                None => Err(self.unexpected("declaration")),
            },
        }
    }

    fn parse_modifiers(&mut self) -> PResult<Modifiers> {
        let mut modifiers = Modifiers::default();
        loop {
            let token = self.peek().clone();
            let Some(name) = token.ident() else {
                break;
            };
            match name {
                "access" if self.nth(1).kind == TokenKind::LParen => {
                    self.advance();
                    modifiers.access = self.parse_access()?;
                }
                // legacy access modifiers
                "pub" | "priv" if matches!(self.nth(1).kind, TokenKind::Identifier(_) | TokenKind::LParen) => {
                    self.advance();
                    modifiers.access = if name == "pub" {
                        if self.eat(&TokenKind::LParen) {
                            self.expect_keyword("set")?;
                            self.expect(&TokenKind::RParen)?;
                        }
                        Access::All
                    } else {
                        Access::Self_
                    };
                }
                "view" if self.nth(1).is_ident("fun") => {
                    self.advance();
                    modifiers.is_view = true;
                }
                "static" | "native" if matches!(self.nth(1).kind, TokenKind::Identifier(_)) => {
                    self.advance();
                    modifiers.is_static |= name == "static";
                }
                _ => break,
            }
            modifiers.start.get_or_insert(token.span);
        }
        Ok(modifiers)
    }

    fn parse_access(&mut self) -> PResult<Access> {
        self.expect(&TokenKind::LParen)?;
        let access = if self.eat_keyword("all") {
            Access::All
        } else if self.eat_keyword("account") {
            Access::Account
        } else if self.eat_keyword("contract") {
            Access::Contract
        } else if self.eat_keyword("self") {
            Access::Self_
        } else if self.eat_keyword("mapping") {
            Access::Mapping(self.parse_nominal_type()?.qualified_name())
        } else {
            let mut names = vec![self.parse_nominal_type()?.qualified_name()];
            while self.eat(&TokenKind::Comma) || self.eat(&TokenKind::Pipe) {
                names.push(self.parse_nominal_type()?.qualified_name());
            }
            Access::Entitlements(names)
        };
        self.expect(&TokenKind::RParen)?;
        Ok(access)
    }

    fn parse_field(&mut self, modifiers: Modifiers, start: Span) -> PResult<FieldDecl> {
        let is_constant = self.advance().is_ident("let");
        let ident = self.expect_ident()?;
        self.expect(&TokenKind::Colon)?;
        let type_annotation = self.parse_type_annotation()?;
        Ok(FieldDecl {
            access: modifiers.access,
            is_constant,
            ident,
            span: start.merge(self.prev_span()),
            type_annotation,
        })
    }

    pub(super) fn parse_variable(&mut self, access: Access, start: Span) -> PResult<VariableDecl> {
        let is_constant = self.advance().is_ident("let");
        let ident = self.expect_ident()?;
        let type_annotation = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let transfer = self.parse_transfer()?;
        let value = self.parse_expr()?;
        Ok(VariableDecl {
            access,
            is_constant,
            ident,
            type_annotation,
            transfer,
            span: start.merge(value.span),
            value,
        })
    }

    pub(super) fn parse_transfer(&mut self) -> PResult<Transfer> {
        let transfer = match self.peek().kind {
            TokenKind::Eq => Transfer::Copy,
            TokenKind::Move => Transfer::Move,
            TokenKind::ForceMove => Transfer::ForceMove,
            _ => return Err(self.unexpected("transfer operator `=`, `<-` or `<-!`")),
        };
        self.advance();
        Ok(transfer)
    }

    /// `fun name(params): T { ... }`, or a special function when `named` is false
    fn parse_function(&mut self, modifiers: Modifiers, start: Span, named: bool) -> PResult<FunctionDecl> {
        let ident = if named {
            self.expect_keyword("fun")?;
            self.expect_ident()?
        } else {
            self.expect_ident()?
        };
        let parameters = self.parse_parameters(false)?;
        let return_type = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let body = if self.at(&TokenKind::LBrace) {
            Some(self.parse_function_block()?)
        } else {
            None
        };
        Ok(FunctionDecl {
            access: modifiers.access,
            is_view: modifiers.is_view,
            is_static: modifiers.is_static,
            ident,
            parameters,
            return_type,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    pub(super) fn parse_parameters(&mut self, allow_defaults: bool) -> PResult<Vec<Parameter>> {
        self.expect(&TokenKind::LParen)?;
        let mut parameters = Vec::new();
        while !self.at(&TokenKind::RParen) {
            let first = self.expect_ident()?;
            let (label, ident) = if matches!(self.peek().kind, TokenKind::Identifier(_)) {
                (Some(first.name), self.expect_ident()?)
            } else {
                (None, first)
            };
            self.expect(&TokenKind::Colon)?;
            let type_annotation = self.parse_type_annotation()?;
            let default = if allow_defaults && self.eat(&TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            parameters.push(Parameter {
                label,
                ident,
                type_annotation,
                default,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(parameters)
    }

    pub(super) fn parse_function_block(&mut self) -> PResult<FunctionBlock> {
        let open = self.expect(&TokenKind::LBrace)?;
        let mut block = FunctionBlock::default();

        if self.at_keyword("pre") && self.nth(1).kind == TokenKind::LBrace {
            self.advance();
            block.pre_conditions = self.parse_conditions()?;
        }
        if self.at_keyword("post") && self.nth(1).kind == TokenKind::LBrace {
            self.advance();
            block.post_conditions = self.parse_conditions()?;
        }

        let statements = self.parse_statements()?;
        let close = self.expect(&TokenKind::RBrace)?;
        block.block = Block {
            statements,
            span: open.span.merge(close.span),
        };
        Ok(block)
    }

    fn parse_conditions(&mut self) -> PResult<Vec<Condition>> {
        self.expect(&TokenKind::LBrace)?;
        let mut conditions = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            if self.eat_keyword("emit") {
                conditions.push(Condition::Emit(self.parse_expr()?));
                continue;
            }
            let test = self.parse_expr()?;
            let message = if self.eat(&TokenKind::Colon) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            conditions.push(Condition::Test { test, message });
        }
        Ok(conditions)
    }

    fn parse_entitlement(&mut self, access: Access, start: Span) -> PResult<EntitlementDecl> {
        self.expect_keyword("entitlement")?;
        let is_mapping = self.at_keyword("mapping") && matches!(self.nth(1).kind, TokenKind::Identifier(_));
        if is_mapping {
            self.advance();
        }
        let ident = self.expect_ident()?;
        if is_mapping {
            // Mapping bodies only relate entitlement names
            self.expect(&TokenKind::LBrace)?;
            while !self.at(&TokenKind::RBrace) {
                if self.at(&TokenKind::Eof) {
                    return Err(self.unexpected("`}`"));
                }
                self.advance();
            }
            self.expect(&TokenKind::RBrace)?;
        }
        Ok(EntitlementDecl {
            access,
            ident,
            is_mapping,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_composite_or_interface(
        &mut self,
        kind: CompositeKind,
        access: Access,
        start: Span,
    ) -> PResult<Parsed> {
        self.advance();

        if self.at_keyword("interface") && matches!(self.nth(1).kind, TokenKind::Identifier(_)) {
            self.advance();
            let ident = self.expect_ident()?;
            let conformances = self.parse_conformances()?;
            let members = self.parse_members(DeclContext::Interface)?;
            return Ok(Parsed::Declaration(Declaration::Interface(InterfaceDecl {
                access,
                kind,
                ident,
                conformances,
                members,
                span: start.merge(self.prev_span()),
            })));
        }

        let ident = self.expect_ident()?;
        let mut decl = CompositeDecl {
            access,
            kind,
            ident,
            conformances: Vec::new(),
            base: None,
            parameters: Vec::new(),
            members: Members::default(),
            span: start,
        };

        match kind {
            CompositeKind::Event => {
                decl.parameters = self.parse_parameters(true)?;
            }
            CompositeKind::Attachment => {
                self.expect_keyword("for")?;
                decl.base = Some(self.parse_nominal_type()?);
                decl.conformances = self.parse_conformances()?;
                decl.members = self.parse_members(DeclContext::Composite(kind))?;
            }
            _ => {
                decl.conformances = self.parse_conformances()?;
                decl.members = self.parse_members(DeclContext::Composite(kind))?;
            }
        }

        decl.span = start.merge(self.prev_span());
        Ok(Parsed::Declaration(Declaration::Composite(decl)))
    }

    fn parse_conformances(&mut self) -> PResult<Vec<NominalType>> {
        let mut conformances = Vec::new();
        if self.eat(&TokenKind::Colon) {
            conformances.push(self.parse_nominal_type()?);
            while self.eat(&TokenKind::Comma) {
                conformances.push(self.parse_nominal_type()?);
            }
        }
        Ok(conformances)
    }

    fn parse_members(&mut self, context: DeclContext) -> PResult<Members> {
        self.expect(&TokenKind::LBrace)?;
        self.enter_nesting()?;
        let mut members = Members::default();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            match self.parse_declaration(context)? {
                Parsed::Field(field) => members.fields.push(field),
                Parsed::Special(function) => members.special_functions.push(function),
                Parsed::EnumCase(case) => members.enum_cases.push(case),
                Parsed::Declaration(Declaration::Function(function)) => {
                    members.functions.push(function)
                }
                Parsed::Declaration(Declaration::Composite(composite)) => {
                    members.composites.push(composite)
                }
                Parsed::Declaration(Declaration::Interface(interface)) => {
                    members.interfaces.push(interface)
                }
                Parsed::Declaration(Declaration::Entitlement(entitlement)) => {
                    members.entitlements.push(entitlement)
                }
                Parsed::Declaration(_) => {
                    return Err(ParseError::new(
                        "invalid declaration in composite",
                        self.prev_span(),
                    ))
                }
            }
        }
        self.exit_nesting();
        Ok(members)
    }

    fn parse_transaction(&mut self) -> PResult<TransactionDecl> {
        let start = self.expect_keyword("transaction")?.span;
        let parameters = if self.at(&TokenKind::LParen) {
            self.parse_parameters(false)?
        } else {
            Vec::new()
        };

        let mut tx = TransactionDecl {
            parameters,
            fields: Vec::new(),
            prepare: None,
            pre_conditions: Vec::new(),
            execute: None,
            post_conditions: Vec::new(),
            span: start,
        };

        self.expect(&TokenKind::LBrace)?;
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            if self.at_keyword("pre") && self.nth(1).kind == TokenKind::LBrace {
                self.advance();
                tx.pre_conditions = self.parse_conditions()?;
            } else if self.at_keyword("post") && self.nth(1).kind == TokenKind::LBrace {
                self.advance();
                tx.post_conditions = self.parse_conditions()?;
            } else if self.at_keyword("execute") && self.nth(1).kind == TokenKind::LBrace {
                self.advance();
                tx.execute = Some(self.parse_block()?);
            } else {
                match self.parse_declaration(DeclContext::Transaction)? {
                    Parsed::Field(field) => tx.fields.push(field),
                    Parsed::Special(function) if function.ident.name == "prepare" => {
                        tx.prepare = Some(function)
                    }
                    _ => {
                        return Err(ParseError::new(
                            "invalid declaration in transaction",
                            self.prev_span(),
                        ))
                    }
                }
            }
        }

        tx.span = start.merge(self.prev_span());
        Ok(tx)
    }
}
