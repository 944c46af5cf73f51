use super::super::ast::*;
use super::super::token::TokenKind;
use super::decl::{DeclContext, Parsed};
use super::{PResult, Parser};

impl Parser {
    pub(super) fn parse_block(&mut self) -> PResult<Block> {
        let open = self.expect(&TokenKind::LBrace)?;
        let statements = self.parse_statements()?;
        let close = self.expect(&TokenKind::RBrace)?;
        Ok(Block {
            statements,
            span: open.span.merge(close.span),
        })
    }

    /// Statements up to (not including) `}` or a switch `case`/`default`
    pub(super) fn parse_statements(&mut self) -> PResult<Vec<Stmt>> {
        self.enter_nesting()?;
        let mut statements = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.at(&TokenKind::RBrace) || self.at(&TokenKind::Eof) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        self.exit_nesting();
        Ok(statements)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        let token = self.peek().clone();
        let next = self.nth(1).kind.clone();

        match token.ident() {
            Some("return") => {
                self.advance();
                let next = self.peek();
                let has_value = !next.newline_before
                    && !matches!(
                        next.kind,
                        TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Eof
                    );
                let value = if has_value {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                let span = value
                    .as_ref()
                    .map(|v| token.span.merge(v.span))
                    .unwrap_or(token.span);
                return Ok(Stmt::Return { value, span });
            }
            Some("break") => {
                self.advance();
                return Ok(Stmt::Break(token.span));
            }
            Some("continue") => {
                self.advance();
                return Ok(Stmt::Continue(token.span));
            }
            Some("if") => {
                self.advance();
                return Ok(Stmt::If(self.parse_if()?));
            }
            Some("while") => {
                self.advance();
                let test = self.parse_expr()?;
                let block = self.parse_block()?;
                return Ok(Stmt::While { test, block });
            }
            Some("for") => {
                self.advance();
                return self.parse_for();
            }
            Some("switch") => {
                self.advance();
                return self.parse_switch();
            }
            Some("emit") => {
                self.advance();
                return Ok(Stmt::Emit(self.parse_expr()?));
            }
            Some("remove") if matches!(next, TokenKind::Identifier(_)) => {
                self.advance();
                let attachment = self.parse_nominal_type()?;
                self.expect_keyword("from")?;
                let value = self.parse_expr()?;
                return Ok(Stmt::Remove { attachment, value });
            }
            _ => {}
        }

        if self.at_local_declaration() {
            return match self.parse_declaration(DeclContext::Function)? {
                Parsed::Declaration(decl) => Ok(Stmt::Declaration(Box::new(decl))),
                _ => Err(self.unexpected("statement")),
            };
        }

        let target = self.parse_expr()?;
        match self.peek().kind {
            TokenKind::Eq | TokenKind::Move | TokenKind::ForceMove => {
                let transfer = self.parse_transfer()?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assignment {
                    target,
                    transfer,
                    value,
                })
            }
            TokenKind::Swap => {
                self.advance();
                let right = self.parse_expr()?;
                Ok(Stmt::Swap {
                    left: target,
                    right,
                })
            }
            _ => Ok(Stmt::Expression(target)),
        }
    }

    fn parse_if(&mut self) -> PResult<IfStmt> {
        let test = if self.at_keyword("let") || self.at_keyword("var") {
            let start = self.current_span();
            IfTest::Binding(Box::new(self.parse_variable(Access::NotSpecified, start)?))
        } else {
            IfTest::Expr(self.parse_expr()?)
        };
        let then = self.parse_block()?;
        let otherwise = if self.eat_keyword("else") {
            if self.eat_keyword("if") {
                Some(Box::new(ElseBranch::If(self.parse_if()?)))
            } else {
                Some(Box::new(ElseBranch::Block(self.parse_block()?)))
            }
        } else {
            None
        };
        Ok(IfStmt {
            test,
            then,
            otherwise,
        })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let first = self.expect_ident()?;
        let (index, ident) = if self.eat(&TokenKind::Comma) {
            (Some(first), self.expect_ident()?)
        } else {
            (None, first)
        };
        self.expect_keyword("in")?;
        let iterable = self.parse_expr()?;
        let block = self.parse_block()?;
        Ok(Stmt::For {
            index,
            ident,
            iterable,
            block,
        })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        let subject = self.parse_expr()?;
        self.expect(&TokenKind::LBrace)?;
        let mut cases = Vec::new();
        loop {
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            let values = if self.eat_keyword("case") {
                let mut values = vec![self.parse_expr()?];
                while self.eat(&TokenKind::Comma) {
                    values.push(self.parse_expr()?);
                }
                Some(values)
            } else {
                self.expect_keyword("default")?;
                None
            };
            self.expect(&TokenKind::Colon)?;

            let mut statements = Vec::new();
            loop {
                while self.eat(&TokenKind::Semicolon) {}
                if self.at(&TokenKind::RBrace)
                    || self.at(&TokenKind::Eof)
                    || self.at_keyword("case")
                    || self.at_keyword("default")
                {
                    break;
                }
                statements.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { values, statements });
        }
        Ok(Stmt::Switch { subject, cases })
    }
}
