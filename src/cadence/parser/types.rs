use super::super::ast::*;
use super::super::token::TokenKind;
use super::super::ParseError;
use super::{PResult, Parser};

impl Parser {
    pub(super) fn parse_type_annotation(&mut self) -> PResult<TypeAnnotation> {
        let is_resource = self.eat(&TokenKind::At);
        let ty = self.parse_type()?;
        Ok(TypeAnnotation { is_resource, ty })
    }

    pub(super) fn parse_type(&mut self) -> PResult<Type> {
        self.enter_nesting()?;
        let mut ty = self.parse_type_primary()?;
        while self.at(&TokenKind::Question) && !self.peek().newline_before {
            let question = self.advance();
            let span = ty.span.merge(question.span);
            ty = Type {
                kind: TypeKind::Optional(Box::new(ty)),
                span,
            };
        }
        self.exit_nesting();
        Ok(ty)
    }

    fn parse_type_primary(&mut self) -> PResult<Type> {
        let start = self.current_span();
        match self.peek().kind.clone() {
            TokenKind::Amp => {
                self.advance();
                self.parse_reference(start, None)
            }
            TokenKind::LBracket => {
                self.advance();
                let element = self.parse_type()?;
                let kind = if self.eat(&TokenKind::Semicolon) {
                    let token = self.advance();
                    let size = match &token.kind {
                        TokenKind::Integer(text) => text.replace('_', "").parse::<u64>().ok(),
                        _ => None,
                    }
                    .ok_or_else(|| ParseError::new("expected constant array size", token.span))?;
                    TypeKind::ConstantArray(Box::new(element), size)
                } else {
                    TypeKind::VariableArray(Box::new(element))
                };
                let close = self.expect(&TokenKind::RBracket)?;
                Ok(Type {
                    kind,
                    span: start.merge(close.span),
                })
            }
            TokenKind::LBrace => {
                self.advance();
                let first = self.parse_type()?;
                if self.eat(&TokenKind::Colon) {
                    let value = self.parse_type()?;
                    let close = self.expect(&TokenKind::RBrace)?;
                    return Ok(Type {
                        kind: TypeKind::Dictionary(Box::new(first), Box::new(value)),
                        span: start.merge(close.span),
                    });
                }
                let mut types = vec![into_nominal(first)?];
                while self.eat(&TokenKind::Comma) {
                    types.push(self.parse_nominal_type()?);
                }
                let close = self.expect(&TokenKind::RBrace)?;
                Ok(Type {
                    kind: TypeKind::Intersection(types),
                    span: start.merge(close.span),
                })
            }
            TokenKind::LParen => {
                // parenthesized type, or a legacy function type `((Int): Int)`
                self.advance();
                if self.at(&TokenKind::LParen) {
                    let ty = self.parse_function_type_tail(start)?;
                    self.expect(&TokenKind::RParen)?;
                    return Ok(ty);
                }
                let inner = self.parse_type()?;
                let close = self.expect(&TokenKind::RParen)?;
                Ok(Type {
                    kind: inner.kind,
                    span: start.merge(close.span),
                })
            }
            TokenKind::Identifier(name) if name == "auth" && self.nth(1).kind == TokenKind::LParen => {
                self.advance();
                self.advance();
                let mut entitlements = Vec::new();
                if self.eat_keyword("mapping") {
                    entitlements.push(self.parse_nominal_type()?.qualified_name());
                } else {
                    entitlements.push(self.parse_nominal_type()?.qualified_name());
                    while self.eat(&TokenKind::Comma) || self.eat(&TokenKind::Pipe) {
                        entitlements.push(self.parse_nominal_type()?.qualified_name());
                    }
                }
                self.expect(&TokenKind::RParen)?;
                self.expect(&TokenKind::Amp)?;
                self.parse_reference(start, Some(entitlements))
            }
            TokenKind::Identifier(name)
                if name == "fun" || (name == "view" && self.nth(1).is_ident("fun")) =>
            {
                if name == "view" {
                    self.advance();
                }
                self.advance();
                self.parse_function_type_tail(start)
            }
            TokenKind::Identifier(_) => {
                let nominal = self.parse_nominal_type()?;
                let span = nominal.span();
                let ty = Type {
                    kind: TypeKind::Nominal(nominal),
                    span,
                };
                if self.at(&TokenKind::Lt) && !self.peek().newline_before {
                    self.advance();
                    let mut arguments = Vec::new();
                    if !self.at(&TokenKind::Gt) {
                        arguments.push(self.parse_type_annotation()?);
                        while self.eat(&TokenKind::Comma) {
                            arguments.push(self.parse_type_annotation()?);
                        }
                    }
                    let close = self.expect(&TokenKind::Gt)?;
                    return Ok(Type {
                        kind: TypeKind::Instantiation {
                            ty: Box::new(ty),
                            arguments,
                        },
                        span: start.merge(close.span),
                    });
                }
                Ok(ty)
            }
            _ => Err(self.unexpected("type")),
        }
    }

    fn parse_reference(
        &mut self,
        start: super::super::position::Span,
        authorization: Option<Vec<String>>,
    ) -> PResult<Type> {
        let ty = self.parse_type_primary()?;
        let span = start.merge(ty.span);
        Ok(Type {
            kind: TypeKind::Reference {
                authorization,
                ty: Box::new(ty),
            },
            span,
        })
    }

    /// `(T, U): R` after `fun`
    fn parse_function_type_tail(&mut self, start: super::super::position::Span) -> PResult<Type> {
        self.expect(&TokenKind::LParen)?;
        let mut parameters = Vec::new();
        while !self.at(&TokenKind::RParen) {
            parameters.push(self.parse_type_annotation()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        let return_type = if self.eat(&TokenKind::Colon) {
            Some(Box::new(self.parse_type_annotation()?))
        } else {
            None
        };
        Ok(Type {
            kind: TypeKind::Function {
                parameters,
                return_type,
            },
            span: start.merge(self.prev_span()),
        })
    }

    pub(super) fn parse_nominal_type(&mut self) -> PResult<NominalType> {
        let identifier = self.expect_ident()?;
        let mut nested = Vec::new();
        while self.at(&TokenKind::Dot) && matches!(self.nth(1).kind, TokenKind::Identifier(_)) {
            self.advance();
            nested.push(self.expect_ident()?);
        }
        Ok(NominalType { identifier, nested })
    }
}

fn into_nominal(ty: Type) -> PResult<NominalType> {
    match ty.kind {
        TypeKind::Nominal(nominal) => Ok(nominal),
        _ => Err(ParseError::new(
            "expected nominal type in intersection",
            ty.span,
        )),
    }
}
