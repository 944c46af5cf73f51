use super::super::ast::*;
use super::super::position::Span;
use super::super::token::{Token, TokenKind};
use super::super::ParseError;
use super::{PResult, Parser};

// Left binding powers, lowest first
const BP_TERNARY: u8 = 10;
const BP_LOGICAL_OR: u8 = 20;
const BP_LOGICAL_AND: u8 = 30;
const BP_COMPARISON: u8 = 40;
const BP_NIL_COALESCING: u8 = 50;
const BP_BITWISE_OR: u8 = 60;
const BP_BITWISE_XOR: u8 = 70;
const BP_BITWISE_AND: u8 = 80;
const BP_SHIFT: u8 = 90;
const BP_ADDITIVE: u8 = 100;
const BP_MULTIPLICATIVE: u8 = 110;
const BP_CASTING: u8 = 120;
const BP_UNARY_PREFIX: u8 = 130;
const BP_POSTFIX: u8 = 140;

impl Parser {
    pub(super) fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> PResult<Expr> {
        self.enter_nesting()?;
        let mut lhs = self.parse_prefix()?;

        loop {
            let token = self.peek().clone();

            // Postfix operators must stay on the operand's line
            if BP_POSTFIX > min_bp {
                if let Some(expr) = self.parse_postfix(&lhs, &token)? {
                    lhs = expr;
                    continue;
                }
            }

            if token.is_ident("as") {
                if BP_CASTING <= min_bp {
                    break;
                }
                lhs = self.parse_cast(lhs)?;
                continue;
            }

            if token.kind == TokenKind::Question {
                if BP_TERNARY <= min_bp {
                    break;
                }
                self.advance();
                let then = self.parse_expr_bp(BP_TERNARY - 1)?;
                self.expect(&TokenKind::Colon)?;
                let otherwise = self.parse_expr_bp(BP_TERNARY - 1)?;
                let span = lhs.span.merge(otherwise.span);
                lhs = Expr::new(
                    ExprKind::Conditional {
                        test: Box::new(lhs),
                        then: Box::new(then),
                        otherwise: Box::new(otherwise),
                    },
                    span,
                );
                continue;
            }

            let Some((op, width, bp, right_assoc)) = self.binary_operator() else {
                break;
            };
            if bp <= min_bp {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let right = self.parse_expr_bp(if right_assoc { bp - 1 } else { bp })?;
            let span = lhs.span.merge(right.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(right),
                },
                span,
            );
        }

        self.exit_nesting();
        Ok(lhs)
    }

    /// The binary operator at the cursor: (op, tokens, binding power, right associative)
    fn binary_operator(&self) -> Option<(BinaryOp, usize, u8, bool)> {
        let token = self.peek();
        let adjacent = |kind: TokenKind| {
            let next = self.nth(1);
            next.kind == kind && next.span.start == token.span.end
        };
        Some(match token.kind {
            TokenKind::PipePipe => (BinaryOp::Or, 1, BP_LOGICAL_OR, false),
            TokenKind::AmpAmp => (BinaryOp::And, 1, BP_LOGICAL_AND, false),
            TokenKind::EqEq => (BinaryOp::Equal, 1, BP_COMPARISON, false),
            TokenKind::BangEq => (BinaryOp::NotEqual, 1, BP_COMPARISON, false),
            TokenKind::Le => (BinaryOp::LessEqual, 1, BP_COMPARISON, false),
            TokenKind::Ge => (BinaryOp::GreaterEqual, 1, BP_COMPARISON, false),
            TokenKind::Lt if adjacent(TokenKind::Lt) => (BinaryOp::ShiftLeft, 2, BP_SHIFT, false),
            TokenKind::Gt if adjacent(TokenKind::Gt) => (BinaryOp::ShiftRight, 2, BP_SHIFT, false),
            TokenKind::Lt => (BinaryOp::Less, 1, BP_COMPARISON, false),
            TokenKind::Gt => (BinaryOp::Greater, 1, BP_COMPARISON, false),
            TokenKind::DoubleQuestion => (BinaryOp::NilCoalesce, 1, BP_NIL_COALESCING, true),
            TokenKind::Pipe => (BinaryOp::BitOr, 1, BP_BITWISE_OR, false),
            TokenKind::Caret => (BinaryOp::BitXor, 1, BP_BITWISE_XOR, false),
            TokenKind::Amp => (BinaryOp::BitAnd, 1, BP_BITWISE_AND, false),
            TokenKind::Plus => (BinaryOp::Add, 1, BP_ADDITIVE, false),
            TokenKind::Minus => (BinaryOp::Subtract, 1, BP_ADDITIVE, false),
            TokenKind::Star => (BinaryOp::Multiply, 1, BP_MULTIPLICATIVE, false),
            TokenKind::Slash => (BinaryOp::Divide, 1, BP_MULTIPLICATIVE, false),
            TokenKind::Percent => (BinaryOp::Modulo, 1, BP_MULTIPLICATIVE, false),
            _ => return None,
        })
    }

    fn parse_postfix(&mut self, lhs: &Expr, token: &Token) -> PResult<Option<Expr>> {
        let same_line = !token.newline_before;
        let expr = match token.kind {
            TokenKind::Bang if same_line => {
                self.advance();
                Expr::new(
                    ExprKind::Force(Box::new(lhs.clone())),
                    lhs.span.merge(token.span),
                )
            }
            TokenKind::LParen if same_line => {
                let arguments = self.parse_arguments()?;
                self.invocation(lhs.clone(), Vec::new(), arguments)
            }
            TokenKind::LBracket if same_line => {
                self.advance();
                let index = self.parse_expr()?;
                let close = self.expect(&TokenKind::RBracket)?;
                Expr::new(
                    ExprKind::Index {
                        expr: Box::new(lhs.clone()),
                        index: Box::new(index),
                    },
                    lhs.span.merge(close.span),
                )
            }
            TokenKind::Dot | TokenKind::QuestionDot => {
                self.advance();
                let member = self.expect_ident()?;
                Expr::new(
                    ExprKind::Member {
                        expr: Box::new(lhs.clone()),
                        optional: token.kind == TokenKind::QuestionDot,
                        member: member.clone(),
                    },
                    lhs.span.merge(member.span),
                )
            }
            TokenKind::Lt if same_line => {
                // `f<T>(...)`: fall back to less-than if this is not a type argument list
                let Some(type_arguments) = self.attempt(|p| p.parse_type_arguments_for_call()) else {
                    return Ok(None);
                };
                let arguments = self.parse_arguments()?;
                self.invocation(lhs.clone(), type_arguments, arguments)
            }
            _ => return Ok(None),
        };
        Ok(Some(expr))
    }

    fn invocation(&self, callee: Expr, type_arguments: Vec<TypeAnnotation>, arguments: Vec<Argument>) -> Expr {
        let span = callee.span.merge(self.prev_span());
        Expr::new(
            ExprKind::Invocation {
                callee: Box::new(callee),
                type_arguments,
                arguments,
            },
            span,
        )
    }

    fn parse_type_arguments_for_call(&mut self) -> PResult<Vec<TypeAnnotation>> {
        self.expect(&TokenKind::Lt)?;
        let mut arguments = Vec::new();
        if !self.at(&TokenKind::Gt) {
            arguments.push(self.parse_type_annotation()?);
            while self.eat(&TokenKind::Comma) {
                arguments.push(self.parse_type_annotation()?);
            }
        }
        self.expect(&TokenKind::Gt)?;
        let next = self.peek();
        if next.kind != TokenKind::LParen || next.newline_before {
            return Err(self.unexpected("`(`"));
        }
        Ok(arguments)
    }

    fn parse_arguments(&mut self) -> PResult<Vec<Argument>> {
        self.expect(&TokenKind::LParen)?;
        let mut arguments = Vec::new();
        while !self.at(&TokenKind::RParen) {
            let label = match (&self.peek().kind, &self.nth(1).kind) {
                (TokenKind::Identifier(_), TokenKind::Colon) => {
                    let label = self.expect_ident()?;
                    self.advance();
                    Some(label)
                }
                _ => None,
            };
            let value = self.parse_expr()?;
            arguments.push(Argument { label, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(arguments)
    }

    fn parse_cast(&mut self, lhs: Expr) -> PResult<Expr> {
        let as_token = self.advance();
        let next = self.peek().clone();
        let adjacent = next.span.start == as_token.span.end;
        let kind = match next.kind {
            TokenKind::Bang if adjacent => {
                self.advance();
                CastKind::Force
            }
            TokenKind::Question if adjacent => {
                self.advance();
                CastKind::Failable
            }
            _ => CastKind::Static,
        };
        let ty = self.parse_type_annotation()?;
        let span = lhs.span.merge(ty.ty.span);
        Ok(Expr::new(
            ExprKind::Cast {
                expr: Box::new(lhs),
                kind,
                ty,
            },
            span,
        ))
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        let span = token.span;

        match &token.kind {
            TokenKind::Integer(text) => {
                self.advance();
                Ok(Expr::new(ExprKind::Integer(text.clone()), span))
            }
            TokenKind::FixedPoint(text) => {
                self.advance();
                Ok(Expr::new(ExprKind::FixedPoint(text.clone()), span))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::String(value.clone()), span))
            }
            TokenKind::LParen => {
                self.advance();
                let mut inner = self.parse_expr()?;
                let close = self.expect(&TokenKind::RParen)?;
                inner.span = span.merge(close.span);
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_dictionary(),
            TokenKind::Minus => self.parse_unary(UnaryOp::Negate),
            TokenKind::Bang => self.parse_unary(UnaryOp::Not),
            TokenKind::Move => self.parse_unary(UnaryOp::Move),
            TokenKind::Amp => {
                self.advance();
                let operand = self.parse_expr_bp(BP_UNARY_PREFIX)?;
                let span = span.merge(operand.span);
                Ok(Expr::new(ExprKind::Reference(Box::new(operand)), span))
            }
            TokenKind::Slash => self.parse_path(),
            TokenKind::Identifier(name) => self.parse_identifier_expr(name.clone(), span),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp) -> PResult<Expr> {
        let start = self.advance().span;
        let operand = self.parse_expr_bp(BP_UNARY_PREFIX)?;
        let span = start.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_identifier_expr(&mut self, name: String, span: Span) -> PResult<Expr> {
        match name.as_str() {
            "true" | "false" => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(name == "true"), span))
            }
            "nil" => {
                self.advance();
                Ok(Expr::new(ExprKind::Nil, span))
            }
            "create" | "destroy" if !self.nth(1).newline_before => {
                self.advance();
                let operand = self.parse_expr_bp(BP_UNARY_PREFIX)?;
                let full = span.merge(operand.span);
                let kind = if name == "create" {
                    ExprKind::Create(Box::new(operand))
                } else {
                    ExprKind::Destroy(Box::new(operand))
                };
                Ok(Expr::new(kind, full))
            }
            "attach" if matches!(self.nth(1).kind, TokenKind::Identifier(_)) => {
                self.advance();
                let attachment = self.parse_expr_bp(BP_UNARY_PREFIX)?;
                self.expect_keyword("to")?;
                let base = self.parse_expr_bp(BP_UNARY_PREFIX)?;
                let full = span.merge(base.span);
                Ok(Expr::new(
                    ExprKind::Attach {
                        attachment: Box::new(attachment),
                        base: Box::new(base),
                    },
                    full,
                ))
            }
            "fun" if self.nth(1).kind == TokenKind::LParen => self.parse_function_expr(span, false),
            "view" if self.nth(1).is_ident("fun") && self.nth(2).kind == TokenKind::LParen => {
                self.advance();
                self.parse_function_expr(span, true)
            }
            _ => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(Ident::new(name, span)), span))
            }
        }
    }

    fn parse_function_expr(&mut self, start: Span, is_view: bool) -> PResult<Expr> {
        self.expect_keyword("fun")?;
        let parameters = self.parse_parameters(false)?;
        let return_type = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let body = self.parse_function_block()?;
        let span = start.merge(self.prev_span());
        Ok(Expr::new(
            ExprKind::Function(Box::new(FunctionDecl {
                access: Access::NotSpecified,
                is_view,
                is_static: false,
                ident: Ident::new("", start),
                parameters,
                return_type,
                body: Some(body),
                span,
            })),
            span,
        ))
    }

    fn parse_array(&mut self) -> PResult<Expr> {
        let open = self.expect(&TokenKind::LBracket)?;
        let mut values = Vec::new();
        while !self.at(&TokenKind::RBracket) {
            values.push(self.parse_expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(&TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::Array(values), open.span.merge(close.span)))
    }

    fn parse_dictionary(&mut self) -> PResult<Expr> {
        let open = self.expect(&TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let key = self.parse_expr()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(&TokenKind::RBrace)?;
        Ok(Expr::new(
            ExprKind::Dictionary(entries),
            open.span.merge(close.span),
        ))
    }

    /// `/domain/identifier`
    fn parse_path(&mut self) -> PResult<Expr> {
        let start = self.expect(&TokenKind::Slash)?.span;
        let domain = self.expect_ident()?;
        self.expect(&TokenKind::Slash)?;
        let identifier = self.expect_ident()?;
        if !matches!(domain.name.as_str(), "storage" | "public" | "private") {
            return Err(ParseError::new(
                format!("invalid path domain `{}`", domain.name),
                domain.span,
            ));
        }
        Ok(Expr::new(
            ExprKind::Path {
                domain: domain.name,
                identifier: identifier.name,
            },
            start.merge(identifier.span),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::Parser;
    use super::*;

    fn expr(source: &str) -> Expr {
        let program_source = format!("access(all) fun main() {{ return {} }}", source);
        let (program, errors) = Parser::new(&program_source).parse_program();
        assert!(errors.is_empty(), "{:?}", errors);
        let Some(Declaration::Function(function)) = program.declarations.into_iter().next() else {
            panic!("expected function");
        };
        let body = function.body.unwrap();
        match body.block.statements.into_iter().next() {
            Some(Stmt::Return { value: Some(value), .. }) => value,
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let e = expr("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = e.kind else {
            panic!("expected binary")
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Multiply, .. }));
    }

    #[test]
    fn test_force_binds_tighter_than_cast() {
        let e = expr("x! as Int");
        let ExprKind::Cast { expr, kind, .. } = e.kind else {
            panic!("expected cast")
        };
        assert_eq!(kind, CastKind::Static);
        assert!(matches!(expr.kind, ExprKind::Force(_)));
    }

    #[test]
    fn test_failable_cast() {
        let e = expr("x as? Int");
        assert!(matches!(e.kind, ExprKind::Cast { kind: CastKind::Failable, .. }));
    }

    #[test]
    fn test_generic_invocation_and_comparison() {
        let e = expr("Type<Int>()");
        assert!(matches!(e.kind, ExprKind::Invocation { ref type_arguments, .. } if type_arguments.len() == 1));

        let e = expr("a < b");
        assert!(matches!(e.kind, ExprKind::Binary { op: BinaryOp::Less, .. }));

        let e = expr("a << 2");
        assert!(matches!(e.kind, ExprKind::Binary { op: BinaryOp::ShiftLeft, .. }));
    }

    #[test]
    fn test_nil_coalescing_is_right_associative() {
        let e = expr("a ?? b ?? c");
        let ExprKind::Binary { right, .. } = e.kind else {
            panic!("expected binary")
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::NilCoalesce, .. }));
    }

    #[test]
    fn test_force_span_covers_operator() {
        let e = expr("1!");
        assert!(matches!(e.kind, ExprKind::Force(_)));
        assert_eq!(e.span.end - e.span.start, 2);
    }

    #[test]
    fn test_paths_and_create() {
        assert!(matches!(expr("/storage/vault").kind, ExprKind::Path { .. }));
        assert!(matches!(expr("<-create R()").kind, ExprKind::Unary { op: UnaryOp::Move, .. }));
    }
}
