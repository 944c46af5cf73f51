//! Expression checking and type inference

use crate::cadence::ast::{BinaryOp, CastKind, CompositeKind, Expr, ExprKind, Ident, UnaryOp};

use super::elaboration::StaticCast;
use super::types::Ty;
use super::{Checker, CheckerError};

fn bool_ty() -> Ty {
    Ty::builtin("Bool")
}

impl<'a> Checker<'a> {
    /// Check `expr` and infer its type. `expected` only guides literal
    /// inference; mismatches are not reported.
    pub(super) fn check_expr(&mut self, expr: &Expr, expected: Option<&Ty>) -> Ty {
        let hint = expected.map(Ty::unwrap_optional);

        match &expr.kind {
            ExprKind::Bool(_) => bool_ty(),
            ExprKind::Nil => Ty::optional(Ty::Never),
            ExprKind::Integer(_) => match hint {
                Some(ty)
                    if ty.is_integer()
                        || ty.is_fixed_point()
                        || *ty == Ty::builtin("Address") =>
                {
                    ty.clone()
                }
                _ => Ty::builtin("Int"),
            },
            ExprKind::FixedPoint(_) => match hint {
                Some(ty) if ty.is_fixed_point() => ty.clone(),
                _ => Ty::builtin("UFix64"),
            },
            ExprKind::String(_) => match hint {
                Some(ty) if *ty == Ty::builtin("Character") => ty.clone(),
                _ => Ty::builtin("String"),
            },
            ExprKind::Path { domain, .. } => Ty::builtin(match domain.as_str() {
                "storage" => "StoragePath",
                "public" => "PublicPath",
                _ => "PrivatePath",
            }),
            ExprKind::Array(values) => self.check_array(values, hint),
            ExprKind::Dictionary(entries) => self.check_dictionary(entries, hint),
            ExprKind::Identifier(ident) => self.check_identifier(ident),
            ExprKind::Member {
                expr: base,
                optional,
                member,
            } => {
                let base_ty = self.check_expr(base, None);
                match (base_ty, *optional) {
                    (Ty::Optional(inner), true) => {
                        let ty = self.member_type(&inner, member);
                        if ty.is_optional() {
                            ty
                        } else {
                            Ty::optional(ty)
                        }
                    }
                    (base_ty, _) => self.member_type(&base_ty, member),
                }
            }
            ExprKind::Index { expr: base, index } => {
                let base_ty = self.check_expr(base, None);
                let index_hint = match &base_ty {
                    Ty::Dictionary(key, _) => Some((**key).clone()),
                    Ty::Array(_) | Ty::ConstantArray(..) => Some(Ty::builtin("Int")),
                    _ => None,
                };
                self.check_expr(index, index_hint.as_ref());
                match base_ty {
                    Ty::Array(element) | Ty::ConstantArray(element, _) => *element,
                    Ty::Dictionary(_, value) => Ty::optional(*value),
                    _ => Ty::Unknown,
                }
            }
            ExprKind::Invocation {
                callee,
                type_arguments,
                arguments,
            } => {
                let callee_ty = self.check_expr(callee, None);
                for argument in type_arguments {
                    self.convert_annotation(argument);
                }
                for argument in arguments {
                    self.check_expr(&argument.value, None);
                }
                match callee_ty {
                    Ty::Function(ret) => *ret,
                    Ty::Meta(ty) => self.construct(*ty),
                    _ => Ty::Unknown,
                }
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    self.check_expr(operand, Some(&bool_ty()));
                    bool_ty()
                }
                UnaryOp::Negate => {
                    let ty = self.check_expr(operand, expected);
                    if matches!(operand.kind, ExprKind::FixedPoint(_)) && hint.is_none() {
                        Ty::builtin("Fix64")
                    } else {
                        ty
                    }
                }
                UnaryOp::Move => self.check_expr(operand, expected),
            },
            ExprKind::Binary { op, left, right } => self.check_binary(*op, left, right, expected),
            ExprKind::Conditional {
                test,
                then,
                otherwise,
            } => {
                self.check_expr(test, Some(&bool_ty()));
                let then_ty = self.check_expr(then, expected);
                let otherwise_ty = self.check_expr(otherwise, expected);
                if then_ty == otherwise_ty || otherwise_ty == Ty::Never {
                    then_ty
                } else if then_ty == Ty::Never {
                    otherwise_ty
                } else {
                    expected.cloned().unwrap_or(Ty::Unknown)
                }
            }
            ExprKind::Cast {
                expr: operand,
                kind,
                ty,
            } => {
                let target = self.convert_annotation(ty);
                match kind {
                    CastKind::Static => {
                        // literals take their type from the cast
                        let literal = operand.is_literal();
                        let operand_ty = self.check_expr(operand, literal.then_some(&target));
                        self.elaboration.static_casts.insert(
                            expr.span,
                            StaticCast {
                                operand: operand_ty,
                                target: target.clone(),
                                operand_is_literal: literal,
                            },
                        );
                        target
                    }
                    CastKind::Failable => {
                        self.check_expr(operand, None);
                        Ty::optional(target)
                    }
                    CastKind::Force => {
                        self.check_expr(operand, None);
                        target
                    }
                }
            }
            ExprKind::Force(operand) => {
                let operand_ty = self.check_expr(operand, None);
                self.elaboration
                    .force_operands
                    .insert(expr.span, operand_ty.clone());
                match operand_ty {
                    Ty::Optional(inner) => *inner,
                    other => other,
                }
            }
            ExprKind::Create(inner) => self.check_expr(inner, expected),
            ExprKind::Destroy(inner) => {
                self.check_expr(inner, None);
                Ty::Void
            }
            ExprKind::Reference(inner) => {
                self.check_expr(inner, None);
                match expected {
                    Some(ty) if matches!(ty.unwrap_optional(), Ty::Reference(_)) => ty.clone(),
                    _ => Ty::Unknown,
                }
            }
            ExprKind::Attach { attachment, base } => {
                self.check_expr(attachment, None);
                self.check_expr(base, None)
            }
            ExprKind::Function(function) => self.check_function(function, None, false),
        }
    }

    fn check_identifier(&mut self, ident: &Ident) -> Ty {
        match self.values.lookup(&ident.name) {
            Some(variable) => variable.ty.clone(),
            None => {
                self.report(CheckerError::not_declared_variable(&ident.name, ident.span));
                Ty::Unknown
            }
        }
    }

    fn check_array(&mut self, values: &[Expr], hint: Option<&Ty>) -> Ty {
        let element_hint = match hint {
            Some(Ty::Array(element)) | Some(Ty::ConstantArray(element, _)) => {
                Some((**element).clone())
            }
            _ => None,
        };
        let types: Vec<Ty> = values
            .iter()
            .map(|value| self.check_expr(value, element_hint.as_ref()))
            .collect();

        if let Some(ty) = hint.filter(|ty| matches!(ty, Ty::Array(_) | Ty::ConstantArray(..))) {
            return ty.clone();
        }
        Ty::Array(Box::new(common_type(&types)))
    }

    fn check_dictionary(&mut self, entries: &[(Expr, Expr)], hint: Option<&Ty>) -> Ty {
        let (key_hint, value_hint) = match hint {
            Some(Ty::Dictionary(key, value)) => (Some((**key).clone()), Some((**value).clone())),
            _ => (None, None),
        };
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            keys.push(self.check_expr(key, key_hint.as_ref()));
            values.push(self.check_expr(value, value_hint.as_ref()));
        }

        if let Some(ty) = hint.filter(|ty| matches!(ty, Ty::Dictionary(..))) {
            return ty.clone();
        }
        Ty::Dictionary(Box::new(common_type(&keys)), Box::new(common_type(&values)))
    }

    fn check_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, expected: Option<&Ty>) -> Ty {
        if op.is_logical() {
            self.check_expr(left, Some(&bool_ty()));
            self.check_expr(right, Some(&bool_ty()));
            return bool_ty();
        }
        if op.is_comparison() {
            let left_ty = self.check_expr(left, None);
            let hint = left_ty.is_known().then_some(&left_ty);
            self.check_expr(right, hint);
            return bool_ty();
        }
        if op == BinaryOp::NilCoalesce {
            let left_hint = expected.map(|ty| Ty::optional(ty.clone()));
            return match self.check_expr(left, left_hint.as_ref()) {
                Ty::Optional(inner) => {
                    let right_ty = self.check_expr(right, Some(&inner));
                    if right_ty.is_optional() {
                        right_ty
                    } else {
                        *inner
                    }
                }
                _ => self.check_expr(right, expected),
            };
        }

        // arithmetic and bitwise operators
        let left_ty = self.check_expr(left, expected);
        let right_hint = if left_ty.is_known() {
            Some(&left_ty)
        } else {
            expected
        };
        let right_ty = self.check_expr(right, right_hint);
        if left_ty.is_known() {
            left_ty
        } else {
            right_ty
        }
    }

    /// The type of invoking a type used as a value
    fn construct(&self, ty: Ty) -> Ty {
        if let Ty::Composite(reference) = &ty {
            if let Some(info) = self.composite_info(reference) {
                if info.kind == CompositeKind::Enum {
                    return Ty::optional(ty);
                }
            }
        }
        ty
    }

    /// Resolve `base.member`
    fn member_type(&mut self, base: &Ty, member: &Ident) -> Ty {
        match base.dereference() {
            Ty::Composite(reference) => {
                let Some(info) = self.composite_info(reference) else {
                    return Ty::Unknown;
                };
                if let Some(declared) = info.members.get(&member.name) {
                    self.check_member_access(&info, declared, member.span);
                    return declared.ty.clone();
                }
                if let Some(ty) = info.implicit_member(&member.name) {
                    return ty;
                }
                if let Some(nested) = info.nested.get(&member.name) {
                    return Ty::meta(nested.clone());
                }
                if info.members_complete {
                    self.report(CheckerError::not_declared_member(
                        &base.to_string(),
                        &member.name,
                        member.span,
                    ));
                }
                Ty::Unknown
            }
            Ty::Meta(inner) => {
                let Ty::Composite(reference) = inner.as_ref() else {
                    return Ty::Unknown;
                };
                let Some(info) = self.composite_info(reference) else {
                    return Ty::Unknown;
                };
                if let Some(nested) = info.nested.get(&member.name) {
                    return Ty::meta(nested.clone());
                }
                if info.enum_cases.contains(&member.name) {
                    return (**inner).clone();
                }
                Ty::Unknown
            }
            _ => Ty::Unknown,
        }
    }
}

/// The element type shared by all `types`, or unknown
fn common_type(types: &[Ty]) -> Ty {
    match types.split_first() {
        Some((first, rest)) if rest.iter().all(|ty| ty == first) => first.clone(),
        _ => Ty::Unknown,
    }
}
