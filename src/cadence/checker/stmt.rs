//! Statement checking

use crate::cadence::ast::{
    Block, Declaration, ElseBranch, Expr, ExprKind, IfStmt, IfTest, Stmt, VariableDecl,
};

use super::scope::Variable;
use super::types::{MemberKind, Ty};
use super::{Checker, CheckerError};

impl<'a> Checker<'a> {
    pub(super) fn check_block(&mut self, block: &Block) {
        self.values.push();
        self.check_statements(&block.statements);
        self.values.pop();
    }

    fn check_statements(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Declaration(declaration) => match declaration.as_ref() {
                Declaration::Variable(variable) => {
                    self.check_variable(variable);
                }
                Declaration::Function(function) => {
                    // declared before the body is checked, for recursion
                    let ty = self.quietly(|checker| {
                        let ret = function
                            .return_type
                            .as_ref()
                            .map(|annotation| checker.convert_annotation(annotation))
                            .unwrap_or(Ty::Void);
                        Ty::function(ret)
                    });
                    self.declare_value(
                        &function.ident.name,
                        function.ident.span,
                        Variable {
                            ty,
                            is_constant: true,
                            kind: "function",
                        },
                    );
                    self.check_function(function, None, false);
                }
                other => self.check_declaration(other),
            },
            Stmt::Expression(expr) => {
                self.check_expr(expr, None);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    let expected = self.functions.last().map(|f| f.return_ty.clone());
                    self.check_expr(value, expected.as_ref());
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::If(statement) => self.check_if(statement),
            Stmt::While { test, block } => {
                self.check_expr(test, Some(&Ty::builtin("Bool")));
                self.check_block(block);
            }
            Stmt::For {
                index,
                ident,
                iterable,
                block,
            } => {
                let iterable_ty = self.check_expr(iterable, None);
                let element = match iterable_ty.dereference() {
                    Ty::Array(element) | Ty::ConstantArray(element, _) => {
                        if iterable_ty.is_known() && !matches!(iterable_ty, Ty::Reference(_)) {
                            (**element).clone()
                        } else {
                            Ty::Unknown
                        }
                    }
                    Ty::Builtin(name) if name == "String" => Ty::builtin("Character"),
                    _ => Ty::Unknown,
                };

                self.values.push();
                if let Some(index) = index {
                    self.declare_value(
                        &index.name,
                        index.span,
                        Variable {
                            ty: Ty::builtin("Int"),
                            is_constant: true,
                            kind: "constant",
                        },
                    );
                }
                self.declare_value(
                    &ident.name,
                    ident.span,
                    Variable {
                        ty: element,
                        is_constant: true,
                        kind: "constant",
                    },
                );
                self.check_block(block);
                self.values.pop();
            }
            Stmt::Assignment { target, value, .. } => self.check_assignment(target, value),
            Stmt::Swap { left, right } => {
                self.check_expr(left, None);
                self.check_expr(right, None);
            }
            Stmt::Emit(event) => {
                self.check_expr(event, None);
            }
            Stmt::Switch { subject, cases } => {
                let subject_ty = self.check_expr(subject, None);
                for case in cases {
                    if let Some(values) = &case.values {
                        for value in values {
                            self.check_expr(value, Some(&subject_ty));
                        }
                    }
                    self.values.push();
                    self.check_statements(&case.statements);
                    self.values.pop();
                }
            }
            Stmt::Remove { attachment, value } => {
                self.resolve_nominal(attachment);
                self.check_expr(value, None);
            }
        }
    }

    /// Check a variable declaration and declare it, returning its type
    pub(super) fn check_variable(&mut self, variable: &VariableDecl) -> Ty {
        let annotated = variable
            .type_annotation
            .as_ref()
            .map(|annotation| self.convert_annotation(annotation));
        let value_ty = self.check_expr(&variable.value, annotated.as_ref());
        let ty = annotated.unwrap_or(value_ty);

        self.declare_value(
            &variable.ident.name,
            variable.ident.span,
            Variable {
                ty: ty.clone(),
                is_constant: variable.is_constant,
                kind: if variable.is_constant {
                    "constant"
                } else {
                    "variable"
                },
            },
        );
        ty
    }

    fn check_if(&mut self, statement: &IfStmt) {
        match &statement.test {
            IfTest::Expr(test) => {
                self.check_expr(test, Some(&Ty::builtin("Bool")));
                self.check_block(&statement.then);
            }
            IfTest::Binding(binding) => {
                let annotated = binding
                    .type_annotation
                    .as_ref()
                    .map(|annotation| self.convert_annotation(annotation));
                let expected = annotated.clone().map(Ty::optional);
                let value_ty = self.check_expr(&binding.value, expected.as_ref());
                let ty = annotated.unwrap_or_else(|| value_ty.unwrap_optional().clone());

                self.values.push();
                self.declare_value(
                    &binding.ident.name,
                    binding.ident.span,
                    Variable {
                        ty,
                        is_constant: binding.is_constant,
                        kind: if binding.is_constant {
                            "constant"
                        } else {
                            "variable"
                        },
                    },
                );
                self.check_block(&statement.then);
                self.values.pop();
            }
        }

        match statement.otherwise.as_deref() {
            Some(ElseBranch::Block(block)) => self.check_block(block),
            Some(ElseBranch::If(nested)) => self.check_if(nested),
            None => {}
        }
    }

    fn check_assignment(&mut self, target: &Expr, value: &Expr) {
        let target_ty = match &target.kind {
            ExprKind::Identifier(ident) => match self.values.lookup(&ident.name).cloned() {
                Some(variable) => {
                    if variable.is_constant {
                        self.report(CheckerError::assignment_to_constant(
                            &ident.name,
                            target.span,
                        ));
                    }
                    variable.ty
                }
                None => {
                    self.report(CheckerError::not_declared_variable(&ident.name, ident.span));
                    Ty::Unknown
                }
            },
            ExprKind::Member { expr, member, .. } => {
                let ty = self.check_expr(target, None);
                let in_initializer = self
                    .functions
                    .last()
                    .map(|f| f.is_initializer)
                    .unwrap_or(false);
                if !in_initializer && self.is_constant_self_field(expr, &member.name) {
                    self.report(CheckerError::assignment_to_constant_member(
                        &member.name,
                        member.span,
                    ));
                }
                ty
            }
            _ => self.check_expr(target, None),
        };
        self.check_expr(value, Some(&target_ty));
    }

    /// Whether `base.name` is a `let` field of the enclosing composite
    fn is_constant_self_field(&self, base: &Expr, name: &str) -> bool {
        let ExprKind::Identifier(ident) = &base.kind else {
            return false;
        };
        if ident.name != "self" {
            return false;
        }
        let Some(Ty::Composite(reference)) = self.values.lookup("self").map(|v| v.ty.dereference().clone()) else {
            return false;
        };
        self.composite_info(&reference)
            .and_then(|info| info.members.get(name).map(|m| m.kind))
            .map(|kind| kind == MemberKind::Field { is_constant: true })
            .unwrap_or(false)
    }
}
