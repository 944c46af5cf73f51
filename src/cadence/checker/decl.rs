//! Declaration passes and checking of composites, functions and transactions

use std::rc::Rc;

use crate::cadence::ast::{
    Access, CompositeDecl, CompositeKind, Condition, Declaration, FunctionBlock, FunctionDecl,
    InterfaceDecl, Members, NominalType, Parameter, TransactionDecl,
};
use crate::cadence::position::Span;

use super::scope::Variable;
use super::types::{CompositeInfo, CompositeRef, Member, MemberKind, Ty};
use super::{Checker, CheckerError, FunctionContext};

fn nested_name(parent: &str, name: &str) -> String {
    format!("{}.{}", parent, name)
}

/// The value a composite name denotes: contracts are singletons,
/// everything else is a constructor
fn composite_value(kind: CompositeKind, ty: Ty) -> Ty {
    match kind {
        CompositeKind::Contract => ty,
        _ => Ty::meta(ty),
    }
}

fn constant(ty: Ty, kind: &'static str) -> Variable {
    Variable {
        ty,
        is_constant: true,
        kind,
    }
}

impl<'a> Checker<'a> {
    // --- pass 2: type names ---

    pub(super) fn declare_type_names(&mut self, declarations: &[Declaration]) {
        for declaration in declarations {
            match declaration {
                Declaration::Composite(composite) => {
                    let ty = self.register_composite(
                        &composite.ident.name,
                        composite.kind,
                        false,
                        &composite.members,
                    );
                    self.declare_type(&composite.ident, composite.kind.keyword(), ty);
                }
                Declaration::Interface(interface) => {
                    let ty = self.register_composite(
                        &interface.ident.name,
                        interface.kind,
                        true,
                        &interface.members,
                    );
                    self.declare_type(&interface.ident, "interface", ty);
                }
                Declaration::Entitlement(entitlement) => {
                    self.declare_type(&entitlement.ident, "entitlement", Ty::Unknown);
                    self.export(&entitlement.ident.name, None, Some(Ty::Unknown));
                }
                _ => {}
            }
        }
    }

    /// Register a skeleton for `qualified` and its nested types
    fn register_composite(
        &mut self,
        qualified: &str,
        kind: CompositeKind,
        is_interface: bool,
        members: &Members,
    ) -> Ty {
        let mut info = CompositeInfo::new(self.location.clone(), qualified, kind);
        info.is_interface = is_interface;

        for nested in &members.interfaces {
            let name = nested_name(qualified, &nested.ident.name);
            let ty = self.register_composite(&name, nested.kind, true, &nested.members);
            info.nested.insert(nested.ident.name.clone(), ty);
        }
        for nested in &members.composites {
            let name = nested_name(qualified, &nested.ident.name);
            let ty = self.register_composite(&name, nested.kind, false, &nested.members);
            info.nested.insert(nested.ident.name.clone(), ty);
        }
        for entitlement in &members.entitlements {
            info.nested.insert(entitlement.ident.name.clone(), Ty::Unknown);
        }
        info.enum_cases = members
            .enum_cases
            .iter()
            .map(|case| case.ident.name.clone())
            .collect();

        let ty = info.ty();
        self.composites.insert(info.reference(), Rc::new(info));
        ty
    }

    // --- pass 3: signatures ---

    pub(super) fn compute_signatures(&mut self, declarations: &[Declaration]) {
        // interfaces first, so conforming composites see their members
        for declaration in declarations {
            if let Declaration::Interface(interface) = declaration {
                self.compute_members(
                    &interface.ident.name,
                    &interface.conformances,
                    &interface.members,
                    &[],
                );
            }
        }
        for declaration in declarations {
            if let Declaration::Composite(composite) = declaration {
                self.compute_members(
                    &composite.ident.name,
                    &composite.conformances,
                    &composite.members,
                    &composite.parameters,
                );
            }
        }
    }

    fn compute_members(
        &mut self,
        qualified: &str,
        conformances: &[NominalType],
        members: &Members,
        event_parameters: &[Parameter],
    ) {
        let reference = self.local_ref(qualified);
        let Some(skeleton) = self.composite_info(&reference) else {
            return;
        };

        self.types.push();
        for (name, ty) in &skeleton.nested {
            self.types.declare(name.clone(), ty.clone());
        }

        for nested in &members.interfaces {
            let name = nested_name(qualified, &nested.ident.name);
            self.compute_members(&name, &nested.conformances, &nested.members, &[]);
        }
        for nested in &members.composites {
            let name = nested_name(qualified, &nested.ident.name);
            self.compute_members(
                &name,
                &nested.conformances,
                &nested.members,
                &nested.parameters,
            );
        }

        let mut info = (*skeleton).clone();
        for parameter in event_parameters {
            let ty = self.convert_annotation(&parameter.type_annotation);
            info.members.insert(
                parameter.ident.name.clone(),
                Member {
                    name: parameter.ident.name.clone(),
                    access: Access::All,
                    kind: MemberKind::Field { is_constant: true },
                    ty,
                },
            );
        }
        for field in &members.fields {
            let ty = self.convert_annotation(&field.type_annotation);
            let member = Member {
                name: field.ident.name.clone(),
                access: field.access.clone(),
                kind: MemberKind::Field {
                    is_constant: field.is_constant,
                },
                ty,
            };
            self.insert_member(&mut info, member, field.ident.span);
        }
        for function in &members.functions {
            let ty = Ty::function(self.return_type(function));
            let member = Member {
                name: function.ident.name.clone(),
                access: function.access.clone(),
                kind: MemberKind::Function,
                ty,
            };
            self.insert_member(&mut info, member, function.ident.span);
        }

        let mut complete = true;
        for conformance in conformances {
            let ty = self.resolve_nominal(conformance);
            let interface = match &ty {
                Ty::Composite(reference) => self.composite_info(reference),
                _ => None,
            };
            match interface {
                Some(interface) if interface.is_interface => {
                    for (name, member) in &interface.members {
                        info.members
                            .entry(name.clone())
                            .or_insert_with(|| member.clone());
                    }
                    complete &= interface.members_complete;
                }
                _ => complete = false,
            }
            info.conformances.push(ty);
        }
        info.members_complete = complete;

        self.types.pop();
        self.composites.insert(reference, Rc::new(info));
    }

    fn insert_member(&mut self, info: &mut CompositeInfo, member: Member, span: Span) {
        if info.members.contains_key(&member.name) {
            self.report(CheckerError::redeclaration(
                member.kind.description(),
                &member.name,
                span,
            ));
            return;
        }
        info.members.insert(member.name.clone(), member);
    }

    fn return_type(&mut self, function: &FunctionDecl) -> Ty {
        function
            .return_type
            .as_ref()
            .map(|annotation| self.convert_annotation(annotation))
            .unwrap_or(Ty::Void)
    }

    fn local_ref(&self, qualified: &str) -> CompositeRef {
        CompositeRef {
            location: self.location.clone(),
            qualified_name: qualified.to_string(),
        }
    }

    // --- pass 4: values ---

    pub(super) fn declare_values(&mut self, declarations: &[Declaration]) {
        for declaration in declarations {
            match declaration {
                Declaration::Composite(composite) => {
                    let name = &composite.ident.name;
                    let ty = Ty::composite(self.location.clone(), name.clone());
                    let value = composite_value(composite.kind, ty.clone());
                    // clashes with other types were reported with the type names
                    self.values
                        .declare(name.clone(), constant(value.clone(), composite.kind.keyword()));
                    self.export(name, Some(value), Some(ty));
                }
                Declaration::Interface(interface) => {
                    let name = &interface.ident.name;
                    let ty = Ty::composite(self.location.clone(), name.clone());
                    self.values
                        .declare(name.clone(), constant(Ty::meta(ty.clone()), "interface"));
                    self.export(name, None, Some(ty));
                }
                Declaration::Function(function) => {
                    let ty = Ty::function(self.return_type(function));
                    self.declare_value(
                        &function.ident.name,
                        function.ident.span,
                        constant(ty.clone(), "function"),
                    );
                    self.export(&function.ident.name, Some(ty), None);
                }
                _ => {}
            }
        }
    }

    // --- bodies ---

    /// Enter the type and value scopes of a composite body
    fn enter_composite_scope(&mut self, info: &CompositeInfo, members: &Members) {
        self.types.push();
        self.values.push();
        for (name, ty) in &info.nested {
            self.types.declare(name.clone(), ty.clone());
            if let Ty::Composite(reference) = ty {
                let value = match self.composite_info(reference) {
                    Some(nested) if nested.is_interface => Ty::meta(ty.clone()),
                    Some(nested) => composite_value(nested.kind, ty.clone()),
                    None => Ty::Unknown,
                };
                self.values.declare(name.clone(), constant(value, "type"));
            }
        }

        // contract members are accessible unqualified
        if info.kind == CompositeKind::Contract {
            for field in &members.fields {
                let ty = info
                    .members
                    .get(&field.ident.name)
                    .map(|m| m.ty.clone())
                    .unwrap_or(Ty::Unknown);
                self.values.declare(
                    field.ident.name.clone(),
                    Variable {
                        ty,
                        is_constant: field.is_constant,
                        kind: "field",
                    },
                );
            }
            for function in &members.functions {
                let ty = info
                    .members
                    .get(&function.ident.name)
                    .map(|m| m.ty.clone())
                    .unwrap_or(Ty::Unknown);
                self.values
                    .declare(function.ident.name.clone(), constant(ty, "function"));
            }
        }
    }

    fn exit_composite_scope(&mut self) {
        self.values.pop();
        self.types.pop();
    }

    pub(super) fn check_composite(&mut self, composite: &CompositeDecl, qualified: &str) {
        let Some(info) = self.composite_info(&self.local_ref(qualified)) else {
            return;
        };

        // signatures were computed quietly; report unresolved types now
        for conformance in &composite.conformances {
            self.resolve_nominal(conformance);
        }
        let base = composite.base.as_ref().map(|base| self.resolve_nominal(base));

        self.enter_composite_scope(&info, &composite.members);
        if let Some(base) = base {
            self.values
                .declare("base", constant(Ty::Reference(Box::new(base)), "constant"));
        }

        for field in &composite.members.fields {
            self.convert_annotation(&field.type_annotation);
        }
        for parameter in &composite.parameters {
            let ty = self.convert_annotation(&parameter.type_annotation);
            if let Some(default) = &parameter.default {
                self.check_expr(default, Some(&ty));
            }
        }

        let self_ty = match composite.kind {
            CompositeKind::Attachment => Ty::Reference(Box::new(info.ty())),
            _ => info.ty(),
        };
        self.check_members(&composite.members, qualified, &self_ty);
        self.exit_composite_scope();
    }

    pub(super) fn check_interface(&mut self, interface: &InterfaceDecl, qualified: &str) {
        let Some(info) = self.composite_info(&self.local_ref(qualified)) else {
            return;
        };
        for conformance in &interface.conformances {
            self.resolve_nominal(conformance);
        }

        self.enter_composite_scope(&info, &interface.members);
        for field in &interface.members.fields {
            self.convert_annotation(&field.type_annotation);
        }
        self.check_members(&interface.members, qualified, &info.ty());
        self.exit_composite_scope();
    }

    fn check_members(&mut self, members: &Members, qualified: &str, self_ty: &Ty) {
        for special in &members.special_functions {
            let is_initializer = special.ident.name == "init";
            self.check_function(special, Some(self_ty.clone()), is_initializer);
        }
        for function in &members.functions {
            let receiver = (!function.is_static).then(|| self_ty.clone());
            self.check_function(function, receiver, false);
        }
        for nested in &members.interfaces {
            self.check_interface(nested, &nested_name(qualified, &nested.ident.name));
        }
        for nested in &members.composites {
            self.check_composite(nested, &nested_name(qualified, &nested.ident.name));
        }
    }

    /// Check a function declaration or expression, returning its type
    pub(super) fn check_function(
        &mut self,
        function: &FunctionDecl,
        self_ty: Option<Ty>,
        is_initializer: bool,
    ) -> Ty {
        self.values.push();
        if let Some(ty) = self_ty {
            self.values.declare("self", constant(ty, "constant"));
        }
        for parameter in &function.parameters {
            let ty = self.convert_annotation(&parameter.type_annotation);
            self.declare_value(
                &parameter.ident.name,
                parameter.ident.span,
                constant(ty, "parameter"),
            );
        }
        let return_ty = self.return_type(function);

        if let Some(body) = &function.body {
            self.functions.push(FunctionContext {
                return_ty: return_ty.clone(),
                is_initializer,
            });
            self.check_function_block(body, &return_ty);
            self.functions.pop();
        }
        self.values.pop();
        Ty::function(return_ty)
    }

    fn check_function_block(&mut self, body: &FunctionBlock, return_ty: &Ty) {
        self.check_conditions(&body.pre_conditions);
        self.check_block(&body.block);

        self.values.push();
        self.values
            .declare("result", constant(return_ty.clone(), "constant"));
        self.values
            .declare("before", constant(Ty::function(Ty::Unknown), "function"));
        self.check_conditions(&body.post_conditions);
        self.values.pop();
    }

    pub(super) fn check_conditions(&mut self, conditions: &[Condition]) {
        let boolean = Ty::builtin("Bool");
        let string = Ty::builtin("String");
        for condition in conditions {
            match condition {
                Condition::Test { test, message } => {
                    self.check_expr(test, Some(&boolean));
                    if let Some(message) = message {
                        self.check_expr(message, Some(&string));
                    }
                }
                Condition::Emit(event) => {
                    self.check_expr(event, None);
                }
            }
        }
    }

    pub(super) fn check_transaction(&mut self, transaction: &TransactionDecl) {
        self.values.push();
        for parameter in &transaction.parameters {
            let ty = self.convert_annotation(&parameter.type_annotation);
            self.declare_value(
                &parameter.ident.name,
                parameter.ident.span,
                constant(ty, "parameter"),
            );
        }
        for field in &transaction.fields {
            self.convert_annotation(&field.type_annotation);
        }
        // fields are not tracked, so `self` stays unknown
        self.values.declare("self", constant(Ty::Unknown, "constant"));

        if let Some(prepare) = &transaction.prepare {
            self.check_function(prepare, Some(Ty::Unknown), true);
        }

        self.functions.push(FunctionContext {
            return_ty: Ty::Void,
            is_initializer: false,
        });
        self.check_conditions(&transaction.pre_conditions);
        if let Some(execute) = &transaction.execute {
            self.check_block(execute);
        }
        self.check_conditions(&transaction.post_conditions);
        self.functions.pop();
        self.values.pop();
    }
}
