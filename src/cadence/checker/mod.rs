//! Semantic checker
//!
//! Checking runs in passes over the top-level declarations:
//!
//! 1. imports are resolved through the [`ImportHandler`],
//! 2. composite and interface names are registered (with nested types),
//! 3. member signatures are computed,
//! 4. top-level values are declared,
//! 5. bodies are checked.
//!
//! The checker never guesses: a type it cannot infer is [`Ty::Unknown`] and
//! checks depending on it are skipped, so the linter does not report false
//! errors on valid programs.

mod decl;
mod elaboration;
mod errors;
mod expr;
mod scope;
mod stmt;
pub mod types;

pub use elaboration::{Elaboration, Export, StaticCast};
pub use errors::CheckerError;
pub use types::{CompositeInfo, CompositeRef, Member, MemberKind, Ty};

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::location::Location;

use super::ast::{self, Declaration, ImportDecl, ImportLocation, Program};
use super::position::Span;
use super::stdlib::{self, Environment};
use scope::{Scopes, Variable};

/// Why an import could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub message: String,
}

impl ImportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Resolves imported locations to checked programs
pub trait ImportHandler {
    fn resolve_import(
        &self,
        importing: &Location,
        imported: &Location,
    ) -> Result<Rc<Elaboration>, ImportError>;
}

/// Decides whether two programs are deployed to the same account,
/// which grants `access(account)`
pub trait AccountAccess {
    fn same_account(&self, accessing: &Location, declaring: &Location) -> bool;
}

#[derive(Clone, Copy)]
pub struct CheckerConfig<'a> {
    pub environment: Environment,
    pub import_handler: Option<&'a dyn ImportHandler>,
    pub account_access: Option<&'a dyn AccountAccess>,
}

impl<'a> CheckerConfig<'a> {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            import_handler: None,
            account_access: None,
        }
    }

    pub fn with_import_handler(mut self, handler: &'a dyn ImportHandler) -> Self {
        self.import_handler = Some(handler);
        self
    }

    pub fn with_account_access(mut self, access: &'a dyn AccountAccess) -> Self {
        self.account_access = Some(access);
        self
    }
}

/// Per-function state
#[derive(Debug, Clone)]
struct FunctionContext {
    return_ty: Ty,
    is_initializer: bool,
}

pub struct Checker<'a> {
    location: Location,
    config: CheckerConfig<'a>,
    values: Scopes<Variable>,
    types: Scopes<Ty>,
    composites: HashMap<CompositeRef, Rc<CompositeInfo>>,
    functions: Vec<FunctionContext>,
    elaboration: Elaboration,
    errors: Vec<CheckerError>,
    /// Type errors are only reported while checking bodies, not while
    /// computing signatures, so each is reported once
    report_types: bool,
}

/// Check `program` at `location`
pub fn check_program(
    program: &Program,
    location: Location,
    config: CheckerConfig<'_>,
) -> (Elaboration, Vec<CheckerError>) {
    Checker::new(location, config).check(program)
}

impl<'a> Checker<'a> {
    pub fn new(location: Location, config: CheckerConfig<'a>) -> Self {
        let mut values = Scopes::new();
        for (name, ty) in stdlib::base_values(config.environment) {
            values.declare(
                name,
                Variable {
                    ty,
                    is_constant: true,
                    kind: "constant",
                },
            );
        }
        let mut types = Scopes::new();
        for (name, ty) in stdlib::base_types() {
            types.declare(name, ty);
        }

        Self {
            elaboration: Elaboration::new(location.clone()),
            location,
            config,
            values,
            types,
            composites: HashMap::new(),
            functions: Vec::new(),
            errors: Vec::new(),
            report_types: true,
        }
    }

    pub fn check(mut self, program: &Program) -> (Elaboration, Vec<CheckerError>) {
        debug!(location = %self.location, "checking program");

        // program declarations live above the built-ins
        self.values.push();
        self.types.push();

        for import in &program.imports {
            self.check_import(import);
        }

        self.report_types = false;
        self.declare_type_names(&program.declarations);
        self.compute_signatures(&program.declarations);
        self.declare_values(&program.declarations);
        self.report_types = true;

        for declaration in &program.declarations {
            self.check_declaration(declaration);
        }

        let mut elaboration = self.elaboration;
        elaboration.has_errors = !self.errors.is_empty();
        elaboration.composites = self.composites.into_iter().collect();
        elaboration
            .composites
            .sort_by(|a, _, b, _| a.qualified_name.cmp(&b.qualified_name));

        let mut errors = self.errors;
        errors.sort_by_key(|e| e.span.start);
        (elaboration, errors)
    }

    // --- reporting ---

    fn report(&mut self, error: CheckerError) {
        self.errors.push(error);
    }

    /// Run `f` without reporting type resolution errors
    fn quietly<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let report_types = std::mem::replace(&mut self.report_types, false);
        let result = f(self);
        self.report_types = report_types;
        result
    }

    // --- imports ---

    fn check_import(&mut self, import: &ImportDecl) {
        let targets: Vec<(Location, Vec<&ast::Ident>)> = match &import.location {
            ImportLocation::Address(address) => import
                .identifiers
                .iter()
                .map(|ident| (Location::address(*address, ident.name.clone()), vec![ident]))
                .collect(),
            ImportLocation::String(value) => {
                vec![(Location::string(value.clone()), import.identifiers.iter().collect())]
            }
            ImportLocation::Identifier(name) => {
                vec![(Location::identifier(name.clone()), import.identifiers.iter().collect())]
            }
        };

        for (location, identifiers) in targets {
            let description = location.description();
            let elaboration = match self.resolve_import(&location) {
                Ok(elaboration) => elaboration,
                Err(error) => {
                    self.report(CheckerError::unresolved_import(
                        &description,
                        &error.message,
                        import.location_span,
                    ));
                    self.declare_unresolved_import(&location, &identifiers, import.span);
                    continue;
                }
            };

            if elaboration.is_cyclic {
                self.report(CheckerError::cyclic_import(&description, import.location_span));
                self.declare_unresolved_import(&location, &identifiers, import.span);
                continue;
            }
            if elaboration.has_errors {
                self.report(CheckerError::imported_program_failed(
                    &description,
                    import.location_span,
                ));
            }

            for (key, info) in &elaboration.composites {
                self.composites.insert(key.clone(), info.clone());
            }

            if identifiers.is_empty() {
                for (name, export) in &elaboration.exports {
                    self.declare_import(name, export, import.span);
                }
                continue;
            }
            for ident in identifiers {
                match elaboration.export(&ident.name) {
                    Some(export) => self.declare_import(&ident.name, &export, ident.span),
                    None => {
                        self.report(CheckerError::missing_import_declaration(
                            &ident.name,
                            &description,
                            ident.span,
                        ));
                        self.declare_import(&ident.name, &unknown_export(), ident.span);
                    }
                }
            }
        }
    }

    fn resolve_import(&self, location: &Location) -> Result<Rc<Elaboration>, ImportError> {
        match self.config.import_handler {
            Some(handler) => handler.resolve_import(&self.location, location),
            None => stdlib::builtin_elaboration(location)
                .map(Rc::new)
                .ok_or_else(|| ImportError::new("imports are not supported here")),
        }
    }

    /// Keep names of a failed import in scope so uses do not cascade into errors
    fn declare_unresolved_import(&mut self, location: &Location, identifiers: &[&ast::Ident], span: Span) {
        if identifiers.is_empty() {
            let name = match location {
                Location::String(value) if !location.is_path() => Some(value.clone()),
                Location::Identifier(value) => Some(value.clone()),
                _ => None,
            };
            if let Some(name) = name {
                self.declare_import(&name, &unknown_export(), span);
            }
            return;
        }
        for ident in identifiers {
            self.declare_import(&ident.name, &unknown_export(), ident.span);
        }
    }

    fn declare_import(&mut self, name: &str, export: &Export, span: Span) {
        if let Some(value) = &export.value {
            self.declare_value(
                name,
                span,
                Variable {
                    ty: value.clone(),
                    is_constant: true,
                    kind: "import",
                },
            );
        }
        if let Some(ty) = &export.ty {
            self.types.declare(name, ty.clone());
        }
    }

    // --- declarations ---

    /// Declare a value in the innermost scope, reporting redeclarations
    fn declare_value(&mut self, name: &str, span: Span, variable: Variable) {
        if self.values.declared_in_current(name) {
            self.report(CheckerError::redeclaration(variable.kind, name, span));
        }
        self.values.declare(name, variable);
    }

    fn declare_type(&mut self, name: &ast::Ident, kind: &'static str, ty: Ty) {
        if self.types.declared_in_current(&name.name) {
            self.report(CheckerError::redeclaration(kind, &name.name, name.span));
        }
        self.types.declare(name.name.clone(), ty);
    }

    fn export(&mut self, name: &str, value: Option<Ty>, ty: Option<Ty>) {
        self.elaboration
            .exports
            .insert(name.to_string(), Export { value, ty });
    }

    fn check_declaration(&mut self, declaration: &Declaration) {
        match declaration {
            Declaration::Composite(composite) => {
                let name = composite.ident.name.clone();
                self.check_composite(composite, &name);
            }
            Declaration::Interface(interface) => {
                let name = interface.ident.name.clone();
                self.check_interface(interface, &name);
            }
            Declaration::Function(function) => {
                self.check_function(function, None, false);
            }
            Declaration::Variable(variable) => {
                let ty = self.check_variable(variable);
                self.export(&variable.ident.name, Some(ty), None);
            }
            Declaration::Transaction(transaction) => {
                self.check_transaction(transaction);
            }
            Declaration::Entitlement(_) | Declaration::Pragma(_) => {}
        }
    }

    // --- types ---

    fn composite_info(&self, reference: &CompositeRef) -> Option<Rc<CompositeInfo>> {
        self.composites.get(reference).cloned()
    }

    fn convert_annotation(&mut self, annotation: &ast::TypeAnnotation) -> Ty {
        self.convert_type(&annotation.ty)
    }

    fn convert_type(&mut self, ty: &ast::Type) -> Ty {
        use ast::TypeKind;
        match &ty.kind {
            TypeKind::Nominal(nominal) => self.resolve_nominal(nominal),
            TypeKind::Optional(inner) => Ty::optional(self.convert_type(inner)),
            TypeKind::VariableArray(inner) => Ty::Array(Box::new(self.convert_type(inner))),
            TypeKind::ConstantArray(inner, size) => {
                Ty::ConstantArray(Box::new(self.convert_type(inner)), *size)
            }
            TypeKind::Dictionary(key, value) => Ty::Dictionary(
                Box::new(self.convert_type(key)),
                Box::new(self.convert_type(value)),
            ),
            TypeKind::Function {
                parameters,
                return_type,
            } => {
                for parameter in parameters {
                    self.convert_annotation(parameter);
                }
                let ret = return_type
                    .as_ref()
                    .map(|r| self.convert_annotation(r))
                    .unwrap_or(Ty::Void);
                Ty::function(ret)
            }
            TypeKind::Reference { ty, .. } => Ty::Reference(Box::new(self.convert_type(ty))),
            TypeKind::Intersection(types) => Ty::Intersection(
                types.iter().map(|t| self.resolve_nominal(t)).collect(),
            ),
            TypeKind::Instantiation { ty, arguments } => {
                let base = self.convert_type(ty);
                let arguments = arguments
                    .iter()
                    .map(|a| self.convert_annotation(a))
                    .collect();
                Ty::Instantiated(Box::new(base), arguments)
            }
        }
    }

    fn resolve_nominal(&mut self, nominal: &ast::NominalType) -> Ty {
        let first = &nominal.identifier;
        let Some(mut ty) = self.types.lookup(&first.name).cloned() else {
            if self.report_types {
                self.report(CheckerError::not_declared_type(&first.name, first.span));
            }
            return Ty::Unknown;
        };

        let mut qualified = first.name.clone();
        for nested in &nominal.nested {
            qualified = format!("{}.{}", qualified, nested.name);
            ty = match &ty {
                Ty::Composite(reference) => match self.composite_info(reference) {
                    Some(info) => match info.nested.get(&nested.name) {
                        Some(nested_ty) => nested_ty.clone(),
                        None => {
                            if info.members_complete && info.conformances.is_empty() && self.report_types {
                                self.report(CheckerError::not_declared_type(&qualified, nominal.span()));
                            }
                            Ty::Unknown
                        }
                    },
                    None => Ty::Unknown,
                },
                // e.g. `Account.Storage`
                Ty::Builtin(name) => Ty::Builtin(format!("{}.{}", name, nested.name)),
                _ => Ty::Unknown,
            };
        }
        ty
    }

    // --- access control ---

    fn check_member_access(&mut self, info: &CompositeInfo, member: &Member, span: Span) {
        if info.location == self.location {
            return;
        }
        let denied = match member.access {
            ast::Access::Account => !self
                .config
                .account_access
                .map(|policy| policy.same_account(&self.location, &info.location))
                .unwrap_or(false),
            ast::Access::Contract | ast::Access::Self_ => true,
            _ => false,
        };
        if denied {
            self.report(CheckerError::access_denied(
                &member.name,
                member.kind.description(),
                &member.access.keyword(),
                span,
            ));
        }
    }
}

fn unknown_export() -> Export {
    Export {
        value: Some(Ty::Unknown),
        ty: Some(Ty::Unknown),
    }
}
