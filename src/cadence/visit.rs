//! Read-only traversal of the syntax tree
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to keep descending.

use super::ast::*;

pub trait Visitor {
    fn visit_declaration(&mut self, declaration: &Declaration) {
        walk_declaration(self, declaration);
    }

    fn visit_function(&mut self, function: &FunctionDecl) {
        walk_function(self, function);
    }

    fn visit_statement(&mut self, statement: &Stmt) {
        walk_statement(self, statement);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_program<V: Visitor + ?Sized>(visitor: &mut V, program: &Program) {
    for declaration in &program.declarations {
        visitor.visit_declaration(declaration);
    }
}

pub fn walk_declaration<V: Visitor + ?Sized>(visitor: &mut V, declaration: &Declaration) {
    match declaration {
        Declaration::Composite(composite) => walk_composite(visitor, composite),
        Declaration::Interface(interface) => walk_members(visitor, &interface.members),
        Declaration::Function(function) => visitor.visit_function(function),
        Declaration::Variable(variable) => visitor.visit_expr(&variable.value),
        Declaration::Transaction(transaction) => {
            for parameter in &transaction.parameters {
                walk_parameter(visitor, parameter);
            }
            if let Some(prepare) = &transaction.prepare {
                visitor.visit_function(prepare);
            }
            walk_conditions(visitor, &transaction.pre_conditions);
            if let Some(execute) = &transaction.execute {
                walk_block(visitor, execute);
            }
            walk_conditions(visitor, &transaction.post_conditions);
        }
        Declaration::Pragma(pragma) => visitor.visit_expr(&pragma.expression),
        Declaration::Entitlement(_) => {}
    }
}

fn walk_composite<V: Visitor + ?Sized>(visitor: &mut V, composite: &CompositeDecl) {
    for parameter in &composite.parameters {
        walk_parameter(visitor, parameter);
    }
    walk_members(visitor, &composite.members);
}

fn walk_members<V: Visitor + ?Sized>(visitor: &mut V, members: &Members) {
    for function in members.special_functions.iter().chain(&members.functions) {
        visitor.visit_function(function);
    }
    for interface in &members.interfaces {
        walk_members(visitor, &interface.members);
    }
    for composite in &members.composites {
        walk_composite(visitor, composite);
    }
}

fn walk_parameter<V: Visitor + ?Sized>(visitor: &mut V, parameter: &Parameter) {
    if let Some(default) = &parameter.default {
        visitor.visit_expr(default);
    }
}

pub fn walk_function<V: Visitor + ?Sized>(visitor: &mut V, function: &FunctionDecl) {
    if let Some(body) = &function.body {
        walk_conditions(visitor, &body.pre_conditions);
        walk_block(visitor, &body.block);
        walk_conditions(visitor, &body.post_conditions);
    }
}

fn walk_conditions<V: Visitor + ?Sized>(visitor: &mut V, conditions: &[Condition]) {
    for condition in conditions {
        match condition {
            Condition::Test { test, message } => {
                visitor.visit_expr(test);
                if let Some(message) = message {
                    visitor.visit_expr(message);
                }
            }
            Condition::Emit(event) => visitor.visit_expr(event),
        }
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for statement in &block.statements {
        visitor.visit_statement(statement);
    }
}

fn walk_if<V: Visitor + ?Sized>(visitor: &mut V, statement: &IfStmt) {
    match &statement.test {
        IfTest::Expr(test) => visitor.visit_expr(test),
        IfTest::Binding(binding) => visitor.visit_expr(&binding.value),
    }
    walk_block(visitor, &statement.then);
    match statement.otherwise.as_deref() {
        Some(ElseBranch::Block(block)) => walk_block(visitor, block),
        Some(ElseBranch::If(nested)) => walk_if(visitor, nested),
        None => {}
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, statement: &Stmt) {
    match statement {
        Stmt::Declaration(declaration) => visitor.visit_declaration(declaration),
        Stmt::Expression(expr) | Stmt::Emit(expr) => visitor.visit_expr(expr),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
        Stmt::If(statement) => walk_if(visitor, statement),
        Stmt::While { test, block } => {
            visitor.visit_expr(test);
            walk_block(visitor, block);
        }
        Stmt::For {
            iterable, block, ..
        } => {
            visitor.visit_expr(iterable);
            walk_block(visitor, block);
        }
        Stmt::Assignment { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Stmt::Swap { left, right } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Stmt::Switch { subject, cases } => {
            visitor.visit_expr(subject);
            for case in cases {
                for value in case.values.iter().flatten() {
                    visitor.visit_expr(value);
                }
                for statement in &case.statements {
                    visitor.visit_statement(statement);
                }
            }
        }
        Stmt::Remove { value, .. } => visitor.visit_expr(value),
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Bool(_)
        | ExprKind::Nil
        | ExprKind::Integer(_)
        | ExprKind::FixedPoint(_)
        | ExprKind::String(_)
        | ExprKind::Path { .. }
        | ExprKind::Identifier(_) => {}
        ExprKind::Array(values) => {
            for value in values {
                visitor.visit_expr(value);
            }
        }
        ExprKind::Dictionary(entries) => {
            for (key, value) in entries {
                visitor.visit_expr(key);
                visitor.visit_expr(value);
            }
        }
        ExprKind::Member { expr, .. } => visitor.visit_expr(expr),
        ExprKind::Index { expr, index } => {
            visitor.visit_expr(expr);
            visitor.visit_expr(index);
        }
        ExprKind::Invocation {
            callee, arguments, ..
        } => {
            visitor.visit_expr(callee);
            for argument in arguments {
                visitor.visit_expr(&argument.value);
            }
        }
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Conditional {
            test,
            then,
            otherwise,
        } => {
            visitor.visit_expr(test);
            visitor.visit_expr(then);
            visitor.visit_expr(otherwise);
        }
        ExprKind::Cast { expr, .. }
        | ExprKind::Force(expr)
        | ExprKind::Create(expr)
        | ExprKind::Destroy(expr)
        | ExprKind::Reference(expr) => visitor.visit_expr(expr),
        ExprKind::Attach { attachment, base } => {
            visitor.visit_expr(attachment);
            visitor.visit_expr(base);
        }
        ExprKind::Function(function) => visitor.visit_function(function),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::parse_program;

    #[derive(Default)]
    struct ForceCounter {
        forces: usize,
    }

    impl Visitor for ForceCounter {
        fn visit_expr(&mut self, expr: &Expr) {
            if matches!(expr.kind, ExprKind::Force(_)) {
                self.forces += 1;
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn test_walk_reaches_nested_functions() {
        let source = r#"
access(all) contract C {
    access(all) resource R {
        access(all) fun f(x: Int?): Int { return x! }
        init() {}
    }
    init() {
        let g = fun (y: Int?): Int { return y! }
        let z = 1!
    }
}
"#;
        let (program, errors) = parse_program(source);
        assert!(errors.is_empty(), "{:?}", errors);
        let mut counter = ForceCounter::default();
        walk_program(&mut counter, &program);
        assert_eq!(counter.forces, 3);
    }
}
