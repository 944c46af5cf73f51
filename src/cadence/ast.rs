//! Cadence syntax tree

use crate::address::Address;

use super::position::Span;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Program {
    pub imports: Vec<ImportDecl>,
    pub declarations: Vec<Declaration>,
}

impl Program {
    /// The transaction, if it is the only non-import declaration
    pub fn sole_transaction(&self) -> Option<&TransactionDecl> {
        match self.significant_declarations().as_slice() {
            [Declaration::Transaction(tx)] => Some(tx),
            _ => None,
        }
    }

    /// The contract, if it is the only non-import declaration
    pub fn sole_contract(&self) -> Option<&CompositeDecl> {
        match self.significant_declarations().as_slice() {
            [Declaration::Composite(c)] if c.kind == CompositeKind::Contract => Some(c),
            _ => None,
        }
    }

    fn significant_declarations(&self) -> Vec<&Declaration> {
        self.declarations
            .iter()
            .filter(|d| !matches!(d, Declaration::Pragma(_)))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportLocation {
    Address(Address),
    /// A path (contains `.cdc`) or contract name
    String(String),
    Identifier(String),
}

#[derive(Clone, Debug)]
pub struct ImportDecl {
    pub identifiers: Vec<Ident>,
    pub location: ImportLocation,
    pub location_span: Span,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    NotSpecified,
    All,
    Account,
    Contract,
    Self_,
    Entitlements(Vec<String>),
    Mapping(String),
}

impl Access {
    pub fn keyword(&self) -> String {
        match self {
            Access::NotSpecified => "not specified".to_string(),
            Access::All => "access(all)".to_string(),
            Access::Account => "access(account)".to_string(),
            Access::Contract => "access(contract)".to_string(),
            Access::Self_ => "access(self)".to_string(),
            Access::Entitlements(names) => format!("access({})", names.join(", ")),
            Access::Mapping(name) => format!("access(mapping {})", name),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Declaration {
    Composite(CompositeDecl),
    Interface(InterfaceDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
    Transaction(TransactionDecl),
    Entitlement(EntitlementDecl),
    Pragma(PragmaDecl),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Contract,
    Resource,
    Struct,
    Event,
    Enum,
    Attachment,
}

impl CompositeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            CompositeKind::Contract => "contract",
            CompositeKind::Resource => "resource",
            CompositeKind::Struct => "struct",
            CompositeKind::Event => "event",
            CompositeKind::Enum => "enum",
            CompositeKind::Attachment => "attachment",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "contract" => CompositeKind::Contract,
            "resource" => CompositeKind::Resource,
            "struct" => CompositeKind::Struct,
            "event" => CompositeKind::Event,
            "enum" => CompositeKind::Enum,
            "attachment" => CompositeKind::Attachment,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Members {
    pub fields: Vec<FieldDecl>,
    pub functions: Vec<FunctionDecl>,
    /// `init`, legacy `destroy` and `prepare`
    pub special_functions: Vec<FunctionDecl>,
    pub composites: Vec<CompositeDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub entitlements: Vec<EntitlementDecl>,
    pub enum_cases: Vec<EnumCase>,
}

#[derive(Clone, Debug)]
pub struct CompositeDecl {
    pub access: Access,
    pub kind: CompositeKind,
    pub ident: Ident,
    pub conformances: Vec<NominalType>,
    /// The base type of an attachment (`for T`)
    pub base: Option<NominalType>,
    /// Event parameters
    pub parameters: Vec<Parameter>,
    pub members: Members,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct InterfaceDecl {
    pub access: Access,
    pub kind: CompositeKind,
    pub ident: Ident,
    pub conformances: Vec<NominalType>,
    pub members: Members,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub access: Access,
    pub is_constant: bool,
    pub ident: Ident,
    pub type_annotation: TypeAnnotation,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct EnumCase {
    pub access: Access,
    pub ident: Ident,
}

#[derive(Clone, Debug)]
pub struct EntitlementDecl {
    pub access: Access,
    pub ident: Ident,
    pub is_mapping: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct PragmaDecl {
    pub expression: Expr,
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub label: Option<String>,
    pub ident: Ident,
    pub type_annotation: TypeAnnotation,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub access: Access,
    pub is_view: bool,
    pub is_static: bool,
    pub ident: Ident,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Option<FunctionBlock>,
    pub span: Span,
}

#[derive(Clone, Debug, Default)]
pub struct FunctionBlock {
    pub pre_conditions: Vec<Condition>,
    pub post_conditions: Vec<Condition>,
    pub block: Block,
}

#[derive(Clone, Debug)]
pub enum Condition {
    Test { test: Expr, message: Option<Expr> },
    Emit(Expr),
}

#[derive(Clone, Debug)]
pub struct TransactionDecl {
    pub parameters: Vec<Parameter>,
    pub fields: Vec<FieldDecl>,
    pub prepare: Option<FunctionDecl>,
    pub pre_conditions: Vec<Condition>,
    pub execute: Option<Block>,
    pub post_conditions: Vec<Condition>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    Copy,
    Move,
    ForceMove,
}

#[derive(Clone, Debug)]
pub struct VariableDecl {
    pub access: Access,
    pub is_constant: bool,
    pub ident: Ident,
    pub type_annotation: Option<TypeAnnotation>,
    pub transfer: Transfer,
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct TypeAnnotation {
    pub is_resource: bool,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub struct NominalType {
    pub identifier: Ident,
    pub nested: Vec<Ident>,
}

impl NominalType {
    pub fn span(&self) -> Span {
        self.nested
            .last()
            .map(|last| self.identifier.span.merge(last.span))
            .unwrap_or(self.identifier.span)
    }

    pub fn qualified_name(&self) -> String {
        std::iter::once(self.identifier.name.as_str())
            .chain(self.nested.iter().map(|n| n.name.as_str()))
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Clone, Debug)]
pub struct Type {
    pub kind: TypeKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum TypeKind {
    Nominal(NominalType),
    Optional(Box<Type>),
    VariableArray(Box<Type>),
    ConstantArray(Box<Type>, u64),
    Dictionary(Box<Type>, Box<Type>),
    Function {
        parameters: Vec<TypeAnnotation>,
        return_type: Option<Box<TypeAnnotation>>,
    },
    Reference {
        authorization: Option<Vec<String>>,
        ty: Box<Type>,
    },
    Intersection(Vec<NominalType>),
    Instantiation {
        ty: Box<Type>,
        arguments: Vec<TypeAnnotation>,
    },
}

#[derive(Clone, Debug, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Declaration(Box<Declaration>),
    Expression(Expr),
    Return { value: Option<Expr>, span: Span },
    Break(Span),
    Continue(Span),
    If(IfStmt),
    While { test: Expr, block: Block },
    For {
        index: Option<Ident>,
        ident: Ident,
        iterable: Expr,
        block: Block,
    },
    Assignment {
        target: Expr,
        transfer: Transfer,
        value: Expr,
    },
    Swap { left: Expr, right: Expr },
    Emit(Expr),
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
    },
    Remove {
        attachment: NominalType,
        value: Expr,
    },
}

#[derive(Clone, Debug)]
pub struct IfStmt {
    pub test: IfTest,
    pub then: Block,
    pub otherwise: Option<Box<ElseBranch>>,
}

#[derive(Clone, Debug)]
pub enum IfTest {
    Expr(Expr),
    Binding(Box<VariableDecl>),
}

#[derive(Clone, Debug)]
pub enum ElseBranch {
    Block(Block),
    If(IfStmt),
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    /// `None` for `default`
    pub values: Option<Vec<Expr>>,
    pub statements: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_literal(&self) -> bool {
        match &self.kind {
            ExprKind::Bool(_)
            | ExprKind::Nil
            | ExprKind::Integer(_)
            | ExprKind::FixedPoint(_)
            | ExprKind::String(_)
            | ExprKind::Path { .. } => true,
            ExprKind::Unary {
                op: UnaryOp::Negate,
                operand,
            } => operand.is_literal(),
            ExprKind::Array(values) => values.iter().all(Expr::is_literal),
            ExprKind::Dictionary(entries) => entries
                .iter()
                .all(|(key, value)| key.is_literal() && value.is_literal()),
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    Move,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    NilCoalesce,
    BitOr,
    BitXor,
    BitAnd,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::And)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastKind {
    Static,
    Failable,
    Force,
}

#[derive(Clone, Debug)]
pub struct Argument {
    pub label: Option<Ident>,
    pub value: Expr,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Bool(bool),
    Nil,
    Integer(String),
    FixedPoint(String),
    String(String),
    Path { domain: String, identifier: String },
    Array(Vec<Expr>),
    Dictionary(Vec<(Expr, Expr)>),
    Identifier(Ident),
    Member {
        expr: Box<Expr>,
        optional: bool,
        member: Ident,
    },
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
    },
    Invocation {
        callee: Box<Expr>,
        type_arguments: Vec<TypeAnnotation>,
        arguments: Vec<Argument>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        kind: CastKind,
        ty: TypeAnnotation,
    },
    Force(Box<Expr>),
    Create(Box<Expr>),
    Destroy(Box<Expr>),
    Reference(Box<Expr>),
    Attach {
        attachment: Box<Expr>,
        base: Box<Expr>,
    },
    Function(Box<FunctionDecl>),
}
