//! Static types as the checker sees them
//!
//! The model is deliberately coarse: anything the checker cannot infer is
//! [`Ty::Unknown`], which suppresses every check that depends on it.

use indexmap::IndexMap;
use std::fmt;

use crate::cadence::ast::{Access, CompositeKind};
use crate::location::Location;

pub const INTEGER_TYPES: &[&str] = &[
    "Int", "Int8", "Int16", "Int32", "Int64", "Int128", "Int256", "UInt", "UInt8", "UInt16",
    "UInt32", "UInt64", "UInt128", "UInt256", "Word8", "Word16", "Word32", "Word64", "Word128",
    "Word256",
];

pub const FIXED_POINT_TYPES: &[&str] = &["Fix64", "UFix64", "Fix128", "UFix128"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// Not inferred; never reported on
    Unknown,
    Never,
    Void,
    /// A built-in named type such as `Int` or `StoragePath`
    Builtin(String),
    Optional(Box<Ty>),
    Array(Box<Ty>),
    ConstantArray(Box<Ty>, u64),
    Dictionary(Box<Ty>, Box<Ty>),
    Reference(Box<Ty>),
    Intersection(Vec<Ty>),
    /// A type applied to type arguments, e.g. `Capability<&R>`
    Instantiated(Box<Ty>, Vec<Ty>),
    Composite(CompositeRef),
    /// A function value; only the return type is tracked
    Function(Box<Ty>),
    /// A type used as a value: constructors, conversion functions and enums
    Meta(Box<Ty>),
}

/// Identity of a composite or interface type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeRef {
    pub location: Location,
    pub qualified_name: String,
}

impl Ty {
    pub fn builtin(name: &str) -> Self {
        Ty::Builtin(name.to_string())
    }

    pub fn optional(inner: Ty) -> Self {
        Ty::Optional(Box::new(inner))
    }

    pub fn function(ret: Ty) -> Self {
        Ty::Function(Box::new(ret))
    }

    pub fn meta(ty: Ty) -> Self {
        Ty::Meta(Box::new(ty))
    }

    pub fn composite(location: Location, qualified_name: impl Into<String>) -> Self {
        Ty::Composite(CompositeRef {
            location,
            qualified_name: qualified_name.into(),
        })
    }

    /// Whether the type was fully inferred
    pub fn is_known(&self) -> bool {
        match self {
            Ty::Unknown => false,
            Ty::Never | Ty::Void | Ty::Builtin(_) | Ty::Composite(_) => true,
            Ty::Optional(inner)
            | Ty::Array(inner)
            | Ty::ConstantArray(inner, _)
            | Ty::Reference(inner)
            | Ty::Function(inner)
            | Ty::Meta(inner) => inner.is_known(),
            Ty::Dictionary(key, value) => key.is_known() && value.is_known(),
            Ty::Intersection(types) => types.iter().all(Ty::is_known),
            Ty::Instantiated(base, arguments) => {
                base.is_known() && arguments.iter().all(Ty::is_known)
            }
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Ty::Optional(_))
    }

    /// The wrapped type of an optional, or the type itself
    pub fn unwrap_optional(&self) -> &Ty {
        match self {
            Ty::Optional(inner) => inner,
            other => other,
        }
    }

    /// The referenced type of a reference, or the type itself
    pub fn dereference(&self) -> &Ty {
        match self {
            Ty::Reference(inner) => inner,
            other => other,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Ty::Builtin(name) if INTEGER_TYPES.contains(&name.as_str()))
    }

    pub fn is_fixed_point(&self) -> bool {
        matches!(self, Ty::Builtin(name) if FIXED_POINT_TYPES.contains(&name.as_str()))
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unknown => f.write_str("<<invalid>>"),
            Ty::Never => f.write_str("Never"),
            Ty::Void => f.write_str("Void"),
            Ty::Builtin(name) => f.write_str(name),
            Ty::Optional(inner) => write!(f, "{}?", inner),
            Ty::Array(inner) => write!(f, "[{}]", inner),
            Ty::ConstantArray(inner, size) => write!(f, "[{}; {}]", inner, size),
            Ty::Dictionary(key, value) => write!(f, "{{{}: {}}}", key, value),
            Ty::Reference(inner) => write!(f, "&{}", inner),
            Ty::Intersection(types) => {
                let names: Vec<String> = types.iter().map(Ty::to_string).collect();
                write!(f, "{{{}}}", names.join(", "))
            }
            Ty::Instantiated(base, arguments) => {
                let names: Vec<String> = arguments.iter().map(Ty::to_string).collect();
                write!(f, "{}<{}>", base, names.join(", "))
            }
            Ty::Composite(composite) => f.write_str(&composite.qualified_name),
            Ty::Function(ret) => write!(f, "fun(): {}", ret),
            Ty::Meta(ty) => write!(f, "Type<{}>", ty),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field { is_constant: bool },
    Function,
}

impl MemberKind {
    pub fn description(self) -> &'static str {
        match self {
            MemberKind::Field { .. } => "field",
            MemberKind::Function => "function",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub access: Access,
    pub kind: MemberKind,
    pub ty: Ty,
}

/// Members and nested types of a composite or interface
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeInfo {
    pub location: Location,
    pub qualified_name: String,
    pub kind: CompositeKind,
    pub is_interface: bool,
    pub members: IndexMap<String, Member>,
    /// Nested composites and interfaces
    pub nested: IndexMap<String, Ty>,
    pub enum_cases: Vec<String>,
    pub conformances: Vec<Ty>,
    /// False when members may come from conformances the checker could not see
    pub members_complete: bool,
}

impl CompositeInfo {
    pub fn new(location: Location, qualified_name: impl Into<String>, kind: CompositeKind) -> Self {
        Self {
            location,
            qualified_name: qualified_name.into(),
            kind,
            is_interface: false,
            members: IndexMap::new(),
            nested: IndexMap::new(),
            enum_cases: Vec::new(),
            conformances: Vec::new(),
            members_complete: true,
        }
    }

    pub fn reference(&self) -> CompositeRef {
        CompositeRef {
            location: self.location.clone(),
            qualified_name: self.qualified_name.clone(),
        }
    }

    pub fn ty(&self) -> Ty {
        Ty::Composite(self.reference())
    }

    /// Members every composite value has without declaring them
    pub fn implicit_member(&self, name: &str) -> Option<Ty> {
        let ty = match name {
            "getType" => Ty::function(Ty::builtin("Type")),
            "isInstance" => Ty::function(Ty::builtin("Bool")),
            "forEachAttachment" => Ty::function(Ty::Void),
            "uuid" if self.kind == CompositeKind::Resource => Ty::builtin("UInt64"),
            "owner" if self.kind == CompositeKind::Resource => Ty::optional(Ty::Reference(
                Box::new(Ty::builtin("Account")),
            )),
            "account" if self.kind == CompositeKind::Contract => Ty::Unknown,
            "rawValue" if self.kind == CompositeKind::Enum => Ty::Unknown,
            "base" if self.kind == CompositeKind::Attachment => Ty::Unknown,
            _ => return None,
        };
        Some(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ty = Ty::Dictionary(
            Box::new(Ty::builtin("String")),
            Box::new(Ty::optional(Ty::Array(Box::new(Ty::builtin("Int"))))),
        );
        assert_eq!(ty.to_string(), "{String: [Int]?}");
        let composite = Ty::composite(Location::string("C"), "C.Vault");
        assert_eq!(Ty::Reference(Box::new(composite)).to_string(), "&C.Vault");
    }

    #[test]
    fn test_is_known() {
        assert!(Ty::optional(Ty::builtin("Int")).is_known());
        assert!(!Ty::Array(Box::new(Ty::Unknown)).is_known());
        assert!(Ty::builtin("UInt8").is_integer());
        assert!(Ty::builtin("UFix64").is_fixed_point());
    }

    #[test]
    fn test_implicit_members_depend_on_kind() {
        let resource = CompositeInfo::new(Location::string("C"), "C.R", CompositeKind::Resource);
        assert!(resource.implicit_member("uuid").is_some());
        let structure = CompositeInfo::new(Location::string("C"), "C.S", CompositeKind::Struct);
        assert!(structure.implicit_member("uuid").is_none());
        assert!(structure.implicit_member("getType").is_some());
    }
}
