//! The result of checking one program

use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

use crate::cadence::position::Span;
use crate::location::Location;

use super::types::{CompositeInfo, CompositeRef, Ty};

/// A top-level declaration made available to importers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Export {
    /// Type of the name used as a value
    pub value: Option<Ty>,
    /// The type the name denotes in type position
    pub ty: Option<Ty>,
}

/// Operand and target of a static cast `e as T`
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCast {
    /// Type of the operand, inferred without the target as expectation
    pub operand: Ty,
    pub target: Ty,
    pub operand_is_literal: bool,
}

#[derive(Debug, Clone)]
pub struct Elaboration {
    pub location: Location,
    pub exports: IndexMap<String, Export>,
    /// Composites and interfaces the program declares or imports
    pub composites: IndexMap<CompositeRef, Rc<CompositeInfo>>,
    /// Operand type of each force expression, keyed by the expression span
    pub force_operands: HashMap<Span, Ty>,
    /// Static casts, keyed by the cast expression span
    pub static_casts: HashMap<Span, StaticCast>,
    /// Imports of any name succeed with an unknown type
    pub is_open: bool,
    /// Synthesized for a location that was still being checked
    pub is_cyclic: bool,
    pub has_errors: bool,
}

impl Elaboration {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            exports: IndexMap::new(),
            composites: IndexMap::new(),
            force_operands: HashMap::new(),
            static_casts: HashMap::new(),
            is_open: false,
            is_cyclic: false,
            has_errors: false,
        }
    }

    /// Placeholder returned for an import that is already being checked
    pub fn cyclic(location: Location) -> Self {
        Self {
            is_cyclic: true,
            ..Self::new(location)
        }
    }

    /// An elaboration that exports every name, used for built-in contracts
    pub fn open(location: Location) -> Self {
        Self {
            is_open: true,
            ..Self::new(location)
        }
    }

    /// Look up an exported name; open elaborations export everything
    pub fn export(&self, name: &str) -> Option<Export> {
        self.exports.get(name).cloned().or_else(|| {
            self.is_open.then(|| Export {
                value: Some(Ty::Unknown),
                ty: Some(Ty::Unknown),
            })
        })
    }

    pub fn force_operand(&self, span: Span) -> Option<&Ty> {
        self.force_operands.get(&span)
    }

    pub fn static_cast(&self, span: Span) -> Option<&StaticCast> {
        self.static_casts.get(&span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_elaboration_exports_anything() {
        let elaboration = Elaboration::open(Location::identifier("Crypto"));
        assert_eq!(
            elaboration.export("KeyList").and_then(|e| e.value),
            Some(Ty::Unknown)
        );
        let closed = Elaboration::new(Location::string("A"));
        assert!(closed.export("KeyList").is_none());
    }
}
