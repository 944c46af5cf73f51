//! Built-in types, values and pseudo-contracts
//!
//! Scripts and transactions/contracts see different built-in values; the
//! environment is chosen from the shape of the program.

use crate::location::{self, Location};

use super::ast::Program;
use super::checker::types::{Ty, FIXED_POINT_TYPES, INTEGER_TYPES};
use super::checker::Elaboration;

/// Which standard library a program is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Scripts: everything, including `getAuthAccount`
    Script,
    /// A sole transaction or a sole contract
    Standard,
}

impl Environment {
    pub fn for_program(program: &Program) -> Self {
        if program.sole_transaction().is_some() || program.sole_contract().is_some() {
            Environment::Standard
        } else {
            Environment::Script
        }
    }
}

/// Named types other than the numeric ones
const BASE_TYPES: &[&str] = &[
    "Never",
    "Void",
    "AnyStruct",
    "AnyResource",
    "AnyStructAttachment",
    "AnyResourceAttachment",
    "Bool",
    "Character",
    "String",
    "Address",
    "Number",
    "SignedNumber",
    "Integer",
    "SignedInteger",
    "FixedPoint",
    "SignedFixedPoint",
    "Path",
    "StoragePath",
    "PublicPath",
    "PrivatePath",
    "CapabilityPath",
    "Capability",
    "Type",
    "Block",
    "Account",
    "AuthAccount",
    "PublicAccount",
    "DeployedContract",
    "StorageCapabilityController",
    "AccountCapabilityController",
    "HashAlgorithm",
    "SignatureAlgorithm",
    "PublicKey",
    "InclusiveRange",
    "Storable",
    "HashableStruct",
];

/// Every built-in type name with the type it denotes
pub fn base_types() -> impl Iterator<Item = (&'static str, Ty)> {
    BASE_TYPES
        .iter()
        .chain(INTEGER_TYPES)
        .chain(FIXED_POINT_TYPES)
        .map(|&name| {
            let ty = match name {
                "Never" => Ty::Never,
                "Void" => Ty::Void,
                other => Ty::builtin(other),
            };
            (name, ty)
        })
}

/// Built-in values in scope for `environment`
pub fn base_values(environment: Environment) -> Vec<(&'static str, Ty)> {
    let mut values = vec![
        ("panic", Ty::function(Ty::Never)),
        ("assert", Ty::function(Ty::Void)),
        ("log", Ty::function(Ty::Void)),
        ("getAccount", Ty::function(Ty::builtin("Account"))),
        ("getCurrentBlock", Ty::function(Ty::builtin("Block"))),
        ("getBlock", Ty::function(Ty::optional(Ty::builtin("Block")))),
        ("unsafeRandom", Ty::function(Ty::builtin("UInt64"))),
        ("revertibleRandom", Ty::function(Ty::Unknown)),
        ("Type", Ty::function(Ty::builtin("Type"))),
        ("RLP", Ty::Unknown),
        ("BLS", Ty::Unknown),
        ("HashAlgorithm", Ty::Unknown),
        ("SignatureAlgorithm", Ty::Unknown),
        ("PublicKey", Ty::meta(Ty::builtin("PublicKey"))),
        ("InclusiveRange", Ty::meta(Ty::builtin("InclusiveRange"))),
        ("Address", Ty::meta(Ty::builtin("Address"))),
        ("String", Ty::meta(Ty::builtin("String"))),
        ("Character", Ty::meta(Ty::builtin("Character"))),
        ("StoragePath", Ty::meta(Ty::builtin("StoragePath"))),
        ("PublicPath", Ty::meta(Ty::builtin("PublicPath"))),
        ("PrivatePath", Ty::meta(Ty::builtin("PrivatePath"))),
        ("CapabilityPath", Ty::meta(Ty::builtin("CapabilityPath"))),
    ];

    // conversion functions
    values.extend(
        INTEGER_TYPES
            .iter()
            .chain(FIXED_POINT_TYPES)
            .map(|&name| (name, Ty::meta(Ty::builtin(name)))),
    );

    if environment == Environment::Script {
        values.push(("getAuthAccount", Ty::function(Ty::Unknown)));
    }
    values
}

/// Functions `import BlockchainHelpers` brings into scope
const BLOCKCHAIN_HELPERS_FUNCTIONS: &[&str] = &[
    "getCurrentBlockHeight",
    "mintFlow",
    "burnFlow",
    "executeScript",
    "getAccountBalance",
];

/// The elaboration of a built-in pseudo-contract, if `location` names one.
///
/// Built-ins are open: the checker does not know their members, so any
/// imported name resolves with an unknown type.
pub fn builtin_elaboration(location: &Location) -> Option<Elaboration> {
    let Location::Identifier(name) = location else {
        return None;
    };
    if !location.is_builtin() {
        return None;
    }

    let mut elaboration = Elaboration::open(location.clone());
    let export = |value| super::checker::Export {
        value: Some(value),
        ty: Some(Ty::Unknown),
    };
    match name.as_str() {
        location::BLOCKCHAIN_HELPERS => {
            for function in BLOCKCHAIN_HELPERS_FUNCTIONS {
                elaboration
                    .exports
                    .insert(function.to_string(), export(Ty::function(Ty::Unknown)));
            }
        }
        _ => {
            elaboration.exports.insert(name.clone(), export(Ty::Unknown));
        }
    }
    Some(elaboration)
}
