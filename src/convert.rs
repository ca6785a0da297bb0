//! Conversion between the native C++ AST and the ASDL AST.
//!
//! Every native kind maps to the grammar production of the same name. Field
//! values are moved across by field name, recursing into child and sequence
//! fields; tokens pass through unchanged and sequences keep their order.

use std::sync::Arc;

use compact_str::CompactString;
use thiserror::Error;

use crate::{
    grammar::{AsdlAst, Grammar, Production},
    tree::{CppAst, Kind, Node, NodeKind, TreeError, Value},
};

/// The converter error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("no conversion for `{0}`")]
    UnsupportedConversion(CompactString),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Converts a native tree to the ASDL tree of `grammar`.
pub fn to_asdl(native: &CppAst, grammar: &Grammar) -> Result<AsdlAst, ConvertError> {
    lower(native.clone(), grammar)
}

/// Converts an ASDL tree back to the native tree.
pub fn to_native(asdl: &AsdlAst, grammar: &Grammar) -> Result<CppAst, ConvertError> {
    raise(asdl.clone(), grammar)
}

/// Converts an owned native tree.
pub fn lower(native: CppAst, grammar: &Grammar) -> Result<AsdlAst, ConvertError> {
    let production: Arc<Production> = grammar
        .production(native.kind().name())
        .cloned()
        .ok_or_else(|| ConvertError::UnsupportedConversion(native.kind().name().into()))?;
    transfer(native, production, &mut |child| lower(child, grammar))
}

/// Converts an owned ASDL tree.
pub fn raise(asdl: AsdlAst, grammar: &Grammar) -> Result<CppAst, ConvertError> {
    let name = asdl.kind().name();
    if grammar.production(name).is_none() {
        return Err(ConvertError::UnsupportedConversion(name.into()));
    }
    let kind: NodeKind = name
        .parse()
        .map_err(|()| ConvertError::UnsupportedConversion(name.into()))?;
    transfer(asdl, kind, &mut |child| raise(child, grammar))
}

/// Rebuilds `node` with kind `to`, converting every child with `convert`.
fn transfer<F: Kind, T: Kind>(
    node: Node<F>,
    to: T,
    convert: &mut impl FnMut(Node<F>) -> Result<Node<T>, ConvertError>,
) -> Result<Node<T>, ConvertError> {
    let (from, values) = node.into_parts();
    let mut converted = Vec::with_capacity(values.len());
    for (decl, value) in from.fields().iter().zip(values) {
        let value = value.try_map(|value| match value {
            Value::Token(token) => Ok(Value::Token(token)),
            Value::Node(child) => convert(child).map(Value::Node),
        })?;
        converted.push((decl.name.as_ref(), value));
    }
    Ok(Node::new(to, converted)?)
}

/// Lists the mismatches between the native kinds and the productions of
/// `grammar`: kinds without a production, productions without a kind, and
/// productions whose fields differ from the kind's fields.
pub fn schema_drift(grammar: &Grammar) -> Vec<String> {
    let mut drift = Vec::new();
    for kind in NodeKind::ALL {
        match grammar.production(kind.name()) {
            None => drift.push(format!("{kind} has no production")),
            Some(production) => {
                if production.ty != kind.category().type_name() {
                    drift.push(format!(
                        "{kind} builds `{}` but its production builds `{}`",
                        kind.category().type_name(),
                        production.ty
                    ));
                }
                if production.fields.as_slice() != kind.field_decls() {
                    drift.push(format!("{kind} fields differ from {production}"));
                }
            }
        }
    }
    for production in grammar.productions() {
        if production.name.parse::<NodeKind>().is_err() {
            drift.push(format!("{} has no native kind", production.name));
        }
    }
    drift
}
