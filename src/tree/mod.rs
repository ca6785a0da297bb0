//! The generic tree shared by the native C++ AST and the ASDL AST.
//!
//! A [`Node`] carries a kind, which declares the node's fields, and one
//! [`FieldValue`] per declared field in declaration order. The same node type
//! is used with [`NodeKind`] for the native AST and with grammar productions
//! for the ASDL AST.

mod kinds;
mod node;

pub use kinds::{Category, NodeKind};
pub use node::*;

/// The native C++ AST.
pub type CppAst = Node<NodeKind>;
