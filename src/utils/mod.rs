//! Utilities shared by the tree, grammar and verifier.

mod format;

pub use format::{Indent, Join};
