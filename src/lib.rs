//! Lossless translation between clang's JSON AST, a native C++ AST, grammar
//! typed ASDL trees and tree-construction actions.
//!
//! ```txt
//!         +---------+              +-----------+              +------------+
//! JSON -> | builder | - CppAst ->  | convert   | - AsdlAst -> | transition |
//!         +---------+              +-----------+              +------------+
//!                                        ^                          |
//!                                        |                       actions
//!                                        |                          v
//!                                        +------- AsdlAst' ---- decoder
//! ```
//!
//! The [`verify`] module drives the whole pipeline and compares the text
//! rendered from the rebuilt tree with the original source.
//!
//! # Examples
//!
//! ```rust
//! use cpp_asdl::{convert, grammar::Grammar, transition};
//! use serde_json::json;
//!
//! let document = json!({
//!     "TypeSummary": [],
//!     "Content": {"kind": "TranslationUnitDecl", "id": "0x1", "inner": []},
//! });
//! let grammar = Grammar::cpp().unwrap();
//! let native = cpp_asdl::builder::build(&document, "").unwrap();
//! let asdl = convert::to_asdl(&native, &grammar).unwrap();
//! let actions = transition::encode(&asdl);
//! assert_eq!(transition::decode(&actions, &grammar).unwrap(), asdl);
//! ```

// Pedantic warnings
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines, clippy::must_use_candidate)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod builder;
pub mod convert;
pub mod errors;
pub mod frontend;
pub mod grammar;
pub mod transition;
pub mod tree;
pub mod utils;
pub mod verify;

pub use errors::{Error, Result};
