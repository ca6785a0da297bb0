//! The grammar model.
//!
//! A grammar is a set of named types, each declared with one or more
//! constructors ("productions"). Every production lists its fields with a
//! declared type and a cardinality. The model is loaded once and never
//! mutated afterwards, so one [`Grammar`] can be shared by any number of
//! concurrent translations.

pub mod lexer;
pub mod parser;

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use compact_str::CompactString;
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use text_size::TextRange;
use thiserror::Error;

use crate::{
    tree::{is_primitive_type, Cardinality, FieldDecl, Kind, Node},
    utils::Join,
};

use self::lexer::TokenKind;

/// The bundled grammar of the native C++ AST.
pub const CPP_GRAMMAR: &str = include_str!("../../grammar/cpp.asdl");

/// The grammar error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error(
        "unexpected token (expected {}, found {}) {:?}",
        .expected.iter().join(", "),
        .found,
        .range,
    )]
    UnexpectedToken {
        expected: Vec<TokenKind>,
        found: TokenKind,
        range: TextRange,
    },
    #[error("undefined type `{ty}` used by field `{field}` of `{production}`")]
    UndefinedType {
        ty: CompactString,
        production: CompactString,
        field: CompactString,
    },
    #[error("type `{0}` is defined twice")]
    DuplicateType(CompactString),
    #[error("constructor `{0}` is defined twice")]
    DuplicateConstructor(CompactString),
    #[error("field `{field}` is defined twice in `{production}`")]
    DuplicateField {
        production: CompactString,
        field: CompactString,
    },
    #[error("grammar defines no types")]
    EmptyGrammar,
}

/// A grammar constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    pub name: CompactString,
    /// The type this production constructs.
    pub ty: CompactString,
    pub fields: Vec<FieldDecl>,
}

impl Production {
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl Kind for Arc<Production> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        &self.ty
    }

    fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.fields.is_empty() {
            write!(f, "({})", self.fields.iter().join(", "))?;
        }
        Ok(())
    }
}

/// A tree whose kinds are grammar productions.
pub type AsdlAst = Node<Arc<Production>>;

/// A loaded grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    module: CompactString,
    types: IndexMap<CompactString, Vec<Arc<Production>>, FxBuildHasher>,
    productions: FxHashMap<CompactString, Arc<Production>>,
}

impl Grammar {
    /// Load a grammar from its text.
    pub fn load(text: &str) -> Result<Grammar, GrammarError> {
        let module = parser::parse(text)?;
        if module.definitions.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }

        let mut types = IndexMap::with_hasher(FxBuildHasher);
        let mut productions = FxHashMap::default();
        for definition in &module.definitions {
            if types.contains_key(&definition.name) {
                return Err(GrammarError::DuplicateType(definition.name.clone()));
            }
            let mut constructors = Vec::with_capacity(definition.constructors.len());
            for constructor in &definition.constructors {
                let mut seen = FxHashSet::default();
                for field in &constructor.fields {
                    if !seen.insert(field.name.as_ref()) {
                        return Err(GrammarError::DuplicateField {
                            production: constructor.name.clone(),
                            field: field.name.as_ref().into(),
                        });
                    }
                }
                let production = Arc::new(Production {
                    name: constructor.name.clone(),
                    ty: definition.name.clone(),
                    fields: constructor.fields.clone(),
                });
                let previous = productions.insert(constructor.name.clone(), production.clone());
                if previous.is_some() {
                    return Err(GrammarError::DuplicateConstructor(constructor.name.clone()));
                }
                constructors.push(production);
            }
            types.insert(definition.name.clone(), constructors);
        }

        for production in productions.values() {
            for field in &production.fields {
                if !is_primitive_type(&field.ty) && !types.contains_key(field.ty.as_ref()) {
                    return Err(GrammarError::UndefinedType {
                        ty: field.ty.as_ref().into(),
                        production: production.name.clone(),
                        field: field.name.as_ref().into(),
                    });
                }
            }
        }

        Ok(Grammar {
            module: module.name,
            types,
            productions,
        })
    }

    /// The bundled C++ grammar, loaded once per process.
    pub fn cpp() -> Result<Arc<Grammar>, GrammarError> {
        static CPP: OnceLock<Result<Arc<Grammar>, GrammarError>> = OnceLock::new();
        CPP.get_or_init(|| Grammar::load(CPP_GRAMMAR).map(Arc::new))
            .clone()
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    /// The constructors declared for a type, empty if the type is unknown.
    pub fn productions_for(&self, ty: &str) -> &[Arc<Production>] {
        self.types.get(ty).map_or(&[], Vec::as_slice)
    }

    /// Looks up a production by constructor name.
    pub fn production(&self, name: &str) -> Option<&Arc<Production>> {
        self.productions.get(name)
    }

    /// The cardinality of `field` in `production`.
    pub fn field_shape(&self, production: &str, field: &str) -> Option<Cardinality> {
        self
            .production(production)?
            .field(field)
            .map(|field| field.cardinality)
    }

    /// The first declared type; a whole tree is rooted at one of its productions.
    pub fn root_type(&self) -> &str {
        self.types.keys().next().map_or("", CompactString::as_str)
    }

    /// The declared types, in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(CompactString::as_str)
    }

    /// All productions, in declaration order.
    pub fn productions(&self) -> impl Iterator<Item = &Arc<Production>> {
        self.types.values().flatten()
    }

    pub fn is_composite_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn is_primitive_type(&self, name: &str) -> bool {
        is_primitive_type(name)
    }
}
