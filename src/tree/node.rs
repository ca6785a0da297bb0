use std::{
    borrow::Cow,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use compact_str::CompactString;
use thiserror::Error;

use crate::utils::{Indent, Join};

/// Types whose values are tokens rather than nodes.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "identifier",
    "string",
    "int",
    "bytes",
    "object",
    "singleton",
];

/// Returns true if `name` is a primitive type.
pub fn is_primitive_type(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

/// How many values a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    Optional,
    Sequence,
}

impl Cardinality {
    /// The ASDL suffix for this cardinality.
    pub const fn suffix(self) -> &'static str {
        match self {
            Cardinality::Single => "",
            Cardinality::Optional => "?",
            Cardinality::Sequence => "*",
        }
    }
}

/// A field declared by a node kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDecl {
    pub name: Cow<'static, str>,
    /// The name of the type held by the field.
    pub ty: Cow<'static, str>,
    pub cardinality: Cardinality,
}

impl FieldDecl {
    pub const fn new_static(
        name: &'static str,
        ty: &'static str,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            ty: Cow::Borrowed(ty),
            cardinality,
        }
    }

    pub fn new(
        name: impl Into<Cow<'static, str>>,
        ty: impl Into<Cow<'static, str>>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            cardinality,
        }
    }

    /// Returns true if the field holds tokens.
    pub fn is_primitive(&self) -> bool {
        is_primitive_type(&self.ty)
    }
}

impl fmt::Display for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", self.ty, self.cardinality.suffix(), self.name)
    }
}

/// The kind of a node: a named constructor with a fixed list of fields.
pub trait Kind: Clone + fmt::Debug + PartialEq {
    /// The constructor name.
    fn name(&self) -> &str;

    /// The type this constructor builds.
    fn type_name(&self) -> &str;

    /// The declared fields, in order.
    fn fields(&self) -> &[FieldDecl];

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().position(|field| field.name == name)
    }
}

/// The tree error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("{kind} has no field `{field}`")]
    UnknownField {
        kind: CompactString,
        field: CompactString,
    },
    #[error("{kind} is missing field `{field}`")]
    MissingField {
        kind: CompactString,
        field: CompactString,
    },
    #[error("field `{field}` of {kind} is supplied twice")]
    DuplicateField {
        kind: CompactString,
        field: CompactString,
    },
    #[error("field `{field}` of {kind} expects `{expected}`, found {found}")]
    ShapeMismatch {
        kind: CompactString,
        field: CompactString,
        expected: CompactString,
        found: CompactString,
    },
    #[error(
        "field `{field}` of {kind} expects a `{expected}` node, found `{found}` ({constructor})"
    )]
    TypeMismatch {
        kind: CompactString,
        field: CompactString,
        expected: CompactString,
        found: CompactString,
        constructor: CompactString,
    },
}

/// A single value: a token or a child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<K> {
    Token(CompactString),
    Node(Node<K>),
}

impl<K> Value<K> {
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Value::Token(token) => Some(token),
            Value::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node<K>> {
        match self {
            Value::Token(_) => None,
            Value::Node(node) => Some(node),
        }
    }

    pub fn into_node(self) -> Option<Node<K>> {
        match self {
            Value::Token(_) => None,
            Value::Node(node) => Some(node),
        }
    }
}

/// The value of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<K> {
    Single(Value<K>),
    Optional(Option<Value<K>>),
    Sequence(Vec<Value<K>>),
}

impl<K> FieldValue<K> {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            FieldValue::Single(_) => Cardinality::Single,
            FieldValue::Optional(_) => Cardinality::Optional,
            FieldValue::Sequence(_) => Cardinality::Sequence,
        }
    }

    /// The values held, in order.
    pub fn values(&self) -> &[Value<K>] {
        match self {
            FieldValue::Single(value) => std::slice::from_ref(value),
            FieldValue::Optional(value) => value.as_slice(),
            FieldValue::Sequence(values) => values,
        }
    }

    pub fn values_mut(&mut self) -> &mut [Value<K>] {
        match self {
            FieldValue::Single(value) => std::slice::from_mut(value),
            FieldValue::Optional(value) => value.as_mut_slice(),
            FieldValue::Sequence(values) => values,
        }
    }

    pub fn into_values(self) -> Vec<Value<K>> {
        match self {
            FieldValue::Single(value) => vec![value],
            FieldValue::Optional(value) => value.into_iter().collect(),
            FieldValue::Sequence(values) => values,
        }
    }

    /// Maps every value, keeping the cardinality.
    pub fn try_map<T, E>(
        self,
        mut f: impl FnMut(Value<K>) -> Result<Value<T>, E>,
    ) -> Result<FieldValue<T>, E> {
        Ok(match self {
            FieldValue::Single(value) => FieldValue::Single(f(value)?),
            FieldValue::Optional(value) => FieldValue::Optional(value.map(f).transpose()?),
            FieldValue::Sequence(values) => {
                FieldValue::Sequence(values.into_iter().map(f).collect::<Result<_, _>>()?)
            }
        })
    }

    /// An empty value for a field of the given cardinality, or `None` for
    /// single fields which have no empty value.
    pub fn empty(cardinality: Cardinality) -> Option<Self> {
        match cardinality {
            Cardinality::Single => None,
            Cardinality::Optional => Some(FieldValue::Optional(None)),
            Cardinality::Sequence => Some(FieldValue::Sequence(Vec::new())),
        }
    }

    fn describe(&self) -> CompactString {
        let mut items = self.values().iter().map(|value| match value {
            Value::Token(_) => "token",
            Value::Node(_) => "node",
        });
        match self {
            FieldValue::Single(_) => items.join(""),
            FieldValue::Optional(None) => "no value".into(),
            FieldValue::Optional(Some(_)) => format!("optional {}", items.join("")),
            FieldValue::Sequence(_) => format!("sequence [{}]", items.join(", ")),
        }
        .into()
    }
}

impl<K> From<Node<K>> for FieldValue<K> {
    fn from(node: Node<K>) -> Self {
        FieldValue::Single(Value::Node(node))
    }
}

impl<K> From<Option<Node<K>>> for FieldValue<K> {
    fn from(node: Option<Node<K>>) -> Self {
        FieldValue::Optional(node.map(Value::Node))
    }
}

impl<K> From<Vec<Node<K>>> for FieldValue<K> {
    fn from(nodes: Vec<Node<K>>) -> Self {
        FieldValue::Sequence(nodes.into_iter().map(Value::Node).collect())
    }
}

impl<K> From<CompactString> for FieldValue<K> {
    fn from(token: CompactString) -> Self {
        FieldValue::Single(Value::Token(token))
    }
}

impl<K> From<&str> for FieldValue<K> {
    fn from(token: &str) -> Self {
        FieldValue::Single(Value::Token(token.into()))
    }
}

impl<K> From<String> for FieldValue<K> {
    fn from(token: String) -> Self {
        FieldValue::Single(Value::Token(token.into()))
    }
}

impl<K> From<Option<CompactString>> for FieldValue<K> {
    fn from(token: Option<CompactString>) -> Self {
        FieldValue::Optional(token.map(Value::Token))
    }
}

impl<K> From<Option<&str>> for FieldValue<K> {
    fn from(token: Option<&str>) -> Self {
        FieldValue::Optional(token.map(|token| Value::Token(token.into())))
    }
}

impl<K> From<Option<String>> for FieldValue<K> {
    fn from(token: Option<String>) -> Self {
        FieldValue::Optional(token.map(|token| Value::Token(token.into())))
    }
}

impl<K> From<Vec<CompactString>> for FieldValue<K> {
    fn from(tokens: Vec<CompactString>) -> Self {
        FieldValue::Sequence(tokens.into_iter().map(Value::Token).collect())
    }
}

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A tree node.
///
/// Nodes are built bottom-up: every field declared by the kind must be
/// supplied at construction, with a value of the declared cardinality, and
/// every child must belong to the declared type. Equality is structural and
/// ignores the creation sequence number.
#[derive(Debug, Clone)]
pub struct Node<K> {
    kind: K,
    fields: Vec<FieldValue<K>>,
    seq: u64,
}

impl<K: PartialEq> PartialEq for Node<K> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.fields == other.fields
    }
}

impl<K: Eq> Eq for Node<K> {}

impl<K: Kind> Node<K> {
    /// Creates a node from `(field name, value)` pairs.
    pub fn new<'a, I>(kind: K, fields: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (&'a str, FieldValue<K>)>,
    {
        let decls = kind.fields();
        let mut slots: Vec<Option<FieldValue<K>>> = decls.iter().map(|_| None).collect();
        for (name, value) in fields {
            let index = kind
                .field_index(name)
                .ok_or_else(|| TreeError::UnknownField {
                    kind: kind.name().into(),
                    field: name.into(),
                })?;
            check_value(&kind, &decls[index], &value)?;
            if slots[index].replace(value).is_some() {
                return Err(TreeError::DuplicateField {
                    kind: kind.name().into(),
                    field: name.into(),
                });
            }
        }
        let fields = slots
            .into_iter()
            .zip(decls)
            .map(|(slot, decl)| {
                slot.ok_or_else(|| TreeError::MissingField {
                    kind: kind.name().into(),
                    field: decl.name.as_ref().into(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            kind,
            fields,
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Creates a node from values given in declaration order.
    pub fn from_values(kind: K, values: Vec<FieldValue<K>>) -> Result<Self, TreeError> {
        let decls = kind.fields();
        if values.len() != decls.len() {
            let missing = decls
                .get(values.len())
                .map_or("", |decl| decl.name.as_ref());
            return Err(TreeError::MissingField {
                kind: kind.name().into(),
                field: missing.into(),
            });
        }
        for (decl, value) in decls.iter().zip(&values) {
            check_value(&kind, decl, value)?;
        }
        Ok(Self {
            kind,
            fields: values,
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
        })
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// The creation sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Iterates over the fields with their declarations.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDecl, &FieldValue<K>)> {
        self.kind.fields().iter().zip(&self.fields)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue<K>> {
        self.kind.field_index(name).map(|index| &self.fields[index])
    }

    /// The token held by a single or optional field.
    pub fn token(&self, name: &str) -> Option<&str> {
        self.get(name)?.values().first()?.as_token()
    }

    /// The node held by a single or optional field.
    pub fn child(&self, name: &str) -> Option<&Node<K>> {
        self.get(name)?.values().first()?.as_node()
    }

    /// The nodes held by a field.
    pub fn children<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Node<K>> + 'a {
        self.get(name)
            .map(FieldValue::values)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_node)
    }

    /// Replaces the value of a field, returning the previous one.
    pub fn set(&mut self, name: &str, value: FieldValue<K>) -> Result<FieldValue<K>, TreeError> {
        let index = self
            .kind
            .field_index(name)
            .ok_or_else(|| TreeError::UnknownField {
                kind: self.kind.name().into(),
                field: name.into(),
            })?;
        check_value(&self.kind, &self.kind.fields()[index], &value)?;
        Ok(std::mem::replace(&mut self.fields[index], value))
    }

    /// Consumes the node, keeping the value of one field.
    pub fn take(self, name: &str) -> Option<FieldValue<K>> {
        let index = self.kind.field_index(name)?;
        self.fields.into_iter().nth(index)
    }

    /// Consumes the node, keeping the child held by a single or optional field.
    pub fn take_child(self, name: &str) -> Option<Node<K>> {
        self
            .take(name)?
            .into_values()
            .into_iter()
            .next()?
            .into_node()
    }

    /// Consumes the node, keeping the children held by a field.
    pub fn take_children(self, name: &str) -> Vec<Node<K>> {
        self.take(name)
            .map(FieldValue::into_values)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Value::into_node)
            .collect()
    }

    /// Splits the node into its kind and its field values.
    pub fn into_parts(self) -> (K, Vec<FieldValue<K>>) {
        (self.kind, self.fields)
    }

    /// Visits this node and all its descendants in pre-order.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node<K>)) {
        f(self);
        for field in &mut self.fields {
            for value in field.values_mut() {
                if let Value::Node(node) = value {
                    node.walk_mut(f);
                }
            }
        }
    }

    /// Visits this node and all its descendants in pre-order.
    pub fn walk(&self, f: &mut impl FnMut(&Node<K>)) {
        f(self);
        for field in &self.fields {
            for value in field.values() {
                if let Value::Node(node) = value {
                    node.walk(f);
                }
            }
        }
    }

    /// The number of nodes in the tree.
    pub fn size(&self) -> usize {
        let mut size = 0;
        self.walk(&mut |_| size += 1);
        size
    }
}

fn check_value<K: Kind>(
    kind: &K,
    decl: &FieldDecl,
    value: &FieldValue<K>,
) -> Result<(), TreeError> {
    if value.cardinality() != decl.cardinality {
        return Err(TreeError::ShapeMismatch {
            kind: kind.name().into(),
            field: decl.name.as_ref().into(),
            expected: decl.to_string().into(),
            found: value.describe(),
        });
    }
    let primitive = decl.is_primitive();
    for item in value.values() {
        match item {
            Value::Token(_) if primitive => {}
            Value::Node(node) if !primitive => {
                if node.kind.type_name() != decl.ty {
                    return Err(TreeError::TypeMismatch {
                        kind: kind.name().into(),
                        field: decl.name.as_ref().into(),
                        expected: decl.ty.as_ref().into(),
                        found: node.kind.type_name().into(),
                        constructor: node.kind.name().into(),
                    });
                }
            }
            _ => {
                return Err(TreeError::ShapeMismatch {
                    kind: kind.name().into(),
                    field: decl.name.as_ref().into(),
                    expected: decl.to_string().into(),
                    found: value.describe(),
                })
            }
        }
    }
    Ok(())
}

impl<K: Kind> fmt::Display for Value<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Token(token) => write!(f, "{token:?}"),
            Value::Node(node) => write!(f, "{node}"),
        }
    }
}

impl<K: Kind> fmt::Display for Node<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.name())?;
        if self.fields.is_empty() {
            return Ok(());
        }
        writeln!(f, "(")?;
        for (decl, value) in self.fields() {
            let rendered = match value {
                FieldValue::Single(value) => value.to_string(),
                FieldValue::Optional(None) => "None".to_owned(),
                FieldValue::Optional(Some(value)) => value.to_string(),
                FieldValue::Sequence(values) if values.is_empty() => "[]".to_owned(),
                FieldValue::Sequence(values) => format!(
                    "[\n{}\n]",
                    values.iter().map(|value| value.indent(2)).join(",\n")
                ),
            };
            writeln!(f, "{}", format!("{}={rendered},", decl.name).indent(2))?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestKind {
        name: &'static str,
        ty: &'static str,
        fields: Vec<FieldDecl>,
    }

    impl Kind for TestKind {
        fn name(&self) -> &str {
            self.name
        }

        fn type_name(&self) -> &str {
            self.ty
        }

        fn fields(&self) -> &[FieldDecl] {
            &self.fields
        }
    }

    fn leaf() -> TestKind {
        TestKind {
            name: "Leaf",
            ty: "expr",
            fields: vec![FieldDecl::new_static("value", "string", Cardinality::Single)],
        }
    }

    fn pair() -> TestKind {
        TestKind {
            name: "Pair",
            ty: "stmt",
            fields: vec![
                FieldDecl::new_static("label", "identifier", Cardinality::Optional),
                FieldDecl::new_static("items", "expr", Cardinality::Sequence),
            ],
        }
    }

    fn leaf_node(value: &str) -> Node<TestKind> {
        Node::new(leaf(), [("value", value.into())]).unwrap()
    }

    #[test]
    fn test_new_validates_field_set() {
        assert!(matches!(
            Node::new(pair(), [("label", FieldValue::from(Some("x")))]),
            Err(TreeError::MissingField { .. })
        ));
        assert!(matches!(
            Node::new(leaf(), [("value", "a".into()), ("other", "b".into())]),
            Err(TreeError::UnknownField { .. })
        ));
        assert!(matches!(
            Node::new(leaf(), [("value", "a".into()), ("value", "b".into())]),
            Err(TreeError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_new_validates_shape() {
        assert!(matches!(
            Node::new(leaf(), [("value", FieldValue::from(Some("a")))]),
            Err(TreeError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Node::new(leaf(), [("value", FieldValue::from(leaf_node("a")))]),
            Err(TreeError::ShapeMismatch { .. })
        ));
        let stmt = Node::new(
            pair(),
            [("label", None::<&str>.into()), ("items", Vec::<Node<TestKind>>::new().into())],
        )
        .unwrap();
        assert!(matches!(
            Node::new(
                pair(),
                [("label", None::<&str>.into()), ("items", vec![stmt].into())],
            ),
            Err(TreeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_equality_ignores_seq() {
        let a = leaf_node("a");
        let b = leaf_node("a");
        assert!(a.seq() < b.seq());
        assert_eq!(a, b);
        assert_ne!(a, leaf_node("b"));
    }

    #[test]
    fn test_accessors_and_set() {
        let mut node = Node::new(
            pair(),
            [
                ("label", Some("l").into()),
                ("items", vec![leaf_node("a"), leaf_node("b")].into()),
            ],
        )
        .unwrap();
        assert_eq!(node.token("label"), Some("l"));
        assert_eq!(node.children("items").count(), 2);
        assert_eq!(node.size(), 3);
        node.set("label", None::<&str>.into()).unwrap();
        assert_eq!(node.token("label"), None);
        assert!(node.set("label", "x".into()).is_err());
    }

    #[test]
    fn test_display() {
        let node = Node::new(
            pair(),
            [
                ("label", None::<&str>.into()),
                ("items", vec![leaf_node("a")].into()),
            ],
        )
        .unwrap();
        assert_eq!(
            node.to_string(),
            "Pair(\n  label=None,\n  items=[\n    Leaf(\n      value=\"a\",\n    )\n  ],\n)"
        );
    }
}
