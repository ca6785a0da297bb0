//! Type handlers. Types mostly come from summary records rather than from
//! the content tree.

use compact_str::CompactString;
use serde_json::Value;

use super::{
    child_count, json, make, patterns::Patterns, unexpected_child, BuildError, BuildErrorKind,
    Built, Builder, JsonNode,
};
use crate::tree::{Category, CppAst, NodeKind};

/// Declarations whose template parameters unnamed type parameters refer to.
const TEMPLATE_SCOPES: &[&str] = &[
    "ClassTemplateDecl",
    "ClassTemplatePartialSpecializationDecl",
    "TypeAliasTemplateDecl",
];

impl<'a> Builder<'a> {
    pub(super) fn builtin_type(&mut self, node: &'a Value) -> Built {
        let name = node
            .at(&["type", "qualType"])
            .and_then(Value::as_str)
            .ok_or_else(|| json::missing(node, "type"))?;
        make(NodeKind::BuiltinType, [("name", name.into())]).map(Some)
    }

    pub(super) fn qual_type(&mut self, node: &'a Value) -> Built {
        let qualifiers = node.req_str("qualifiers")?;
        let ty = self.only_child(node)?;
        make(
            NodeKind::QualType,
            [("qualifiers", qualifiers.into()), ("type", ty.into())],
        )
        .map(Some)
    }

    pub(super) fn member_pointer_type(&mut self, node: &'a Value) -> Built {
        let [cls, ty] = self.exact(node)?;
        make(
            NodeKind::MemberPointerType,
            [("cls", cls.into()), ("type", ty.into())],
        )
        .map(Some)
    }

    /// Constant arrays and vectors, whose size is a number.
    pub(super) fn sized_type(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let size = json::scalar(node.req("size")?);
        let ty = self.only_child(node)?;
        make(kind, [("type", ty.into()), ("size", size.into())]).map(Some)
    }

    /// Arrays sized by an expression. The size is kept as source text.
    pub(super) fn dependent_array_type(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let mut children = self.subnodes(node)?.into_iter();
        let ty = children
            .next()
            .ok_or_else(|| child_count(node, "1 or 2", 0))?;
        let size_repr = match node.opt_str("size_repr") {
            Some(repr) => repr,
            None => {
                let size = node
                    .inner()
                    .get(1)
                    .ok_or_else(|| json::missing(node, "size_repr"))?;
                self.source.of(size)
            }
        };
        make(kind, [("type", ty.into()), ("size_repr", size_repr.into())]).map(Some)
    }

    pub(super) fn elaborated_type(&mut self, node: &'a Value) -> Built {
        let ty = self.only_child(node)?;
        make(
            NodeKind::ElaboratedType,
            [("qualifiers", node.opt_str("qualifiers").into()), ("type", ty.into())],
        )
        .map(Some)
    }

    pub(super) fn function_proto_type(&mut self, node: &'a Value) -> Built {
        let mut children = self.subnodes(node)?.into_iter();
        let return_type = children
            .next()
            .ok_or_else(|| child_count(node, "at least 1", 0))?;
        make(
            NodeKind::FunctionProtoType,
            [
                ("return_type", return_type.into()),
                ("trailing_return", node.flag("trailingReturn").then_some("auto").into()),
                ("parameter_types", children.collect::<Vec<_>>().into()),
            ],
        )
        .map(Some)
    }

    /// A record or enum type, named after its declaration. Anonymous
    /// declarations use their synthetic name.
    pub(super) fn tag_type(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let decl = node.req("decl")?;
        let name = match decl.opt_str("name").filter(|name| !name.is_empty()) {
            Some(name) => name.into(),
            None => self
                .anonymous
                .by_id
                .get(decl.id())
                .cloned()
                .ok_or_else(|| json::missing(decl, "name"))?,
        };
        make(kind, [("name", name.into())]).map(Some)
    }

    pub(super) fn typedef_type(&mut self, node: &'a Value) -> Built {
        let ty = self.only_child(node)?;
        let name = match node.opt_str("name") {
            Some(name) => name,
            None => node
                .at(&["decl", "name"])
                .and_then(Value::as_str)
                .ok_or_else(|| json::missing(node, "decl"))?,
        };
        make(
            NodeKind::TypedefType,
            [("name", name.into()), ("type", ty.into())],
        )
        .map(Some)
    }

    /// A reference to a template type parameter.
    ///
    /// Clang leaves the name out when the parameter is referred to by
    /// position; it is then looked up by depth and index among the enclosing
    /// template declarations. Invented parameters of generic lambdas are
    /// named `auto:N` and written back as `auto`.
    pub(super) fn template_type_parm_type(&mut self, node: &'a Value) -> Built {
        match node.opt_str("name") {
            Some(name) if name.ends_with(":auto") || name.starts_with("auto:") => {
                let keyword = make(NodeKind::Auto, [])?;
                make(NodeKind::AutoType, [("keyword", keyword.into())]).map(Some)
            }
            Some(name) => make(NodeKind::TemplateTypeParmType, [("name", name.into())]).map(Some),
            None => {
                let name = self.positional_parameter(node)?;
                make(NodeKind::TemplateTypeParmType, [("name", name.into())]).map(Some)
            }
        }
    }

    fn positional_parameter(&self, node: &Value) -> Result<&'a str, BuildError> {
        let position = |key: &str| {
            node.req(key)?
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| json::missing(node, key))
        };
        let index = position("index")?;
        let depth = position("depth")?;
        let not_found = || BuildErrorKind::InvalidRecord {
            node_id: node.id().into(),
            message: format!("no template parameter at depth {depth} index {index}"),
        };

        let scope: &'a Value = self
            .stack
            .iter()
            .copied()
            .filter(|parent| {
                parent
                    .kind()
                    .is_some_and(|kind| TEMPLATE_SCOPES.contains(&kind))
            })
            .nth(depth)
            .ok_or_else(not_found)?;
        scope
            .inner()
            .iter()
            .filter(|param| param.kind() == Some("TemplateTypeParmDecl"))
            .nth(index)
            .and_then(|param| param.opt_str("name"))
            .ok_or_else(|| not_found().into())
    }

    /// `template <...> T<args>`. Dependent specializations name the
    /// template in `name` and carry bare types or expressions.
    pub(super) fn template_specialization_type(&mut self, node: &'a Value) -> Built {
        let children = self.subnodes(node)?;
        let (name, template_args) = if let Some(name) = node.opt_str("templateName") {
            let args = children
                .into_iter()
                .filter(|child| *child.kind() == NodeKind::TemplateArgument)
                .collect::<Vec<_>>();
            (name, args)
        } else if let Some(name) = node.opt_str("name") {
            let mut args = Vec::with_capacity(children.len());
            for child in children {
                let (ty, expr) = match child.kind().category() {
                    Category::Type => (Some(child), None),
                    Category::Expr => (None, Some(child)),
                    _ => return Err(unexpected_child(node, &child)),
                };
                args.push(make(
                    NodeKind::TemplateArgument,
                    [
                        ("type", ty.into()),
                        ("expr", expr.into()),
                        ("pack", Vec::<CppAst>::new().into()),
                    ],
                )?);
            }
            (name, args)
        } else {
            return Err(json::missing(node, "templateName"));
        };
        make(
            NodeKind::TemplateSpecializationType,
            [("name", name.into()), ("template_args", template_args.into())],
        )
        .map(Some)
    }

    /// `typename A::b`. The parts are recorded in the summary when the node
    /// has an id.
    pub(super) fn dependent_name_type(&mut self, node: &'a Value) -> Built {
        let info = if node.id().is_empty() {
            node
        } else {
            self.type_info(node)?
        };
        let nested = info.req_str("nested_name")?;
        let attr = info.req_str("attribute_name")?;
        make(
            NodeKind::DependentNameType,
            [("nested", nested.into()), ("attr", attr.into())],
        )
        .map(Some)
    }

    pub(super) fn auto_type(&mut self, node: &'a Value) -> Built {
        let keyword = match node.req_str("keyword")? {
            "auto" => NodeKind::Auto,
            "decltype(auto)" => NodeKind::DecltypeAuto,
            "__auto_type" => NodeKind::GNUAutoType,
            other => {
                return Err(BuildErrorKind::InvalidRecord {
                    node_id: node.id().into(),
                    message: format!("unknown auto keyword `{other}`"),
                }
                .into())
            }
        };
        make(NodeKind::AutoType, [("keyword", make(keyword, [])?.into())]).map(Some)
    }

    /// `_BitInt(N)`. Older summaries only carry the spelling.
    pub(super) fn bit_int_type(&mut self, node: &'a Value) -> Built {
        let (size, sign): (CompactString, Option<CompactString>);
        if let Some(found) = node.get("size") {
            size = json::scalar(found);
            sign = node.opt_str("sign").map(Into::into);
        } else {
            let spelling = node
                .at(&["type", "qualType"])
                .and_then(Value::as_str)
                .ok_or_else(|| json::missing(node, "size"))?;
            let captures = Patterns::get()?.bit_int.captures(spelling).ok_or_else(|| {
                BuildErrorKind::InvalidRecord {
                    node_id: node.id().into(),
                    message: format!("unrecognized bit-precise integer `{spelling}`"),
                }
            })?;
            sign = captures.get(1).map(|sign| sign.as_str().into());
            size = captures.get(2).map_or("", |size| size.as_str()).into();
        }
        let sign = sign.filter(|sign| !sign.is_empty());
        make(
            NodeKind::BitIntType,
            [("size", size.into()), ("sign", sign.into())],
        )
        .map(Some)
    }
}
