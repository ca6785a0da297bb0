//! Template declarations, template parameters and template arguments.

use serde_json::Value;

use super::{
    child_count, is, json, make, unexpected_child, BuildError, BuildErrorKind, Built, Builder,
    JsonNode,
};
use crate::tree::{Category, CppAst, NodeKind};

/// The function-like declarations a function template may wrap.
const TEMPLATED_FUNCTIONS: [NodeKind; 5] = [
    NodeKind::FunctionDecl,
    NodeKind::CXXMethodDecl,
    NodeKind::CXXConstructorDecl,
    NodeKind::CXXDestructorDecl,
    NodeKind::CXXConversionDecl,
];

fn no_templated_decl(node: &Value) -> BuildError {
    BuildErrorKind::MalformedJson {
        node_id: node.id().into(),
        missing_key: "templated declaration".into(),
    }
    .into()
}

fn pack(node: &Value) -> Option<&'static str> {
    node.flag("isParameterPack").then_some("pack")
}

impl<'a> Builder<'a> {
    /// Splits the children of a template into its parameters and the first
    /// declaration accepted by `is_decl`. Later matching declarations are
    /// implicit instantiations and are skipped.
    fn template_parts(
        &mut self,
        node: &'a Value,
        is_decl: impl Fn(&NodeKind) -> bool,
    ) -> Result<(Vec<CppAst>, CppAst), BuildError> {
        let mut parameters = Vec::new();
        let mut decl = None;
        for child in self.subnodes(node)? {
            if child.kind().is_template_parameter() {
                parameters.push(child);
            } else if is_decl(child.kind()) {
                if decl.is_none() {
                    decl = Some(child);
                } else {
                    log::trace!("skipping instantiation of {}", node.id());
                }
            } else {
                return Err(unexpected_child(node, &child));
            }
        }
        let decl = decl.ok_or_else(|| no_templated_decl(node))?;
        Ok((parameters, decl))
    }

    pub(super) fn class_template_decl(&mut self, node: &'a Value) -> Built {
        let (parameters, decl) = self.template_parts(node, |kind| {
            matches!(kind, NodeKind::CXXRecordDecl | NodeKind::ClassTemplateSpecializationDecl)
        })?;
        make(
            NodeKind::ClassTemplateDecl,
            [("template_parameters", parameters.into()), ("decl", decl.into())],
        )
        .map(Some)
    }

    /// Explicit and partial specializations. Implicit ones carry no tag and
    /// are not written.
    pub(super) fn class_template_specialization(
        &mut self,
        node: &'a Value,
        kind: NodeKind,
    ) -> Built {
        let Some(tag) = node.opt_str("tagUsed") else {
            return Ok(None);
        };
        let parts = self.record_parts(node, tag)?;

        let mut arguments = Vec::new();
        let mut parameters = Vec::new();
        let mut decls = Vec::new();
        for child in parts.decls {
            if is(&child, Category::TemplateArgument) {
                arguments.push(child);
            } else if child.kind().is_template_parameter() {
                parameters.push(child);
            } else {
                decls.push(child);
            }
        }

        make(
            kind,
            [
                ("name", parts.name.into()),
                ("tag", parts.tag.into()),
                ("bases", parts.bases.into()),
                ("complete", parts.complete.into()),
                ("template_arguments", arguments.into()),
                ("template_parameters", parameters.into()),
                ("decls", decls.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn function_template_decl(&mut self, node: &'a Value) -> Built {
        let (parameters, decl) =
            self.template_parts(node, |kind| TEMPLATED_FUNCTIONS.contains(kind))?;
        make(
            NodeKind::FunctionTemplateDecl,
            [("template_parameters", parameters.into()), ("decl", decl.into())],
        )
        .map(Some)
    }

    /// The alias declaration always comes last.
    pub(super) fn type_alias_template_decl(&mut self, node: &'a Value) -> Built {
        let mut parameters = self.subnodes(node)?;
        let decl = parameters.pop().ok_or_else(|| no_templated_decl(node))?;
        make(
            NodeKind::TypeAliasTemplateDecl,
            [("template_parameters", parameters.into()), ("decl", decl.into())],
        )
        .map(Some)
    }

    pub(super) fn template_type_parm_decl(&mut self, node: &'a Value) -> Built {
        let tag = match node.req_str("tagUsed")? {
            "typename" => NodeKind::TypenameTag,
            "class" => NodeKind::ClassTag,
            other => {
                return Err(BuildErrorKind::InvalidRecord {
                    node_id: node.id().into(),
                    message: format!("unknown template parameter tag `{other}`"),
                }
                .into())
            }
        };
        let default = self.optional_child(node)?;
        make(
            NodeKind::TemplateTypeParmDecl,
            [
                ("name", node.opt_str("name").into()),
                ("tag", make(tag, [])?.into()),
                ("default", default.into()),
                ("parameter_pack", pack(node).into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn non_type_template_parm_decl(&mut self, node: &'a Value) -> Built {
        let ty = self.resolved_type(node)?;
        let default = self.optional_child(node)?;
        make(
            NodeKind::NonTypeTemplateParmDecl,
            [
                ("name", node.opt_str("name").into()),
                ("type", ty.into()),
                ("default", default.into()),
                ("parameter_pack", pack(node).into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn template_template_parm_decl(&mut self, node: &'a Value) -> Built {
        let parameters = self.subnodes(node)?;
        make(
            NodeKind::TemplateTemplateParmDecl,
            [("name", node.opt_str("name").into()), ("template_parameters", parameters.into())],
        )
        .map(Some)
    }

    /// A template argument: an integral value, a type, an expression, or a
    /// pack of nested arguments.
    pub(super) fn template_argument(&mut self, node: &'a Value) -> Built {
        if let Some(value) = node.get("value") {
            let ty = make(NodeKind::BuiltinType, [("name", "int".into())])?;
            let literal = make(
                NodeKind::IntegerLiteral,
                [("type", ty.into()), ("value", json::scalar(value).into())],
            )?;
            return self.argument(None, Some(literal), Vec::new()).map(Some);
        }

        let mut children = self.subnodes(node)?;
        match children.len() {
            0 => Err(child_count(node, "at least 1", 0)),
            1 => {
                let child = children.remove(0);
                match child.kind().category() {
                    Category::Type => self.argument(Some(child), None, Vec::new()),
                    Category::Expr => self.argument(None, Some(child), Vec::new()),
                    Category::TemplateArgument => self.argument(None, None, vec![child]),
                    _ => Err(unexpected_child(node, &child)),
                }
                .map(Some)
            }
            _ => self.argument(None, None, children).map(Some),
        }
    }

    fn argument(
        &self,
        ty: Option<CppAst>,
        expr: Option<CppAst>,
        pack: Vec<CppAst>,
    ) -> Result<CppAst, BuildError> {
        make(
            NodeKind::TemplateArgument,
            [("type", ty.into()), ("expr", expr.into()), ("pack", pack.into())],
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::builder::BuildOptions;

    fn build_template(node: Value, summary: Value) -> Result<Option<CppAst>, BuildError> {
        let parent = json!({"kind": "NamespaceDecl"});
        let options = BuildOptions::default();
        let mut builder = Builder::new("", &options);
        builder.summary.ingest(&summary)?;
        builder.stack.push(&parent);
        builder.node(&node)
    }

    fn type_parm(id: &str, name: &str) -> Value {
        json!({"id": id, "kind": "TemplateTypeParmDecl", "name": name, "tagUsed": "typename", "depth": 0, "index": 0})
    }

    #[test]
    fn test_function_template() {
        let node = json!({
            "id": "0x1", "kind": "FunctionTemplateDecl", "name": "f",
            "inner": [
                type_parm("0x2", "T"),
                {"id": "0x3", "kind": "FunctionDecl", "name": "f", "inner": []},
                {"id": "0x4", "kind": "FunctionDecl", "name": "f", "inner": []},
            ],
        });
        let summary = json!([
            {"node_id": "0x3", "node_inner": [{"kind": "FunctionProtoType", "inner": [{"kind": "BuiltinType", "type": {"qualType": "void"}}]}]},
            {"node_id": "0x4", "node_inner": [{"kind": "FunctionProtoType", "inner": [{"kind": "BuiltinType", "type": {"qualType": "void"}}]}]},
        ]);
        let built = build_template(node, summary).unwrap().unwrap();
        assert_eq!(*built.kind(), NodeKind::FunctionTemplateDecl);
        let parameters: Vec<_> = built.children("template_parameters").collect();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].token("name"), Some("T"));
        assert_eq!(
            *parameters[0].child("tag").unwrap().kind(),
            NodeKind::TypenameTag
        );
        assert_eq!(built.child("decl").unwrap().token("name"), Some("f"));
    }

    #[test]
    fn test_template_without_decl() {
        let node = json!({"id": "0x1", "kind": "FunctionTemplateDecl", "inner": [type_parm("0x2", "T")]});
        let err = build_template(node, json!([])).unwrap_err();
        assert!(matches!(err.kind, BuildErrorKind::MalformedJson { .. }));

        let alias = json!({"id": "0x5", "kind": "TypeAliasTemplateDecl", "inner": []});
        assert!(build_template(alias, json!([])).is_err());
    }

    #[test]
    fn test_type_parameters() {
        let node = json!({
            "id": "0x1", "kind": "TemplateTypeParmDecl", "tagUsed": "class", "isParameterPack": true,
        });
        let built = build_template(node, json!([])).unwrap().unwrap();
        assert_eq!(built.token("name"), None);
        assert_eq!(*built.child("tag").unwrap().kind(), NodeKind::ClassTag);
        assert_eq!(built.token("parameter_pack"), Some("pack"));

        let bad = json!({"id": "0x2", "kind": "TemplateTypeParmDecl", "tagUsed": "struct"});
        let err = build_template(bad, json!([])).unwrap_err();
        assert!(matches!(err.kind, BuildErrorKind::InvalidRecord { .. }));
    }

    #[test]
    fn test_non_type_parameter() {
        let node = json!({
            "id": "0x1", "kind": "NonTypeTemplateParmDecl", "name": "N",
            "inner": [{"id": "0x2", "kind": "IntegerLiteral", "value": "3"}],
        });
        let summary = json!([
            {"node_id": "0x1", "node_inner": [{"kind": "BuiltinType", "type": {"qualType": "int"}}]},
            {"node_id": "0x2", "node_inner": [{"kind": "BuiltinType", "type": {"qualType": "int"}}]},
        ]);
        let built = build_template(node, summary).unwrap().unwrap();
        assert_eq!(built.token("name"), Some("N"));
        assert_eq!(built.child("type").unwrap().token("name"), Some("int"));
        assert_eq!(built.child("default").unwrap().token("value"), Some("3"));
        assert_eq!(built.token("parameter_pack"), None);
    }

    #[test]
    fn test_template_arguments() {
        let value = build_template(json!({"kind": "TemplateArgument", "value": 4}), json!([]))
            .unwrap()
            .unwrap();
        let literal = value.child("expr").unwrap();
        assert_eq!(literal.token("value"), Some("4"));
        assert_eq!(literal.child("type").unwrap().token("name"), Some("int"));

        let ty = json!({"kind": "TemplateArgument",
                        "inner": [{"kind": "BuiltinType", "type": {"qualType": "char"}}]});
        let built = build_template(ty, json!([])).unwrap().unwrap();
        assert_eq!(built.child("type").unwrap().token("name"), Some("char"));
        assert!(built.child("expr").is_none());

        let pack = json!({"kind": "TemplateArgument", "inner": [
            {"kind": "TemplateArgument", "value": 1},
            {"kind": "TemplateArgument", "value": 2},
        ]});
        let built = build_template(pack, json!([])).unwrap().unwrap();
        assert_eq!(built.children("pack").count(), 2);

        let empty = build_template(json!({"kind": "TemplateArgument"}), json!([])).unwrap_err();
        assert!(matches!(empty.kind, BuildErrorKind::UnexpectedChildCount { found: 0, .. }));
    }
}
