//! Declaration handlers.

use compact_str::{format_compact, CompactString};
use rustc_hash::FxHashSet;
use serde_json::Value;

use super::{
    child_count, json, make, patterns::Patterns, unexpected_child, BuildError, BuildErrorKind,
    Built, Builder, JsonNode, SourceLoc,
};
use crate::tree::{Category, CppAst, FieldValue, NodeKind};

/// The children of a function-like declaration, sorted by role.
#[derive(Debug, Default)]
pub(super) struct FunctionParts {
    pub body: Option<CppAst>,
    pub parameters: Vec<CppAst>,
    pub initializers: Vec<CppAst>,
    pub method_attributes: Vec<CppAst>,
    pub attributes: Vec<CppAst>,
    pub exception: Option<CppAst>,
}

/// The pieces shared by every record declaration.
pub(super) struct RecordParts {
    pub name: CompactString,
    pub tag: CompactString,
    pub bases: Vec<CppAst>,
    pub complete: Option<&'static str>,
    pub decls: Vec<CppAst>,
}

fn reject_all(parent: &Value, nodes: &[CppAst]) -> Result<(), BuildError> {
    match nodes.first() {
        Some(node) => Err(unexpected_child(parent, node)),
        None => Ok(()),
    }
}

impl<'a> Builder<'a> {
    pub(super) fn function_parts(
        &mut self,
        node: &'a Value,
        info: &'a Value,
    ) -> Result<FunctionParts, BuildError> {
        let mut parts = FunctionParts::default();
        if info.flag("isNoReturn") {
            parts.attributes.push(make(NodeKind::NoReturnAttr, [])?);
        }
        for child in self.subnodes(node)? {
            match child.kind() {
                NodeKind::ParmVarDecl => parts.parameters.push(child),
                NodeKind::TemplateArgument => {}
                NodeKind::CXXCtorInitializer => parts.initializers.push(child),
                NodeKind::OverrideAttr | NodeKind::FinalAttr => parts.method_attributes.push(child),
                NodeKind::CompoundStmt if parts.body.is_none() => parts.body = Some(child),
                kind if kind.category() == Category::Attr => parts.attributes.push(child),
                _ => return Err(unexpected_child(node, &child)),
            }
        }
        parts.exception = self.exception_spec(node, info)?;
        Ok(parts)
    }

    /// The exception specification of a function type.
    ///
    /// A basic `noexcept` may be implied by the compiler, so it is kept only
    /// when the keyword is spelled in the declaration.
    fn exception_spec(
        &mut self,
        node: &'a Value,
        info: &'a Value,
    ) -> Result<Option<CppAst>, BuildError> {
        let Some(spec) = info.get("exception_spec") else {
            return Ok(None);
        };
        if spec.flag("isDynamic") {
            let mut args = Vec::new();
            for ty in spec.inner() {
                args.extend(self.node(ty)?);
            }
            make(NodeKind::Throw, [("args", args.into())]).map(Some)
        } else if spec.flag("isNoThrow") {
            make(NodeKind::NoThrow, []).map(Some)
        } else if spec.flag("isBasic") && self.source.of(node).contains("noexcept") {
            make(
                NodeKind::NoExcept,
                [("repr", spec.opt_str("expr_repr").into())],
            )
            .map(Some)
        } else {
            Ok(None)
        }
    }

    pub(super) fn is_variadic(node: &Value) -> Result<Option<&'static str>, BuildError> {
        let patterns = Patterns::get()?;
        let spelling = node
            .at(&["type", "qualType"])
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(patterns.variadic.is_match(spelling).then_some("..."))
    }

    fn defaulted(node: &Value) -> Result<Option<CppAst>, BuildError> {
        let kind = if node.flag("explicitlyDefaulted") {
            NodeKind::Default
        } else if node.flag("explicitlyDeleted") {
            NodeKind::Delete
        } else if node.flag("pure") {
            NodeKind::PureVirtual
        } else {
            return Ok(None);
        };
        make(kind, []).map(Some)
    }

    fn virtual_of(node: &Value) -> Result<Option<CppAst>, BuildError> {
        if node.flag("virtual") {
            make(NodeKind::Virtual, []).map(Some)
        } else {
            Ok(None)
        }
    }

    fn explicit_of(&self, node: &Value) -> Option<&'static str> {
        self.summary
            .explicit
            .get(node.id())
            .copied()
            .unwrap_or_default()
            .then_some("explicit")
    }

    pub(super) fn function_decl(&mut self, node: &'a Value) -> Built {
        self.in_function(|this| {
            let name = node.req_str("name")?;
            let info = this.type_info(node)?;
            let return_type = this.node(info)?.and_then(|ty| ty.take_child("return_type"));
            let parts = this.function_parts(node, info)?;
            reject_all(node, &parts.initializers)?;
            reject_all(node, &parts.method_attributes)?;

            make(
                NodeKind::FunctionDecl,
                [
                    ("name", name.into()),
                    ("return_type", return_type.into()),
                    (
                        "trailing_return",
                        info
                            .flag("trailingReturn")
                            .then_some("trailing-return")
                            .into(),
                    ),
                    ("parameters", parts.parameters.into()),
                    ("variadic", Self::is_variadic(node)?.into()),
                    ("inline", node.flag("inline").then_some("inline").into()),
                    ("storage", node.opt_str("storageClass").into()),
                    ("attributes", parts.attributes.into()),
                    ("defaulted", Self::defaulted(node)?.into()),
                    ("exception", parts.exception.into()),
                    ("body", parts.body.into()),
                ],
            )
            .map(Some)
        })
    }

    pub(super) fn method_decl(&mut self, node: &'a Value) -> Built {
        if node.flag("isImplicit") {
            return Ok(None);
        }
        self.in_function(|this| {
            let name = node.req_str("name")?;
            let info = this.type_info(node)?;
            let parts = this.function_parts(node, info)?;
            reject_all(node, &parts.initializers)?;

            let return_type = this
                .node(info)?
                .and_then(|ty| ty.take_child("return_type"))
                .ok_or_else(|| json::missing(info, "return type"))?;
            let ref_qualifier = match info.opt_str("ref_qualifier") {
                None => None,
                Some("LValue") => Some("&"),
                Some("RValue") => Some("&&"),
                Some(other) => {
                    return Err(BuildErrorKind::InvalidRecord {
                        node_id: node.id().into(),
                        message: format!("unknown reference qualifier `{other}`"),
                    }
                    .into())
                }
            };

            make(
                NodeKind::CXXMethodDecl,
                [
                    ("name", name.into()),
                    ("return_type", return_type.into()),
                    (
                        "trailing_return",
                        info
                            .flag("trailingReturn")
                            .then_some("trailing-return")
                            .into(),
                    ),
                    ("parameters", parts.parameters.into()),
                    ("variadic", Self::is_variadic(node)?.into()),
                    ("inline", node.flag("inline").then_some("inline").into()),
                    ("storage", node.opt_str("storageClass").into()),
                    ("virtual", Self::virtual_of(node)?.into()),
                    ("const", info.flag("isconst").then_some("const").into()),
                    ("ref_qualifier", ref_qualifier.into()),
                    ("method_attributes", parts.method_attributes.into()),
                    ("attributes", parts.attributes.into()),
                    ("defaulted", Self::defaulted(node)?.into()),
                    ("exception", parts.exception.into()),
                    ("body", parts.body.into()),
                ],
            )
            .map(Some)
        })
    }

    pub(super) fn constructor_decl(&mut self, node: &'a Value) -> Built {
        if node.flag("isImplicit") {
            return Ok(None);
        }
        self.in_function(|this| {
            let name = node.req_str("name")?;
            let parts = this.function_parts(node, this.type_info(node)?)?;
            reject_all(node, &parts.method_attributes)?;

            make(
                NodeKind::CXXConstructorDecl,
                [
                    ("name", name.into()),
                    ("explicit", this.explicit_of(node).into()),
                    ("parameters", parts.parameters.into()),
                    ("initializers", parts.initializers.into()),
                    ("attributes", parts.attributes.into()),
                    ("defaulted", Self::defaulted(node)?.into()),
                    ("exception", parts.exception.into()),
                    ("body", parts.body.into()),
                ],
            )
            .map(Some)
        })
    }

    pub(super) fn destructor_decl(&mut self, node: &'a Value) -> Built {
        if node.flag("isImplicit") {
            return Ok(None);
        }
        self.in_function(|this| {
            let name = node.req_str("name")?;
            let parts = this.function_parts(node, this.type_info(node)?)?;
            reject_all(node, &parts.parameters)?;
            reject_all(node, &parts.initializers)?;
            reject_all(node, &parts.method_attributes)?;

            make(
                NodeKind::CXXDestructorDecl,
                [
                    ("name", name.into()),
                    ("virtual", Self::virtual_of(node)?.into()),
                    ("attributes", parts.attributes.into()),
                    ("defaulted", Self::defaulted(node)?.into()),
                    ("exception", parts.exception.into()),
                    ("body", parts.body.into()),
                ],
            )
            .map(Some)
        })
    }

    pub(super) fn conversion_decl(&mut self, node: &'a Value) -> Built {
        self.in_function(|this| {
            let name = node.req_str("name")?;
            let info = this.type_info(node)?;
            let parts = this.function_parts(node, info)?;
            reject_all(node, &parts.parameters)?;
            reject_all(node, &parts.initializers)?;

            make(
                NodeKind::CXXConversionDecl,
                [
                    ("name", name.into()),
                    ("explicit", this.explicit_of(node).into()),
                    ("inline", node.flag("inline").then_some("inline").into()),
                    ("const", info.flag("isconst").then_some("const").into()),
                    ("attributes", parts.attributes.into()),
                    ("exception", parts.exception.into()),
                    ("body", parts.body.into()),
                ],
            )
            .map(Some)
        })
    }

    /// A member or base initializer. Initializers the user did not write
    /// have no arguments and are dropped.
    pub(super) fn ctor_initializer(&mut self, node: &'a Value) -> Built {
        let name = if let Some(member) = node.get("anyInit") {
            member.req_str("name")?
        } else if let Some(base) = node.get("baseInit") {
            base.req_str("qualType")?
        } else {
            return Err(json::missing(node, "anyInit"));
        };
        let args = self.subnodes(node)?;
        if args.is_empty() && node.get("anyInit").is_some() {
            return Ok(None);
        }
        make(
            NodeKind::CXXCtorInitializer,
            [("name", name.into()), ("args", args.into())],
        )
        .map(Some)
    }

    pub(super) fn parm_var_decl(&mut self, node: &'a Value) -> Built {
        let ty = self.resolved_type(node)?;
        let mut default = None;
        let mut attributes = Vec::new();
        for child in self.subnodes(node)? {
            match child.kind().category() {
                Category::Expr if default.is_none() => default = Some(child),
                Category::Attr => attributes.push(child),
                _ => return Err(unexpected_child(node, &child)),
            }
        }
        make(
            NodeKind::ParmVarDecl,
            [
                ("name", node.opt_str("name").into()),
                ("type", ty.into()),
                ("default", default.into()),
                ("attributes", attributes.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn var_decl(&mut self, node: &'a Value) -> Built {
        let ty = self.resolved_type(node)?;
        let mut children = self.subnodes(node)?;
        let (init, init_mode) = match node.opt_str("init") {
            Some(mode) => {
                let init = children
                    .pop()
                    .ok_or_else(|| json::missing(node, "initializer"))?;
                (Some(init), Some(mode))
            }
            None => (None, None),
        };
        make(
            NodeKind::VarDecl,
            [
                ("name", node.opt_str("name").into()),
                ("type", ty.into()),
                ("storage_class", node.opt_str("storageClass").into()),
                ("tls", node.opt_str("tls").into()),
                ("init_mode", init_mode.into()),
                ("implicit", node.flag("isImplicit").then_some("implicit").into()),
                ("referenced", node.flag("isReferenced").then_some("referenced").into()),
                ("init", init.into()),
                ("attributes", children.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn field_decl(&mut self, node: &'a Value) -> Built {
        let ty = self.resolved_type(node)?;
        let mut children = self.subnodes(node)?.into_iter();
        let mut next_child = |what: &str| children.next().ok_or_else(|| json::missing(node, what));
        let bitwidth = if node.flag("isBitfield") {
            Some(next_child("bit width")?)
        } else {
            None
        };
        let init = if node.flag("hasInClassInitializer") {
            Some(next_child("initializer")?)
        } else {
            None
        };
        make(
            NodeKind::FieldDecl,
            [
                ("name", node.opt_str("name").into()),
                ("type", ty.into()),
                ("type_qualifier", node.flag("mutable").then_some("mutable").into()),
                ("bitwidth", bitwidth.into()),
                ("init", init.into()),
                ("attributes", children.collect::<Vec<_>>().into()),
            ],
        )
        .map(Some)
    }

    /// Builds the name, tag, bases and members of a record.
    pub(super) fn record_parts(
        &mut self,
        node: &'a Value,
        tag: &str,
    ) -> Result<RecordParts, BuildError> {
        let name = match node.opt_str("name") {
            Some(name) => CompactString::from(name),
            None => {
                let loc = SourceLoc::of(node).unwrap_or_default();
                let location = format!(
                    "(unnamed {tag} at {}:{}:{})",
                    loc.file().or(self.last_file).unwrap_or(self.main_file),
                    loc.presumed_line.or(loc.line).unwrap_or_default(),
                    loc.col.unwrap_or_default(),
                );
                self.anonymous.assign(node.id(), location)
            }
        };

        let mut bases = Vec::new();
        let listed = node.get("bases").and_then(Value::as_array);
        for base in listed.map_or(&[][..], Vec::as_slice) {
            bases.push(self.base(base)?);
        }

        let mut decls = self.subnodes(node)?;
        self.hide_transparent_records(node, &mut decls)?;

        Ok(RecordParts {
            name,
            tag: tag.into(),
            bases,
            complete: node.flag("completeDefinition").then_some("complete"),
            decls,
        })
    }

    fn base(&self, base: &Value) -> Result<CppAst, BuildError> {
        let access_spec = match base.req_str("writtenAccess")? {
            "none" => None,
            "public" => Some(make(NodeKind::Public, [])?),
            "protected" => Some(make(NodeKind::Protected, [])?),
            "private" => Some(make(NodeKind::Private, [])?),
            other => {
                return Err(BuildErrorKind::InvalidRecord {
                    node_id: base.id().into(),
                    message: format!("unknown access `{other}`"),
                }
                .into())
            }
        };
        let virtual_ = if base.flag("isVirtual") {
            Some(make(NodeKind::Virtual, [])?)
        } else {
            None
        };
        let name = base
            .at(&["type", "qualType"])
            .and_then(Value::as_str)
            .ok_or_else(|| json::missing(base, "type"))?;
        make(
            NodeKind::Base,
            [
                ("access_spec", access_spec.into()),
                ("virtual", virtual_.into()),
                ("name", self.mangle(name).into()),
            ],
        )
    }

    /// Clears the name of anonymous member records whose fields are all
    /// reachable as indirect fields of `node`, so they are written as a
    /// transparent member group.
    fn hide_transparent_records(
        &self,
        node: &Value,
        decls: &mut [CppAst],
    ) -> Result<(), BuildError> {
        let indirect: FxHashSet<&str> = node
            .inner()
            .iter()
            .filter(|child| child.kind() == Some("IndirectFieldDecl"))
            .filter_map(|child| child.opt_str("name"))
            .collect();

        for decl in decls {
            if !matches!(decl.kind(), NodeKind::CXXRecordDecl | NodeKind::RecordDecl) {
                continue;
            }
            let name = decl.token("name");
            if !name.is_some_and(|name| self.anonymous.is_anonymous(name)) {
                continue;
            }
            let transparent = decl
                .children("decls")
                .filter(|field| *field.kind() == NodeKind::FieldDecl)
                .all(|field| {
                    field
                        .token("name")
                        .is_some_and(|name| indirect.contains(name))
                });
            if transparent {
                decl.set("name", "".into())?;
            }
        }
        Ok(())
    }

    /// Replaces the spelling of an anonymous record type with its synthetic
    /// name.
    pub(super) fn mangle(&self, spelling: &str) -> CompactString {
        ["struct ", "union ", "class "]
            .iter()
            .find_map(|prefix| spelling.strip_prefix(prefix))
            .and_then(|location| self.anonymous.by_location.get(location))
            .cloned()
            .unwrap_or_else(|| spelling.into())
    }

    pub(super) fn record_decl(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        if node.flag("isImplicit") {
            return Ok(None);
        }
        let tag = node.req_str("tagUsed")?;
        let parts = self.record_parts(node, tag)?;
        make(
            kind,
            [
                ("name", parts.name.into()),
                ("tag", parts.tag.into()),
                ("bases", parts.bases.into()),
                ("complete", parts.complete.into()),
                ("decls", parts.decls.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn named_type_decl(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let name = node.req_str("name")?;
        let ty = self.only_child(node)?;
        make(kind, [("name", name.into()), ("type", ty.into())]).map(Some)
    }

    pub(super) fn namespace_decl(&mut self, node: &'a Value) -> Built {
        let decls = self.subnodes(node)?;
        make(
            NodeKind::NamespaceDecl,
            [
                ("name", node.opt_str("name").into()),
                ("inline", node.flag("isInline").then_some("inline").into()),
                ("decls", decls.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn using_directive_decl(&mut self, node: &'a Value) -> Built {
        let name = node
            .at(&["nominatedNamespace", "name"])
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| json::missing(node, "nominatedNamespace"))?;
        make(NodeKind::UsingDirectiveDecl, [("name", name.into())]).map(Some)
    }

    pub(super) fn static_assert_decl(&mut self, node: &'a Value) -> Built {
        let mut children = self.subnodes(node)?.into_iter();
        let (Some(cond), message, None) = (children.next(), children.next(), children.next()) else {
            return Err(child_count(node, "1 or 2", node.inner().len()));
        };
        let message = message.and_then(|message| message.token("value").map(CompactString::from));
        make(
            NodeKind::StaticAssertDecl,
            [("cond", cond.into()), ("message", message.into())],
        )
        .map(Some)
    }

    pub(super) fn enum_decl(&mut self, node: &'a Value) -> Built {
        let fields = self.subnodes(node)?;
        let underlying_type = node
            .at(&["fixedUnderlyingType", "qualType"])
            .and_then(Value::as_str);
        make(
            NodeKind::EnumDecl,
            [
                ("name", node.opt_str("name").into()),
                ("scoped", node.opt_str("scopedEnumTag").into()),
                ("underlying_type", underlying_type.into()),
                ("fields", fields.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn enum_constant_decl(&mut self, node: &'a Value) -> Built {
        let name = node.req_str("name")?;
        let init = self.subnodes(node)?.into_iter().next();
        make(
            NodeKind::EnumConstantDecl,
            [("name", name.into()), ("init", init.into())],
        )
        .map(Some)
    }

    pub(super) fn access_spec_decl(&mut self, node: &'a Value) -> Built {
        let access_spec = match node.req_str("access")? {
            "public" => NodeKind::Public,
            "protected" => NodeKind::Protected,
            "private" => NodeKind::Private,
            other => {
                return Err(BuildErrorKind::InvalidRecord {
                    node_id: node.id().into(),
                    message: format!("unknown access `{other}`"),
                }
                .into())
            }
        };
        make(
            NodeKind::AccessSpecDecl,
            [("access_spec", make(access_spec, [])?.into())],
        )
        .map(Some)
    }

    pub(super) fn friend_decl(&mut self, node: &'a Value) -> Built {
        let spelling = node
            .at(&["type", "qualType"])
            .and_then(Value::as_str)
            .ok_or_else(|| json::missing(node, "type"))?;
        make(
            NodeKind::FriendDecl,
            [("type", self.mangle(spelling).into())],
        )
        .map(Some)
    }

    /// Resolves a statement to its single declaration.
    pub(super) fn single_decl(parent: &Value, stmt: CppAst) -> Result<CppAst, BuildError> {
        if *stmt.kind() != NodeKind::DeclStmt {
            return Err(unexpected_child(parent, &stmt));
        }
        let mut decls = stmt.take_children("decls");
        match decls.len() {
            1 => Ok(decls.remove(0)),
            found => Err(BuildErrorKind::UnexpectedChildCount {
                kind: format_compact!("{} declaration", parent.kind().unwrap_or_default()),
                expected: "1".into(),
                found,
            }
            .into()),
        }
    }
}

/// Sets an optional field back to empty.
pub(super) fn clear(node: &mut CppAst, field: &str) -> Result<(), BuildError> {
    node.set(field, FieldValue::Optional(None))?;
    Ok(())
}
