//! Expression handlers.

use compact_str::{format_compact, CompactString};
use serde_json::Value;

use super::{
    child_count, is, json, make, unexpected_child, BuildError, BuildErrorKind, Built, Builder,
    JsonNode,
};
use crate::tree::{Category, CppAst, FieldValue, NodeKind, TreeError};

/// The value of a field of a node built by this crate.
fn field_of(node: &CppAst, name: &str) -> Result<FieldValue<NodeKind>, BuildError> {
    node.get(name).cloned().ok_or_else(|| {
        TreeError::UnknownField {
            kind: node.kind().name().into(),
            field: name.into(),
        }
        .into()
    })
}

/// Clang lists the operands of atomic builtins with the memory order second;
/// this restores the order they are written in.
fn atomic_operand_order(name: &str, len: usize) -> Vec<usize> {
    if name.starts_with("__atomic_compare_exchange") && len >= 4 {
        [0, 2].into_iter().chain(4..len).chain([1, 3]).collect()
    } else if len >= 2 {
        [0].into_iter().chain(2..len).chain([1]).collect()
    } else {
        (0..len).collect()
    }
}

impl<'a> Builder<'a> {
    pub(super) fn binary_operator(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let opcode = node.req_str("opcode")?;
        let [lhs, rhs] = self.exact(node)?;
        make(
            kind,
            [("opcode", opcode.into()), ("lhs", lhs.into()), ("rhs", rhs.into())],
        )
        .map(Some)
    }

    pub(super) fn unary_operator(&mut self, node: &'a Value) -> Built {
        let opcode = node.req_str("opcode")?;
        let expr = self.only_child(node)?;
        let postfix = json::scalar(node.req("isPostfix")?);
        make(
            NodeKind::UnaryOperator,
            [("opcode", opcode.into()), ("expr", expr.into()), ("postfix", postfix.into())],
        )
        .map(Some)
    }

    pub(super) fn conditional(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let [cond, true_expr, false_expr] = self.exact(node)?;
        make(
            kind,
            [
                ("cond", cond.into()),
                ("true_expr", true_expr.into()),
                ("false_expr", false_expr.into()),
            ],
        )
        .map(Some)
    }

    /// `a ?: b`. The middle children are the opaque copies of `a`.
    pub(super) fn binary_conditional(&mut self, node: &'a Value) -> Built {
        let [cond, _, _, false_expr] = self.exact(node)?;
        make(
            NodeKind::BinaryConditionalOperator,
            [("cond", cond.into()), ("false_expr", false_expr.into())],
        )
        .map(Some)
    }

    pub(super) fn array_subscript(&mut self, node: &'a Value) -> Built {
        let [base, index] = self.exact(node)?;
        make(
            NodeKind::ArraySubscriptExpr,
            [("base", base.into()), ("index", index.into())],
        )
        .map(Some)
    }

    pub(super) fn call(
        &mut self,
        node: &'a Value,
        kind: NodeKind,
        callee_field: &'static str,
    ) -> Built {
        let mut children = self.subnodes(node)?.into_iter();
        let callee = children
            .next()
            .ok_or_else(|| child_count(node, "at least 1", 0))?;
        make(
            kind,
            [(callee_field, callee.into()), ("args", children.collect::<Vec<_>>().into())],
        )
        .map(Some)
    }

    pub(super) fn operator_call(&mut self, node: &'a Value) -> Built {
        let mut children = self.subnodes(node)?.into_iter();
        let found = children.len();
        let (Some(op), Some(left), right, None) =
            (children.next(), children.next(), children.next(), children.next())
        else {
            return Err(child_count(node, "2 or 3", found));
        };
        make(
            NodeKind::CXXOperatorCallExpr,
            [("op", op.into()), ("left", left.into()), ("right", right.into())],
        )
        .map(Some)
    }

    pub(super) fn member_expr(&mut self, node: &'a Value) -> Built {
        let name = node.req_str("name")?;
        let op = if node.flag("isArrow") { "->" } else { "." };
        let expr = self.optional_child(node)?;
        make(
            NodeKind::MemberExpr,
            [("name", name.into()), ("op", op.into()), ("expr", expr.into())],
        )
        .map(Some)
    }

    /// A reference, named as spelled so qualifiers survive.
    pub(super) fn decl_ref_expr(&mut self, node: &'a Value) -> Built {
        let spelled = self.source.of(node);
        let name = if spelled.is_empty() {
            node.at(&["referencedDecl", "name"])
                .and_then(Value::as_str)
                .ok_or_else(|| json::missing(node, "referencedDecl"))?
        } else {
            spelled
        };
        make(NodeKind::DeclRefExpr, [("name", name.into())]).map(Some)
    }

    pub(super) fn integer_literal(&mut self, node: &'a Value) -> Built {
        let ty = self.resolved_type(node)?;
        let value = json::scalar(node.req("value")?);
        make(
            NodeKind::IntegerLiteral,
            [("type", ty.into()), ("value", value.into())],
        )
        .map(Some)
    }

    /// A floating literal, normalized to a lowercase spelling with a dot.
    pub(super) fn floating_literal(&mut self, node: &'a Value) -> Built {
        let ty = self.resolved_type(node)?;
        let mut value = json::scalar(node.req("value")?).to_lowercase();
        if !value.contains('.') {
            value.push('.');
        }
        make(
            NodeKind::FloatingLiteral,
            [("type", ty.into()), ("value", value.into())],
        )
        .map(Some)
    }

    pub(super) fn imaginary_literal(&mut self, node: &'a Value) -> Built {
        let ty = self.resolved_type(node)?;
        let literal = self.only_child(node)?;
        let value = literal
            .token("value")
            .map(CompactString::from)
            .ok_or_else(|| unexpected_child(node, &literal))?;
        make(
            NodeKind::ImaginaryLiteral,
            [("type", ty.into()), ("value", value.into())],
        )
        .map(Some)
    }

    /// A character literal; clang records the code point.
    pub(super) fn character_literal(&mut self, node: &'a Value) -> Built {
        let value = node.req("value")?;
        let Some(ch) = value
            .as_u64()
            .and_then(|code| u32::try_from(code).ok())
            .and_then(char::from_u32)
        else {
            return Err(BuildErrorKind::InvalidRecord {
                node_id: node.id().into(),
                message: format!("invalid character value `{value}`"),
            }
            .into());
        };
        make(
            NodeKind::CharacterLiteral,
            [("value", format_compact!("{ch}").into())],
        )
        .map(Some)
    }

    /// `12_km`: the suffix is the name of the literal operator, and a numeric
    /// operand is typed as a user-defined literal.
    pub(super) fn user_defined_literal(&mut self, node: &'a Value) -> Built {
        let [func, mut expr] = self.exact(node)?;
        let callee = match func.kind() {
            NodeKind::DeclRefExpr => &func,
            _ => func
                .child("expr")
                .ok_or_else(|| unexpected_child(node, &func))?,
        };
        let suffix = callee
            .token("name")
            .ok_or_else(|| unexpected_child(node, callee))?;
        if matches!(expr.kind(), NodeKind::IntegerLiteral | NodeKind::FloatingLiteral) {
            let ty = make(
                NodeKind::BuiltinType,
                [("name", "user-defined-literal".into())],
            )?;
            expr.set("type", ty.into())?;
        }
        make(
            NodeKind::UserDefinedLiteral,
            [("suffix", suffix.into()), ("expr", expr.into())],
        )
        .map(Some)
    }

    pub(super) fn this_expr(&mut self, node: &'a Value) -> Built {
        if node.flag("implicit") {
            return Ok(None);
        }
        self.marker(NodeKind::CXXThisExpr)
    }

    pub(super) fn cast(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let ty = self.resolved_type(node)?;
        let expr = self.only_child(node)?;
        make(kind, [("type", ty.into()), ("expr", expr.into())]).map(Some)
    }

    pub(super) fn categorized_cast(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let ty = self.resolved_type(node)?;
        let expr = self.only_child(node)?;
        let value_category = node.req_str("valueCategory")?;
        make(
            kind,
            [
                ("type", ty.into()),
                ("expr", expr.into()),
                ("value_category", value_category.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn temporary_object(&mut self, node: &'a Value) -> Built {
        let ty = self.resolved_type(node)?;
        let args = self.subnodes(node)?;
        make(
            NodeKind::CXXTemporaryObjectExpr,
            [("type", ty.into()), ("args", args.into())],
        )
        .map(Some)
    }

    /// `new T[n](args)` or `new (place) T(args)`. The summary records the
    /// pointer type of the result; the allocated type is its pointee.
    pub(super) fn new_expr(&mut self, node: &'a Value) -> Built {
        let mut args = self.subnodes(node)?;
        let array_size = if node.flag("isArray") {
            if args.is_empty() {
                return Err(json::missing(node, "array size"));
            }
            Some(args.remove(0))
        } else {
            None
        };
        let placement = if node.flag("isPlacement") {
            Some(args.pop().ok_or_else(|| json::missing(node, "placement"))?)
        } else {
            None
        };

        let pointer = self.resolved_type(node)?;
        if *pointer.kind() != NodeKind::PointerType {
            return Err(unexpected_child(node, &pointer));
        }
        let ty = pointer
            .take_child("type")
            .ok_or_else(|| json::missing(node, "type"))?;

        make(
            NodeKind::CXXNewExpr,
            [
                ("type", ty.into()),
                ("args", args.into()),
                ("array_size", array_size.into()),
                ("placement", placement.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn delete_expr(&mut self, node: &'a Value) -> Built {
        let expr = self.only_child(node)?;
        let is_array = node.flag("isArrayAsWritten").then_some("array");
        make(
            NodeKind::CXXDeleteExpr,
            [("expr", expr.into()), ("is_array", is_array.into())],
        )
        .map(Some)
    }

    pub(super) fn throw_expr(&mut self, node: &'a Value) -> Built {
        let expr = self.optional_child(node)?;
        make(NodeKind::CXXThrowExpr, [("expr", expr.into())]).map(Some)
    }

    /// `typeid`, `sizeof` and friends: the operand is either a type, recorded
    /// in the summary, or an expression child.
    pub(super) fn type_or_expr(
        &mut self,
        node: &'a Value,
        kind: NodeKind,
        type_key: &str,
    ) -> Built {
        let (expr, ty) = if node.get(type_key).is_some() {
            (None, Some(self.resolved_type(node)?))
        } else {
            let expr = self.subnodes(node)?.into_iter().next();
            (Some(expr.ok_or_else(|| child_count(node, "1", 0))?), None)
        };
        if kind == NodeKind::UnaryExprOrTypeTraitExpr {
            let name = node.req_str("name")?;
            make(
                kind,
                [("name", name.into()), ("expr", expr.into()), ("type", ty.into())],
            )
            .map(Some)
        } else {
            make(kind, [("expr", expr.into()), ("type", ty.into())]).map(Some)
        }
    }

    pub(super) fn constant_expr(&mut self, node: &'a Value) -> Built {
        let expr = self.only_child(node)?;
        let result = node.get("value").map(json::scalar);
        make(
            NodeKind::ConstantExpr,
            [("expr", expr.into()), ("result", result.into())],
        )
        .map(Some)
    }

    pub(super) fn atomic_expr(&mut self, node: &'a Value) -> Built {
        let name = self
            .req_attr_info(node, "name")?
            .as_str()
            .ok_or_else(|| json::missing(node, "name"))?;
        let mut args: Vec<Option<CppAst>> = self.subnodes(node)?.into_iter().map(Some).collect();
        let ordered: Vec<CppAst> = atomic_operand_order(name, args.len())
            .into_iter()
            .filter_map(|index| args[index].take())
            .collect();
        make(
            NodeKind::AtomicExpr,
            [("name", name.into()), ("args", ordered.into())],
        )
        .map(Some)
    }

    /// Returns true if a captured expression refers to a parameter pack.
    fn is_parameter_pack(&self, expr: &Value) -> bool {
        expr.get("referencedDecl")
            .and_then(|decl| self.summary.types.get(decl.id()))
            .is_some_and(|info| info.kind() == Some("PackExpansionType"))
    }

    /// A lambda. Its signature is read from the call operator of the
    /// closure class; captures and body are the remaining children.
    pub(super) fn lambda_expr(&mut self, node: &'a Value) -> Built {
        self.in_function(|this| {
            let closure = node
                .inner()
                .first()
                .ok_or_else(|| json::missing(node, "inner"))?;
            let call_operator = closure
                .inner()
                .iter()
                .find(|method| method.opt_str("name") == Some("operator()"))
                .ok_or_else(|| json::missing(closure, "operator()"))?;
            let mut method = this
                .node(call_operator)?
                .ok_or_else(|| json::missing(closure, "operator()"))?;
            if *method.kind() == NodeKind::FunctionTemplateDecl {
                method = method
                    .take_child("decl")
                    .ok_or_else(|| json::missing(call_operator, "decl"))?;
            }
            let trailing_type = match method.token("trailing_return") {
                Some(_) => method.child("return_type").cloned(),
                None => None,
            };

            let mut capture_exprs = Vec::new();
            let mut body = None;
            let children = this.subnodes_keep_empty(node)?;
            for (built, child) in children.into_iter().zip(node.inner()) {
                let Some(built) = built else {
                    continue;
                };
                let category = built.kind().category();
                match category {
                    _ if *built.kind() == NodeKind::ParenListExpr => {
                        let exprs = built.take_children("exprs");
                        for (expr, expr_node) in exprs.into_iter().zip(child.inner()) {
                            if this.is_parameter_pack(expr_node) {
                                let pack =
                                    make(NodeKind::PackExpansionExpr, [("expr", expr.into())])?;
                                capture_exprs.push(pack);
                            } else {
                                capture_exprs.push(expr);
                            }
                        }
                    }
                    Category::Expr => capture_exprs.push(built),
                    Category::Stmt if body.is_none() => body = Some(built),
                    _ => return Err(unexpected_child(node, &built)),
                }
            }
            let body = body.ok_or_else(|| json::missing(node, "body"))?;

            make(
                NodeKind::LambdaExpr,
                [
                    ("parameters", field_of(&method, "parameters")?),
                    ("trailing_type", trailing_type.into()),
                    ("variadic", field_of(&method, "variadic")?),
                    ("exception", field_of(&method, "exception")?),
                    ("attributes", field_of(&method, "attributes")?),
                    ("capture_exprs", capture_exprs.into()),
                    ("body", body.into()),
                ],
            )
            .map(Some)
        })
    }

    pub(super) fn va_arg_expr(&mut self, node: &'a Value) -> Built {
        let expr = self.only_child(node)?;
        let ty = self.resolved_type(node)?;
        make(
            NodeKind::VAArgExpr,
            [("expr", expr.into()), ("type", ty.into())],
        )
        .map(Some)
    }

    /// `offsetof(T, a.b[i])`. The summary lists the type followed by the
    /// designator components; array indices are the children of the node.
    pub(super) fn offsetof_expr(&mut self, node: &'a Value) -> Built {
        let entries = self
            .summary
            .exprs
            .get(node.id())
            .copied()
            .ok_or_else(|| json::missing(node, "expr_inner"))?;
        let mut indices = self.subnodes(node)?.into_iter();

        let mut ty = None;
        let mut components = Vec::new();
        for entry in entries {
            let built = if entry.kind() == Some("OffsetOfArray") {
                let index = indices
                    .next()
                    .ok_or_else(|| json::missing(node, "array index"))?;
                make(NodeKind::OffsetOfArray, [("index", index.into())])?
            } else {
                match self.node(entry)? {
                    Some(built) => built,
                    None => continue,
                }
            };
            match (&ty, is(&built, Category::OffsetOfComponent)) {
                (None, false) => ty = Some(built),
                (Some(_), true) => components.push(built),
                _ => return Err(unexpected_child(node, &built)),
            }
        }
        let ty = ty.ok_or_else(|| json::missing(node, "type"))?;
        make(
            NodeKind::OffsetOfExpr,
            [("type", ty.into()), ("components", components.into())],
        )
        .map(Some)
    }

    pub(super) fn offsetof_array(&mut self, node: &'a Value) -> Built {
        let index = self.only_child(node)?;
        make(NodeKind::OffsetOfArray, [("index", index.into())]).map(Some)
    }

    pub(super) fn subst_non_type_template_parm_expr(&mut self, node: &'a Value) -> Built {
        let [decl, expr] = self.exact(node)?;
        make(
            NodeKind::SubstNonTypeTemplateParmExpr,
            [("decl", decl.into()), ("expr", expr.into())],
        )
        .map(Some)
    }
}
