//! Statement handlers.

use compact_str::CompactString;
use serde_json::Value;

use super::{
    as_statement, as_statements, child_count, decl::clear, is, json, make, unexpected_child,
    BuildError, Built, Builder, JsonNode,
};
use crate::tree::{Category, CppAst, NodeKind};

fn tokens(items: &[&str]) -> Vec<CompactString> {
    items.iter().copied().map(CompactString::from).collect()
}

/// Follows a path of child indices through `inner` lists.
fn nested<'v>(node: &'v Value, path: &[usize]) -> Result<&'v Value, BuildError> {
    path.iter()
        .try_fold(node, |node, index| node.inner().get(*index))
        .ok_or_else(|| json::missing(node, "inner"))
}

impl<'a> Builder<'a> {
    /// Builds exactly `N` children.
    pub(super) fn exact<const N: usize>(
        &mut self,
        node: &'a Value,
    ) -> Result<[CppAst; N], BuildError> {
        let children = self.subnodes(node)?;
        let found = children.len();
        children
            .try_into()
            .map_err(|_| child_count(node, &N.to_string(), found))
    }

    pub(super) fn compound_stmt(&mut self, node: &'a Value) -> Built {
        let stmts = as_statements(self.subnodes(node)?)?;
        make(NodeKind::CompoundStmt, [("stmts", stmts.into())]).map(Some)
    }

    pub(super) fn decl_stmt(&mut self, node: &'a Value) -> Built {
        let decls = self.subnodes(node)?;
        make(NodeKind::DeclStmt, [("decls", decls.into())]).map(Some)
    }

    pub(super) fn return_stmt(&mut self, node: &'a Value) -> Built {
        let value = self.optional_child(node)?;
        make(NodeKind::ReturnStmt, [("value", value.into())]).map(Some)
    }

    /// Wraps a condition: a declared variable or a plain expression.
    fn condition(node: &Value, cond: CppAst, has_var: bool) -> Result<CppAst, BuildError> {
        if has_var {
            let decl = Self::single_decl(node, cond)?;
            make(
                NodeKind::DeclOrExpr,
                [("decl", Some(decl).into()), ("expr", None::<CppAst>.into())],
            )
        } else if is(&cond, Category::Expr) {
            make(
                NodeKind::DeclOrExpr,
                [("decl", None::<CppAst>.into()), ("expr", Some(cond).into())],
            )
        } else {
            Err(unexpected_child(node, &cond))
        }
    }

    pub(super) fn if_stmt(&mut self, node: &'a Value) -> Built {
        let mut children = self.subnodes(node)?.into_iter();
        let has_var = node.flag("hasVar");
        let cond = children
            .next()
            .ok_or_else(|| child_count(node, "2 or 3", 0))?;
        let cond = Self::condition(node, cond, has_var)?;
        if has_var {
            // the implicit evaluation of the declared variable
            children.next();
        }
        let (true_body, false_body) = match (children.next(), children.next(), children.next()) {
            (Some(true_body), false_body, None) => (true_body, false_body),
            _ => return Err(child_count(node, "2 or 3", node.inner().len())),
        };
        make(
            NodeKind::IfStmt,
            [
                ("constexpr", node.flag("isConstexpr").then_some("constexpr").into()),
                ("cond", cond.into()),
                ("true_body", as_statement(true_body)?.into()),
                ("false_body", false_body.map(as_statement).transpose()?.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn while_stmt(&mut self, node: &'a Value) -> Built {
        let has_var = node.flag("hasVar");
        let (cond, body) = if has_var {
            let [var, _, body] = self.exact(node)?;
            (var, body)
        } else {
            let [cond, body] = self.exact(node)?;
            (cond, body)
        };
        make(
            NodeKind::WhileStmt,
            [
                ("cond", Self::condition(node, cond, has_var)?.into()),
                ("body", as_statement(body)?.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn do_stmt(&mut self, node: &'a Value) -> Built {
        let [body, cond] = self.exact(node)?;
        make(
            NodeKind::DoStmt,
            [("body", as_statement(body)?.into()), ("cond", cond.into())],
        )
        .map(Some)
    }

    /// A `for` loop. Clang always dumps five slots (init, condition variable,
    /// condition, increment, body), leaving absent ones empty.
    pub(super) fn for_stmt(&mut self, node: &'a Value) -> Built {
        let slots = self.subnodes_keep_empty(node)?;
        let found = slots.len();
        let Ok([init, cond_var, cond, inc, body]) = <[Option<CppAst>; 5]>::try_from(slots) else {
            return Err(child_count(node, "5", found));
        };

        let init = match init {
            None => None,
            Some(init) if *init.kind() == NodeKind::DeclStmt => Some(make(
                NodeKind::DeclsOrExpr,
                [("decls", init.take_children("decls").into()), ("expr", None::<CppAst>.into())],
            )?),
            Some(init) if is(&init, Category::Expr) => Some(make(
                NodeKind::DeclsOrExpr,
                [("decls", Vec::<CppAst>::new().into()), ("expr", Some(init).into())],
            )?),
            Some(init) => return Err(unexpected_child(node, &init)),
        };
        let cond = match (cond_var, cond) {
            (Some(var), _) => Some(Self::condition(node, var, true)?),
            (None, Some(cond)) => Some(Self::condition(node, cond, false)?),
            (None, None) => None,
        };
        let body = body.ok_or_else(|| json::missing(node, "body"))?;

        make(
            NodeKind::ForStmt,
            [
                ("init", init.into()),
                ("cond", cond.into()),
                ("inc", inc.into()),
                ("body", as_statement(body)?.into()),
            ],
        )
        .map(Some)
    }

    /// A range-based `for`. The range expression and the loop variable are
    /// recovered from the implicit statements clang generates around them.
    pub(super) fn for_range_stmt(&mut self, node: &'a Value) -> Built {
        let range = self
            .node(nested(node, &[1, 0, 0])?)?
            .ok_or_else(|| json::missing(node, "range"))?;
        let decl_stmt = self
            .node(nested(node, &[6])?)?
            .ok_or_else(|| json::missing(node, "loop variable"))?;
        let body = self
            .node(nested(node, &[7])?)?
            .ok_or_else(|| json::missing(node, "body"))?;

        let mut decl = Self::single_decl(node, decl_stmt)?;
        if *decl.kind() == NodeKind::VarDecl {
            clear(&mut decl, "init")?;
            clear(&mut decl, "init_mode")?;
        }
        make(
            NodeKind::CXXForRangeStmt,
            [
                ("decl", decl.into()),
                ("range", range.into()),
                ("body", as_statement(body)?.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn switch_stmt(&mut self, node: &'a Value) -> Built {
        let [cond, body] = self.exact(node)?;
        make(
            NodeKind::SwitchStmt,
            [("cond", cond.into()), ("body", as_statement(body)?.into())],
        )
        .map(Some)
    }

    /// A `case`, possibly with a GNU range end.
    pub(super) fn case_stmt(&mut self, node: &'a Value) -> Built {
        let mut children = self.subnodes(node)?;
        let (pattern, pattern_end, stmt) = match children.len() {
            2 => {
                let stmt = children.remove(1);
                (children.remove(0), None, stmt)
            }
            3 => {
                let stmt = children.remove(2);
                let pattern_end = children.remove(1);
                (children.remove(0), Some(pattern_end), stmt)
            }
            found => return Err(child_count(node, "2 or 3", found)),
        };
        make(
            NodeKind::CaseStmt,
            [
                ("pattern", pattern.into()),
                ("pattern_end", pattern_end.into()),
                ("stmt", as_statement(stmt)?.into()),
            ],
        )
        .map(Some)
    }

    pub(super) fn default_stmt(&mut self, node: &'a Value) -> Built {
        let stmt = self.only_child(node)?;
        make(
            NodeKind::DefaultStmt,
            [("stmt", as_statement(stmt)?.into())],
        )
        .map(Some)
    }

    pub(super) fn label_stmt(&mut self, node: &'a Value) -> Built {
        let name = node.req_str("name")?;
        self.declare_label(node.opt_str("declId").unwrap_or(node.id()), name);
        let stmt = self.only_child(node)?;
        make(
            NodeKind::LabelStmt,
            [("name", name.into()), ("stmt", as_statement(stmt)?.into())],
        )
        .map(Some)
    }

    /// A `goto`. Its target is the label name when the label was already
    /// seen, otherwise it is patched when the enclosing function is closed.
    /// Without a label id the target is read from the source text.
    pub(super) fn goto_stmt(&mut self, node: &'a Value) -> Built {
        let spelled = self.source.of(node).replacen("goto", "", 1);
        let mut goto = make(NodeKind::GotoStmt, [("target", spelled.trim().into())])?;
        if let Some(label) = node.opt_str("targetLabelDeclId") {
            if let Some(name) = self.reference_label(label, goto.seq()) {
                goto.set("target", name.into())?;
            }
        }
        Ok(Some(goto))
    }

    pub(super) fn attributed_stmt(&mut self, node: &'a Value) -> Built {
        let mut children = self.subnodes(node)?;
        let stmt = children
            .pop()
            .ok_or_else(|| child_count(node, "at least 1", 0))?;
        make(
            NodeKind::AttributedStmt,
            [("attributes", children.into()), ("stmt", as_statement(stmt)?.into())],
        )
        .map(Some)
    }

    pub(super) fn try_stmt(&mut self, node: &'a Value) -> Built {
        let mut children = self.subnodes(node)?.into_iter();
        let body = children
            .next()
            .ok_or_else(|| child_count(node, "at least 1", 0))?;
        let handlers = as_statements(children.collect())?;
        make(
            NodeKind::CXXTryStmt,
            [("body", as_statement(body)?.into()), ("handlers", handlers.into())],
        )
        .map(Some)
    }

    /// A `catch` handler; `catch (...)` has no declaration.
    pub(super) fn catch_stmt(&mut self, node: &'a Value) -> Built {
        let mut slots = self.subnodes_keep_empty(node)?;
        let found = slots.len();
        let (decl, body) = match (slots.pop(), slots.pop(), slots.pop()) {
            (Some(Some(body)), decl, None) => (decl.flatten(), body),
            _ => return Err(child_count(node, "1 or 2", found)),
        };
        make(
            NodeKind::CXXCatchStmt,
            [("decl", decl.into()), ("body", body.into())],
        )
        .map(Some)
    }

    /// Inline assembly. Operands are paired with the constraints recorded
    /// for their node ids.
    pub(super) fn asm_stmt(&mut self, node: &'a Value) -> Built {
        let info = self
            .summary
            .asms
            .get(node.id())
            .cloned()
            .ok_or_else(|| json::missing(node, "asm_string"))?;

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for child in node.inner() {
            let Some(expr) = self.node(child)? else {
                continue;
            };
            let constrained = |constraint: &str, expr: CppAst| {
                make(
                    NodeKind::ConstrainedExpression,
                    [("expr", expr.into()), ("constraint", constraint.into())],
                )
            };
            match (
                info
                    .input_constraints
                    .get(child.id())
                    .filter(|c| !c.is_empty()),
                info
                    .output_constraints
                    .get(child.id())
                    .filter(|c| !c.is_empty()),
            ) {
                (Some(input), Some(output)) => {
                    inputs.push(constrained(input, expr.clone())?);
                    outputs.push(constrained(output, expr)?);
                }
                (Some(input), None) => inputs.push(constrained(input, expr)?),
                (None, Some(output)) => outputs.push(constrained(output, expr)?),
                (None, None) => {}
            }
        }

        make(
            NodeKind::GCCAsmStmt,
            [
                ("string", info.asm_string.into()),
                ("output_operands", outputs.into()),
                ("input_operands", inputs.into()),
                ("clobbers", tokens(&info.clobbers).into()),
                ("labels", tokens(&info.labels).into()),
            ],
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::builder::{build, BuildErrorKind};

    fn int_type(id: &str) -> Value {
        json!({"node_id": id, "node_inner": [{"kind": "BuiltinType", "type": {"qualType": "int"}}]})
    }

    fn function(body: Value, summary: Vec<Value>) -> Value {
        let mut summary = summary;
        summary.push(json!({"node_id": "0x2", "kind": "FunctionProtoType",
                            "inner": [{"kind": "BuiltinType", "type": {"qualType": "int"}}]}));
        json!({
            "TypeSummary": summary,
            "Content": {"kind": "TranslationUnitDecl", "id": "0x1", "inner": [{
                "id": "0x2", "kind": "FunctionDecl", "loc": {"offset": 4, "file": "<stdin>"},
                "name": "f", "type": {"qualType": "int ()"},
                "inner": [body],
            }]},
        })
    }

    #[test]
    fn test_for_stmt() {
        let body = json!({"id": "0x3", "kind": "CompoundStmt", "inner": [{
            "id": "0x4", "kind": "ForStmt",
            "inner": [
                {"id": "0x5", "kind": "DeclStmt", "inner": [
                    {"id": "0x6", "kind": "VarDecl", "name": "i", "init": "c",
                     "inner": [{"id": "0x7", "kind": "IntegerLiteral", "value": "0"}]},
                ]},
                {},
                {"id": "0x8", "kind": "BinaryOperator", "opcode": "<", "inner": [
                    {"id": "0x9", "kind": "ImplicitCastExpr", "inner": [
                        {"id": "0xa", "kind": "DeclRefExpr", "referencedDecl": {"name": "i"}},
                    ]},
                    {"id": "0xb", "kind": "IntegerLiteral", "value": "10"},
                ]},
                {"id": "0xc", "kind": "UnaryOperator", "opcode": "++", "isPostfix": true, "inner": [
                    {"id": "0xd", "kind": "DeclRefExpr", "referencedDecl": {"name": "i"}},
                ]},
                {"id": "0xe", "kind": "CompoundStmt"},
            ],
        }]});
        let summary = ["0x6", "0x7", "0x9", "0xb"].into_iter().map(int_type).collect();
        let unit = build(&function(body, summary), "").unwrap();

        let function = unit
            .children("stmts")
            .next()
            .unwrap()
            .children("decls")
            .next()
            .unwrap();
        let for_stmt = function
            .child("body")
            .unwrap()
            .children("stmts")
            .next()
            .unwrap();
        assert_eq!(*for_stmt.kind(), NodeKind::ForStmt);
        let init = for_stmt.child("init").unwrap();
        assert_eq!(*init.kind(), NodeKind::DeclsOrExpr);
        assert_eq!(
            init.children("decls").next().unwrap().token("name"),
            Some("i")
        );
        let cond = for_stmt.child("cond").unwrap();
        assert_eq!(cond.child("expr").unwrap().token("opcode"), Some("<"));
        let inc = for_stmt.child("inc").unwrap();
        assert_eq!(inc.token("postfix"), Some("true"));
        assert_eq!(for_stmt.child("body").unwrap().children("stmts").count(), 0);
    }

    #[test]
    fn test_asm_operands() {
        let operand = |id: &str, name: &str| {
            json!({"id": id, "kind": "DeclRefExpr", "referencedDecl": {"name": name}})
        };
        let body = json!({"id": "0x3", "kind": "CompoundStmt", "inner": [{
            "id": "0x4", "kind": "GCCAsmStmt",
            "inner": [
                operand("0x5", "x"), operand("0x6", "y"), operand("0x7", "z"), operand("0x8", "w"),
            ],
        }]});
        let asm = json!({
            "node_id": "0x4", "asm_string": "add %1, %0",
            "output_constraints": [{"id": "0x5", "constraint": "=r"}],
            "input_constraints": [
                {"id": "0x5", "constraint": "r"},
                {"id": "0x6", "constraint": "m"},
                {"id": "0x8", "constraint": ""},
            ],
            "clobbers": [{"clobber": "cc"}],
        });
        let unit = build(&function(body, vec![asm]), "").unwrap();
        let function = unit
            .children("stmts")
            .next()
            .unwrap()
            .children("decls")
            .next()
            .unwrap();
        let asm = function
            .child("body")
            .unwrap()
            .children("stmts")
            .next()
            .unwrap();
        assert_eq!(*asm.kind(), NodeKind::GCCAsmStmt);
        assert_eq!(asm.token("string"), Some("add %1, %0"));

        let operands = |field: &str| -> Vec<_> {
            asm.children(field)
                .map(|operand| {
                    let expr = operand.child("expr").unwrap().token("name").unwrap();
                    (expr, operand.token("constraint").unwrap())
                })
                .collect()
        };
        // an operand with both constraints is listed on both sides
        assert_eq!(operands("output_operands"), [("x", "=r")]);
        assert_eq!(operands("input_operands"), [("x", "r"), ("y", "m")]);
        let clobbers: Vec<_> = asm
            .get("clobbers")
            .unwrap()
            .values()
            .iter()
            .filter_map(|v| v.as_token())
            .collect();
        assert_eq!(clobbers, ["cc"]);
    }

    #[test]
    fn test_forward_goto() {
        let source = "int f() { goto end; end: ; }";
        let body = json!({"id": "0x3", "kind": "CompoundStmt", "inner": [
            {"id": "0x4", "kind": "GotoStmt", "targetLabelDeclId": "0x9",
             "range": {"begin": {"offset": 10, "tokLen": 4}, "end": {"offset": 15, "tokLen": 3}}},
            {"id": "0x5", "kind": "LabelStmt", "name": "end", "declId": "0x9",
             "inner": [{"id": "0x6", "kind": "NullStmt"}]},
        ]});
        let unit = build(&function(body, Vec::new()), source).unwrap();
        let function = unit
            .children("stmts")
            .next()
            .unwrap()
            .children("decls")
            .next()
            .unwrap();
        let mut stmts = function.child("body").unwrap().children("stmts");
        assert_eq!(stmts.next().unwrap().token("target"), Some("end"));
        assert_eq!(stmts.next().unwrap().token("name"), Some("end"));
    }

    #[test]
    fn test_goto_patched_by_label_id() {
        // the spelled target differs from the label so the patch is observable
        let body = json!({"id": "0x3", "kind": "CompoundStmt", "inner": [
            {"id": "0x4", "kind": "GotoStmt", "targetLabelDeclId": "0x9"},
            {"id": "0x5", "kind": "LabelStmt", "name": "done", "declId": "0x9",
             "inner": [{"id": "0x6", "kind": "NullStmt"}]},
            {"id": "0x7", "kind": "GotoStmt", "targetLabelDeclId": "0x9"},
        ]});
        let unit = build(&function(body, Vec::new()), "").unwrap();
        let mut targets = Vec::new();
        unit.walk(&mut |node| {
            if *node.kind() == NodeKind::GotoStmt {
                targets.push(node.token("target").unwrap().to_owned());
            }
        });
        assert_eq!(targets, ["done", "done"]);
    }

    #[test]
    fn test_goto_undeclared_label() {
        // the spelled target is kept when the label never shows up
        let source = "int f() { goto out; }";
        let body = json!({"id": "0x3", "kind": "CompoundStmt", "inner": [
            {"id": "0x4", "kind": "GotoStmt", "targetLabelDeclId": "0x9",
             "range": {"begin": {"offset": 10, "tokLen": 4}, "end": {"offset": 15, "tokLen": 3}}},
        ]});
        let unit = build(&function(body, Vec::new()), source).unwrap();
        let decl = unit
            .children("stmts")
            .next()
            .unwrap()
            .children("decls")
            .next()
            .unwrap();
        let goto = decl
            .child("body")
            .unwrap()
            .children("stmts")
            .next()
            .unwrap();
        assert_eq!(goto.token("target"), Some("out"));

        let body = json!({"id": "0x3", "kind": "CompoundStmt", "inner": [
            {"id": "0x4", "kind": "GotoStmt", "targetLabelDeclId": "0x9"},
        ]});
        let err = build(&function(body, Vec::new()), "").unwrap_err();
        assert_eq!(err.kind, BuildErrorKind::UnresolvedLabel("0x9".into()));
        assert_eq!(err.ancestors, ["FunctionDecl 0x2"]);
    }

    #[test]
    fn test_unknown_kind() {
        let body = json!({"id": "0x3", "kind": "CompoundStmt", "inner": [{"id": "0x4", "kind": "SomeFutureNode"}]});
        let err = build(&function(body, Vec::new()), "").unwrap_err();
        assert_eq!(
            err.kind,
            BuildErrorKind::UnsupportedNodeKind("SomeFutureNode".into())
        );
        assert_eq!(
            err.ancestors,
            ["FunctionDecl 0x2", "CompoundStmt 0x3", "SomeFutureNode 0x4"]
        );
    }
}
